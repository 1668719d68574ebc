//! Service layout library
//!
//! Generic CRUD service-layer building blocks: scoped database sessions, a
//! generic repository, a model registry with registry-driven migrations, an
//! outbound HTTP client and application lifecycle hooks.

pub mod config;
pub mod core;
pub mod db;
pub mod modules;
pub mod services;

// Re-export commonly used types
pub use crate::config::AppSettings;
pub use crate::core::{AppError, Result};
pub use crate::db::{Repository, Session, SessionProvider};
pub use crate::modules::tickets;
pub use crate::services::HttpClient;
