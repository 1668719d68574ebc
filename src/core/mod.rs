pub mod error;
pub mod events;
pub mod telemetry;

pub use error::{AppError, Result};
