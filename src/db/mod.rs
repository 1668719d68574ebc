//! Persistence layer: sessions, model metadata, the generic repository and
//! registry-driven migrations.

pub mod migrations;
pub mod pagination;
pub mod query;
pub mod registry;
pub mod repository;
pub mod session;
pub mod value;

pub use pagination::{Page, PageParams};
pub use registry::{ColumnDef, Entity, ModelRegistry, SqlType, TableDef};
pub use repository::{NoHooks, Repository, RepositoryHooks};
pub use session::{Session, SessionProvider};
pub use value::{Attributes, FieldMap, FieldValue, Filters};
