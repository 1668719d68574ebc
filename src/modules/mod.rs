pub mod tickets;

use crate::core::Result;
use crate::db::ModelRegistry;

/// Registry holding every application entity. Build it once at startup.
pub fn model_registry() -> Result<ModelRegistry> {
    let mut registry = ModelRegistry::new();
    registry.register::<tickets::Ticket>()?;
    Ok(registry)
}
