use async_trait::async_trait;
use chrono::Utc;

use crate::core::{AppError, Result};
use crate::db::{Attributes, FieldValue, Repository, RepositoryHooks, Session};
use crate::modules::tickets::models::{Ticket, TICKET_STATUSES};

/// Ticket repository: generic CRUD plus ticket-specific attribute rules
pub type TicketRepository = Repository<Ticket, TicketHooks>;

pub fn ticket_repository(session: Session) -> TicketRepository {
    Repository::with_hooks(session, TicketHooks)
}

/// Normalizes names, checks statuses and stamps `updated_at`
#[derive(Debug, Clone, Copy, Default)]
pub struct TicketHooks;

#[async_trait]
impl RepositoryHooks<Ticket> for TicketHooks {
    async fn before_create(&self, mut attributes: Attributes) -> Result<Attributes> {
        match attributes.get("name") {
            Some(FieldValue::Text(_)) => {}
            _ => return Err(AppError::validation("Ticket name is required")),
        }
        normalize(&mut attributes)?;
        Ok(attributes)
    }

    async fn before_update(&self, ticket: &Ticket, mut attributes: Attributes) -> Result<Attributes> {
        if ticket.is_closed() && !attributes.contains_key("status") {
            return Err(AppError::validation(format!(
                "Ticket {} is closed; reopen it before editing",
                ticket.id
            )));
        }
        normalize(&mut attributes)?;
        attributes.insert("updated_at", Utc::now());
        Ok(attributes)
    }
}

fn normalize(attributes: &mut Attributes) -> Result<()> {
    if let Some(FieldValue::Text(name)) = attributes.get("name") {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("Ticket name cannot be blank"));
        }
        attributes.insert("name", name);
    }

    match attributes.get("status") {
        None => {}
        Some(FieldValue::Text(status)) if TICKET_STATUSES.contains(&status.as_str()) => {}
        Some(other) => {
            return Err(AppError::validation(format!(
                "Invalid ticket status '{}'",
                other
            )))
        }
    }

    Ok(())
}
