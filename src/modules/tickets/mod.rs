pub mod models;
pub mod repositories;

pub use models::{Ticket, TICKET_STATUSES};
pub use repositories::{ticket_repository, TicketHooks, TicketRepository};
