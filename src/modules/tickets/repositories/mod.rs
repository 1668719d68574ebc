pub mod ticket_repository;

pub use ticket_repository::{ticket_repository, TicketHooks, TicketRepository};
