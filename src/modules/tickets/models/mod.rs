pub mod ticket;

pub use ticket::{Ticket, TICKET_STATUSES};
