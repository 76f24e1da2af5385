pub mod ticket;

pub use ticket::TicketQueue;
