pub mod flag;
pub mod index;

pub use flag::FlagQueue;
pub use index::IndexQueue;
