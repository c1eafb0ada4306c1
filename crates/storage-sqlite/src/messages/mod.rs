//! SQLite storage implementation for chat messages.

mod model;
mod repository;

pub use model::{MessageDB, MessageMirrorDB, NewMessageDB};
pub use repository::MessageRepository;
