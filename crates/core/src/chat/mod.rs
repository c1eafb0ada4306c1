//! Chat module - the request-level flow behind posting and reading messages.

mod chat_service;

pub use chat_service::{ChatReceipt, ChatService};
