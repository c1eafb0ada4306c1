//! Messages module - domain models, the message store service, and its cache.

mod cache;
mod messages_model;
mod messages_service;
mod messages_traits;

pub use cache::{CacheConfig, MessageCache};
pub use messages_model::{Message, MessageQuery, MirrorLink, NewMessage};
pub use messages_service::MessageService;
pub use messages_traits::{MessageRepositoryTrait, MessageServiceTrait};
