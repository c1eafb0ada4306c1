//! BookChat Core - Domain entities, services, and traits.
//!
//! This crate contains the chat domain: the message store service and its
//! cache, the repository mirror, and the chat orchestration that ties them
//! together. It is storage-agnostic and defines traits that are implemented
//! by `bookchat-storage-sqlite` (persistence) and `bookchat-github` (remotes).
//!
//! ```text
//!                 ChatService
//!                /           \
//!     MessageService       MirrorService
//!          │                     │
//!  MessageRepositoryTrait   MirrorClient ── TargetStateStore
//! ```

pub mod chat;
pub mod constants;
pub mod errors;
pub mod messages;
pub mod mirror;

pub use errors::Error;
pub use errors::Result;
