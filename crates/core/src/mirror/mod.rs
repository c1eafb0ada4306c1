//! Repository mirror - turns each stored message into a commit on every
//! configured repository target.
//!
//! Mirroring is best-effort: every target is attempted independently and
//! failures are reported per target instead of aborting the others.

mod errors;
mod mirror_model;
mod mirror_service;
mod mirror_traits;
pub mod targets;

pub use errors::{MirrorError, MirrorErrorKind};
pub use mirror_model::{
    CommitQuery, Credential, MirrorOutcome, MirrorPolicy, MirrorReceipt, MirrorResult,
    RemoteCommit, RepositoryTarget, TargetSyncState,
};
pub use mirror_service::MirrorService;
pub use mirror_traits::{MirrorClient, MirrorServiceTrait, TargetStateStore};
pub use targets::{parse_target, targets_from_vars};
