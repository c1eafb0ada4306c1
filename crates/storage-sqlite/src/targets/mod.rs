//! SQLite storage implementation for mirror target bookkeeping.

mod model;
mod repository;

pub use model::{NewRepositoryDB, RepositoryDB};
pub use repository::TargetRepository;
