use chrono::NaiveDateTime;
use diesel::prelude::*;

use bookchat_core::mirror::{RepositoryTarget, TargetSyncState};

use crate::utils::to_utc;

#[derive(Queryable, Identifiable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::repositories)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RepositoryDB {
    pub id: i64,
    pub target_index: i64,
    pub owner: String,
    pub name: String,
    pub last_sync: Option<NaiveDateTime>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::repositories)]
pub struct NewRepositoryDB {
    pub target_index: i64,
    pub owner: String,
    pub name: String,
}

impl From<&RepositoryTarget> for NewRepositoryDB {
    fn from(target: &RepositoryTarget) -> Self {
        Self {
            target_index: target.index as i64,
            owner: target.owner.clone(),
            name: target.name.clone(),
        }
    }
}

impl From<RepositoryDB> for TargetSyncState {
    fn from(db: RepositoryDB) -> Self {
        Self {
            index: usize::try_from(db.target_index).unwrap_or_default(),
            repository: format!("{}/{}", db.owner, db.name),
            last_sync: db.last_sync.map(to_utc),
        }
    }
}
