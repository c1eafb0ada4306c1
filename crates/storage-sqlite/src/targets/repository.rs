use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::upsert::excluded;
use diesel::SqliteConnection;

use bookchat_core::errors::Result;
use bookchat_core::mirror::{RepositoryTarget, TargetStateStore, TargetSyncState};

use super::model::{NewRepositoryDB, RepositoryDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::repositories;

/// Tracks configured targets by `owner/name` and when each last accepted a
/// commit. Tokens are never written.
pub struct TargetRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl TargetRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        TargetRepository { pool, writer }
    }
}

#[async_trait]
impl TargetStateStore for TargetRepository {
    async fn register_targets(&self, targets: &[RepositoryTarget]) -> Result<()> {
        let rows: Vec<NewRepositoryDB> = targets.iter().map(NewRepositoryDB::from).collect();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                for row in &rows {
                    diesel::insert_into(repositories::table)
                        .values(row)
                        .on_conflict((repositories::owner, repositories::name))
                        .do_update()
                        .set(repositories::target_index.eq(excluded(repositories::target_index)))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                Ok(())
            })
            .await
    }

    async fn mark_synced(&self, target: &RepositoryTarget, at: DateTime<Utc>) -> Result<()> {
        let owner = target.owner.clone();
        let name = target.name.clone();
        let at = at.trunc_subsecs(3).naive_utc();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::update(
                    repositories::table
                        .filter(repositories::owner.eq(owner))
                        .filter(repositories::name.eq(name)),
                )
                .set(repositories::last_sync.eq(Some(at)))
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    fn list_target_states(&self) -> Result<Vec<TargetSyncState>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = repositories::table
            .order((repositories::target_index, repositories::id))
            .select(RepositoryDB::as_select())
            .load::<RepositoryDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(TargetSyncState::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use bookchat_core::mirror::Credential;
    use tempfile::tempdir;

    async fn create_test_repository() -> (TargetRepository, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("chat.db");
        let db_path_str = db_path.to_string_lossy().to_string();

        let pool = create_pool(&db_path_str).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());

        (TargetRepository::new(pool, writer), temp_dir)
    }

    fn target(index: usize, name: &str) -> RepositoryTarget {
        RepositoryTarget::new(index, "octo", name, Credential::new("ghp_secret"))
    }

    #[tokio::test]
    async fn registers_targets_and_records_sync_times() {
        let (repo, _dir) = create_test_repository().await;
        let targets = vec![target(1, "first"), target(2, "second")];
        repo.register_targets(&targets).await.unwrap();

        let states = repo.list_target_states().unwrap();
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].repository, "octo/first");
        assert!(states.iter().all(|s| s.last_sync.is_none()));

        let at = Utc::now().trunc_subsecs(3);
        repo.mark_synced(&targets[1], at).await.unwrap();

        let states = repo.list_target_states().unwrap();
        assert_eq!(states[1].last_sync, Some(at));
        assert!(states[0].last_sync.is_none());
    }

    #[tokio::test]
    async fn re_registering_moves_index_and_keeps_sync_time() {
        let (repo, _dir) = create_test_repository().await;
        repo.register_targets(&[target(1, "chat")]).await.unwrap();
        let at = Utc::now().trunc_subsecs(3);
        repo.mark_synced(&target(1, "chat"), at).await.unwrap();

        repo.register_targets(&[target(3, "chat")]).await.unwrap();

        let states = repo.list_target_states().unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].index, 3);
        assert_eq!(states[0].last_sync, Some(at));
    }
}
