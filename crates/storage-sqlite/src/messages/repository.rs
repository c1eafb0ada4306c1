use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::upsert::excluded;
use diesel::SqliteConnection;
use log::debug;

use bookchat_core::errors::{DatabaseError, Error, Result};
use bookchat_core::messages::{
    Message, MessageQuery, MessageRepositoryTrait, MirrorLink, NewMessage,
};
use bookchat_core::mirror::MirrorResult;

use super::model::{MessageDB, MessageMirrorDB, NewMessageDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{message_mirrors, messages};
use crate::utils::{chunk_for_sqlite, now_naive};

pub struct MessageRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl MessageRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        MessageRepository { pool, writer }
    }

    /// Successful mirror links for `message_ids`, grouped by message.
    fn load_links(
        conn: &mut SqliteConnection,
        message_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<MirrorLink>>> {
        let mut links: HashMap<i64, Vec<MirrorLink>> = HashMap::new();
        for chunk in chunk_for_sqlite(message_ids) {
            let rows = message_mirrors::table
                .filter(message_mirrors::message_id.eq_any(chunk))
                .filter(message_mirrors::url.is_not_null())
                .order((message_mirrors::message_id, message_mirrors::target_index))
                .select(MessageMirrorDB::as_select())
                .load::<MessageMirrorDB>(conn)
                .map_err(StorageError::from)?;

            for row in rows {
                let message_id = row.message_id;
                if let Some(link) = row.into_link() {
                    links.entry(message_id).or_default().push(link);
                }
            }
        }
        Ok(links)
    }

    fn attach_links(conn: &mut SqliteConnection, rows: Vec<MessageDB>) -> Result<Vec<Message>> {
        let ids: Vec<i64> = rows.iter().map(|m| m.id).collect();
        let mut links = Self::load_links(conn, &ids)?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let mirrors = links.remove(&row.id).unwrap_or_default();
                row.into_domain(mirrors)
            })
            .collect())
    }
}

#[async_trait]
impl MessageRepositoryTrait for MessageRepository {
    async fn insert_message(&self, new_message: NewMessage) -> Result<Message> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Message> {
                // The writer runs one job at a time, so clamping against the
                // latest row keeps timestamps non-decreasing in id order even
                // if the wall clock steps backwards.
                let latest = messages::table
                    .select(messages::created_at)
                    .order(messages::id.desc())
                    .first::<chrono::NaiveDateTime>(conn)
                    .optional()
                    .map_err(StorageError::from)?;
                let now = now_naive();
                let created_at = latest.map_or(now, |last| last.max(now));

                let row = diesel::insert_into(messages::table)
                    .values(&NewMessageDB {
                        content: new_message.into_content(),
                        created_at,
                    })
                    .returning(MessageDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                debug!("Stored message {}", row.id);
                Ok(Message::from(row))
            })
            .await
    }

    fn list_messages(&self, query: &MessageQuery) -> Result<Vec<Message>> {
        let mut conn = get_connection(&self.pool)?;

        let mut statement = messages::table
            .select(MessageDB::as_select())
            .into_boxed();
        if let Some(since) = query.since {
            statement = statement.filter(messages::created_at.gt(since.naive_utc()));
        }

        let rows = statement
            .order((messages::created_at.desc(), messages::id.desc()))
            .limit(i64::try_from(query.limit).unwrap_or(i64::MAX))
            .load::<MessageDB>(&mut conn)
            .map_err(StorageError::from)?;

        Self::attach_links(&mut conn, rows)
    }

    fn get_message(&self, message_id: i64) -> Result<Message> {
        let mut conn = get_connection(&self.pool)?;
        let row = messages::table
            .find(message_id)
            .select(MessageDB::as_select())
            .first::<MessageDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .ok_or_else(|| {
                Error::Database(DatabaseError::NotFound(format!(
                    "Message {} not found",
                    message_id
                )))
            })?;

        let mut found = Self::attach_links(&mut conn, vec![row])?;
        found
            .pop()
            .ok_or_else(|| Error::Unexpected("message vanished while loading".to_string()))
    }

    async fn record_mirror_results(
        &self,
        message_id: i64,
        results: Vec<MirrorResult>,
    ) -> Result<()> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                let exists = messages::table
                    .find(message_id)
                    .select(messages::id)
                    .first::<i64>(conn)
                    .optional()
                    .map_err(StorageError::from)?;
                if exists.is_none() {
                    return Err(Error::Database(DatabaseError::NotFound(format!(
                        "Message {} not found",
                        message_id
                    ))));
                }

                let recorded_at = now_naive();
                for result in &results {
                    let row = MessageMirrorDB::from_result(message_id, result, recorded_at);
                    diesel::insert_into(message_mirrors::table)
                        .values(&row)
                        .on_conflict((message_mirrors::message_id, message_mirrors::target_index))
                        .do_update()
                        .set((
                            message_mirrors::repository.eq(excluded(message_mirrors::repository)),
                            message_mirrors::url.eq(excluded(message_mirrors::url)),
                            message_mirrors::commit_sha.eq(excluded(message_mirrors::commit_sha)),
                            message_mirrors::error_kind.eq(excluded(message_mirrors::error_kind)),
                            message_mirrors::error_message
                                .eq(excluded(message_mirrors::error_message)),
                            message_mirrors::created_at.eq(excluded(message_mirrors::created_at)),
                        ))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }

                if let Some(url) = MirrorResult::first_url(&results) {
                    diesel::update(
                        messages::table
                            .filter(messages::id.eq(message_id))
                            .filter(messages::github_url.is_null()),
                    )
                    .set(messages::github_url.eq(url))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                }
                Ok(())
            })
            .await
    }
}
