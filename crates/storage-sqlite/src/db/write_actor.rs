//! Single-writer actor.
//!
//! All writes go through one task that owns one pooled connection and runs
//! each job inside an `IMMEDIATE` transaction, so message identifiers and
//! timestamps advance together under concurrent posts.

use std::any::Any;

use diesel::connection::Connection;
use diesel::SqliteConnection;
use log::{error, warn};
use tokio::sync::{mpsc, oneshot};

use bookchat_core::errors::{DatabaseError, Error, Result};

use super::DbPool;
use crate::errors::StorageError;

type AnyBox = Box<dyn Any + Send + 'static>;
type Job = Box<dyn FnOnce(&mut SqliteConnection) -> Result<AnyBox> + Send + 'static>;
type Envelope = (Job, oneshot::Sender<Result<AnyBox>>);

/// Queue depth before callers start waiting on the writer.
const WRITE_QUEUE_DEPTH: usize = 1024;

/// Handle for submitting jobs to the writer task.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<Envelope>,
}

impl WriteHandle {
    /// Runs `job` on the writer connection and waits for its result.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |conn| job(conn).map(|value| Box::new(value) as AnyBox));

        self.tx
            .send((job, reply_tx))
            .await
            .map_err(|_| writer_gone("writer task has stopped"))?;

        let boxed = reply_rx
            .await
            .map_err(|_| writer_gone("writer task dropped the reply"))??;

        boxed
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| Error::Unexpected("writer returned an unexpected type".to_string()))
    }
}

fn writer_gone(reason: &str) -> Error {
    Error::Database(DatabaseError::WriterUnavailable(reason.to_string()))
}

/// Spawns the writer task on the current Tokio runtime.
///
/// The task holds one connection from `pool` for its whole lifetime and
/// exits once every [`WriteHandle`] has been dropped.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (tx, mut rx) = mpsc::channel::<Envelope>(WRITE_QUEUE_DEPTH);

    tokio::spawn(async move {
        let mut conn = match pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                error!("Writer could not acquire a database connection: {}", e);
                // Dropping `rx` fails every pending and future exec call.
                return;
            }
        };

        while let Some((job, reply_tx)) = rx.recv().await {
            let result: Result<AnyBox> = conn
                .immediate_transaction::<_, StorageError, _>(|c| job(c).map_err(StorageError::from))
                .map_err(Error::from);

            if reply_tx.send(result).is_err() {
                warn!("Write completed but the caller went away before the reply");
            }
        }
    });

    WriteHandle { tx }
}
