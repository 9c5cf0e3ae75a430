use super::DbPool;
use crate::errors::StorageError;
use diesel::SqliteConnection;
use std::any::Any;
use tokio::sync::{mpsc, oneshot};

use famquest_core::errors::Result;

// A job executed by the writer actor: a closure over the actor's dedicated
// connection. Callers get back a core Result, with domain errors raised
// inside the transaction preserved across the channel.
type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;

/// Handle for sending write jobs to the writer actor.
///
/// Every mutation in the system funnels through this handle. The actor owns
/// a single connection and runs one job at a time inside an immediate
/// transaction, so read-modify-write sequences (progress accumulation,
/// reward issuance) are serialized without row locks.
#[derive(Clone)]
pub struct WriteHandle {
    // Jobs are boxed closures paired with a oneshot sender for the reply.
    // Box<dyn Any + Send> erases the job's return type on the wire.
    #[allow(clippy::type_complexity)]
    tx: mpsc::Sender<(
        Job<Box<dyn Any + Send + 'static>>,
        oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>,
    )>,
}

impl WriteHandle {
    /// Executes a database job on the writer actor's dedicated connection.
    ///
    /// The closure runs inside an immediate transaction; returning an `Err`
    /// rolls the transaction back and the error is forwarded to the caller.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static + Any,
    {
        let (ret_tx, ret_rx) = oneshot::channel();

        self.tx
            .send((
                Box::new(move |c| job(c).map(|v| Box::new(v) as Box<dyn Any + Send>)),
                ret_tx,
            ))
            .await
            .expect("writer actor channel closed, the actor has stopped");

        ret_rx
            .await
            .expect("writer actor dropped the reply sender without responding")
            .map(|boxed: Box<dyn Any + Send + 'static>| {
                *boxed
                    .downcast::<T>()
                    .unwrap_or_else(|_| panic!("failed to downcast writer actor result"))
            })
    }
}

/// Spawns a background Tokio task acting as the single writer to the
/// database. The actor takes one connection from the pool and processes
/// jobs serially, each wrapped in an immediate transaction.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (tx, mut rx) = mpsc::channel::<(
        Job<Box<dyn Any + Send + 'static>>,
        oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>,
    )>(1024);

    tokio::spawn(async move {
        // This connection is held for the lifetime of the actor.
        let mut conn = pool
            .get()
            .expect("failed to get a connection from the pool for the writer actor");

        while let Some((job, reply_tx)) = rx.recv().await {
            // StorageError implements From<diesel::result::Error>, which the
            // transaction combinator needs; core errors pass through intact.
            let result: Result<Box<dyn Any + Send + 'static>> = conn
                .immediate_transaction::<_, StorageError, _>(|c| {
                    job(c).map_err(StorageError::from)
                })
                .map_err(|e: StorageError| e.into());

            // Ignore a dropped receiver, the caller may have been cancelled.
            let _ = reply_tx.send(result);
        }
        // rx.recv() == None means every WriteHandle was dropped.
    });

    WriteHandle { tx }
}
