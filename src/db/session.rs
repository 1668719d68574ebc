//! Scoped database sessions.
//!
//! A [`Session`] is one logical unit of work: the first statement begins a
//! transaction, [`Session::commit`] ends it, and the next statement starts a
//! fresh one. [`SessionProvider::scope`] hands a session to a closure and
//! closes it afterwards no matter how the closure finished. Closing rolls
//! back whatever was not committed and returns the connection to the pool;
//! every later call fails with [`AppError::SessionClosed`].

use std::future::Future;
use std::sync::Arc;

use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use tokio::sync::Mutex;

use crate::core::{AppError, Result};

/// Hands out sessions bound to the shared connection pool
#[derive(Debug, Clone)]
pub struct SessionProvider {
    pool: PgPool,
}

impl SessionProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// An unscoped session; the caller is responsible for `close()`
    pub fn session(&self) -> Session {
        Session::new(self.pool.clone())
    }

    /// Run `f` with a fresh session and close it on every exit path
    pub async fn scope<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let session = self.session();
        let result = f(session.clone()).await;
        session.close().await;
        result
    }
}

struct SessionState {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
    closed: bool,
}

impl SessionState {
    /// Current transaction, begun lazily
    async fn transaction(&mut self) -> Result<&mut Transaction<'static, Postgres>> {
        if self.closed {
            return Err(AppError::SessionClosed);
        }

        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => {
                tracing::trace!("Beginning transaction");
                self.pool.begin().await?
            }
        };
        Ok(self.tx.insert(tx))
    }
}

/// Handle to one exclusively owned unit of work
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    fn new(pool: PgPool) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                pool,
                tx: None,
                closed: false,
            })),
        }
    }

    pub async fn fetch_all<E>(&self, qb: &mut QueryBuilder<'_, Postgres>) -> Result<Vec<E>>
    where
        E: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut state = self.state.lock().await;
        let tx = state.transaction().await?;
        let rows = qb.build_query_as::<E>().fetch_all(&mut **tx).await?;
        Ok(rows)
    }

    pub async fn fetch_optional<E>(&self, qb: &mut QueryBuilder<'_, Postgres>) -> Result<Option<E>>
    where
        E: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut state = self.state.lock().await;
        let tx = state.transaction().await?;
        let row = qb.build_query_as::<E>().fetch_optional(&mut **tx).await?;
        Ok(row)
    }

    /// Single `BIGINT` value (ids, counts)
    pub async fn fetch_scalar(&self, qb: &mut QueryBuilder<'_, Postgres>) -> Result<i64> {
        let mut state = self.state.lock().await;
        let tx = state.transaction().await?;
        let value = qb.build_query_scalar::<i64>().fetch_one(&mut **tx).await?;
        Ok(value)
    }

    /// Returns the number of affected rows
    pub async fn execute(&self, qb: &mut QueryBuilder<'_, Postgres>) -> Result<u64> {
        let mut state = self.state.lock().await;
        let tx = state.transaction().await?;
        let result = qb.build().execute(&mut **tx).await?;
        Ok(result.rows_affected())
    }

    pub async fn ping(&self) -> Result<()> {
        let mut qb = QueryBuilder::new("SELECT 1::BIGINT");
        self.fetch_scalar(&mut qb).await?;
        Ok(())
    }

    /// Commit the open transaction, if any
    pub async fn commit(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(AppError::SessionClosed);
        }
        if let Some(tx) = state.tx.take() {
            tx.commit().await?;
            tracing::trace!("Transaction committed");
        }
        Ok(())
    }

    /// Discard the open transaction, if any
    pub async fn rollback(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(AppError::SessionClosed);
        }
        if let Some(tx) = state.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }

    /// Roll back uncommitted work and refuse further use. Never fails; a
    /// rollback error is logged and the connection is dropped anyway.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if state.closed {
            return;
        }
        state.closed = true;
        if let Some(tx) = state.tx.take() {
            if let Err(e) = tx.rollback().await {
                tracing::warn!(error = %e, "Rollback on session close failed");
            }
        }
        tracing::trace!("Session closed");
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }
}
