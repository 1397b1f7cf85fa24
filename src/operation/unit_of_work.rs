//! Transactional resources attached to an operation.

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};

use crate::{db::DbPool, error::AppError};

/// A transactional resource an operation may hold for its lifetime.
///
/// The owning [`OperationTemplate`](super::OperationTemplate) calls
/// [`release`](Self::release) exactly once, when the operation is disposed or
/// dropped.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Name reported for this resource by health checks.
    fn component(&self) -> &str;

    /// Round-trip to the underlying resource.
    async fn probe(&mut self) -> Result<(), AppError>;

    /// Gives back whatever the unit of work holds. Uncommitted work is discarded.
    fn release(&mut self);
}

/// Unit of work over a Postgres transaction, opened on first use.
pub struct PgUnitOfWork {
    pool: DbPool,
    transaction: Option<Transaction<'static, Postgres>>,
}

impl PgUnitOfWork {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            transaction: None,
        }
    }

    async fn transaction(&mut self) -> Result<&mut Transaction<'static, Postgres>, AppError> {
        let tx = match self.transaction.take() {
            Some(tx) => tx,
            None => self.pool.begin().await?,
        };
        Ok(self.transaction.insert(tx))
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    fn component(&self) -> &str {
        "postgres"
    }

    async fn probe(&mut self) -> Result<(), AppError> {
        let tx = self.transaction().await?;
        sqlx::query("SELECT 1").execute(&mut **tx).await?;
        Ok(())
    }

    fn release(&mut self) {
        // Dropping an open sqlx transaction rolls it back.
        self.transaction.take();
    }
}
