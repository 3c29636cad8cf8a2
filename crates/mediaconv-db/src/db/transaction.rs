//! Database transaction utilities
//!
//! Multi-statement record updates (post row plus its metadata) run inside a
//! [`TransactionGuard`] so they land together or not at all.

use anyhow::{Context, Result};
use sqlx::{MySql, MySqlPool, Transaction};
use std::ops::{Deref, DerefMut};

/// A database transaction wrapper that must be explicitly committed. Dropping
/// it uncommitted rolls back.
///
/// # Example
///
/// ```ignore
/// use mediaconv_db::TransactionGuard;
///
/// async fn example(pool: &sqlx::MySqlPool) -> anyhow::Result<()> {
///     let mut tx = TransactionGuard::begin(pool).await?;
///     sqlx::query("UPDATE ...").execute(&mut **tx).await?;
///     tx.commit().await?;
///     Ok(())
/// }
/// ```
pub struct TransactionGuard {
    transaction: Option<Transaction<'static, MySql>>,
}

impl TransactionGuard {
    /// Begin a new database transaction
    pub async fn begin(pool: &MySqlPool) -> Result<Self> {
        let transaction = pool
            .begin()
            .await
            .context("Failed to begin database transaction")?;

        Ok(Self {
            transaction: Some(transaction),
        })
    }

    /// Commit the transaction
    pub async fn commit(mut self) -> Result<()> {
        if let Some(tx) = self.transaction.take() {
            tx.commit()
                .await
                .context("Failed to commit database transaction")?;
        }
        Ok(())
    }
}

impl Deref for TransactionGuard {
    type Target = Transaction<'static, MySql>;

    fn deref(&self) -> &Self::Target {
        self.transaction
            .as_ref()
            .expect("Transaction was already committed")
    }
}

impl DerefMut for TransactionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.transaction
            .as_mut()
            .expect("Transaction was already committed")
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        // sqlx rolls back a dropped transaction when its connection returns to the pool.
        if self.transaction.is_some() {
            tracing::warn!(
                "Transaction was dropped without commit - rolling back"
            );
        }
    }
}
