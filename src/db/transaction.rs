//! Routed transactions over the source and replica pools.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tracing::debug;

use super::router::{DbRouter, Endpoint, EndpointChooser, OperationKind};
use super::store::{StoreTransaction, TransactionSource};
use crate::error::{AppError, AppResult};

/// A transaction whose statements are bound per operation kind.
///
/// A transaction is opened lazily on each endpoint the first time a
/// statement is routed there. Once a write has been issued, plain reads
/// follow the chooser back to the source so the transaction reads its own
/// writes.
pub struct RoutedTransaction {
    source: DatabaseConnection,
    replica: Option<DatabaseConnection>,
    chooser: Arc<dyn EndpointChooser>,
    writer: Option<DatabaseTransaction>,
    reader: Option<DatabaseTransaction>,
    wrote: bool,
}

impl RoutedTransaction {
    pub fn new(router: &DbRouter) -> Self {
        Self {
            source: router.source().clone(),
            replica: router.replica().cloned(),
            chooser: router.chooser(),
            writer: None,
            reader: None,
            wrote: false,
        }
    }

    /// Whether a write has been issued in this transaction.
    pub fn has_written(&self) -> bool {
        self.wrote
    }

    /// The transaction a statement of `kind` runs in.
    pub(crate) async fn bind(&mut self, kind: OperationKind) -> AppResult<&DatabaseTransaction> {
        let endpoint = match self.chooser.choose_endpoint(kind, self.wrote) {
            Endpoint::Replica if self.replica.is_none() => Endpoint::Source,
            endpoint => endpoint,
        };
        if kind == OperationKind::Write {
            self.wrote = true;
        }

        match endpoint {
            Endpoint::Source => {
                if self.writer.is_none() {
                    debug!("Opening source transaction");
                    self.writer = Some(begin(&self.source).await?);
                }
                self.writer
                    .as_ref()
                    .ok_or_else(|| AppError::Database("Source transaction not open".to_string()))
            }
            Endpoint::Replica => {
                if self.reader.is_none() {
                    let replica = self.replica.as_ref().ok_or_else(|| {
                        AppError::Database("Replica endpoint not configured".to_string())
                    })?;
                    debug!("Opening replica transaction");
                    self.reader = Some(begin(replica).await?);
                }
                self.reader
                    .as_ref()
                    .ok_or_else(|| AppError::Database("Replica transaction not open".to_string()))
            }
        }
    }
}

async fn begin(conn: &DatabaseConnection) -> AppResult<DatabaseTransaction> {
    conn.begin()
        .await
        .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))
}

#[async_trait]
impl StoreTransaction for RoutedTransaction {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        let this = *self;
        if let Some(reader) = this.reader {
            reader
                .commit()
                .await
                .map_err(|e| AppError::Database(format!("Failed to close replica transaction: {}", e)))?;
        }
        if let Some(writer) = this.writer {
            writer
                .commit()
                .await
                .map_err(|e| AppError::Database(format!("Failed to commit transaction: {}", e)))?;
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        let this = *self;
        if let Some(reader) = this.reader {
            reader
                .rollback()
                .await
                .map_err(|e| AppError::Database(format!("Failed to close replica transaction: {}", e)))?;
        }
        if let Some(writer) = this.writer {
            writer
                .rollback()
                .await
                .map_err(|e| AppError::Database(format!("Failed to roll back transaction: {}", e)))?;
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionSource for DbRouter {
    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(RoutedTransaction::new(self)))
    }
}
