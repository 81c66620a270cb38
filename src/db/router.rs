//! Endpoint selection for read replica routing.
//!
//! Every statement a transaction issues is classified as an [`OperationKind`]
//! and bound to the endpoint an [`EndpointChooser`] picks for it.

use std::sync::Arc;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

use crate::config::DatabaseSettings;
use crate::error::{AppError, AppResult};

/// What a statement does, as far as routing is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Plain select.
    Read,
    /// Select that takes an exclusive row lock.
    LockedRead,
    /// Insert, update or delete.
    Write,
}

/// A database endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// The writer.
    Source,
    /// The read replica.
    Replica,
}

/// Picks the endpoint a statement runs on.
///
/// `wrote` is true once the enclosing transaction has issued a write.
pub trait EndpointChooser: Send + Sync {
    fn choose_endpoint(&self, kind: OperationKind, wrote: bool) -> Endpoint;
}

/// Everything runs on the source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleEndpoint;

impl EndpointChooser for SingleEndpoint {
    fn choose_endpoint(&self, _kind: OperationKind, _wrote: bool) -> Endpoint {
        Endpoint::Source
    }
}

/// Writes and locked reads go to the source, plain reads to the replica
/// until the transaction has written.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadReplicaRouting;

impl EndpointChooser for ReadReplicaRouting {
    fn choose_endpoint(&self, kind: OperationKind, wrote: bool) -> Endpoint {
        match kind {
            OperationKind::Write | OperationKind::LockedRead => Endpoint::Source,
            OperationKind::Read if wrote => Endpoint::Source,
            OperationKind::Read => Endpoint::Replica,
        }
    }
}

/// Connection pools for the configured topology plus the routing policy.
#[derive(Clone)]
pub struct DbRouter {
    source: DatabaseConnection,
    replica: Option<DatabaseConnection>,
    chooser: Arc<dyn EndpointChooser>,
}

impl DbRouter {
    /// Connect to one endpoint (`replica_url` is `None`) or to a source and a replica.
    pub async fn connect(
        settings: &DatabaseSettings,
        source_url: &str,
        replica_url: Option<&str>,
    ) -> AppResult<Self> {
        let source = connect_pool(settings, source_url).await?;
        let replica = match replica_url {
            Some(url) => Some(connect_pool(settings, url).await?),
            None => None,
        };

        let chooser: Arc<dyn EndpointChooser> = if replica.is_some() {
            info!("Database routing: source + read replica");
            Arc::new(ReadReplicaRouting)
        } else {
            info!("Database routing: single endpoint");
            Arc::new(SingleEndpoint)
        };

        Ok(Self {
            source,
            replica,
            chooser,
        })
    }

    /// Build a router over existing connections.
    pub fn from_connections(
        source: DatabaseConnection,
        replica: Option<DatabaseConnection>,
        chooser: Arc<dyn EndpointChooser>,
    ) -> Self {
        Self {
            source,
            replica,
            chooser,
        }
    }

    /// The writer connection, used for migrations and readiness checks.
    pub fn source(&self) -> &DatabaseConnection {
        &self.source
    }

    pub fn replica(&self) -> Option<&DatabaseConnection> {
        self.replica.as_ref()
    }

    pub fn chooser(&self) -> Arc<dyn EndpointChooser> {
        self.chooser.clone()
    }
}

async fn connect_pool(settings: &DatabaseSettings, url: &str) -> AppResult<DatabaseConnection> {
    let mut options = ConnectOptions::new(url.to_owned());
    options
        .max_connections(settings.pool_size)
        .min_connections(1)
        .acquire_timeout(settings.pool_timeout)
        .max_lifetime(settings.recycle)
        .sqlx_logging(settings.log_queries);

    Database::connect(options)
        .await
        .map_err(|e| AppError::Database(format!("Failed to connect to database: {}", e)))
}
