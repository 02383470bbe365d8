use async_trait::async_trait;
use sqlx::{Connection, PgConnection};
use std::time::Duration;
use uuid::Uuid;

use crate::configuration::{DatabaseSettings, DEFAULT_PROBE_TIMEOUT};
use crate::db;
use crate::models::{JobLogRecord, ProbeOutcome};

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("log store unreachable: {0}")]
    Connect(String),
    #[error("log write failed: {0}")]
    Write(String),
}

/// Durable destination for probe outcomes.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn record(&self, job_id: Uuid, outcome: &ProbeOutcome) -> Result<(), PersistenceError>;
}

/// Writes each outcome to `job_logs` over its own connection: one record, one connection.
pub struct PgResultLogger {
    settings: DatabaseSettings,
    timeout: Duration,
}

impl PgResultLogger {
    pub fn new(settings: DatabaseSettings) -> Self {
        Self {
            settings,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn connect(&self) -> Result<PgConnection, PersistenceError> {
        let options = self
            .settings
            .connect_options()
            .map_err(|err| PersistenceError::Connect(err.to_string()))?;

        match tokio::time::timeout(self.timeout, PgConnection::connect_with(&options)).await {
            Ok(Ok(connection)) => Ok(connection),
            Ok(Err(err)) => Err(PersistenceError::Connect(err.to_string())),
            Err(_) => Err(PersistenceError::Connect(format!(
                "timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

#[async_trait]
impl ResultSink for PgResultLogger {
    #[tracing::instrument(name = "Record probe outcome", skip(self, outcome), fields(backend = %outcome.backend_kind))]
    async fn record(&self, job_id: Uuid, outcome: &ProbeOutcome) -> Result<(), PersistenceError> {
        let record = JobLogRecord::from_outcome(job_id, outcome);
        let mut connection = self.connect().await?;

        let written = db::job_log::insert(&mut connection, &record)
            .await
            .map_err(PersistenceError::Write);

        if let Err(err) = connection.close().await {
            tracing::warn!("Closing log store connection: {:?}", err);
        }

        written
    }
}
