use async_trait::async_trait;
use sqlx::{Connection, PgConnection};
use std::time::Duration;

use super::{scoped, within, Backend, Probe, ProbeError};
use crate::configuration::{DatabaseSettings, DEFAULT_PROBE_TIMEOUT};
use crate::models::BackendKind;

/// Opens a dedicated connection (no pool) and asks the server for its version.
pub struct DatabaseProbe {
    settings: DatabaseSettings,
    timeout: Duration,
}

impl DatabaseProbe {
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
}

#[async_trait]
impl Backend for DatabaseProbe {
    type Session = PgConnection;

    #[tracing::instrument(name = "Connect to PostgreSQL", skip(self), fields(address = %self.settings.address()))]
    async fn connect(&self) -> Result<PgConnection, ProbeError> {
        let options = self.settings.connect_options()?;

        within(
            self.timeout,
            async {
                PgConnection::connect_with(&options)
                    .await
                    .map_err(|err| ProbeError::ConnectFailure(err.to_string()))
            },
            ProbeError::ConnectFailure,
        )
        .await
    }

    #[tracing::instrument(name = "Query PostgreSQL version", skip(self, session))]
    async fn check(&self, session: &mut PgConnection) -> Result<String, ProbeError> {
        within(
            self.timeout,
            async {
                sqlx::query_scalar::<_, String>("SELECT version()")
                    .fetch_one(&mut *session)
                    .await
                    .map_err(|err| ProbeError::CheckFailure(err.to_string()))
            },
            ProbeError::CheckFailure,
        )
        .await
    }

    async fn release(&self, session: PgConnection) {
        match tokio::time::timeout(self.timeout, session.close()).await {
            Ok(Ok(())) => tracing::debug!("PostgreSQL connection closed"),
            Ok(Err(err)) => tracing::warn!("Closing PostgreSQL connection: {:?}", err),
            // the dropped future takes the socket with it
            Err(_) => tracing::warn!("Closing PostgreSQL connection timed out"),
        }
    }
}

#[async_trait]
impl Probe for DatabaseProbe {
    fn kind(&self) -> BackendKind {
        BackendKind::Database
    }

    fn target(&self) -> String {
        self.settings.address()
    }

    async fn execute(&self) -> Result<String, ProbeError> {
        scoped(self).await
    }
}
