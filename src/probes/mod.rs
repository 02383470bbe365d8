//! Connect-and-check probes, one per backend kind.
//!
//! A backend exposes three capabilities: `connect` acquires a session,
//! `check` performs one functional check on it, and `release` gives it back.
//! [`scoped`] drives them so that every acquired session is released exactly
//! once, whatever the check returned. The orchestrator only sees [`Probe`],
//! whose [`Probe::run`] turns any failure into a failed [`ProbeOutcome`].

mod api;
mod broker;
mod database;
mod error;

pub use api::ApiProbe;
pub use broker::{BrokerProbe, TEST_QUEUE};
pub use database::DatabaseProbe;
pub use error::ProbeError;

use crate::configuration::BackendConfig;
use crate::models::{BackendKind, ProbeOutcome};
use async_trait::async_trait;
use std::future::Future;
use std::time::{Duration, Instant};

#[async_trait]
pub trait Backend: Send + Sync {
    type Session: Send;

    /// Acquire every resource the check needs. On error nothing may remain open.
    async fn connect(&self) -> Result<Self::Session, ProbeError>;

    /// Run the functional check, returning a detail string on success.
    async fn check(&self, session: &mut Self::Session) -> Result<String, ProbeError>;

    async fn release(&self, session: Self::Session);
}

/// connect, check, release. `release` consumes the session, so it runs once
/// for each session `connect` handed out.
pub async fn scoped<B: Backend + ?Sized>(backend: &B) -> Result<String, ProbeError> {
    let mut session = backend.connect().await?;
    let checked = backend.check(&mut session).await;
    backend.release(session).await;
    checked
}

#[async_trait]
pub trait Probe: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Host, address or URL being probed. Never contains secrets.
    fn target(&self) -> String;

    async fn execute(&self) -> Result<String, ProbeError>;

    async fn run(&self) -> ProbeOutcome {
        let start = Instant::now();
        let result = self.execute().await;
        let elapsed = start.elapsed().as_millis() as u64;

        match result {
            Ok(detail) => {
                tracing::info!(
                    backend = %self.kind(),
                    target = %self.target(),
                    elapsed_ms = elapsed,
                    "Probe succeeded"
                );
                ProbeOutcome::succeeded(self.kind(), self.target(), detail, elapsed)
            }
            Err(err) => {
                tracing::error!(
                    backend = %self.kind(),
                    target = %self.target(),
                    elapsed_ms = elapsed,
                    "Probe failed: {}",
                    err
                );
                ProbeOutcome::failed(
                    self.kind(),
                    self.target(),
                    err.kind(),
                    err.to_string(),
                    elapsed,
                )
            }
        }
    }
}

/// Build the probe matching a resolved backend configuration.
pub fn from_config(config: BackendConfig, timeout: Duration) -> Box<dyn Probe> {
    match config {
        BackendConfig::Database(settings) => {
            Box::new(DatabaseProbe::new(settings).with_timeout(timeout))
        }
        BackendConfig::Broker(settings) => Box::new(BrokerProbe::new(settings).with_timeout(timeout)),
        BackendConfig::Api(settings) => Box::new(ApiProbe::new(settings).with_timeout(timeout)),
    }
}

/// Bound `fut` by `limit`, mapping an elapsed timer through `on_timeout`.
pub(crate) async fn within<T, F>(
    limit: Duration,
    fut: F,
    on_timeout: impl FnOnce(String) -> ProbeError,
) -> Result<T, ProbeError>
where
    F: Future<Output = Result<T, ProbeError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout(format!("timed out after {:?}", limit))),
    }
}
