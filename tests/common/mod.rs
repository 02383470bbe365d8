#![allow(dead_code)]

use async_trait::async_trait;
use maestro_probe::configuration::{ConfigResolver, EnvironmentSettings, DatabaseSettings};
use maestro_probe::models::{BackendKind, ProbeOutcome};
use maestro_probe::probes::{Probe, ProbeError};
use maestro_probe::services::{PersistenceError, ResultSink};
use sqlx::{Connection, PgConnection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// A local port with nothing listening on it.
pub fn refused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    listener.local_addr().unwrap().port()
}

pub fn resolver(pairs: &[(&str, String)]) -> ConfigResolver<HashMap<String, String>> {
    ConfigResolver::new(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    )
}

/// Live backends are only used when `MAESTRO_LIVE_TESTS` is set.
pub fn live_resolver() -> Option<ConfigResolver<EnvironmentSettings>> {
    if std::env::var("MAESTRO_LIVE_TESTS").is_err() {
        eprintln!("Skipping live test: MAESTRO_LIVE_TESTS is not set");
        return None;
    }
    Some(ConfigResolver::new(EnvironmentSettings::load()))
}

pub async fn configure_database(settings: &DatabaseSettings) -> Result<PgConnection, sqlx::Error> {
    let mut connection = PgConnection::connect(&settings.connection_string()).await?;

    sqlx::migrate!("./migrations").run(&mut connection).await?;

    Ok(connection)
}

/// Probe double that returns a canned result and notes the order it ran in.
pub struct ScriptedProbe {
    kind: BackendKind,
    result: Result<String, String>,
    calls: Arc<Mutex<Vec<BackendKind>>>,
}

impl ScriptedProbe {
    pub fn ok(kind: BackendKind, detail: &str, calls: &Arc<Mutex<Vec<BackendKind>>>) -> Box<Self> {
        Box::new(Self {
            kind,
            result: Ok(detail.to_string()),
            calls: calls.clone(),
        })
    }

    pub fn failing(kind: BackendKind, reason: &str, calls: &Arc<Mutex<Vec<BackendKind>>>) -> Box<Self> {
        Box::new(Self {
            kind,
            result: Err(reason.to_string()),
            calls: calls.clone(),
        })
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn target(&self) -> String {
        format!("scripted-{}", self.kind)
    }

    async fn execute(&self) -> Result<String, ProbeError> {
        self.calls.lock().unwrap().push(self.kind);
        self.result
            .clone()
            .map_err(ProbeError::ConnectFailure)
    }
}

/// In-memory sink; `fail` makes every write fail.
#[derive(Clone, Default)]
pub struct MemorySink {
    pub records: Arc<Mutex<Vec<(Uuid, ProbeOutcome)>>>,
    pub fail: bool,
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn record(&self, job_id: Uuid, outcome: &ProbeOutcome) -> Result<(), PersistenceError> {
        if self.fail {
            return Err(PersistenceError::Connect("store offline".to_string()));
        }
        self.records.lock().unwrap().push((job_id, outcome.clone()));
        Ok(())
    }
}
