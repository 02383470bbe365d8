use serde::Serialize;
use std::io::Write;
use uuid::Uuid;

use crate::configuration::{ConfigResolver, SettingsSource};
use crate::models::{BackendKind, ProbeOutcome};
use crate::probes::{self, Probe};
use crate::services::ResultSink;

const RULE: &str = "==================================================";

/// Linear run states. A run never branches on a probe's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    ProbingDatabase,
    ProbingBroker,
    ProbingApi,
    Done,
}

impl RunState {
    pub fn next(self) -> Self {
        match self {
            Self::Idle => Self::ProbingDatabase,
            Self::ProbingDatabase => Self::ProbingBroker,
            Self::ProbingBroker => Self::ProbingApi,
            Self::ProbingApi | Self::Done => Self::Done,
        }
    }

    /// The backend probed in this state, if any.
    pub fn probing(self) -> Option<BackendKind> {
        match self {
            Self::ProbingDatabase => Some(BackendKind::Database),
            Self::ProbingBroker => Some(BackendKind::Broker),
            Self::ProbingApi => Some(BackendKind::Api),
            Self::Idle | Self::Done => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub outcomes: Vec<ProbeOutcome>,
    pub persisted: usize,
    pub persistence_failures: usize,
    pub state: RunState,
}

impl RunSummary {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }
}

struct JobRecording {
    job_id: Uuid,
    sink: Box<dyn ResultSink>,
}

pub struct Orchestrator {
    database: Box<dyn Probe>,
    broker: Box<dyn Probe>,
    api: Box<dyn Probe>,
    recording: Option<JobRecording>,
}

impl Orchestrator {
    pub fn new(database: Box<dyn Probe>, broker: Box<dyn Probe>, api: Box<dyn Probe>) -> Self {
        Self {
            database,
            broker,
            api,
            recording: None,
        }
    }

    /// Resolve every backend's configuration once and build the real probes.
    pub fn from_resolver<S: SettingsSource>(resolver: &ConfigResolver<S>) -> Self {
        let timeout = resolver.probe_timeout();
        let build = |kind| probes::from_config(resolver.resolve(kind), timeout);

        Self::new(
            build(BackendKind::Database),
            build(BackendKind::Broker),
            build(BackendKind::Api),
        )
    }

    /// Record every outcome under `job_id` as it is produced.
    pub fn with_recording(mut self, job_id: Uuid, sink: Box<dyn ResultSink>) -> Self {
        self.recording = Some(JobRecording { job_id, sink });
        self
    }

    fn probe_for(&self, kind: BackendKind) -> &dyn Probe {
        match kind {
            BackendKind::Database => self.database.as_ref(),
            BackendKind::Broker => self.broker.as_ref(),
            BackendKind::Api => self.api.as_ref(),
        }
    }

    /// Run every probe once, in order, writing status lines to `out`.
    #[tracing::instrument(name = "Connectivity run", skip(self, out))]
    pub async fn run<W: Write>(&self, out: &mut W) -> RunSummary {
        let mut summary = RunSummary {
            outcomes: Vec::with_capacity(BackendKind::ORDER.len()),
            persisted: 0,
            persistence_failures: 0,
            state: RunState::Idle,
        };

        emit(out, RULE);
        emit(out, "Starting Maestro connectivity check");
        emit(out, RULE);

        loop {
            summary.state = summary.state.next();
            let Some(kind) = summary.state.probing() else {
                break;
            };

            let outcome = self.probe_for(kind).run().await;
            emit(out, &status_line(&outcome));

            if let Some(recording) = &self.recording {
                match recording.sink.record(recording.job_id, &outcome).await {
                    Ok(()) => {
                        summary.persisted += 1;
                        emit(
                            out,
                            &format!(
                                "  ✓ Logged {} outcome for job {}",
                                kind, recording.job_id
                            ),
                        );
                    }
                    Err(err) => {
                        summary.persistence_failures += 1;
                        tracing::error!(backend = %kind, "Failed to record outcome: {}", err);
                        emit(
                            out,
                            &format!(
                                "  ✗ Could not record {} outcome for job {}: {}",
                                kind, recording.job_id, err
                            ),
                        );
                    }
                }
            }

            summary.outcomes.push(outcome);
        }

        emit(out, RULE);
        emit(
            out,
            &format!(
                "Run complete: {}/{} probes passed",
                summary.passed(),
                summary.outcomes.len()
            ),
        );
        emit(out, RULE);

        summary
    }
}

pub fn status_line(outcome: &ProbeOutcome) -> String {
    let mark = if outcome.success { "✓" } else { "✗" };
    format!(
        "{} {} ({}): {}",
        mark,
        outcome.backend_kind.label(),
        outcome.target,
        outcome.detail
    )
}

fn emit<W: Write>(out: &mut W, line: &str) {
    if let Err(err) = writeln!(out, "{}", line) {
        tracing::warn!("Failed to write status line: {:?}", err);
    }
}
