use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::ProbeOutcome;

/// Log level stored in `job_logs.level`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only job log entry, ready to be written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobLogRecord {
    pub job_id: Uuid,
    pub level: LogLevel,
    pub message: String,
}

impl JobLogRecord {
    pub fn from_outcome(job_id: Uuid, outcome: &ProbeOutcome) -> Self {
        let (level, verb) = if outcome.success {
            (LogLevel::Info, "succeeded")
        } else {
            (LogLevel::Error, "failed")
        };

        Self {
            job_id,
            level,
            message: format!(
                "{} probe {} against {}: {}",
                outcome.backend_kind, verb, outcome.target, outcome.detail
            ),
        }
    }
}

/// A row read back from `job_logs`; the id and timestamp are assigned by the store.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StoredJobLog {
    pub id: i64,
    pub job_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BackendKind, FailureKind};

    #[test]
    fn success_maps_to_info() {
        let job_id = Uuid::new_v4();
        let outcome = ProbeOutcome::succeeded(
            BackendKind::Database,
            "db:5432/maestro_db".to_string(),
            "PostgreSQL 14.2".to_string(),
            4,
        );

        let record = JobLogRecord::from_outcome(job_id, &outcome);
        assert_eq!(record.job_id, job_id);
        assert_eq!(record.level, LogLevel::Info);
        assert_eq!(
            record.message,
            "database probe succeeded against db:5432/maestro_db: PostgreSQL 14.2"
        );
    }

    #[test]
    fn failure_maps_to_error() {
        let outcome = ProbeOutcome::failed(
            BackendKind::Api,
            "http://api/api/v1/health".to_string(),
            FailureKind::UnhealthyStatus,
            "status 503".to_string(),
            9,
        );

        let record = JobLogRecord::from_outcome(Uuid::new_v4(), &outcome);
        assert_eq!(record.level, LogLevel::Error);
        assert!(record.message.starts_with("api probe failed against"));
    }
}
