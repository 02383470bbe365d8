use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Database,
    Broker,
    Api,
}

impl BackendKind {
    /// The fixed order in which a run probes the backends.
    pub const ORDER: [BackendKind; 3] = [Self::Database, Self::Broker, Self::Api];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Broker => "broker",
            Self::Api => "api",
        }
    }

    /// Human-readable name used in status lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Database => "PostgreSQL",
            Self::Broker => "RabbitMQ",
            Self::Api => "Maestro API",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ConnectFailure,
    CheckFailure,
    RequestFailure,
    UnhealthyStatus,
}

/// Result of one probe run. Every run yields exactly one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub backend_kind: BackendKind,
    pub target: String,
    pub success: bool,
    /// Version string, queue state or response body on success; the error otherwise.
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    pub elapsed_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl ProbeOutcome {
    pub fn succeeded(
        backend_kind: BackendKind,
        target: String,
        detail: String,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            backend_kind,
            target,
            success: true,
            detail,
            failure: None,
            elapsed_ms,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(
        backend_kind: BackendKind,
        target: String,
        failure: FailureKind,
        detail: String,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            backend_kind,
            target,
            success: false,
            detail,
            failure: Some(failure),
            elapsed_ms,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_serializes_with_lowercase_kind() {
        let outcome = ProbeOutcome::failed(
            BackendKind::Broker,
            "mq:5672".to_string(),
            FailureKind::ConnectFailure,
            "connection refused".to_string(),
            3,
        );

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["backend_kind"], "broker");
        assert_eq!(json["failure"], "connect_failure");
        assert_eq!(json["success"], false);
    }

    #[test]
    fn successful_outcome_omits_failure() {
        let outcome = ProbeOutcome::succeeded(
            BackendKind::Api,
            "http://api".to_string(),
            r#"{"status":"ok"}"#.to_string(),
            1,
        );

        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json.get("failure").is_none());
    }
}
