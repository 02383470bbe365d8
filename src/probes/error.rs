use crate::configuration::InvalidSetting;
use crate::models::FailureKind;

/// Why a probe did not succeed. Converted into a failed outcome at the probe boundary.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Backend unreachable, auth rejected or connection parameters unusable
    #[error("connection failed: {0}")]
    ConnectFailure(String),
    /// Connected, but the functional check did not pass
    #[error("check failed: {0}")]
    CheckFailure(String),
    /// HTTP transport error, timeout or unreadable response
    #[error("request failed: {0}")]
    RequestFailure(String),
    #[error("unhealthy status {status}: {body}")]
    UnhealthyStatus { status: u16, body: String },
}

impl ProbeError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ConnectFailure(_) => FailureKind::ConnectFailure,
            Self::CheckFailure(_) => FailureKind::CheckFailure,
            Self::RequestFailure(_) => FailureKind::RequestFailure,
            Self::UnhealthyStatus { .. } => FailureKind::UnhealthyStatus,
        }
    }
}

impl From<InvalidSetting> for ProbeError {
    fn from(err: InvalidSetting) -> Self {
        Self::ConnectFailure(err.to_string())
    }
}
