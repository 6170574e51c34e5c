use serde::{Deserialize, Serialize};

/// Errors shared by the coordinator and workers.
///
/// The type is serializable so a worker's failure reaches the coordinator
/// with its kind intact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum FleetError {
    #[error("machine {0} is not connected")]
    NotConnected(String),
    #[error("share {path} on {machine} does not exist")]
    NotFound { machine: String, path: String },
    #[error("share {path} on {machine} already exists")]
    AlreadyExists { machine: String, path: String },
    #[error("{command}: {detail}")]
    ExternalCommandFailed { command: String, detail: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("some machines are not connected: {}", .0.join(", "))]
    PartialSyncFailure(Vec<String>),
    #[error("transport: {0}")]
    Transport(String),
    #[error("store: {0}")]
    Store(String),
    #[error("io: {0}")]
    Io(String),
}

impl FleetError {
    pub fn command_failed(command: impl Into<String>, detail: impl Into<String>) -> Self {
        FleetError::ExternalCommandFailed {
            command: command.into(),
            detail: detail.into(),
        }
    }
}

impl From<std::io::Error> for FleetError {
    fn from(e: std::io::Error) -> Self {
        FleetError::Io(e.to_string())
    }
}

impl From<bincode::Error> for FleetError {
    fn from(e: bincode::Error) -> Self {
        FleetError::Transport(format!("codec: {e}"))
    }
}

impl From<quinn::ConnectionError> for FleetError {
    fn from(e: quinn::ConnectionError) -> Self {
        FleetError::Transport(e.to_string())
    }
}

impl From<quinn::ConnectError> for FleetError {
    fn from(e: quinn::ConnectError) -> Self {
        FleetError::Transport(e.to_string())
    }
}

impl From<quinn::WriteError> for FleetError {
    fn from(e: quinn::WriteError) -> Self {
        FleetError::Transport(e.to_string())
    }
}

impl From<quinn::ReadToEndError> for FleetError {
    fn from(e: quinn::ReadToEndError) -> Self {
        FleetError::Transport(e.to_string())
    }
}

impl From<quinn::ClosedStream> for FleetError {
    fn from(e: quinn::ClosedStream) -> Self {
        FleetError::Transport(e.to_string())
    }
}
