use serde::{Deserialize, Serialize};

use crate::error::FleetError;
use crate::share::{ConnectionInfo, MountSpec, SharePoint, ShareDefinition, SyncReport};

/// Every message exchanged over a control channel.
///
/// Each bidirectional stream carries exactly one request and one response.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum FleetMessage {
    // worker -> coordinator
    SetConnection { addr: String, machine_name: String },
    Notify(String),

    // coordinator -> worker
    CreateExport(String),
    RemoveExport(String),
    Mount(MountSpec),
    Unmount(MountSpec),

    // admin -> coordinator
    CreateShare(SharePoint),
    RemoveShare(SharePoint),
    ListShares,
    ListConnections,
    SyncShares,

    // response
    Ack,
    Error(FleetError),
    Shares(Vec<ShareDefinition>),
    Connections(Vec<ConnectionInfo>),
    Synced(SyncReport),
}

impl FleetMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            FleetMessage::SetConnection { .. } => "SetConnection",
            FleetMessage::Notify(_) => "Notify",
            FleetMessage::CreateExport(_) => "CreateExport",
            FleetMessage::RemoveExport(_) => "RemoveExport",
            FleetMessage::Mount(_) => "Mount",
            FleetMessage::Unmount(_) => "Unmount",
            FleetMessage::CreateShare(_) => "CreateShare",
            FleetMessage::RemoveShare(_) => "RemoveShare",
            FleetMessage::ListShares => "ListShares",
            FleetMessage::ListConnections => "ListConnections",
            FleetMessage::SyncShares => "SyncShares",
            FleetMessage::Ack => "Ack",
            FleetMessage::Error(_) => "Error",
            FleetMessage::Shares(_) => "Shares",
            FleetMessage::Connections(_) => "Connections",
            FleetMessage::Synced(_) => "Synced",
        }
    }

    /// Converts an `Error` response back into its typed error.
    pub fn into_result(self) -> Result<FleetMessage, FleetError> {
        match self {
            FleetMessage::Error(e) => Err(e),
            other => Ok(other),
        }
    }

    /// Expects a bare `Ack`.
    pub fn expect_ack(self) -> Result<(), FleetError> {
        match self.into_result()? {
            FleetMessage::Ack => Ok(()),
            other => Err(FleetError::Transport(format!(
                "expected Ack, got {}",
                other.kind()
            ))),
        }
    }
}

impl From<Result<(), FleetError>> for FleetMessage {
    fn from(res: Result<(), FleetError>) -> Self {
        match res {
            Ok(()) => FleetMessage::Ack,
            Err(e) => FleetMessage::Error(e),
        }
    }
}
