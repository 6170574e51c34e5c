use async_trait::async_trait;
use common::FleetMessage;
use common::quic::request_with_timeout;
use quinn::{Connection, ConnectionError};
use std::io;
use std::os::unix::process::CommandExt;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Lifecycle of the control channel to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    Connecting,
    Ready,
    TransientFailure,
    Shutdown,
}

impl ChannelState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ChannelState::TransientFailure | ChannelState::Shutdown)
    }
}

#[async_trait]
pub trait ControlChannel: Send + Sync {
    fn state(&self) -> ChannelState;

    /// Waits until the state differs from `current`. Returns false once the
    /// channel can no longer change.
    async fn wait_for_state_change(&self, current: ChannelState) -> bool;

    fn request_reconnect(&self);

    fn close(&self);
}

/// Replaces the running process. Only returns on failure.
pub trait Relauncher: Send + Sync {
    fn relaunch(&self) -> io::Error;
}

/// Re-executes the current binary with the same arguments and environment.
pub struct ExecRelauncher;

impl Relauncher for ExecRelauncher {
    fn relaunch(&self) -> io::Error {
        let exe = match std::env::current_exe() {
            Ok(exe) => exe,
            Err(e) => return e,
        };
        Command::new(exe).args(std::env::args_os().skip(1)).exec()
    }
}

#[derive(Debug)]
pub enum MonitorExit {
    /// The channel stopped reporting changes.
    ChannelGone,
    RestartFailed(io::Error),
}

/// Reacts to control channel state changes; a lost channel restarts the
/// whole worker.
pub struct ConnectionMonitor {
    channel: Arc<dyn ControlChannel>,
    relauncher: Arc<dyn Relauncher>,
}

impl ConnectionMonitor {
    pub fn new(channel: Arc<dyn ControlChannel>, relauncher: Arc<dyn Relauncher>) -> Self {
        Self {
            channel,
            relauncher,
        }
    }

    pub async fn run(self) -> MonitorExit {
        let mut state = self.channel.state();
        loop {
            match state {
                ChannelState::Ready => debug!("control channel ready"),
                ChannelState::Idle => {
                    info!("control channel idle, requesting reconnect");
                    self.channel.request_reconnect();
                }
                ChannelState::Connecting => info!("control channel connecting"),
                ChannelState::TransientFailure | ChannelState::Shutdown => {
                    warn!("control channel is {state:?}, restarting worker");
                    self.channel.close();
                    let err = self.relauncher.relaunch();
                    error!("failed to restart worker: {err}");
                    return MonitorExit::RestartFailed(err);
                }
            }

            if !self.channel.wait_for_state_change(state).await {
                debug!("control channel gone, connection monitor exiting");
                return MonitorExit::ChannelGone;
            }
            state = self.channel.state();
        }
    }
}

const NUDGE_TIMEOUT: Duration = Duration::from_secs(5);

/// State of a QUIC connection as seen by the connection monitor.
///
/// A dialed connection starts `Ready`. QUIC keeps the link alive by itself,
/// so `Idle` and `Connecting` are never reported; the connection only moves
/// to a terminal state when it closes.
pub struct QuicControlChannel {
    conn: Connection,
    state: watch::Receiver<ChannelState>,
}

impl QuicControlChannel {
    pub fn new(conn: Connection) -> Self {
        let (tx, rx) = watch::channel(ChannelState::Ready);
        let watched = conn.clone();
        tokio::spawn(async move {
            let reason = watched.closed().await;
            let next = closed_state(&reason);
            info!("control channel closed: {reason}");
            let _ = tx.send(next);
        });
        Self { conn, state: rx }
    }
}

fn closed_state(reason: &ConnectionError) -> ChannelState {
    match reason {
        ConnectionError::TimedOut | ConnectionError::Reset => ChannelState::TransientFailure,
        _ => ChannelState::Shutdown,
    }
}

#[async_trait]
impl ControlChannel for QuicControlChannel {
    fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    async fn wait_for_state_change(&self, current: ChannelState) -> bool {
        let mut rx = self.state.clone();
        rx.wait_for(|s| *s != current).await.is_ok()
    }

    fn request_reconnect(&self) {
        // traffic wakes an idle path
        let conn = self.conn.clone();
        tokio::spawn(async move {
            let ping = FleetMessage::Notify("reconnect".to_string());
            if let Err(e) = request_with_timeout(&conn, &ping, NUDGE_TIMEOUT).await {
                warn!("reconnect nudge failed: {e}");
            }
        });
    }

    fn close(&self) {
        self.conn.close(0u32.into(), b"worker restarting");
    }
}
