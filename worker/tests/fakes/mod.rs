#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use worker::daemon::conn_monitor::{ChannelState, ControlChannel, Relauncher};
use worker::share::ShareOps;
use worker::share::command::{CommandOutput, CommandRunner};
use worker::share::exports::ExportsFile;
use worker::share::mount_table::MountTable;

pub const OPTS: &str = "*(rw,sync,no_subtree_check,no_root_squash)";

/// Answers commands from per-program queues; anything unscripted succeeds
/// with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    outputs: Mutex<HashMap<String, VecDeque<CommandOutput>>>,
    missing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn without(tools: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            missing: tools.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        })
    }

    pub fn push(&self, program: &str, output: CommandOutput) {
        self.outputs
            .lock()
            .unwrap()
            .entry(program.to_string())
            .or_default()
            .push_back(output);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, program: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.split(' ').next() == Some(program))
            .collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        let mut call = program.to_string();
        for arg in args {
            call.push(' ');
            call.push_str(arg);
        }
        self.calls.lock().unwrap().push(call);

        if self.missing.contains(program) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "not found"));
        }
        let scripted = self
            .outputs
            .lock()
            .unwrap()
            .get_mut(program)
            .and_then(|q| q.pop_front());
        Ok(scripted.unwrap_or_else(|| CommandOutput::ok("")))
    }

    fn exists(&self, program: &str) -> bool {
        !self.missing.contains(program)
    }
}

pub fn share_ops(runner: Arc<ScriptedRunner>, exports_file: &Path) -> Arc<ShareOps> {
    Arc::new(ShareOps::new(
        runner,
        ExportsFile::new(exports_file, OPTS),
        Arc::new(MountTable::new()),
    ))
}

/// Reports the given states one change at a time, then goes away.
pub struct ScriptedChannel {
    current: Mutex<ChannelState>,
    upcoming: Mutex<VecDeque<ChannelState>>,
    pub reconnects: AtomicUsize,
    pub closes: AtomicUsize,
}

impl ScriptedChannel {
    pub fn new(states: &[ChannelState]) -> Arc<Self> {
        let mut upcoming: VecDeque<ChannelState> = states.iter().copied().collect();
        let first = upcoming.pop_front().unwrap_or(ChannelState::Idle);
        Arc::new(Self {
            current: Mutex::new(first),
            upcoming: Mutex::new(upcoming),
            reconnects: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ControlChannel for ScriptedChannel {
    fn state(&self) -> ChannelState {
        *self.current.lock().unwrap()
    }

    async fn wait_for_state_change(&self, _current: ChannelState) -> bool {
        let next = self.upcoming.lock().unwrap().pop_front();
        match next {
            Some(next) => {
                *self.current.lock().unwrap() = next;
                true
            }
            None => false,
        }
    }

    fn request_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct CountingRelauncher {
    pub launches: AtomicUsize,
}

impl Relauncher for CountingRelauncher {
    fn relaunch(&self) -> io::Error {
        self.launches.fetch_add(1, Ordering::SeqCst);
        io::Error::other("exec disabled in tests")
    }
}
