use async_trait::async_trait;
use common::FleetError;
use std::io;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Captured result of one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Runs privileged tools on behalf of the share operations.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput>;

    /// Whether `program` can be found at all.
    fn exists(&self, program: &str) -> bool;
}

/// Spawns real processes, optionally through `sudo`.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    use_sudo: bool,
}

impl SystemRunner {
    pub fn new(use_sudo: bool) -> Self {
        Self { use_sudo }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        let mut cmd = if self.use_sudo {
            let mut cmd = Command::new("sudo");
            cmd.arg(program);
            cmd
        } else {
            Command::new(program)
        };
        cmd.args(args).kill_on_drop(true);

        let output = cmd.output().await?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn exists(&self, program: &str) -> bool {
        let Some(paths) = std::env::var_os("PATH") else {
            return false;
        };
        std::env::split_paths(&paths).any(|dir| is_executable(&dir.join(program)))
    }
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Runs `program` and maps a spawn error or non-zero exit to
/// `ExternalCommandFailed`, carrying the tool's own error text.
pub async fn run_checked(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[&str],
) -> Result<String, FleetError> {
    let desc = describe(program, args);
    debug!("running {desc}");

    let output = runner
        .run(program, args)
        .await
        .map_err(|e| FleetError::command_failed(&desc, e.to_string()))?;
    if output.success {
        return Ok(output.stdout);
    }

    let detail = match output.stderr.trim() {
        "" => output.stdout.trim(),
        stderr => stderr,
    };
    Err(FleetError::command_failed(desc, detail))
}

fn describe(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}
