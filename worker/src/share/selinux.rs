//! SELinux labeling so NFS may export a folder on enforcing hosts.
//!
//! Every step is best-effort: a missing tool or a failed step is logged and
//! the export goes ahead.

use tracing::{info, warn};

use super::command::{CommandRunner, run_checked};

pub const POLICY_MODULE: &str = "fleet_nfs_generator";

const POLICY_SOURCE: &str = "module fleet_nfs_generator 1.0;

require {
    type systemd_nfs_generator_t;
    class capability dac_read_search;
}

allow systemd_nfs_generator_t self:capability dac_read_search;
";

pub async fn is_enforcing(runner: &dyn CommandRunner) -> bool {
    if !runner.exists("getenforce") {
        return false;
    }
    match run_checked(runner, "getenforce", &[]).await {
        Ok(mode) => mode.trim() == "Enforcing",
        Err(e) => {
            warn!("getenforce failed: {e}");
            false
        }
    }
}

/// Labels `path` for read-write NFS sharing when SELinux is enforcing.
pub async fn label_for_sharing(runner: &dyn CommandRunner, path: &str) {
    if !is_enforcing(runner).await {
        return;
    }
    info!("SELinux is enforcing, labeling {path} for NFS");

    if require_tool(runner, "setsebool")
        && let Err(e) = run_checked(runner, "setsebool", &["-P", "nfs_export_all_rw", "1"]).await
    {
        warn!("{e}");
    }

    if require_tool(runner, "semanage") {
        let spec = format!("{}(/.*)?", path.trim_end_matches('/'));
        let added = run_checked(
            runner,
            "semanage",
            &["fcontext", "-a", "-t", "public_content_rw_t", &spec],
        )
        .await;
        // -a refuses an existing rule
        if added.is_err()
            && let Err(e) = run_checked(
                runner,
                "semanage",
                &["fcontext", "-m", "-t", "public_content_rw_t", &spec],
            )
            .await
        {
            warn!("{e}");
        }
    }

    if require_tool(runner, "restorecon")
        && let Err(e) = run_checked(runner, "restorecon", &["-Rv", path]).await
    {
        warn!("{e}");
    }

    ensure_policy_module(runner).await;
}

async fn ensure_policy_module(runner: &dyn CommandRunner) {
    let tools = ["semodule", "checkmodule", "semodule_package"];
    if !tools.iter().all(|tool| require_tool(runner, tool)) {
        return;
    }

    match run_checked(runner, "semodule", &["-l"]).await {
        Ok(list) if list.lines().any(|l| l.split_whitespace().next() == Some(POLICY_MODULE)) => {
            return;
        }
        Ok(_) => {}
        Err(e) => {
            warn!("{e}");
            return;
        }
    }

    if let Err(e) = install_policy_module(runner).await {
        warn!("failed to install {POLICY_MODULE}: {e}");
    }
}

async fn install_policy_module(runner: &dyn CommandRunner) -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let te = dir.path().join(format!("{POLICY_MODULE}.te"));
    let module = dir.path().join(format!("{POLICY_MODULE}.mod"));
    let package = dir.path().join(format!("{POLICY_MODULE}.pp"));
    tokio::fs::write(&te, POLICY_SOURCE).await?;

    let (te, module, package) = (
        te.to_string_lossy().into_owned(),
        module.to_string_lossy().into_owned(),
        package.to_string_lossy().into_owned(),
    );
    run_checked(runner, "checkmodule", &["-M", "-m", "-o", &module, &te]).await?;
    run_checked(runner, "semodule_package", &["-o", &package, "-m", &module]).await?;
    run_checked(runner, "semodule", &["-i", &package]).await?;
    info!("installed SELinux module {POLICY_MODULE}");
    Ok(())
}

fn require_tool(runner: &dyn CommandRunner, tool: &str) -> bool {
    let found = runner.exists(tool);
    if !found {
        warn!("{tool} not found, skipping");
    }
    found
}
