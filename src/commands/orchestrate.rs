use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::Config;
use crate::shutdown::{forward_interrupts, ShutdownHandle};
use crate::supervisor::{clean_previous_output, OrchestrationPlan, Orchestrator, SupervisorError};
use crate::toolchain::{build_plan, dev_plan, CLEAN_PATHS};

/// `stagehand dev`: watch-mode toolchain plus auto-restarting server.
pub async fn dev(root: &Path, config: &Config) -> Result<i32> {
    run_plan(root, config, dev_plan(config)).await
}

/// `stagehand build`: one-shot type-check and bundle.
pub async fn build(root: &Path, config: &Config) -> Result<i32> {
    run_plan(root, config, build_plan(config)).await
}

/// `stagehand clean`: remove previous build output.
pub fn clean(root: &Path) -> Result<Vec<PathBuf>> {
    let paths: Vec<PathBuf> = CLEAN_PATHS.iter().map(PathBuf::from).collect();
    let removed = clean_previous_output(root, &paths)?;
    if removed.is_empty() {
        println!("Nothing to clean.");
    }
    for path in &removed {
        println!("Removed {}", path.display());
    }
    Ok(removed)
}

async fn run_plan(root: &Path, config: &Config, plan: OrchestrationPlan) -> Result<i32> {
    let mode = plan.mode();
    let shutdown = ShutdownHandle::new();
    let interrupts = forward_interrupts(shutdown.clone());

    let mut orchestrator = Orchestrator::new(root)
        .with_shutdown(shutdown)
        .with_poll_interval(config.supervisor.readiness_poll())
        .with_shutdown_grace(config.supervisor.shutdown_grace());
    let result = orchestrator.run(plan).await;
    interrupts.abort();

    match result {
        Ok(code) => Ok(code),
        Err(SupervisorError::Spawn(e)) if e.is_not_found() => {
            let hint = format!(
                "`{}` not found; is the toolchain installed (try `npm install`)?",
                e.command
            );
            Err(anyhow::Error::new(e).context(hint))
        }
        Err(e) => Err(e).with_context(|| format!("{} failed", mode)),
    }
}
