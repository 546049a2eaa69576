//! Runs an [`OrchestrationPlan`]: clean, start stages in order, then react
//! to stage exits until one of them (or the operator) ends the run.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::task::{JoinError, JoinSet};

use crate::shutdown::ShutdownHandle;
use crate::supervisor::console::{Console, Stream};
use crate::supervisor::error::SupervisorError;
use crate::supervisor::plan::{OrchestrationPlan, Stage, StartCondition};
use crate::supervisor::process::{supervise, ManagedProcess, StageExit, DEFAULT_SHUTDOWN_GRACE};
use crate::supervisor::readiness::{ReadinessGate, DEFAULT_POLL_INTERVAL};

/// Exit code reported when the run is stopped by Ctrl+C or SIGTERM.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    CleaningPreviousOutput,
    StagesStarting,
    StagesRunning,
    Terminated,
}

type StageResult = (String, Result<StageExit, SupervisorError>);

/// Exclusive owner of every process started for a plan.
pub struct Orchestrator {
    root: PathBuf,
    console: Console,
    shutdown: ShutdownHandle,
    poll_interval: Duration,
    grace: Duration,
    state: OrchestratorState,
}

impl Orchestrator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            console: Console::Terminal,
            shutdown: ShutdownHandle::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            grace: DEFAULT_SHUTDOWN_GRACE,
            state: OrchestratorState::Idle,
        }
    }

    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownHandle) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Signalling this handle stops the run as an interrupt.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    fn advance(&mut self, state: OrchestratorState) {
        tracing::debug!(from = ?self.state, to = ?state, "orchestrator state");
        self.state = state;
    }

    /// Execute `plan` and return the program exit code.
    ///
    /// Whatever ends the run, every started process is terminated and
    /// reaped before this returns.
    pub async fn run(&mut self, plan: OrchestrationPlan) -> Result<i32, SupervisorError> {
        let (mode, clean, stages) = plan.into_parts();
        tracing::info!(
            %mode,
            stages = stages.len(),
            root = %self.root.display(),
            "orchestration started"
        );

        self.advance(OrchestratorState::CleaningPreviousOutput);
        if let Err(e) = clean_previous_output(&self.root, &clean) {
            self.advance(OrchestratorState::Terminated);
            return Err(e);
        }

        self.advance(OrchestratorState::StagesStarting);
        let mut running = JoinSet::new();
        let result = self.start_and_supervise(stages, &mut running).await;

        self.shutdown.signal();
        while let Some(joined) = running.join_next().await {
            match joined {
                Ok((_, Ok(_))) => {}
                Ok((name, Err(e))) => {
                    tracing::warn!(name = %name, "stage failed during shutdown: {}", e)
                }
                Err(e) => tracing::warn!("stage task failed during shutdown: {}", e),
            }
        }

        self.advance(OrchestratorState::Terminated);
        match &result {
            Ok(code) => tracing::info!(%mode, code, "orchestration finished"),
            Err(e) => tracing::error!(%mode, "orchestration failed: {}", e),
        }
        result
    }

    async fn start_and_supervise(
        &mut self,
        stages: Vec<Stage>,
        running: &mut JoinSet<StageResult>,
    ) -> Result<i32, SupervisorError> {
        for stage in stages {
            if let StartCondition::AfterPathExists(path) = &stage.start {
                if let Some(code) = self.wait_for_path(&stage, path, running).await? {
                    return Ok(code);
                }
            }
            self.spawn_stage(stage, running)?;
        }

        self.advance(OrchestratorState::StagesRunning);
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.wait() => return Ok(INTERRUPTED_EXIT_CODE),
                joined = running.join_next() => match joined {
                    None => return Ok(0),
                    Some(joined) => {
                        if let Some(code) = on_stage_exit(joined)? {
                            return Ok(code);
                        }
                    }
                },
            }
        }
    }

    /// Block a gated stage on its path while still reacting to exits of
    /// stages that are already running. Returns an exit code if the run
    /// ended while waiting.
    async fn wait_for_path(
        &self,
        stage: &Stage,
        path: &Path,
        running: &mut JoinSet<StageResult>,
    ) -> Result<Option<i32>, SupervisorError> {
        let gate = ReadinessGate::new(self.root.join(path), self.poll_interval);
        if gate.is_ready().await {
            return Ok(None);
        }

        let tag = stage.spec.tagger().render();
        self.console
            .line(Stream::Stderr, &format!("{} waiting for {} ...", tag, path.display()))
            .map_err(|source| relay_error(stage, source))?;

        let ready = gate.wait();
        tokio::pin!(ready);
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.wait() => return Ok(Some(INTERRUPTED_EXIT_CODE)),
                Some(joined) = running.join_next() => {
                    if let Some(code) = on_stage_exit(joined)? {
                        return Ok(Some(code));
                    }
                }
                _ = &mut ready => return Ok(None),
            }
        }
    }

    fn spawn_stage(
        &self,
        stage: Stage,
        running: &mut JoinSet<StageResult>,
    ) -> Result<(), SupervisorError> {
        let Stage { spec, policy, .. } = stage;
        let spec = if spec.working_dir().is_none() {
            spec.cwd(&self.root)
        } else {
            spec
        };
        let name = spec.name().to_string();

        let mut process = ManagedProcess::new(spec, self.console.clone()).with_grace(self.grace);
        process.start()?;
        tracing::info!(name = %name, ?policy, pid = process.pid(), "stage started");

        let shutdown = self.shutdown.clone();
        let grace = self.grace;
        running.spawn(async move {
            let result = supervise(&mut process, policy, &shutdown, grace).await;
            (name, result)
        });
        Ok(())
    }
}

fn relay_error(stage: &Stage, source: io::Error) -> SupervisorError {
    SupervisorError::Relay {
        name: stage.spec.name().to_string(),
        source,
    }
}

fn on_stage_exit(joined: Result<StageResult, JoinError>) -> Result<Option<i32>, SupervisorError> {
    let (name, result) = joined?;
    match result? {
        StageExit::Finished(status) => {
            tracing::debug!(name = %name, %status, "stage finished, continuing");
            Ok(None)
        }
        StageExit::Terminate(code) => {
            tracing::info!(name = %name, code, "stage ended the run");
            Ok(Some(code))
        }
        StageExit::Cancelled => Ok(None),
    }
}

/// Remove previous build output under `root`. Missing paths are skipped.
///
/// Returns the paths that were actually removed.
pub fn clean_previous_output(
    root: &Path,
    paths: &[PathBuf],
) -> Result<Vec<PathBuf>, SupervisorError> {
    let mut removed = Vec::new();
    for relative in paths {
        let path = root.join(relative);
        let result = match std::fs::symlink_metadata(&path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => Err(e),
            Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(&path),
            Ok(_) => std::fs::remove_file(&path),
        };
        result.map_err(|source| SupervisorError::Clean {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "removed previous output");
        removed.push(path);
    }
    Ok(removed)
}
