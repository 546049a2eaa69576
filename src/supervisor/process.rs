use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};
use tokio::task::JoinSet;

use crate::shutdown::ShutdownHandle;
use crate::supervisor::console::{Console, Stream};
use crate::supervisor::error::{SpawnError, SupervisorError};
use crate::supervisor::relay::{relay, LinePrefixer};
use crate::supervisor::tagger::{Color, Tagger};

/// Fixed command line and presentation for one external process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    name: String,
    color: Color,
    command: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
}

impl ProcessSpec {
    pub fn new(name: impl Into<String>, color: Color, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color,
            command: command.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Add an environment override on top of the inherited environment.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn working_dir(&self) -> Option<&PathBuf> {
        self.cwd.as_ref()
    }

    pub fn env_overrides(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn tagger(&self) -> Tagger {
        Tagger::new(self.name.clone(), self.color)
    }
}

/// How an OS process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Code(i32),
    Signal(i32),
}

impl ExitStatus {
    /// Exit code to propagate; signals map to `128 + signal`.
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Code(code) => code,
            ExitStatus::Signal(signal) => 128 + signal,
        }
    }

    pub fn success(self) -> bool {
        self == ExitStatus::Code(0)
    }

    fn from_std(status: std::process::ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExitStatus::Code(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ExitStatus::Signal(signal);
            }
        }
        ExitStatus::Code(-1)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Code(code) => write!(f, "exited with code {code}"),
            ExitStatus::Signal(signal) => write!(f, "terminated by signal {signal}"),
        }
    }
}

/// Program-level consequence of a stage's termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPolicy {
    /// The whole program exits with this process's exit code.
    Propagate,
    /// The whole program exits only if this process exits non-zero.
    FailFastOnNonZero,
    /// Respawn after a fixed delay, forever. Meant for a dev server that
    /// crashes on a bad request; there is no backoff and no retry cap.
    RestartAfterDelay(Duration),
}

/// What the supervisor does after a policy has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyOutcome {
    Continue,
    Restart(Duration),
    Terminate(i32),
}

impl ExitPolicy {
    pub fn decide(&self, status: ExitStatus) -> PolicyOutcome {
        match *self {
            ExitPolicy::Propagate => PolicyOutcome::Terminate(status.code()),
            ExitPolicy::FailFastOnNonZero if status.success() => PolicyOutcome::Continue,
            ExitPolicy::FailFastOnNonZero => PolicyOutcome::Terminate(status.code()),
            ExitPolicy::RestartAfterDelay(delay) => PolicyOutcome::Restart(delay),
        }
    }
}

/// Time a process group gets between SIGTERM and SIGKILL.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Owns at most one live OS process for a [`ProcessSpec`] at a time.
///
/// The process runs in its own process group. Whatever it leaves behind in
/// that group (a wrapper like `npx` forks the real tool) is stopped once the
/// leader exits, so its output pipes close and nothing outlives the stage.
pub struct ManagedProcess {
    spec: Arc<ProcessSpec>,
    tagger: Tagger,
    console: Console,
    grace: Duration,
    child: Option<Child>,
    /// Group of the current child; outlives `child.id()`, which is gone
    /// as soon as the leader has been waited on.
    pgid: Option<u32>,
    relays: JoinSet<io::Result<()>>,
    spawned_at: Vec<Instant>,
    last_exit: Option<ExitStatus>,
}

impl ManagedProcess {
    pub fn new(spec: ProcessSpec, console: Console) -> Self {
        let tagger = spec.tagger();
        Self {
            spec: Arc::new(spec),
            tagger,
            console,
            grace: DEFAULT_SHUTDOWN_GRACE,
            child: None,
            pgid: None,
            relays: JoinSet::new(),
            spawned_at: Vec::new(),
            last_exit: None,
        }
    }

    /// Grace period used when the group has to be stopped from [`ManagedProcess::wait`].
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    pub fn spawn_count(&self) -> usize {
        self.spawned_at.len()
    }

    /// When each OS process was spawned, oldest first.
    pub fn spawn_history(&self) -> &[Instant] {
        &self.spawned_at
    }

    pub fn last_exit(&self) -> Option<ExitStatus> {
        self.last_exit
    }

    /// Spawn the OS process and attach relays. Does not wait for it.
    pub fn start(&mut self) -> Result<(), SupervisorError> {
        if self.child.is_some() {
            return Err(SupervisorError::AlreadyRunning {
                name: self.spec.name.clone(),
            });
        }

        let mut cmd = Command::new(&self.spec.command);
        cmd.args(&self.spec.args)
            .envs(self.spec.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.spec.cwd {
            cmd.current_dir(dir);
        }
        // Own process group, so shutdown reaches grandchildren too.
        #[cfg(unix)]
        {
            cmd.process_group(0);
        }

        let mut child = cmd.spawn().map_err(|source| SpawnError {
            name: self.spec.name.clone(),
            command: self.spec.command.clone(),
            source,
        })?;

        if let Some(stdout) = child.stdout.take() {
            self.relays.spawn(relay(
                stdout,
                LinePrefixer::new(&self.tagger),
                self.console.clone(),
                Stream::Stdout,
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            self.relays.spawn(relay(
                stderr,
                LinePrefixer::new(&self.tagger),
                self.console.clone(),
                Stream::Stderr,
            ));
        }

        tracing::debug!(
            name = %self.spec.name,
            command = %self.spec.command,
            pid = child.id(),
            spawn = self.spawned_at.len() + 1,
            "process started"
        );
        self.pgid = child.id();
        self.spawned_at.push(Instant::now());
        self.child = Some(child);
        Ok(())
    }

    /// Wait for the OS process to exit and its output to drain.
    ///
    /// A failing relay stops the process and is returned as
    /// [`SupervisorError::Relay`]. Cancel-safe: dropping the future leaves
    /// the process registered, and a later call (or
    /// [`ManagedProcess::terminate`]) picks up where it left off.
    pub async fn wait(&mut self) -> Result<ExitStatus, SupervisorError> {
        if self.child.is_none() {
            return self.last_exit.ok_or_else(|| SupervisorError::NotStarted {
                name: self.spec.name.clone(),
            });
        }
        let grace = self.grace;

        let status = match self.watch().await {
            Ok(status) => ExitStatus::from_std(status),
            Err(e) => {
                tracing::warn!(name = %self.spec.name, "{}; stopping process", e);
                if let Err(cleanup) = self.terminate(grace).await {
                    tracing::warn!(
                        name = %self.spec.name,
                        "cleanup after relay failure: {}",
                        cleanup
                    );
                }
                return Err(e);
            }
        };
        self.settle_group(grace).await?;
        self.reaped(status)?;
        Ok(status)
    }

    /// Resolve when the leader exits, or early with the first relay failure.
    async fn watch(&mut self) -> Result<std::process::ExitStatus, SupervisorError> {
        let name = &self.spec.name;
        let relays = &mut self.relays;
        let Some(child) = self.child.as_mut() else {
            return Err(SupervisorError::NotStarted { name: name.clone() });
        };

        loop {
            tokio::select! {
                status = child.wait() => {
                    return status.map_err(|source| SupervisorError::Wait {
                        name: name.clone(),
                        source,
                    });
                }
                Some(joined) = relays.join_next() => match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(source)) => {
                        return Err(SupervisorError::Relay {
                            name: name.clone(),
                            source,
                        })
                    }
                    Err(err) => return Err(SupervisorError::Task(err)),
                },
            }
        }
    }

    /// SIGTERM the process group, escalate to SIGKILL after `grace`, reap.
    pub async fn terminate(&mut self, grace: Duration) -> Result<(), SupervisorError> {
        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };
        let name = self.spec.name.clone();

        let exited = child.try_wait().map_err(|source| SupervisorError::Wait {
            name: name.clone(),
            source,
        })?;
        let status = match exited {
            Some(status) => status,
            None => {
                let signalled = match self.pgid {
                    Some(pgid) => send_terminate(child, pgid),
                    None => child.start_kill(),
                };
                signalled.map_err(|source| SupervisorError::Signal {
                    name: name.clone(),
                    source,
                })?;

                match tokio::time::timeout(grace, child.wait()).await {
                    Ok(status) => status,
                    Err(_) => {
                        tracing::warn!(name = %name, "process ignored SIGTERM, killing");
                        if let Some(pgid) = self.pgid {
                            kill_group(pgid);
                        }
                        child
                            .kill()
                            .await
                            .map_err(|source| SupervisorError::Signal {
                                name: name.clone(),
                                source,
                            })?;
                        child.wait().await
                    }
                }
                .map_err(|source| SupervisorError::Wait {
                    name: name.clone(),
                    source,
                })?
            }
        };

        if let Err(e) = self.settle_group(grace).await {
            tracing::warn!(name = %name, "while stopping: {}", e);
        }
        self.reaped(ExitStatus::from_std(status))
    }

    /// The leader has exited: stop the rest of its group and collect the
    /// remaining output.
    async fn settle_group(&mut self, grace: Duration) -> Result<(), SupervisorError> {
        if let Some(pgid) = self.pgid {
            if let Err(e) = terminate_group(pgid) {
                tracing::warn!(name = %self.spec.name, "failed to signal process group: {}", e);
            }
        }

        let drained = match tokio::time::timeout(grace, self.drain_relays()).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    name = %self.spec.name,
                    "process group still holds output open, killing"
                );
                if let Some(pgid) = self.pgid {
                    kill_group(pgid);
                }
                match tokio::time::timeout(grace, self.drain_relays()).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::warn!(
                            name = %self.spec.name,
                            "output still open, dropping relays"
                        );
                        Ok(())
                    }
                }
            }
        };

        if drained.is_err() {
            if let Some(pgid) = self.pgid {
                kill_group(pgid);
            }
        }
        // Dropping the set aborts whatever relay is still attached.
        self.relays = JoinSet::new();
        self.pgid = None;
        drained
    }

    async fn drain_relays(&mut self) -> Result<(), SupervisorError> {
        while let Some(joined) = self.relays.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(source)) => {
                    return Err(SupervisorError::Relay {
                        name: self.spec.name.clone(),
                        source,
                    })
                }
                Err(err) => return Err(SupervisorError::Task(err)),
            }
        }
        Ok(())
    }

    fn reaped(&mut self, status: ExitStatus) -> Result<(), SupervisorError> {
        self.child = None;
        self.last_exit = Some(status);
        tracing::info!(name = %self.spec.name, %status, "process exited");
        self.console
            .line(
                Stream::Stderr,
                &format!("{} {}.", self.tagger.render(), status),
            )
            .map_err(|source| SupervisorError::Relay {
                name: self.spec.name.clone(),
                source,
            })
    }
}

impl Drop for ManagedProcess {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid {
            kill_group(pgid);
        }
    }
}

#[cfg(unix)]
fn signal_group(pgid: u32, signal: libc::c_int) -> io::Result<()> {
    // SAFETY: killpg takes plain integers and has no memory preconditions.
    let rc = unsafe { libc::killpg(pgid as libc::pid_t, signal) };
    if rc == 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        return Ok(());
    }
    Err(err)
}

#[cfg(unix)]
fn send_terminate(_child: &mut Child, pgid: u32) -> io::Result<()> {
    signal_group(pgid, libc::SIGTERM)
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child, _pgid: u32) -> io::Result<()> {
    child.start_kill()
}

#[cfg(unix)]
fn terminate_group(pgid: u32) -> io::Result<()> {
    signal_group(pgid, libc::SIGTERM)
}

#[cfg(not(unix))]
fn terminate_group(_pgid: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    let _ = signal_group(pgid, libc::SIGKILL);
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

/// How a supervised stage ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageExit {
    /// Exited and the policy said to carry on without it.
    Finished(ExitStatus),
    /// The policy asks for the whole program to exit with this code.
    Terminate(i32),
    /// Shutdown was signalled; the process was terminated and reaped.
    Cancelled,
}

/// Drive an already started process through its exit policy until the
/// policy ends the stage or `shutdown` fires.
pub async fn supervise(
    process: &mut ManagedProcess,
    policy: ExitPolicy,
    shutdown: &ShutdownHandle,
    grace: Duration,
) -> Result<StageExit, SupervisorError> {
    let result = supervise_loop(process, policy, shutdown, grace).await;
    if result.is_err() {
        if let Err(e) = process.terminate(grace).await {
            tracing::warn!(name = %process.spec().name(), "cleanup after failure: {}", e);
        }
    }
    result
}

async fn supervise_loop(
    process: &mut ManagedProcess,
    policy: ExitPolicy,
    shutdown: &ShutdownHandle,
    grace: Duration,
) -> Result<StageExit, SupervisorError> {
    loop {
        let status = tokio::select! {
            status = process.wait() => status?,
            _ = shutdown.wait() => {
                process.terminate(grace).await?;
                return Ok(StageExit::Cancelled);
            }
        };

        match policy.decide(status) {
            PolicyOutcome::Continue => return Ok(StageExit::Finished(status)),
            PolicyOutcome::Terminate(code) => return Ok(StageExit::Terminate(code)),
            PolicyOutcome::Restart(delay) => {
                tracing::warn!(
                    name = %process.spec().name(),
                    delay_ms = delay.as_millis() as u64,
                    "restarting process"
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown.wait() => return Ok(StageExit::Cancelled),
                }
                process.start()?;
            }
        }
    }
}

/// Run one process to completion with relayed output.
pub async fn run_to_completion(
    spec: ProcessSpec,
    console: Console,
) -> Result<ExitStatus, SupervisorError> {
    let mut process = ManagedProcess::new(spec, console);
    process.start()?;
    process.wait().await
}
