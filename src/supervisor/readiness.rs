use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Polls for a path at a fixed interval until it becomes accessible.
///
/// No timeout: the preceding stage either produces the artifact or its own
/// exit policy ends the run.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    path: PathBuf,
    interval: Duration,
}

impl ReadinessGate {
    pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            path: path.into(),
            interval,
        }
    }

    pub async fn is_ready(&self) -> bool {
        tokio::fs::metadata(&self.path).await.is_ok()
    }

    pub async fn wait(&self) {
        let mut polls: u64 = 0;
        while !self.is_ready().await {
            polls += 1;
            tokio::time::sleep(self.interval).await;
        }
        tracing::debug!(path = %self.path.display(), polls, "readiness satisfied");
    }
}

/// Suspend until `path` exists, polling every [`DEFAULT_POLL_INTERVAL`].
pub async fn wait_until_accessible(path: impl Into<PathBuf>) {
    ReadinessGate::new(path, DEFAULT_POLL_INTERVAL).wait().await
}
