use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The OS could not create a process for a stage.
///
/// Usually a missing toolchain install, so it is never retried.
#[derive(Debug, Error)]
#[error("[{name}] failed to spawn `{command}`: {source}")]
pub struct SpawnError {
    pub name: String,
    pub command: String,
    #[source]
    pub source: io::Error,
}

impl SpawnError {
    pub fn is_not_found(&self) -> bool {
        self.source.kind() == io::ErrorKind::NotFound
    }
}

/// Fatal errors raised while supervising processes.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error("[{name}] output relay failed: {source}")]
    Relay {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("[{name}] failed to wait for process: {source}")]
    Wait {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("[{name}] failed to signal process: {source}")]
    Signal {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("[{name}] is already running")]
    AlreadyRunning { name: String },

    #[error("[{name}] was never started")]
    NotStarted { name: String },

    #[error("Failed to remove previous output '{path}': {source}")]
    Clean {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Stage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
