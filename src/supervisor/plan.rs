use std::fmt;
use std::path::PathBuf;

use crate::supervisor::process::{ExitPolicy, ProcessSpec};

/// Which orchestration a plan was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Dev,
    Build,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Dev => f.write_str("dev"),
            Mode::Build => f.write_str("build"),
        }
    }
}

/// When a stage may be started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartCondition {
    Immediately,
    /// Wait until this path (relative to the project root) exists.
    AfterPathExists(PathBuf),
}

/// One managed process within a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub spec: ProcessSpec,
    pub policy: ExitPolicy,
    pub start: StartCondition,
}

impl Stage {
    pub fn new(spec: ProcessSpec, policy: ExitPolicy) -> Self {
        Self {
            spec,
            policy,
            start: StartCondition::Immediately,
        }
    }

    pub fn after_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.start = StartCondition::AfterPathExists(path.into());
        self
    }
}

/// Static description of a run: what to clean, then which stages to start.
///
/// Built once per invocation and consumed by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestrationPlan {
    mode: Mode,
    clean: Vec<PathBuf>,
    stages: Vec<Stage>,
}

impl OrchestrationPlan {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            clean: Vec::new(),
            stages: Vec::new(),
        }
    }

    pub fn clean(mut self, path: impl Into<PathBuf>) -> Self {
        self.clean.push(path.into());
        self
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn clean_paths(&self) -> &[PathBuf] {
        &self.clean
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn into_parts(self) -> (Mode, Vec<PathBuf>, Vec<Stage>) {
        (self.mode, self.clean, self.stages)
    }
}
