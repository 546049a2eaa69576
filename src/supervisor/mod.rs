//! Multi-process supervisor for the toolchain driven by `dev` and `build`.
//!
//! ```text
//! Tagger → LinePrefixer/relay → ManagedProcess → Orchestrator
//!                                     ↑
//!                               ReadinessGate
//! ```
//!
//! Each [`ManagedProcess`] owns one OS process and its two output relays.
//! The [`Orchestrator`] owns every managed process of a plan and turns
//! per-stage [`PolicyOutcome`]s into the program's exit code.

mod console;
mod error;
mod orchestrator;
mod plan;
mod process;
mod readiness;
mod relay;
mod tagger;

pub use console::{CaptureBuffer, Console, SharedWriter, Stream};
pub use error::{SpawnError, SupervisorError};
pub use orchestrator::{
    clean_previous_output, Orchestrator, OrchestratorState, INTERRUPTED_EXIT_CODE,
};
pub use plan::{Mode, OrchestrationPlan, Stage, StartCondition};
pub use process::{
    run_to_completion, supervise, ExitPolicy, ExitStatus, ManagedProcess, PolicyOutcome,
    ProcessSpec, StageExit, DEFAULT_SHUTDOWN_GRACE,
};
pub use readiness::{wait_until_accessible, ReadinessGate, DEFAULT_POLL_INTERVAL};
pub use relay::{relay, LinePrefixer};
pub use tagger::{Color, Tagger};
