//! Fixed toolchain command lines for the `dev` and `build` plans.
//!
//! Paths are relative to the project root the orchestrator runs in.

use crate::config::Config;
use crate::supervisor::{Color, ExitPolicy, Mode, OrchestrationPlan, ProcessSpec, Stage};

/// Server entry point emitted by the type-checker; gates the dev server.
pub const SERVER_ENTRY: &str = "dist/server/index.js";
pub const CLIENT_SCRIPT_SRC: &str = "src/client/index.tsx";
pub const CLIENT_STYLE_SRC: &str = "src/client/style.css";
pub const BUNDLE_OUT_DIR: &str = "dist/bundles";

/// Previous output removed before every `dev`, `build` and `clean`.
pub const CLEAN_PATHS: [&str; 2] = ["dist", "tsconfig.tsbuildinfo"];

fn type_checker(config: &Config, watch: bool) -> ProcessSpec {
    let spec = ProcessSpec::new("ts", Color::Green, &config.toolchain.npx).args(["tsc", "--build"]);
    if watch {
        spec.args(["--watch", "--pretty", "--preserveWatchOutput"])
    } else {
        spec.arg("--pretty")
    }
}

fn bundler(config: &Config, watch: bool) -> ProcessSpec {
    let spec = ProcessSpec::new("bundle", Color::Blue, &config.toolchain.npx).args([
        "esbuild",
        CLIENT_SCRIPT_SRC,
        CLIENT_STYLE_SRC,
    ]);
    let spec = if watch { spec.arg("--watch") } else { spec };
    spec.args(["--bundle", "--minify", "--sourcemap", "--format=esm"])
        .arg(format!("--outdir={}", BUNDLE_OUT_DIR))
}

fn server(config: &Config) -> ProcessSpec {
    ProcessSpec::new("server", Color::Magenta, &config.toolchain.node).args([
        "--enable-source-maps",
        "--watch",
        SERVER_ENTRY,
    ])
}

fn with_clean(mut plan: OrchestrationPlan) -> OrchestrationPlan {
    for path in CLEAN_PATHS {
        plan = plan.clean(path);
    }
    plan
}

/// Type-checker and bundler in watch mode, then the server once its entry
/// point exists.
pub fn dev_plan(config: &Config) -> OrchestrationPlan {
    with_clean(OrchestrationPlan::new(Mode::Dev))
        .stage(Stage::new(type_checker(config, true), ExitPolicy::Propagate))
        .stage(Stage::new(bundler(config, true), ExitPolicy::FailFastOnNonZero))
        .stage(
            Stage::new(
                server(config),
                ExitPolicy::RestartAfterDelay(config.supervisor.restart_delay()),
            )
            .after_path(SERVER_ENTRY),
        )
}

/// One-shot type-check and bundle; both must exit 0.
pub fn build_plan(config: &Config) -> OrchestrationPlan {
    with_clean(OrchestrationPlan::new(Mode::Build))
        .stage(Stage::new(type_checker(config, false), ExitPolicy::FailFastOnNonZero))
        .stage(Stage::new(bundler(config, false), ExitPolicy::FailFastOnNonZero))
}
