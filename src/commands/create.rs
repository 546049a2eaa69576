use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::config::Config;
use crate::supervisor::{run_to_completion, Color, Console, ProcessSpec};
use crate::template::{scaffold, validate_project_name};

/// Resolved flags for `stagehand create`.
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub name: String,
    pub template: Option<PathBuf>,
    pub skip_install: bool,
    pub skip_git: bool,
    /// Package to `npm link` into the new project before installing.
    pub link: Option<String>,
}

/// Create the project `opts.name` inside `base_dir`.
pub async fn run(
    base_dir: &Path,
    opts: &CreateOptions,
    config: &Config,
    console: Console,
) -> Result<PathBuf> {
    validate_project_name(&opts.name)?;
    let target = base_dir.join(&opts.name);
    let template_dir = opts
        .template
        .clone()
        .unwrap_or_else(|| config.create.resolved_template_dir());

    println!("Copying files to {} ...", target.display());
    let vars = HashMap::from([("name".to_string(), opts.name.clone())]);
    let expanded = scaffold(&template_dir, &target, &vars)
        .with_context(|| format!("failed to scaffold from '{}'", template_dir.display()))?;
    println!("Expanded {} template file(s)", expanded.len());

    let toolchain = &config.toolchain;
    if !opts.skip_install {
        if let Some(package) = &opts.link {
            println!("Linking {} ...", package);
            run_step(
                ProcessSpec::new("npm", Color::Cyan, &toolchain.npm)
                    .args(["link", package.as_str()])
                    .cwd(&target),
                console.clone(),
            )
            .await?;
        }
        println!("Installing packages ...");
        run_step(
            ProcessSpec::new("npm", Color::Cyan, &toolchain.npm)
                .arg("install")
                .cwd(&target),
            console.clone(),
        )
        .await?;
    }

    if !opts.skip_git {
        println!("Initializing git ...");
        run_step(
            ProcessSpec::new("git", Color::Yellow, &toolchain.git)
                .arg("init")
                .cwd(&target),
            console,
        )
        .await?;
    }

    println!("Done.");
    Ok(target)
}

async fn run_step(spec: ProcessSpec, console: Console) -> Result<()> {
    let command_line = std::iter::once(spec.command())
        .chain(spec.arguments().iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");
    let status = run_to_completion(spec, console)
        .await
        .with_context(|| format!("failed to run `{}`", command_line))?;
    if !status.success() {
        bail!("`{}` {}", command_line, status);
    }
    Ok(())
}
