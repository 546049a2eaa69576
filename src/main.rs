use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use stagehand::commands::create::CreateOptions;
use stagehand::commands::{create, orchestrate};
use stagehand::config::Config;
use stagehand::logging::init_tracing;
use stagehand::supervisor::Console;

#[derive(Parser)]
#[command(
    name = "stagehand",
    version,
    about = "Scaffold, develop and build TypeScript server/client projects"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new project from the template
    Create {
        /// Project name (also the directory to create)
        name: String,
        /// Template directory to copy instead of the configured one
        #[arg(long)]
        template: Option<PathBuf>,
        /// Do not run `npm install`
        #[arg(long)]
        skip_install: bool,
        /// Do not run `git init`
        #[arg(long)]
        skip_git: bool,
        /// Package to `npm link` before installing
        #[arg(long, value_name = "PACKAGE")]
        link: Option<String>,
    },
    /// Run the type-checker, bundler and server in watch mode
    Dev,
    /// Type-check and bundle once
    Build,
    /// Remove previous build output
    Clean,
}

async fn run(cli: Cli) -> Result<i32> {
    let cwd = std::env::current_dir().context("cannot determine current directory")?;
    let config = Config::discover(&cwd)?;

    match cli.command {
        Commands::Create {
            name,
            template,
            skip_install,
            skip_git,
            link,
        } => {
            let opts = CreateOptions {
                name,
                template,
                skip_install,
                skip_git,
                link,
            };
            create::run(&cwd, &opts, &config, Console::Terminal).await?;
            Ok(0)
        }
        Commands::Dev => orchestrate::dev(&cwd, &config).await,
        Commands::Build => orchestrate::build(&cwd, &config).await,
        Commands::Clean => {
            orchestrate::clean(&cwd)?;
            Ok(0)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            1
        }
    };
    std::process::exit(code);
}
