mod config;
mod show_cmd;
mod solve_cmd;
mod validate_cmd;

#[cfg(test)]
mod test_util;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use tfd_core::{StandaloneHost, TfdPlanSolver};

use config::TfdConfig;

/// Plugin name under which the solver declares its parameters.
const PLUGIN_NAME: &str = "tfd";

/// Exit code for "the toolchain ran but the answer is no".
const EXIT_NO_RESULT: i32 = 2;

#[derive(Parser)]
#[command(name = "tfd", about = "Temporal Fast Downward planning adapter")]
struct Cli {
    /// Base directory for working files (overrides TFD_OUTPUT_DIR env var)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a tfd config file
    Init {
        /// TFD installation root (used when TFD_HOME is unset)
        #[arg(long)]
        toolchain_home: Option<PathBuf>,
        /// Default base directory for working files
        #[arg(long)]
        default_output_dir: Option<PathBuf>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Solve a planning problem
    Solve {
        /// Path to the PDDL domain file
        #[arg(long)]
        domain: PathBuf,
        /// Path to the PDDL problem file
        #[arg(long)]
        problem: PathBuf,
        /// Namespace isolating this run's working directory
        #[arg(long, default_value = "")]
        namespace: String,
        /// Solver timeout in seconds
        #[arg(long, default_value_t = 15)]
        timeout: u64,
        /// Kill the pipeline when the timeout expires
        #[arg(long)]
        enforce_timeout: bool,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check that the toolchain accepts a domain
    Validate {
        /// Path to the PDDL domain file
        #[arg(long)]
        domain: PathBuf,
        /// Namespace isolating this run's working directory
        #[arg(long, default_value = "")]
        namespace: String,
    },
    /// Parse and print an existing plan file
    ShowPlan {
        /// Path to the plan file (e.g. pddlplan.1.last)
        file: PathBuf,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Execute the `tfd init` command: write config file.
fn cmd_init(
    toolchain_home: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    force: bool,
) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        toolchain: config::ToolchainSection {
            home: toolchain_home,
        },
        output: config::OutputSection { dir: output_dir },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    if let Some(ref home) = cfg.toolchain.home {
        println!("  toolchain.home = {}", home.display());
    }
    if let Some(ref dir) = cfg.output.dir {
        println!("  output.dir = {}", dir.display());
    }
    Ok(())
}

/// Resolve configuration and build a configured solver.
///
/// A missing toolchain is fatal: it is logged and the process exits.
fn configured_solver(cli_output_dir: Option<PathBuf>, enforce_timeout: bool) -> TfdPlanSolver {
    let resolved = match TfdConfig::resolve(cli_output_dir) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{e}; set TFD_HOME or run `tfd init --toolchain-home <dir>`");
            std::process::exit(1);
        }
    };

    let host = Arc::new(
        StandaloneHost::new(PLUGIN_NAME).with_parameter(
            format!("{PLUGIN_NAME}.output_dir"),
            resolved.output_dir.to_string_lossy(),
        ),
    );

    let mut solver = TfdPlanSolver::new().with_timeout_enforcement(enforce_timeout);
    if let Err(e) = solver.configure_with_toolchain(host, PLUGIN_NAME, resolved.toolchain) {
        tracing::error!("failed to configure solver: {e}");
        std::process::exit(1);
    }
    solver
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            toolchain_home,
            default_output_dir,
            force,
        } => {
            cmd_init(toolchain_home, default_output_dir, force)?;
        }
        Commands::Solve {
            domain,
            problem,
            namespace,
            timeout,
            enforce_timeout,
            json,
        } => {
            let solver = configured_solver(cli.output_dir, enforce_timeout);
            let opts = solve_cmd::SolveOptions {
                domain,
                problem,
                namespace,
                timeout: Duration::from_secs(timeout),
                json,
            };
            if !solve_cmd::run_solve(&solver, &opts).await? {
                std::process::exit(EXIT_NO_RESULT);
            }
        }
        Commands::Validate { domain, namespace } => {
            let solver = configured_solver(cli.output_dir, false);
            if !validate_cmd::run_validate(&solver, &domain, &namespace).await? {
                std::process::exit(EXIT_NO_RESULT);
            }
        }
        Commands::ShowPlan { file, json } => {
            show_cmd::run_show_plan(&file, json).await?;
        }
    }

    Ok(())
}
