//! `tfd solve` command: run the full TFD pipeline on a domain/problem pair.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use tfd_core::TfdPlanSolver;

use crate::show_cmd::print_plan;

/// Options for `tfd solve`.
#[derive(Debug)]
pub struct SolveOptions {
    pub domain: PathBuf,
    pub problem: PathBuf,
    pub namespace: String,
    pub timeout: Duration,
    pub json: bool,
}

/// Run the solve command.
///
/// Returns `Ok(false)` when the toolchain ran but found no plan.
pub async fn run_solve(solver: &TfdPlanSolver, opts: &SolveOptions) -> Result<bool> {
    let domain = read_input(&opts.domain, "domain")?;
    let problem = read_input(&opts.problem, "problem")?;

    let plan = solver
        .solve(&domain, &problem, &opts.namespace, opts.timeout)
        .await
        .context("planning failed")?;

    match plan {
        Some(plan) => {
            print_plan(&plan, opts.json)?;
            Ok(true)
        }
        None => {
            eprintln!("No plan found.");
            Ok(false)
        }
    }
}

pub(crate) fn read_input(path: &Path, what: &str) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} file {}", path.display()))
}
