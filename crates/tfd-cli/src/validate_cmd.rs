//! `tfd validate` command: check that the toolchain accepts a domain.

use std::path::Path;

use anyhow::Result;

use tfd_core::{SolverError, TfdPlanSolver};

use crate::solve_cmd::read_input;

/// Run the validate command. Returns whether the domain is valid.
pub async fn run_validate(
    solver: &TfdPlanSolver,
    domain_file: &Path,
    namespace: &str,
) -> Result<bool> {
    let domain = read_input(domain_file, "domain")?;

    match solver.validate_domain(&domain, namespace).await {
        Ok(()) => {
            println!("Domain {} is valid.", domain_file.display());
            Ok(true)
        }
        Err(SolverError::DomainNameNotFound) => {
            eprintln!("Invalid domain: no (domain <name>) declaration found.");
            Ok(false)
        }
        Err(SolverError::StageFailed { stderr, .. }) => {
            eprintln!("Invalid domain: rejected by the translator.");
            let snippet = stderr.trim();
            if !snippet.is_empty() {
                eprintln!("  translate: {snippet}");
            }
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
