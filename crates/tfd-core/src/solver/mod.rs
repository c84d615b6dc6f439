//! The TFD plan solver: the plugin a host framework loads to turn PDDL
//! domain/problem text into a [`Plan`].
//!
//! A planning run goes through four phases:
//! 1. Stage `domain.pddl` and `problem.pddl` in the namespace's working
//!    directory.
//! 2. Run translate → preprocess → search, each stage reading the previous
//!    stage's output file.
//! 3. Parse `pddlplan.1` if the search produced one.
//! 4. Archive every artifact as `<name>.last`, whatever the outcome, even
//!    when the caller drops the future part-way.

pub mod domain;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;

use crate::config::ToolchainConfig;
use crate::error::SolverError;
use crate::host::{HostContext, LogLevel};
use crate::pipeline::{CommandRunner, ProcessRunner, Stage, StageCommand, StageOutput};
use crate::plan::{Plan, read_plan_file};
use crate::workspace::{self, WorkingDir};

type DirLocks = Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>;

pub use domain::{extract_domain_name, placeholder_problem};

/// Timeout used when the caller does not pick one.
pub const DEFAULT_SOLVER_TIMEOUT: Duration = Duration::from_secs(15);

/// Plugin interface between a host framework and a planner.
///
/// Errors never cross this boundary: a host treats "no plan" and "invalid
/// domain" as answers, so implementations log failures through the host and
/// return `None` / `false`.
#[async_trait]
pub trait PlanSolver: Send + Sync {
    /// Bind the solver to its host and declare its parameters.
    ///
    /// An error here is fatal: the planner cannot run at all.
    fn configure(
        &mut self,
        host: Arc<dyn HostContext>,
        plugin_name: &str,
    ) -> Result<(), SolverError>;

    /// Solve `problem` in `domain`, or `None` if no plan was produced.
    async fn get_plan(
        &self,
        domain: &str,
        problem: &str,
        namespace: &str,
        timeout: Duration,
    ) -> Option<Plan>;

    /// Whether the toolchain accepts `domain`.
    async fn is_domain_valid(&self, domain: &str, namespace: &str) -> bool;
}

/// State established by [`PlanSolver::configure`].
struct Configured {
    host: Arc<dyn HostContext>,
    toolchain: ToolchainConfig,
    output_dir_param: String,
}

/// [`PlanSolver`] backed by the Temporal Fast Downward toolchain.
pub struct TfdPlanSolver {
    runner: Arc<dyn CommandRunner>,
    enforce_timeout: bool,
    configured: Option<Configured>,
    /// One async lock per working directory; runs sharing a namespace would
    /// otherwise clobber each other's files.
    dir_locks: DirLocks,
}

/// Holds a working directory's lock and drops its map entry once no other
/// run is waiting on it.
struct DirLockGuard<'a> {
    locks: &'a DirLocks,
    dir: PathBuf,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for DirLockGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks
            .get(&self.dir)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.dir);
        }
    }
}

impl Default for TfdPlanSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TfdPlanSolver {
    /// An unconfigured solver that spawns real toolchain processes.
    pub fn new() -> Self {
        Self::with_runner(Arc::new(ProcessRunner))
    }

    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            enforce_timeout: false,
            configured: None,
            dir_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Turn the `timeout` argument of [`TfdPlanSolver::solve`] into a hard
    /// deadline for the whole pipeline. Off by default: the timeout is only
    /// advisory.
    pub fn with_timeout_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_timeout = enforce;
        self
    }

    /// Configure with an explicit toolchain location instead of `TFD_HOME`.
    pub fn configure_with_toolchain(
        &mut self,
        host: Arc<dyn HostContext>,
        plugin_name: &str,
        toolchain: ToolchainConfig,
    ) -> Result<(), SolverError> {
        if let Err(e) = toolchain.verify() {
            host.log(LogLevel::Fatal, &format!("{e} for {plugin_name}"));
            return Err(e.into());
        }

        let output_dir_param = format!("{plugin_name}.output_dir");
        let default_dir = std::env::temp_dir();
        let output_dir =
            host.declare_parameter(&output_dir_param, &default_dir.to_string_lossy());

        tracing::debug!(
            plugin = plugin_name,
            tfd_home = %toolchain.home().display(),
            output_dir = %output_dir,
            "configured TFD plan solver"
        );

        self.configured = Some(Configured {
            host,
            toolchain,
            output_dir_param,
        });
        Ok(())
    }

    pub fn toolchain(&self) -> Option<&ToolchainConfig> {
        self.configured.as_ref().map(|c| &c.toolchain)
    }

    /// Current value of the `<plugin>.output_dir` parameter.
    pub fn output_dir(&self) -> Option<PathBuf> {
        self.configured.as_ref().map(Self::output_dir_of)
    }

    /// Run the full pipeline and parse the plan.
    ///
    /// `Ok(None)` means the toolchain ran but produced no (or an empty)
    /// plan. Artifacts are archived before returning, on every path that got
    /// as far as creating the working directory.
    pub async fn solve(
        &self,
        domain: &str,
        problem: &str,
        namespace: &str,
        timeout: Duration,
    ) -> Result<Option<Plan>, SolverError> {
        let cfg = self.configured()?;
        let work = WorkingDir::resolve(&Self::output_dir_of(cfg), namespace).await?;
        let _lock = self.lock_dir(work.path()).await;
        let archive = work.archive_guard();

        cfg.host.log(
            LogLevel::Info,
            &format!("Writing planning results to {}.", work.path().display()),
        );

        let deadline = if self.enforce_timeout {
            Instant::now().checked_add(timeout)
        } else {
            None
        };
        tracing::debug!(
            namespace,
            timeout_ms = timeout.as_millis() as u64,
            enforced = self.enforce_timeout,
            "starting TFD pipeline"
        );

        let outcome = self.run_pipeline(cfg, &work, domain, problem, deadline).await;

        match archive.archive().await {
            Ok(archived) => tracing::debug!(count = archived.len(), "archived run artifacts"),
            Err(e) => cfg.host.log(
                LogLevel::Warn,
                &format!("Failed to archive planning artifacts: {e}"),
            ),
        }

        outcome
    }

    /// Check that the toolchain can translate `domain`.
    ///
    /// A domain without a `(domain <name>)` declaration fails with
    /// [`SolverError::DomainNameNotFound`] before anything is run; a
    /// translator rejection is reported as the translate stage's failure.
    pub async fn validate_domain(&self, domain: &str, namespace: &str) -> Result<(), SolverError> {
        let cfg = self.configured()?;
        let work = WorkingDir::resolve(&Self::output_dir_of(cfg), namespace).await?;
        let _lock = self.lock_dir(work.path()).await;

        cfg.host.log(
            LogLevel::Info,
            &format!("Writing domain validation results to {}.", work.path().display()),
        );

        let domain_path = work.write_file(workspace::DOMAIN_FILE, domain).await?;

        let Some(domain_name) = extract_domain_name(domain) else {
            return Err(SolverError::DomainNameNotFound);
        };

        let problem_path = work
            .write_file(workspace::PROBLEM_FILE, &placeholder_problem(domain_name))
            .await?;

        let translate =
            StageCommand::translate(&cfg.toolchain, work.path(), &domain_path, &problem_path);
        self.run_required(&translate, None).await?;

        work.rename(workspace::SAS_FILE, workspace::VALIDATION_SAS_FILE).await?;

        Ok(())
    }

    async fn run_pipeline(
        &self,
        cfg: &Configured,
        work: &WorkingDir,
        domain: &str,
        problem: &str,
        deadline: Option<Instant>,
    ) -> Result<Option<Plan>, SolverError> {
        work.clear_outputs().await?;
        let domain_path = work.write_file(workspace::DOMAIN_FILE, domain).await?;
        let problem_path = work.write_file(workspace::PROBLEM_FILE, problem).await?;

        let translate =
            StageCommand::translate(&cfg.toolchain, work.path(), &domain_path, &problem_path);
        self.run_required(&translate, deadline).await?;

        let preprocess =
            StageCommand::preprocess(&cfg.toolchain, work.path(), &work.sas_file());
        self.run_required(&preprocess, deadline).await?;

        let search = StageCommand::search(
            &cfg.toolchain,
            work.path(),
            &work.preprocessed_file(),
            &work.plan_prefix(),
        );
        let output = self.run_stage(&search, deadline).await?;
        if !output.success() {
            // TFD's search exits non-zero when the problem is unsolvable;
            // whether a plan file exists is what counts.
            tracing::info!(exit_code = ?output.exit_code, "search finished without success");
            let tail = output.stdout.lines().last().unwrap_or_default();
            tracing::debug!(stdout_tail = tail, "search output");
        }

        let plan = read_plan_file(&work.plan_file()).await?;
        Ok(plan.filter(|p| !p.is_empty()))
    }

    /// Run a stage that must exit 0 for the pipeline to continue.
    async fn run_required(
        &self,
        command: &StageCommand,
        deadline: Option<Instant>,
    ) -> Result<StageOutput, SolverError> {
        let output = self.run_stage(command, deadline).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(SolverError::StageFailed {
                stage: command.stage,
                exit_code: output.exit_code,
                stderr: output.stderr,
            })
        }
    }

    async fn run_stage(
        &self,
        command: &StageCommand,
        deadline: Option<Instant>,
    ) -> Result<StageOutput, SolverError> {
        let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
        if remaining == Some(Duration::ZERO) {
            return Err(SolverError::StageTimedOut {
                stage: command.stage,
            });
        }

        let command = command.clone().with_timeout(remaining);
        let output = self
            .runner
            .run(&command)
            .await
            .map_err(|e| SolverError::from_run(command.stage, e))?;

        tracing::info!(
            stage = %command.stage,
            exit_code = ?output.exit_code,
            duration_ms = output.duration_ms,
            "toolchain stage finished"
        );
        Ok(output)
    }

    fn configured(&self) -> Result<&Configured, SolverError> {
        self.configured.as_ref().ok_or(SolverError::NotConfigured)
    }

    fn output_dir_of(cfg: &Configured) -> PathBuf {
        cfg.host
            .get_parameter(&cfg.output_dir_param)
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir)
    }

    async fn lock_dir(&self, dir: &Path) -> DirLockGuard<'_> {
        let lock = {
            let mut locks = self.dir_locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(locks.entry(dir.to_path_buf()).or_default())
        };
        DirLockGuard {
            locks: &self.dir_locks,
            dir: dir.to_path_buf(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Number of working directories with a live lock entry.
    #[cfg(test)]
    fn tracked_dirs(&self) -> usize {
        self.dir_locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn report(&self, what: &str, err: &SolverError) {
        match self.configured {
            Some(ref cfg) => cfg.host.log(LogLevel::Error, &format!("{what}: {err}")),
            None => tracing::error!(error = %err, "{what}"),
        }
    }
}

#[async_trait]
impl PlanSolver for TfdPlanSolver {
    fn configure(
        &mut self,
        host: Arc<dyn HostContext>,
        plugin_name: &str,
    ) -> Result<(), SolverError> {
        match ToolchainConfig::from_env() {
            Ok(toolchain) => self.configure_with_toolchain(host, plugin_name, toolchain),
            Err(e) => {
                host.log(LogLevel::Fatal, &format!("{e} for {plugin_name}"));
                Err(e.into())
            }
        }
    }

    async fn get_plan(
        &self,
        domain: &str,
        problem: &str,
        namespace: &str,
        timeout: Duration,
    ) -> Option<Plan> {
        match self.solve(domain, problem, namespace, timeout).await {
            Ok(plan) => plan,
            Err(e) => {
                self.report("Planning failed", &e);
                None
            }
        }
    }

    async fn is_domain_valid(&self, domain: &str, namespace: &str) -> bool {
        match self.validate_domain(domain, namespace).await {
            Ok(()) => true,
            Err(e) => {
                self.report("Domain validation failed", &e);
                false
            }
        }
    }
}
