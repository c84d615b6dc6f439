//! Per-namespace working directory for one planning run.
//!
//! All inputs and toolchain artifacts for a run live under
//! `<output_dir>/<namespace>`. After each run the artifacts are renamed with
//! a `.last` suffix so the next run starts clean while the previous one
//! stays inspectable.

use std::path::{Component, Path, PathBuf};

use crate::error::SolverError;

pub const DOMAIN_FILE: &str = "domain.pddl";
pub const PROBLEM_FILE: &str = "problem.pddl";
pub const SAS_FILE: &str = "output.sas";
pub const PREPROCESSED_FILE: &str = "output";
pub const PLAN_PREFIX: &str = "pddlplan";
/// The search stage appends `.1` to the prefix for the first plan found.
pub const PLAN_FILE: &str = "pddlplan.1";
/// Where domain validation keeps its translated output.
pub const VALIDATION_SAS_FILE: &str = "output.sas.validation";
pub const ARCHIVE_SUFFIX: &str = ".last";

/// Files renamed to `<name>.last` after every planning run.
pub const ARCHIVED_FILES: &[&str] = &[
    DOMAIN_FILE,
    PROBLEM_FILE,
    SAS_FILE,
    PREPROCESSED_FILE,
    PLAN_FILE,
];

/// Files the toolchain stages produce. Removed before a run so a leftover
/// from an interrupted run is never mistaken for fresh output.
pub const STAGE_OUTPUTS: &[&str] = &[SAS_FILE, PREPROCESSED_FILE, PLAN_FILE];

/// A resolved, existing working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDir {
    path: PathBuf,
}

impl WorkingDir {
    /// Resolve `<base>/<namespace>` and create it if absent.
    ///
    /// Root and `.` components of the namespace are dropped, so `/robot1`
    /// and `robot1` map to the same directory. A `..` component is rejected.
    pub async fn resolve(base: &Path, namespace: &str) -> Result<Self, SolverError> {
        let path = Self::join_namespace(base, namespace)?;
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| SolverError::io(&path, e))?;
        Ok(Self { path })
    }

    /// Pure path computation behind [`WorkingDir::resolve`].
    pub fn join_namespace(base: &Path, namespace: &str) -> Result<PathBuf, SolverError> {
        let mut path = base.to_path_buf();
        for component in Path::new(namespace).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
                Component::ParentDir => {
                    return Err(SolverError::InvalidNamespace(namespace.to_owned()));
                }
            }
        }
        Ok(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    pub fn domain_file(&self) -> PathBuf {
        self.file(DOMAIN_FILE)
    }

    pub fn problem_file(&self) -> PathBuf {
        self.file(PROBLEM_FILE)
    }

    pub fn sas_file(&self) -> PathBuf {
        self.file(SAS_FILE)
    }

    pub fn preprocessed_file(&self) -> PathBuf {
        self.file(PREPROCESSED_FILE)
    }

    pub fn plan_prefix(&self) -> PathBuf {
        self.file(PLAN_PREFIX)
    }

    pub fn plan_file(&self) -> PathBuf {
        self.file(PLAN_FILE)
    }

    /// Write `content` verbatim to `<dir>/<name>`, replacing any old file.
    pub async fn write_file(&self, name: &str, content: &str) -> Result<PathBuf, SolverError> {
        let path = self.file(name);
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| SolverError::io(&path, e))?;
        Ok(path)
    }

    /// Rename `<dir>/<from>` to `<dir>/<to>`, replacing `to` if present.
    ///
    /// Returns `Ok(false)` when `from` does not exist.
    pub async fn rename(&self, from: &str, to: &str) -> Result<bool, SolverError> {
        let src = self.file(from);
        match tokio::fs::rename(&src, self.file(to)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SolverError::io(src, e)),
        }
    }

    /// Delete every file in [`STAGE_OUTPUTS`]. Missing files are fine.
    pub async fn clear_outputs(&self) -> Result<(), SolverError> {
        for name in STAGE_OUTPUTS {
            let path = self.file(name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => tracing::debug!(file = name, "removed stale stage output"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(SolverError::io(path, e)),
            }
        }
        Ok(())
    }

    /// Rename every artifact in [`ARCHIVED_FILES`] that exists to
    /// `<name>.last`, returning the new paths.
    ///
    /// Every file is attempted even if an earlier rename fails; the first
    /// failure is returned afterwards.
    pub async fn archive(&self) -> Result<Vec<PathBuf>, SolverError> {
        let mut archived = Vec::new();
        let mut first_error = None;

        for name in ARCHIVED_FILES {
            let target = format!("{name}{ARCHIVE_SUFFIX}");
            let result = self.rename(name, &target).await;
            self.record_archived(name, &target, result, &mut archived, &mut first_error);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(archived),
        }
    }

    /// [`WorkingDir::archive`] with blocking renames, for use from `Drop`.
    pub fn archive_blocking(&self) -> Result<Vec<PathBuf>, SolverError> {
        let mut archived = Vec::new();
        let mut first_error = None;

        for name in ARCHIVED_FILES {
            let target = format!("{name}{ARCHIVE_SUFFIX}");
            let src = self.file(name);
            let result = match std::fs::rename(&src, self.file(&target)) {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(SolverError::io(src, e)),
            };
            self.record_archived(name, &target, result, &mut archived, &mut first_error);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(archived),
        }
    }

    fn record_archived(
        &self,
        name: &str,
        target: &str,
        result: Result<bool, SolverError>,
        archived: &mut Vec<PathBuf>,
        first_error: &mut Option<SolverError>,
    ) {
        match result {
            Ok(true) => archived.push(self.file(target)),
            Ok(false) => tracing::debug!(file = name, "nothing to archive"),
            Err(e) => {
                tracing::warn!(file = name, error = %e, "failed to archive artifact");
                first_error.get_or_insert(e);
            }
        }
    }

    /// Guard that archives this directory when dropped, unless
    /// [`ArchiveGuard::archive`] already ran to completion.
    pub fn archive_guard(&self) -> ArchiveGuard<'_> {
        ArchiveGuard {
            dir: self,
            armed: true,
        }
    }
}

/// Archives a run's artifacts even when the run's future is dropped
/// part-way, e.g. by a caller-side `tokio::time::timeout`.
#[must_use = "dropping the guard archives immediately"]
#[derive(Debug)]
pub struct ArchiveGuard<'a> {
    dir: &'a WorkingDir,
    armed: bool,
}

impl ArchiveGuard<'_> {
    /// Archive asynchronously and disarm the guard.
    pub async fn archive(mut self) -> Result<Vec<PathBuf>, SolverError> {
        let result = self.dir.archive().await;
        self.armed = false;
        result
    }
}

impl Drop for ArchiveGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::debug!(dir = %self.dir.path().display(), "archiving interrupted run");
        if let Err(e) = self.dir.archive_blocking() {
            tracing::warn!(error = %e, "failed to archive interrupted run");
        }
    }
}
