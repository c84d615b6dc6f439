//! The three external TFD stages and how they are invoked.
//!
//! Every stage is described as a [`StageCommand`]: an explicit program path,
//! an argument vector, a working directory and an optional stdin file. No
//! shell is involved, so paths are never re-split or interpreted.

pub mod runner;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::config::ToolchainConfig;

pub use runner::{CommandRunner, ProcessRunner};

/// Fixed search configuration passed to the TFD search engine, followed by
/// `p <plan-prefix>`.
pub const SEARCH_FLAGS: &[&str] = &[
    "y", "Y", "a", "T", "10", "t", "5", "e", "r", "O", "1", "C", "1",
];

/// A step of the TFD pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Translate,
    Preprocess,
    Search,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Translate => "translate",
            Self::Preprocess => "preprocess",
            Self::Search => "search",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCommand {
    pub stage: Stage,
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Directory the program runs in; TFD writes its fixed-name outputs here.
    pub current_dir: PathBuf,
    /// File connected to the program's standard input.
    pub stdin: Option<PathBuf>,
    /// Kill the program if it runs longer than this.
    pub timeout: Option<Duration>,
}

impl StageCommand {
    /// `translate.py <domain> <problem>`, writing `output.sas` in `work_dir`.
    pub fn translate(
        toolchain: &ToolchainConfig,
        work_dir: &Path,
        domain: &Path,
        problem: &Path,
    ) -> Self {
        Self {
            stage: Stage::Translate,
            program: toolchain.translate_path(),
            args: vec![path_arg(domain), path_arg(problem)],
            current_dir: work_dir.to_path_buf(),
            stdin: None,
            timeout: None,
        }
    }

    /// `preprocess < <sas>`, writing `output` in `work_dir`.
    pub fn preprocess(toolchain: &ToolchainConfig, work_dir: &Path, sas: &Path) -> Self {
        Self {
            stage: Stage::Preprocess,
            program: toolchain.preprocess_path(),
            args: Vec::new(),
            current_dir: work_dir.to_path_buf(),
            stdin: Some(sas.to_path_buf()),
            timeout: None,
        }
    }

    /// `search <flags> p <plan_prefix> < <preprocessed>`, writing
    /// `<plan_prefix>.1` when a plan is found.
    pub fn search(
        toolchain: &ToolchainConfig,
        work_dir: &Path,
        preprocessed: &Path,
        plan_prefix: &Path,
    ) -> Self {
        let mut args: Vec<String> = SEARCH_FLAGS.iter().map(|s| (*s).to_owned()).collect();
        args.push("p".to_owned());
        args.push(path_arg(plan_prefix));

        Self {
            stage: Stage::Search,
            program: toolchain.search_path(),
            args,
            current_dir: work_dir.to_path_buf(),
            stdin: Some(preprocessed.to_path_buf()),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Human-readable rendering for logs.
    pub fn display_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        if let Some(ref stdin) = self.stdin {
            line.push_str(" < ");
            line.push_str(&stdin.display().to_string());
        }
        line
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// What a finished stage left behind.
#[derive(Debug, Clone)]
pub struct StageOutput {
    /// The exit code, or `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: i64,
}

impl StageOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Failures of the process machinery itself, as opposed to a program that
/// ran and exited non-zero.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("could not launch {}: {source}", .program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not open stdin file {}: {source}", .path.display())]
    Stdin {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting on {}: {source}", .program.display())]
    Wait {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} timed out after {timeout:?}", .program.display())]
    TimedOut { program: PathBuf, timeout: Duration },
}
