//! Adapter around the Temporal Fast Downward (TFD) planning toolchain.
//!
//! Stages PDDL input in a per-namespace working directory, drives the
//! external `translate` / `preprocess` / `search` programs, and parses the
//! resulting plan file into a [`plan::Plan`].

pub mod config;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod plan;
pub mod solver;
pub mod workspace;

pub use config::{ConfigError, ToolchainConfig};
pub use error::SolverError;
pub use host::{HostContext, LogLevel, StandaloneHost};
pub use plan::{Plan, PlanItem, PlanParseError};
pub use solver::{DEFAULT_SOLVER_TIMEOUT, PlanSolver, TfdPlanSolver};
