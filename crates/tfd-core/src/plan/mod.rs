//! Plan model and the TFD plan-file parser.

pub mod parser;
pub mod types;

pub use parser::{PlanParseError, parse_plan, parse_plan_line, read_plan_file};
pub use types::{Plan, PlanItem};
