//! TFD plan-file parser.
//!
//! The search stage writes one action per line:
//!
//! ```text
//! 0.00100000: (pick-up a) [1.50000000]
//! ```
//!
//! Each line is split on its delimiters (first `:`, then `(`, `)`, `[`,
//! `]`) and every boundary is checked, so a truncated or garbled line is
//! reported with its line number instead of producing a bogus item.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::types::{Plan, PlanItem};

/// Errors that can occur while reading or parsing a plan file.
#[derive(Debug, Error)]
pub enum PlanParseError {
    #[error("failed to read plan file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: missing ':' after the start time")]
    MissingColon { line: usize },

    #[error("line {line}: invalid start time {value:?}")]
    InvalidTime { line: usize, value: String },

    #[error("line {line}: expected '(' to open the action")]
    MissingOpenParen { line: usize },

    #[error("line {line}: unterminated action, missing ')'")]
    MissingCloseParen { line: usize },

    #[error("line {line}: empty action")]
    EmptyAction { line: usize },

    #[error("line {line}: expected a bracketed duration after the action")]
    MissingDuration { line: usize },

    #[error("line {line}: invalid duration {value:?}")]
    InvalidDuration { line: usize, value: String },
}

/// Parse a whole plan file's contents.
///
/// Blank lines and `;` comment lines are skipped; every other line must be
/// a well-formed plan line.
pub fn parse_plan(content: &str) -> Result<Plan, PlanParseError> {
    let mut items = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        items.push(parse_plan_line(line, idx + 1)?);
    }

    Ok(Plan::new(items))
}

/// Parse a single `<time>: (<action>) [<duration>]` line.
///
/// `line_no` is only used for error reporting.
pub fn parse_plan_line(line: &str, line_no: usize) -> Result<PlanItem, PlanParseError> {
    let (time_str, rest) = line
        .split_once(':')
        .ok_or(PlanParseError::MissingColon { line: line_no })?;

    let time_str = time_str.trim();
    let time: f64 = time_str.parse().map_err(|_| PlanParseError::InvalidTime {
        line: line_no,
        value: time_str.to_owned(),
    })?;

    let rest = rest
        .trim_start()
        .strip_prefix('(')
        .ok_or(PlanParseError::MissingOpenParen { line: line_no })?;

    let (action, rest) = rest
        .split_once(')')
        .ok_or(PlanParseError::MissingCloseParen { line: line_no })?;

    let action = action.trim();
    if action.is_empty() {
        return Err(PlanParseError::EmptyAction { line: line_no });
    }

    let duration_str = rest
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or(PlanParseError::MissingDuration { line: line_no })?
        .trim();

    let duration: f64 = duration_str
        .parse()
        .map_err(|_| PlanParseError::InvalidDuration {
            line: line_no,
            value: duration_str.to_owned(),
        })?;

    Ok(PlanItem::new(time, action, duration))
}

/// Read and parse the plan file at `path`.
///
/// Returns `Ok(None)` when the file does not exist, which is how the search
/// stage signals that no plan was found.
pub async fn read_plan_file(path: &Path) -> Result<Option<Plan>, PlanParseError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(PlanParseError::Io {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    parse_plan(&content).map(Some)
}
