//! The host-framework boundary.
//!
//! A planner plugin is loaded by a host that owns parameters and logging.
//! [`HostContext`] captures the two capabilities the solver needs from it,
//! and [`StandaloneHost`] provides them without any host runtime (used by
//! the `tfd` binary and by tests).

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

/// Severity of a message sent to the host's log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        };
        f.write_str(s)
    }
}

/// Parameter and logging services provided by the host framework.
pub trait HostContext: Send + Sync {
    /// Declare a parameter with a default and return its effective value.
    ///
    /// If the host already holds a value for `name` (e.g. an override
    /// supplied at launch), that value wins over `default`.
    fn declare_parameter(&self, name: &str, default: &str) -> String;

    /// Current value of a parameter, if declared or overridden.
    fn get_parameter(&self, name: &str) -> Option<String>;

    /// Emit a message on the host's log.
    fn log(&self, level: LogLevel, message: &str);
}

/// In-process host: parameters live in a map, logs go to `tracing`.
#[derive(Debug, Default)]
pub struct StandaloneHost {
    name: String,
    parameters: Mutex<HashMap<String, String>>,
}

impl StandaloneHost {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Mutex::new(HashMap::new()),
        }
    }

    /// Seed a parameter value, as a launch-time override would.
    pub fn with_parameter(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_parameter(name, value);
        self
    }

    pub fn set_parameter(&self, name: impl Into<String>, value: impl Into<String>) {
        self.params().insert(name.into(), value.into());
    }

    fn params(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.parameters.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl HostContext for StandaloneHost {
    fn declare_parameter(&self, name: &str, default: &str) -> String {
        self.params()
            .entry(name.to_owned())
            .or_insert_with(|| default.to_owned())
            .clone()
    }

    fn get_parameter(&self, name: &str) -> Option<String> {
        self.params().get(name).cloned()
    }

    fn log(&self, level: LogLevel, message: &str) {
        let host = self.name.as_str();
        match level {
            LogLevel::Debug => tracing::debug!(host, "{message}"),
            LogLevel::Info => tracing::info!(host, "{message}"),
            LogLevel::Warn => tracing::warn!(host, "{message}"),
            LogLevel::Error => tracing::error!(host, "{message}"),
            LogLevel::Fatal => tracing::error!(host, fatal = true, "{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_returns_default_when_unset() {
        let host = StandaloneHost::new("test");
        let value = host.declare_parameter("tfd.output_dir", "/tmp");
        assert_eq!(value, "/tmp");
        assert_eq!(host.get_parameter("tfd.output_dir").as_deref(), Some("/tmp"));
    }

    #[test]
    fn override_wins_over_declared_default() {
        let host = StandaloneHost::new("test").with_parameter("tfd.output_dir", "/var/plans");
        let value = host.declare_parameter("tfd.output_dir", "/tmp");
        assert_eq!(value, "/var/plans");
    }

    #[test]
    fn unknown_parameter_is_none() {
        let host = StandaloneHost::new("test");
        assert!(host.get_parameter("missing").is_none());
    }

    #[test]
    fn host_is_usable_as_trait_object() {
        let host: Box<dyn HostContext> = Box::new(StandaloneHost::new("boxed"));
        host.log(LogLevel::Info, "hello");
        assert_eq!(host.declare_parameter("a", "b"), "b");
        assert!(LogLevel::Fatal > LogLevel::Error);
    }
}
