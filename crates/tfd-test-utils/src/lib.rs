//! Shared test utilities for tfd integration tests.
//!
//! [`FakeToolchain`] lays out a throwaway `TFD_HOME` whose `translate.py`,
//! `preprocess` and `search` are small POSIX shell scripts. They honour the
//! real programs' I/O contract (fixed-name outputs in the current
//! directory, stdin input, `p <prefix>` plan output) so the solver can be
//! driven end to end without a TFD installation.

#![cfg(unix)]

use std::fmt::Write as _;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tempfile::TempDir;

use tfd_core::ToolchainConfig;
use tfd_core::pipeline::Stage;

/// A scripted stand-in for a TFD installation. Removed on drop.
pub struct FakeToolchain {
    dir: TempDir,
}

/// Builder for [`FakeToolchain`].
#[derive(Debug, Clone)]
pub struct FakeToolchainBuilder {
    translate_exit: i32,
    preprocess_exit: i32,
    search_exit: i32,
    plan: Option<String>,
    search_sleep_secs: Option<u32>,
    reject_marker: Option<String>,
    missing: Vec<Stage>,
}

impl Default for FakeToolchainBuilder {
    fn default() -> Self {
        Self {
            translate_exit: 0,
            preprocess_exit: 0,
            search_exit: 0,
            plan: None,
            search_sleep_secs: None,
            reject_marker: None,
            missing: Vec::new(),
        }
    }
}

impl FakeToolchainBuilder {
    /// Contents the search stage writes to `<prefix>.1`. Without a plan the
    /// search writes nothing, as TFD does for unsolvable problems.
    pub fn plan(mut self, plan: impl Into<String>) -> Self {
        self.plan = Some(plan.into());
        self
    }

    pub fn translate_exit(mut self, code: i32) -> Self {
        self.translate_exit = code;
        self
    }

    pub fn preprocess_exit(mut self, code: i32) -> Self {
        self.preprocess_exit = code;
        self
    }

    pub fn search_exit(mut self, code: i32) -> Self {
        self.search_exit = code;
        self
    }

    /// Make the search stage sleep before doing anything.
    pub fn search_sleep(mut self, secs: u32) -> Self {
        self.search_sleep_secs = Some(secs);
        self
    }

    /// The translator rejects any domain file containing `marker`.
    pub fn reject_domains_containing(mut self, marker: impl Into<String>) -> Self {
        self.reject_marker = Some(marker.into());
        self
    }

    /// Leave the program for `stage` out, so launching it fails.
    pub fn without(mut self, stage: Stage) -> Self {
        self.missing.push(stage);
        self
    }

    pub fn build(self) -> FakeToolchain {
        let dir = tempfile::Builder::new()
            .prefix("fake-tfd-")
            .tempdir()
            .expect("failed to create fake toolchain directory");
        let home = dir.path();

        if !self.missing.contains(&Stage::Translate) {
            write_script(
                &home.join("translate").join("translate.py"),
                &self.translate_script(home),
            );
        }
        if !self.missing.contains(&Stage::Preprocess) {
            write_script(
                &home.join("preprocess").join("preprocess"),
                &self.preprocess_script(),
            );
        }
        if !self.missing.contains(&Stage::Search) {
            write_script(&home.join("search").join("search"), &self.search_script(home));
        }

        FakeToolchain { dir }
    }

    fn translate_script(&self, home: &Path) -> String {
        let mut s = String::from("#!/bin/sh\n");
        let _ = writeln!(
            s,
            "printf '%s\\n' \"$@\" > '{}'",
            home.join("translate.args").display()
        );
        s.push_str("[ \"$#\" -eq 2 ] || { echo 'usage: translate.py DOMAIN PROBLEM' >&2; exit 2; }\n");
        s.push_str("[ -f \"$1\" ] && [ -f \"$2\" ] || { echo 'input file missing' >&2; exit 2; }\n");
        if let Some(ref marker) = self.reject_marker {
            let _ = writeln!(
                s,
                "if grep -q '{marker}' \"$1\"; then echo 'Error: could not parse domain file' >&2; exit 1; fi"
            );
        }
        if self.translate_exit != 0 {
            let _ = writeln!(s, "echo 'translate failed' >&2\nexit {}", self.translate_exit);
            return s;
        }
        s.push_str("{ echo begin_version; echo 3; echo end_version; cat \"$2\"; } > output.sas\n");
        s.push_str("exit 0\n");
        s
    }

    fn preprocess_script(&self) -> String {
        let mut s = String::from("#!/bin/sh\n");
        if self.preprocess_exit != 0 {
            let _ = writeln!(
                s,
                "cat > /dev/null\necho 'preprocess failed' >&2\nexit {}",
                self.preprocess_exit
            );
            return s;
        }
        s.push_str("cat > output\nexit 0\n");
        s
    }

    fn search_script(&self, home: &Path) -> String {
        let mut s = String::from("#!/bin/sh\n");
        if let Some(secs) = self.search_sleep_secs {
            let _ = writeln!(s, "sleep {secs}");
        }
        let _ = writeln!(s, "printf '%s\\n' \"$@\" > '{}'", home.join("search.args").display());
        s.push_str("cat > /dev/null\n");
        s.push_str("prefix=''\ntake=0\n");
        s.push_str("for arg in \"$@\"; do\n");
        s.push_str("  if [ \"$take\" = 1 ]; then prefix=\"$arg\"; take=0; continue; fi\n");
        s.push_str("  if [ \"$arg\" = p ]; then take=1; fi\n");
        s.push_str("done\n");
        s.push_str("[ -n \"$prefix\" ] || { echo 'no plan prefix given' >&2; exit 2; }\n");
        match self.plan {
            Some(ref plan) if plan.is_empty() => s.push_str(": > \"$prefix.1\"\n"),
            Some(ref plan) => {
                s.push_str("cat > \"$prefix.1\" <<'TFD_PLAN_EOF'\n");
                s.push_str(plan);
                if !plan.ends_with('\n') {
                    s.push('\n');
                }
                s.push_str("TFD_PLAN_EOF\n");
            }
            None => s.push_str("echo 'Completely explored state space -- no solution!'\n"),
        }
        let _ = writeln!(s, "exit {}", self.search_exit);
        s
    }
}

fn write_script(path: &Path, body: &str) {
    let parent = path.parent().expect("script path has a parent");
    std::fs::create_dir_all(parent)
        .unwrap_or_else(|e| panic!("failed to create {}: {e}", parent.display()));
    std::fs::write(path, body)
        .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .unwrap_or_else(|e| panic!("failed to chmod {}: {e}", path.display()));
}

impl FakeToolchain {
    pub fn builder() -> FakeToolchainBuilder {
        FakeToolchainBuilder::default()
    }

    /// A toolchain whose search always finds `plan`.
    pub fn with_plan(plan: impl Into<String>) -> Self {
        Self::builder().plan(plan).build()
    }

    pub fn home(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> ToolchainConfig {
        ToolchainConfig::new(self.dir.path())
    }

    /// Arguments the last translate invocation received.
    pub fn translate_args(&self) -> Option<Vec<String>> {
        read_args(&self.dir.path().join("translate.args"))
    }

    /// Arguments the last search invocation received.
    pub fn search_args(&self) -> Option<Vec<String>> {
        read_args(&self.dir.path().join("search.args"))
    }
}

fn read_args(path: &Path) -> Option<Vec<String>> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.lines().map(str::to_owned).collect())
}
