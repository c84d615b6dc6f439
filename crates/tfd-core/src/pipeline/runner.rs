use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use super::{RunError, StageCommand, StageOutput};

/// Executes [`StageCommand`]s.
///
/// The solver only talks to this trait, so tests can substitute a runner
/// that fabricates the toolchain's output files instead of spawning
/// processes.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion and capture its exit status and output.
    ///
    /// A program that starts and exits non-zero is *not* an error here; it
    /// is reported through [`StageOutput::exit_code`].
    async fn run(&self, command: &StageCommand) -> Result<StageOutput, RunError>;
}

// Compile-time assertion: CommandRunner must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn CommandRunner) {}
};

/// Spawns real child processes via `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &StageCommand) -> Result<StageOutput, RunError> {
        let start = Instant::now();

        let stdin = match command.stdin {
            Some(ref path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|e| RunError::Stdin {
                        path: path.clone(),
                        source: e,
                    })?;
                Stdio::from(file.into_std().await)
            }
            None => Stdio::null(),
        };

        tracing::debug!(
            stage = %command.stage,
            command = %command.display_line(),
            cwd = %command.current_dir.display(),
            "spawning toolchain stage"
        );

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.current_dir)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RunError::Launch {
                program: command.program.clone(),
                source: e,
            })?;

        // Drain both pipes while waiting so a chatty stage cannot block on a
        // full pipe buffer.
        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        let read_stdout = async {
            let mut buf = Vec::new();
            if let Some(ref mut pipe) = stdout_pipe {
                pipe.read_to_end(&mut buf).await.ok();
            }
            String::from_utf8_lossy(&buf).into_owned()
        };

        let read_stderr = async {
            let mut buf = Vec::new();
            if let Some(ref mut pipe) = stderr_pipe {
                pipe.read_to_end(&mut buf).await.ok();
            }
            String::from_utf8_lossy(&buf).into_owned()
        };

        let wait_all = async {
            let (wait_result, stdout, stderr) =
                tokio::join!(child.wait(), read_stdout, read_stderr);
            (wait_result, stdout, stderr)
        };

        let finished = match command.timeout {
            Some(limit) => tokio::time::timeout(limit, wait_all).await.ok(),
            None => Some(wait_all.await),
        };

        match finished {
            Some((Ok(status), stdout, stderr)) => {
                let duration_ms = i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX);
                Ok(StageOutput {
                    exit_code: status.code(),
                    stdout,
                    stderr,
                    duration_ms,
                })
            }
            Some((Err(e), _, _)) => Err(RunError::Wait {
                program: command.program.clone(),
                source: e,
            }),
            None => {
                let _ = child.kill().await;
                Err(RunError::TimedOut {
                    program: command.program.clone(),
                    timeout: command.timeout.unwrap_or_default(),
                })
            }
        }
    }
}
