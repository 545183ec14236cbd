//! CLI command execution helpers
//!
//! Wraps the `inwatch` binary built for this test run.

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, ChildStderr, Command, Stdio};
use std::time::{Duration, Instant};

/// CLI command builder
pub struct InwatchCommand {
    binary_path: PathBuf,
    args: Vec<String>,
}

impl InwatchCommand {
    pub fn new() -> Self {
        Self {
            binary_path: PathBuf::from(env!("CARGO_BIN_EXE_inwatch")),
            args: Vec::new(),
        }
    }

    /// Add command arguments
    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary_path);
        command.args(&self.args);
        command
    }

    /// Run to completion
    pub fn execute(&self) -> Result<CommandResult> {
        let output = self.command().output().context("Failed to execute inwatch")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    /// Run and assert success
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;
        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }
        Ok(result)
    }

    /// Run and expect failure
    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;
        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }
        Ok(result)
    }

    /// Start a long-running `watch` and wait until its watches are registered
    pub fn spawn_watching(&self) -> Result<RunningWatch> {
        let mut child = self
            .command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn inwatch")?;

        let stderr = child.stderr.take().context("stderr not captured")?;
        let mut stderr = BufReader::new(stderr);
        let mut early_stderr = String::new();

        loop {
            let start = early_stderr.len();
            if stderr.read_line(&mut early_stderr)? == 0 {
                let _ = child.kill();
                anyhow::bail!("inwatch exited before registering watches:\n{}", early_stderr);
            }
            if early_stderr[start..].starts_with("watching ") {
                break;
            }
        }

        Ok(RunningWatch {
            child,
            stderr,
            early_stderr,
        })
    }
}

/// A `watch` process whose registrations are in place
pub struct RunningWatch {
    child: Child,
    stderr: BufReader<ChildStderr>,
    /// Lines read while waiting for registration
    early_stderr: String,
}

impl RunningWatch {
    /// Wait for exit, killing the process after `timeout`
    pub fn finish(mut self, timeout: Duration) -> Result<CommandResult> {
        let start = Instant::now();
        loop {
            if self.child.try_wait()?.is_some() {
                break;
            }
            if start.elapsed() > timeout {
                let _ = self.child.kill();
                anyhow::bail!("inwatch did not exit within {:?}", timeout);
            }
            std::thread::sleep(Duration::from_millis(20));
        }

        let mut stderr = self.early_stderr;
        self.stderr.read_to_string(&mut stderr)?;

        let output = self.child.wait_with_output()?;
        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr,
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

/// Captured output of a finished command
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }
}

/// Macro for convenient command construction
#[macro_export]
macro_rules! inwatch {
    ($($arg:expr),*) => {{
        let mut cmd = $crate::common::cli::InwatchCommand::new();
        cmd.args(&[$($arg),*]);
        cmd
    }};
}
