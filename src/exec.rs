//! Subprocess execution
//!
//! Reporter commands are described as [`Invocation`] values and handed to
//! an [`Executor`], which runs them to completion and reports the exit status.

use anyhow::{Context, Result};
use colored::Colorize;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// One external command: program, argument vector, working directory and,
/// for env-tagged commands, the extra environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Option<BTreeMap<String, String>>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: cwd.into(),
            env: None,
        }
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    /// First argument, i.e. the reporter subcommand
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(|s| s.as_str())
    }

    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Capability to run an [`Invocation`]. Only spawn failures are errors; a
/// command that ran and failed is reported through its exit status.
pub trait Executor: Send + Sync {
    fn exec(&self, invocation: &Invocation) -> impl Future<Output = Result<i32>> + Send;
}

/// Runs invocations as child processes sharing this process's stdio
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor;

impl Executor for ProcessExecutor {
    async fn exec(&self, invocation: &Invocation) -> Result<i32> {
        println!("{}", format!("[command]{}", invocation.command_line()).dimmed());

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        if let Some(ref env) = invocation.env {
            cmd.envs(env);
        }

        let status = cmd
            .status()
            .await
            .with_context(|| format!("Failed to execute {}", invocation.program.display()))?;

        // Killed by a signal
        Ok(status.code().unwrap_or(-1))
    }
}
