//! Code Climate test reporter driver
//!
//! Provides:
//! - before-build / after-build bracketing of the test step
//! - Per-file formatting of discovered coverage reports
//! - Summing of formatted reports into one total
//! - Upload of the total, tagged with commit and branch metadata

mod format;
mod sum;
mod upload;

pub use format::formatted_coverage_path;
pub use sum::total_coverage_path;

use anyhow::Result;
use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use crate::console;
use crate::environment::EnvironmentContext;
use crate::error::{Parameters, ReporterError};
use crate::exec::{Executor, Invocation};
use crate::matcher::PatternMatcher;

/// A coverage file pattern and the report format of its matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternAndType {
    pub pattern: String,
    /// Format label understood by `format-coverage -t` (lcov, clover, ...)
    pub r#type: String,
}

impl PatternAndType {
    pub fn new(pattern: impl Into<String>, r#type: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            r#type: r#type.into(),
        }
    }
}

/// A path as a reporter argument; lossy conversion would name a file that
/// does not exist
fn path_arg(path: &Path) -> Result<String, ReporterError> {
    path.to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| ReporterError::NonUtf8Path {
            path: path.to_string_lossy().to_string(),
        })
}

/// Progress of a reporter run
#[derive(Debug, Clone, PartialEq)]
pub enum ReporterEvent {
    /// A reporter command is about to run
    CommandStarted { args: Vec<String> },
    /// A pattern matched no file; the run goes on without it
    PatternWithoutMatches { pattern: String },
    FileFormatted { source: PathBuf, output: PathBuf },
    CoverageSummed { output: PathBuf, count: usize },
    CoverageUploaded { input: PathBuf },
}

/// Drives one reporter executable against one repository
pub struct CodeClimate<E, M> {
    executable: PathBuf,
    repository_root: PathBuf,
    debug: bool,
    environment: EnvironmentContext,
    executor: E,
    matcher: M,
    event_tx: Option<Sender<ReporterEvent>>,
}

impl<E: Executor, M: PatternMatcher> CodeClimate<E, M> {
    pub fn new(executable: &Path, repository_root: &Path, executor: E, matcher: M) -> Self {
        Self {
            executable: executable.to_path_buf(),
            repository_root: repository_root.to_path_buf(),
            debug: false,
            environment: EnvironmentContext::default(),
            executor,
            matcher,
            event_tx: None,
        }
    }

    /// Append `--debug` to format and upload commands
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Metadata for env-tagged commands, resolved once per run
    pub fn with_environment(mut self, environment: EnvironmentContext) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_event_sender(mut self, tx: Sender<ReporterEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn emit(&self, event: ReporterEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    fn invocation(&self, args: Vec<String>) -> Invocation {
        Invocation::new(&self.executable, args, &self.repository_root)
    }

    fn tagged_invocation(&self, args: Vec<String>) -> Invocation {
        self.invocation(args).with_env(self.environment.to_env())
    }

    async fn run(&self, invocation: &Invocation) -> Result<i32> {
        self.emit(ReporterEvent::CommandStarted {
            args: invocation.args.clone(),
        });
        self.executor.exec(invocation).await
    }

    /// Run `before-build` ahead of the test step
    pub async fn run_before_build(&self) -> Result<()> {
        let invocation = self.tagged_invocation(vec!["before-build".to_string()]);

        if self.run(&invocation).await? != 0 {
            return Err(ReporterError::BeforeBuildFailed(Parameters::new(&invocation.args)).into());
        }

        Ok(())
    }

    /// Format every file matched by `patterns`, sum the results and upload
    /// the total.
    ///
    /// Patterns are formatted concurrently, each one file at a time. The
    /// first failing pattern fails the run; commands already issued by other
    /// patterns are not waited for.
    pub async fn collect_coverage(
        &self,
        patterns: &[PatternAndType],
        prefix: Option<&str>,
        output_dir: &Path,
    ) -> Result<()> {
        let jobs = patterns
            .iter()
            .enumerate()
            .map(|(pattern_index, pattern_and_type)| {
                self.format_coverage_of_type(pattern_and_type, pattern_index, prefix, output_dir)
            });

        // try_join_all keeps pattern order whatever the completion order
        let formatted_by_pattern = try_join_all(jobs).await?;
        let formatted: Vec<PathBuf> = formatted_by_pattern.into_iter().flatten().collect();

        if formatted.is_empty() {
            return Err(ReporterError::NoCoverageFiles.into());
        }

        console::debug(
            self.debug,
            &format!("Formatted {} coverage file(s)", formatted.len()),
        );

        let total = self.sum_coverages(&formatted, output_dir).await?;
        self.upload_coverage(&total).await?;

        console::success(&format!("Coverage uploaded from {}", total.display()));

        Ok(())
    }

    /// Run `after-build`, passing on the exit code of the test step
    pub async fn run_after_build(&self, last_command_exit_code: i32) -> Result<()> {
        let invocation = self.tagged_invocation(vec![
            "after-build".to_string(),
            "--exit-code".to_string(),
            last_command_exit_code.to_string(),
        ]);

        if self.run(&invocation).await? != 0 {
            return Err(ReporterError::AfterBuildFailed(Parameters::new(&invocation.args)).into());
        }

        Ok(())
    }
}
