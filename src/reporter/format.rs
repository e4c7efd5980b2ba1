//! Per-file formatting with `format-coverage`

use anyhow::Result;
use std::path::{Path, PathBuf};

use super::{path_arg, CodeClimate, PatternAndType, ReporterEvent};
use crate::console;
use crate::error::{Parameters, ReporterError};
use crate::exec::Executor;
use crate::matcher::PatternMatcher;

/// Output path of the formatted report for file `file_index` of pattern
/// `pattern_index`. Distinct coordinates never share a path.
pub fn formatted_coverage_path(output_dir: &Path, pattern_index: usize, file_index: usize) -> PathBuf {
    output_dir.join(format!("codeclimate.{}.{}.json", pattern_index, file_index))
}

/// Formatting of one matched file
struct FormatCommand {
    source: PathBuf,
    output: PathBuf,
    args: Vec<String>,
}

impl<E: Executor, M: PatternMatcher> CodeClimate<E, M> {
    fn format_command(
        &self,
        source: &Path,
        r#type: &str,
        output: &Path,
        prefix: Option<&str>,
    ) -> Result<Vec<String>, ReporterError> {
        let mut args = vec![
            "format-coverage".to_string(),
            path_arg(source)?,
            "-t".to_string(),
            r#type.to_string(),
            "-o".to_string(),
            path_arg(output)?,
        ];

        if let Some(prefix) = prefix {
            args.push("--prefix".to_string());
            args.push(prefix.to_string());
        }

        if self.debug {
            args.push("--debug".to_string());
        }

        Ok(args)
    }

    /// Format every file matched by one pattern, one file at a time, in
    /// matcher order. Returns the formatted paths in that same order; a
    /// pattern without matches yields an empty list. Every command is built
    /// before the first one runs, so a non-UTF-8 path fails the pattern
    /// without running anything.
    pub(super) async fn format_coverage_of_type(
        &self,
        pattern_and_type: &PatternAndType,
        pattern_index: usize,
        prefix: Option<&str>,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        let PatternAndType { pattern, r#type } = pattern_and_type;
        let sources = self.matcher.expand(pattern).await?;

        if sources.is_empty() {
            console::warning(&format!("Could not find any file for pattern «{}»", pattern));
            self.emit(ReporterEvent::PatternWithoutMatches {
                pattern: pattern.clone(),
            });
            return Ok(Vec::new());
        }

        let commands = sources
            .into_iter()
            .enumerate()
            .map(|(file_index, source)| {
                let output = formatted_coverage_path(output_dir, pattern_index, file_index);
                let args = self.format_command(&source, r#type, &output, prefix)?;
                Ok(FormatCommand { source, output, args })
            })
            .collect::<Result<Vec<FormatCommand>, ReporterError>>()?;

        let mut formatted = Vec::with_capacity(commands.len());

        for command in commands {
            let invocation = self.invocation(command.args);

            if self.run(&invocation).await? != 0 {
                return Err(ReporterError::FormatFailed {
                    file: command.source.to_string_lossy().to_string(),
                    parameters: Parameters::new(&invocation.args),
                }
                .into());
            }

            self.emit(ReporterEvent::FileFormatted {
                source: command.source,
                output: command.output.clone(),
            });
            formatted.push(command.output);
        }

        Ok(formatted)
    }
}
