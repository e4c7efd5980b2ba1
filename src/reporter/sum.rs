//! Aggregation with `sum-coverage`

use anyhow::Result;
use std::path::{Path, PathBuf};

use super::{path_arg, CodeClimate, ReporterEvent};
use crate::error::{Parameters, ReporterError};
use crate::exec::Executor;
use crate::matcher::PatternMatcher;

pub fn total_coverage_path(output_dir: &Path) -> PathBuf {
    output_dir.join("codeclimate.total.json")
}

impl<E: Executor, M: PatternMatcher> CodeClimate<E, M> {
    /// Sum formatted reports into one total. `formatted` must not be empty;
    /// the part count passed to the reporter is its length.
    pub(super) async fn sum_coverages(&self, formatted: &[PathBuf], output_dir: &Path) -> Result<PathBuf> {
        let total = total_coverage_path(output_dir);

        let mut args = Vec::with_capacity(formatted.len() + 5);
        args.push("sum-coverage".to_string());
        for part in formatted {
            args.push(path_arg(part)?);
        }
        args.push("-p".to_string());
        args.push(formatted.len().to_string());
        args.push("-o".to_string());
        args.push(path_arg(&total)?);

        let invocation = self.invocation(args);

        if self.run(&invocation).await? != 0 {
            return Err(ReporterError::SumFailed(Parameters::new(&invocation.args)).into());
        }

        self.emit(ReporterEvent::CoverageSummed {
            output: total.clone(),
            count: formatted.len(),
        });

        Ok(total)
    }
}
