//! Upload with `upload-coverage`

use anyhow::Result;
use std::path::Path;

use super::{path_arg, CodeClimate, ReporterEvent};
use crate::error::{Parameters, ReporterError};
use crate::exec::Executor;
use crate::matcher::PatternMatcher;

impl<E: Executor, M: PatternMatcher> CodeClimate<E, M> {
    pub(super) async fn upload_coverage(&self, total: &Path) -> Result<()> {
        let mut args = vec![
            "upload-coverage".to_string(),
            "-i".to_string(),
            path_arg(total)?,
        ];

        if self.debug {
            args.push("--debug".to_string());
        }

        let invocation = self.tagged_invocation(args);

        if self.run(&invocation).await? != 0 {
            return Err(ReporterError::UploadFailed(Parameters::new(&invocation.args)).into());
        }

        self.emit(ReporterEvent::CoverageUploaded {
            input: total.to_path_buf(),
        });

        Ok(())
    }
}
