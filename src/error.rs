//! Failure taxonomy for a reporter run

use std::fmt;
use thiserror::Error;

/// Argument vector rendered the way failures echo it back to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters(pub Vec<String>);

impl Parameters {
    pub fn new(args: &[String]) -> Self {
        Self(args.to_vec())
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let readable: Vec<String> = self.0.iter().map(|p| format!("«{}»", p)).collect();
        write!(f, "Parameters: [ {} ]", readable.join(", "))
    }
}

#[derive(Debug, Error)]
pub enum ReporterError {
    /// A coverage pattern line has no `:type` suffix
    #[error("Line {index} does not have a valid type: «{line}». Expected to be something like «{line}:lcov»")]
    MissingType { index: usize, line: String },

    #[error("before-build command failed. {0}")]
    BeforeBuildFailed(Parameters),

    #[error("Could not format coverage file at «{file}». {parameters}")]
    FormatFailed { file: String, parameters: Parameters },

    #[error("Could not sum coverages. {0}")]
    SumFailed(Parameters),

    #[error("Could not upload coverage. {0}")]
    UploadFailed(Parameters),

    #[error("after-build command failed. {0}")]
    AfterBuildFailed(Parameters),

    /// Reporter arguments are strings, so such a path cannot be passed on
    #[error("Path is not valid UTF-8: «{path}»")]
    NonUtf8Path { path: String },

    /// Every pattern matched zero files
    #[error("No coverage files found")]
    NoCoverageFiles,

    #[error("Failed to get body from CodeClimate executable request response")]
    EmptyDownload,

    #[error("Could not download CodeClimate executable from {url}: HTTP {status}")]
    DownloadStatus { url: String, status: u16 },

    #[error("Checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },
}
