//! Reporter executable download

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::console;
use crate::error::ReporterError;

pub const DOWNLOAD_BASE_URL: &str = "https://codeclimate.com/downloads/test-reporter";

/// Platform name used in reporter release file names
fn platform() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

pub fn executable_filename() -> String {
    format!("test-reporter-latest-{}-amd64", platform())
}

pub fn executable_url(base_url: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), executable_filename())
}

/// Options for [`download_executable`]
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub base_url: String,
    /// Check the body against the published `.sha256` file
    pub verify_checksum: bool,
    pub debug: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            base_url: DOWNLOAD_BASE_URL.to_string(),
            verify_checksum: false,
            debug: false,
        }
    }
}

/// Fresh `code-climate-<uuid>` directory under the system temp dir. Not
/// created here.
pub fn scratch_folder() -> PathBuf {
    std::env::temp_dir().join(format!("code-climate-{}", Uuid::new_v4()))
}

/// Where formatted reports go: the requested directory, else next to a
/// downloaded reporter, else a fresh scratch folder. A reporter that was not
/// downloaded may live in a system directory or be a bare `PATH` name, so its
/// location is never used.
pub fn output_folder(requested: Option<&Path>, executable: &Path, downloaded: bool) -> PathBuf {
    if let Some(dir) = requested {
        return dir.to_path_buf();
    }

    Some(executable)
        .filter(|_| downloaded)
        .and_then(Path::parent)
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(scratch_folder)
}

/// Download the reporter into a fresh temporary directory and make it
/// executable. The directory also receives the run's formatted reports.
pub async fn download_executable(options: &DownloadOptions) -> Result<PathBuf> {
    let url = executable_url(&options.base_url);
    let client = reqwest::Client::new();

    let body = fetch(&client, &url).await?;
    if body.is_empty() {
        return Err(ReporterError::EmptyDownload.into());
    }

    if options.verify_checksum {
        let checksum = fetch(&client, &format!("{}.sha256", url)).await?;
        verify_checksum(&url, &body, &String::from_utf8_lossy(&checksum))?;
    }

    let folder = scratch_folder();
    tokio::fs::create_dir_all(&folder)
        .await
        .with_context(|| format!("Failed to create {}", folder.display()))?;

    let path = folder.join(executable_filename());
    install(&path, &body).await?;

    console::debug(
        options.debug,
        &format!(
            "Code Climate reporter downloaded to {}. Size {} bytes",
            path.display(),
            body.len()
        ),
    );

    Ok(path)
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let response = client
        .get(url)
        .header("User-Agent", "covx")
        .send()
        .await
        .with_context(|| format!("Failed to request {}", url))?;

    if !response.status().is_success() {
        return Err(ReporterError::DownloadStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        }
        .into());
    }

    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("Failed to read response from {}", url))?;

    Ok(bytes.to_vec())
}

/// `checksum_file` holds the hex digest as its first token, optionally
/// followed by the file name (`sha256sum` output)
fn verify_checksum(url: &str, body: &[u8], checksum_file: &str) -> Result<()> {
    let expected = checksum_file
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase();
    let actual = hex::encode(Sha256::digest(body));

    if expected != actual {
        return Err(ReporterError::ChecksumMismatch {
            url: url.to_string(),
            expected,
            actual,
        }
        .into());
    }

    Ok(())
}

async fn install(path: &Path, body: &[u8]) -> Result<()> {
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o775))
            .await
            .with_context(|| format!("Failed to make {} executable", path.display()))?;
    }

    Ok(())
}
