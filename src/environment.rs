//! Commit and branch metadata for tagging uploads
//!
//! CI platforms expose the same facts through several overlapping signals.
//! [`Signals`] is a snapshot of all of them, taken once per run, and
//! [`resolve`] turns it into the [`EnvironmentContext`] passed to every
//! env-tagged reporter command.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::Path;

pub const GIT_BRANCH: &str = "GIT_BRANCH";
pub const GIT_COMMIT_SHA: &str = "GIT_COMMIT_SHA";
pub const CC_TEST_REPORTER_ID: &str = "CC_TEST_REPORTER_ID";

const GITHUB_EVENT_NAME: &str = "GITHUB_EVENT_NAME";
const GITHUB_EVENT_PATH: &str = "GITHUB_EVENT_PATH";
const GITHUB_HEAD_REF: &str = "GITHUB_HEAD_REF";
const GITHUB_SHA: &str = "GITHUB_SHA";
const GITHUB_REF: &str = "GITHUB_REF";

const PULL_REQUEST_EVENTS: &[&str] = &["pull_request", "pull_request_target"];

/// Raw metadata signals, captured once per run
#[derive(Debug, Clone, Default)]
pub struct Signals {
    vars: HashMap<String, String>,
    /// Head commit of the pull request, taken from the webhook payload
    pull_request_head_sha: Option<String>,
}

impl Signals {
    pub fn new(vars: HashMap<String, String>) -> Self {
        Self {
            vars,
            pull_request_head_sha: None,
        }
    }

    pub fn with_pull_request_head_sha(mut self, sha: impl Into<String>) -> Self {
        self.pull_request_head_sha = Some(sha.into());
        self
    }

    /// Snapshot the process environment and, for pull request events, the
    /// event payload
    pub fn capture() -> Result<Self> {
        Self::from_vars(env::vars().collect())
    }

    /// The payload is only read for pull request events, so a broken
    /// payload cannot fail any other run
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let mut signals = Self::new(vars);

        if signals.is_pull_request() {
            if let Some(path) = signals.get(GITHUB_EVENT_PATH) {
                let path = path.to_string();
                signals.pull_request_head_sha = read_pull_request_head_sha(Path::new(&path))?;
            }
        }

        Ok(signals)
    }

    /// Non-empty value of a signal
    fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(|v| v.as_str())
            .filter(|v| !v.is_empty())
    }

    fn is_pull_request(&self) -> bool {
        self.get(GITHUB_EVENT_NAME)
            .map(|event| PULL_REQUEST_EVENTS.contains(&event))
            .unwrap_or(false)
    }
}

fn read_pull_request_head_sha(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read event payload: {}", path.display()))?;
    let payload: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse event payload: {}", path.display()))?;

    Ok(pull_request_head_sha(&payload))
}

fn pull_request_head_sha(payload: &Value) -> Option<String> {
    payload
        .get("pull_request")?
        .get("head")?
        .get("sha")?
        .as_str()
        .filter(|sha| !sha.is_empty())
        .map(|sha| sha.to_string())
}

/// Metadata attached to env-tagged commands. Fields are never absent:
/// an unknown value is an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentContext {
    pub git_branch: String,
    pub git_commit_sha: String,
    pub cc_test_reporter_id: String,
}

impl EnvironmentContext {
    pub fn to_env(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (GIT_BRANCH.to_string(), self.git_branch.clone()),
            (GIT_COMMIT_SHA.to_string(), self.git_commit_sha.clone()),
            (CC_TEST_REPORTER_ID.to_string(), self.cc_test_reporter_id.clone()),
        ])
    }
}

/// Strip the `refs/heads/` prefix from a ref; anything else passes through
pub fn branch_name_without_ref(branch: &str) -> &str {
    branch.strip_prefix("refs/heads/").unwrap_or(branch)
}

/// Resolve branch, commit and reporter id from a signal snapshot.
///
/// Commit: pull request head sha, `GITHUB_SHA`, `GIT_COMMIT_SHA`.
/// Branch: pull request head ref, `GITHUB_REF`, `GIT_BRANCH` (both
/// normalized). Pull request sources only count for pull request events.
/// An empty signal counts as absent and falls through to the next source.
pub fn resolve(signals: &Signals) -> EnvironmentContext {
    let (pr_branch, pr_sha) = if signals.is_pull_request() {
        (
            signals.get(GITHUB_HEAD_REF),
            signals.pull_request_head_sha.as_deref().filter(|s| !s.is_empty()),
        )
    } else {
        (None, None)
    };

    let git_commit_sha = pr_sha
        .or_else(|| signals.get(GITHUB_SHA))
        .or_else(|| signals.get(GIT_COMMIT_SHA))
        .unwrap_or_default();

    let git_branch = pr_branch
        .or_else(|| signals.get(GITHUB_REF).map(branch_name_without_ref))
        .or_else(|| signals.get(GIT_BRANCH).map(branch_name_without_ref))
        .unwrap_or_default();

    EnvironmentContext {
        git_branch: git_branch.to_string(),
        git_commit_sha: git_commit_sha.to_string(),
        cc_test_reporter_id: signals
            .get(CC_TEST_REPORTER_ID)
            .unwrap_or_default()
            .to_string(),
    }
}
