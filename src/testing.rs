//! Test doubles for the executor and matcher capabilities

use anyhow::Result;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use crate::exec::{Executor, Invocation};
use crate::matcher::PatternMatcher;

type ExitCodeFn = Box<dyn Fn(&Invocation) -> i32 + Send + Sync>;
type MatchFn = Box<dyn Fn(&Invocation) -> bool + Send + Sync>;

/// Records every invocation and answers with scripted exit codes
pub struct FakeExecutor {
    calls: Mutex<Vec<Invocation>>,
    scripted: Mutex<VecDeque<i32>>,
    exit_code: ExitCodeFn,
    delay: Option<(MatchFn, Duration)>,
}

impl FakeExecutor {
    fn new(exit_code: ExitCodeFn) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            scripted: Mutex::new(VecDeque::new()),
            exit_code,
            delay: None,
        }
    }

    pub fn succeeding() -> Self {
        Self::always(0)
    }

    pub fn always(code: i32) -> Self {
        Self::new(Box::new(move |_| code))
    }

    /// Exit 1 for invocations matching `predicate`, 0 otherwise
    pub fn failing_when<F>(predicate: F) -> Self
    where
        F: Fn(&Invocation) -> bool + Send + Sync + 'static,
    {
        Self::new(Box::new(move |invocation| if predicate(invocation) { 1 } else { 0 }))
    }

    /// Answer calls in order with `codes`, then 0
    pub fn with_exit_codes(codes: &[i32]) -> Self {
        let executor = Self::succeeding();
        executor.scripted.lock().unwrap().extend(codes.iter().copied());
        executor
    }

    /// Matching invocations finish `duration` after they are recorded
    pub fn delaying_when<F>(mut self, predicate: F, duration: Duration) -> Self
    where
        F: Fn(&Invocation) -> bool + Send + Sync + 'static,
    {
        self.delay = Some((Box::new(predicate), duration));
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

impl Executor for FakeExecutor {
    async fn exec(&self, invocation: &Invocation) -> Result<i32> {
        self.calls.lock().unwrap().push(invocation.clone());

        if let Some((predicate, duration)) = &self.delay {
            if predicate(invocation) {
                tokio::time::sleep(*duration).await;
            }
        }

        let scripted = self.scripted.lock().unwrap().pop_front();
        Ok(scripted.unwrap_or_else(|| (self.exit_code)(invocation)))
    }
}

/// Pattern → fixed match list; unknown patterns match `fallback`
#[derive(Default)]
pub struct FakeMatcher {
    matches: HashMap<String, Vec<PathBuf>>,
    fallback: Vec<PathBuf>,
    expanded: Mutex<Vec<String>>,
}

impl FakeMatcher {
    /// Every pattern matches `paths`
    pub fn returning(paths: &[&str]) -> Self {
        Self {
            fallback: paths.iter().map(PathBuf::from).collect(),
            ..Self::default()
        }
    }

    pub fn with_matches(mut self, pattern: &str, paths: &[&str]) -> Self {
        self.matches
            .insert(pattern.to_string(), paths.iter().map(PathBuf::from).collect());
        self
    }

    pub fn with_match_paths(mut self, pattern: &str, paths: Vec<PathBuf>) -> Self {
        self.matches.insert(pattern.to_string(), paths);
        self
    }

    pub fn expanded(&self) -> Vec<String> {
        self.expanded.lock().unwrap().clone()
    }
}

impl PatternMatcher for FakeMatcher {
    async fn expand(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        self.expanded.lock().unwrap().push(pattern.to_string());

        Ok(self
            .matches
            .get(pattern)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}
