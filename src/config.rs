use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ReporterError;
use crate::reporter::PatternAndType;

/// Run configuration, from `covx.toml` or from GitHub Action inputs
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `pattern:type` entries
    pub coverage_file_patterns: Vec<String>,
    pub run_before_build: bool,
    pub collect_coverage: bool,
    pub run_after_build: bool,
    pub last_command_exit_code: Option<i32>,
    pub prefix: Option<String>,
    pub working_directory: Option<PathBuf>,
    /// Use this reporter instead of downloading one
    pub executable: Option<PathBuf>,
    pub debug: bool,
}

/// Validated configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub coverage_file_patterns: Vec<PatternAndType>,
    pub run_before_build: bool,
    pub collect_coverage: bool,
    pub run_after_build: bool,
    pub last_command_exit_code: i32,
    pub prefix: Option<String>,
    pub working_directory: Option<PathBuf>,
    pub executable: Option<PathBuf>,
    pub debug: bool,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(config)
    }

    /// Build from GitHub Action inputs; `input` returns the raw value of an
    /// input by name (`INPUT_<NAME>` in the step environment)
    pub fn from_action_inputs<F>(input: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| input(name).map(|v| v.trim().to_string()).unwrap_or_default();
        let flag = |name: &str| get(name) == "true";
        let non_empty = |name: &str| Some(get(name)).filter(|v| !v.is_empty());

        let last_command_exit_code = match non_empty("last_command_exit_code") {
            Some(raw) => Some(raw.parse::<i32>().with_context(|| {
                format!("Input last_command_exit_code is not an integer: «{}»", raw)
            })?),
            None => None,
        };

        Ok(Self {
            coverage_file_patterns: get("coverage_file_patterns")
                .lines()
                .map(|line| line.to_string())
                .collect(),
            run_before_build: flag("run_before_build"),
            collect_coverage: flag("collect_coverage"),
            run_after_build: flag("run_after_build"),
            last_command_exit_code,
            prefix: non_empty("prefix"),
            working_directory: non_empty("working_directory").map(PathBuf::from),
            executable: None,
            debug: false,
        })
    }

    /// Read action inputs from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_action_inputs(|name| std::env::var(input_variable(name)).ok())
    }

    pub fn into_options(self) -> Result<Options> {
        let coverage_file_patterns = parse_patterns(&self.coverage_file_patterns.join("\n"))?;

        Ok(Options {
            coverage_file_patterns,
            run_before_build: self.run_before_build,
            collect_coverage: self.collect_coverage,
            run_after_build: self.run_after_build,
            last_command_exit_code: self.last_command_exit_code.unwrap_or(0),
            prefix: self.prefix.filter(|p| !p.is_empty()),
            working_directory: self.working_directory,
            executable: self.executable,
            debug: self.debug,
        })
    }
}

/// Environment variable the Actions runner uses for an input
pub fn input_variable(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
}

/// Parse one `pattern:type` entry per line. The type is the text after the
/// last `:`, so patterns may contain colons themselves. Blank lines are
/// skipped; line numbers in errors count them.
pub fn parse_patterns(raw: &str) -> Result<Vec<PatternAndType>, ReporterError> {
    let mut patterns = Vec::new();

    for (index, line) in raw.trim().split('\n').map(str::trim).enumerate() {
        if line.is_empty() {
            continue;
        }

        match line.rsplit_once(':') {
            Some((pattern, r#type)) if !r#type.is_empty() => {
                patterns.push(PatternAndType::new(pattern, r#type));
            }
            _ => {
                return Err(ReporterError::MissingType {
                    index,
                    line: line.to_string(),
                })
            }
        }
    }

    Ok(patterns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn inputs(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_parse_patterns() {
        let patterns = parse_patterns("fake-pattern-one:lcov\nfake-pattern-two:junit").unwrap();
        assert_eq!(
            patterns,
            vec![
                PatternAndType::new("fake-pattern-one", "lcov"),
                PatternAndType::new("fake-pattern-two", "junit"),
            ]
        );
    }

    #[test]
    fn test_only_last_segment_is_type() {
        let patterns = parse_patterns("fake-pattern:one:lcov\nfake-pattern:two:junit").unwrap();
        assert_eq!(
            patterns,
            vec![
                PatternAndType::new("fake-pattern:one", "lcov"),
                PatternAndType::new("fake-pattern:two", "junit"),
            ]
        );
    }

    #[test]
    fn test_line_without_type() {
        let err = parse_patterns("fake-pattern-one:lcov\nfake-pattern-two").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Line 1 does not have a valid type: «fake-pattern-two». Expected to be something like «fake-pattern-two:lcov»"
        );
    }

    #[test]
    fn test_empty_type_is_rejected() {
        let err = parse_patterns("coverage/*.info:").unwrap_err();
        assert!(matches!(err, ReporterError::MissingType { index: 0, .. }));
    }

    #[test]
    fn test_blank_lines_and_whitespace() {
        let patterns = parse_patterns("\n  a/*.lcov:lcov  \n\n\tb.xml:clover\n").unwrap();
        assert_eq!(
            patterns,
            vec![
                PatternAndType::new("a/*.lcov", "lcov"),
                PatternAndType::new("b.xml", "clover"),
            ]
        );
        assert!(parse_patterns("").unwrap().is_empty());
    }

    #[test]
    fn test_action_inputs() {
        let config = Config::from_action_inputs(inputs(&[
            ("coverage_file_patterns", "fake-pattern-one:lcov"),
            ("run_before_build", "true"),
            ("collect_coverage", "false"),
            ("run_after_build", "true"),
            ("last_command_exit_code", "42"),
            ("prefix", ""),
        ]))
        .unwrap();
        let options = config.into_options().unwrap();

        assert_eq!(
            options.coverage_file_patterns,
            vec![PatternAndType::new("fake-pattern-one", "lcov")]
        );
        assert!(options.run_before_build);
        assert!(!options.collect_coverage);
        assert!(options.run_after_build);
        assert_eq!(options.last_command_exit_code, 42);
        assert_eq!(options.prefix, None);
    }

    #[test]
    fn test_action_input_defaults() {
        let options = Config::from_action_inputs(inputs(&[]))
            .unwrap()
            .into_options()
            .unwrap();

        assert!(options.coverage_file_patterns.is_empty());
        assert!(!options.run_before_build);
        assert!(!options.collect_coverage);
        assert!(!options.run_after_build);
        assert_eq!(options.last_command_exit_code, 0);
        assert_eq!(options.working_directory, None);
    }

    #[test]
    fn test_invalid_exit_code_input() {
        let err = Config::from_action_inputs(inputs(&[("last_command_exit_code", "abc")])).unwrap_err();
        assert!(err.to_string().contains("«abc»"));
    }

    #[test]
    fn test_input_variable() {
        assert_eq!(input_variable("coverage_file_patterns"), "INPUT_COVERAGE_FILE_PATTERNS");
        assert_eq!(input_variable("run before"), "INPUT_RUN_BEFORE");
    }

    #[test]
    fn test_parse_config_file() {
        let toml_content = r#"
coverage_file_patterns = ["coverage/lcov.info:lcov", "build/clover.xml:clover"]
collect_coverage = true
prefix = "/home/runner/work/app"
working_directory = "app"
"#;

        let dir = tempdir().unwrap();
        let path = dir.path().join("covx.toml");
        fs::write(&path, toml_content).unwrap();

        let options = Config::load(&path).unwrap().into_options().unwrap();
        assert_eq!(options.coverage_file_patterns.len(), 2);
        assert_eq!(options.coverage_file_patterns[1], PatternAndType::new("build/clover.xml", "clover"));
        assert!(options.collect_coverage);
        assert_eq!(options.prefix.as_deref(), Some("/home/runner/work/app"));
        assert_eq!(options.working_directory, Some(PathBuf::from("app")));
    }

    #[test]
    fn test_config_file_pattern_without_type() {
        let config: Config = toml::from_str(r#"coverage_file_patterns = ["ok:lcov", "broken"]"#).unwrap();
        let err = config.into_options().unwrap_err();
        assert!(err.to_string().starts_with("Line 1 does not have a valid type"));
    }
}
