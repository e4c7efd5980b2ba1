use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::env;
use std::path::{Path, PathBuf};

use covx::config::{Config, Options};
use covx::console;
use covx::download::{download_executable, output_folder, DownloadOptions};
use covx::environment::{resolve, Signals};
use covx::exec::ProcessExecutor;
use covx::matcher::GlobMatcher;
use covx::reporter::CodeClimate;

const CONFIG_FILE: &str = "covx.toml";

#[derive(Parser)]
#[command(name = "covx")]
#[command(about = "Collect coverage in CI and upload it with the Code Climate test reporter")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (default: covx.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Reporter executable to use instead of downloading the latest one
    #[arg(long, global = true)]
    executable: Option<PathBuf>,

    /// Repository root the reporter runs in
    #[arg(long, global = true)]
    working_directory: Option<PathBuf>,

    /// Pass --debug to the reporter and print debug lines
    #[arg(long, global = true)]
    debug: bool,

    /// Check the downloaded reporter against its published checksum
    #[arg(long, global = true)]
    verify_download: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the stages selected by GitHub Action inputs (INPUT_* variables)
    Action,

    /// Run `before-build` ahead of the test step
    BeforeBuild,

    /// Format, sum and upload coverage reports
    Collect {
        /// Coverage files as `pattern:type`, e.g. `coverage/lcov.info:lcov`
        #[arg(short, long = "pattern")]
        patterns: Vec<String>,

        /// Prefix stripped from source paths in the reports
        #[arg(long)]
        prefix: Option<String>,

        /// Directory for formatted reports (default: next to the reporter)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Run `after-build` with the exit code of the test step
    AfterBuild {
        #[arg(long, allow_negative_numbers = true)]
        exit_code: i32,
    },
}

fn main() {
    if let Err(e) = run() {
        console::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.command {
        Commands::Action => Config::from_env()?,
        _ => load_config(cli.config.as_deref())?,
    };
    let mut output_dir = None;

    match cli.command {
        Commands::Action => {}
        Commands::BeforeBuild => {
            config.run_before_build = true;
            config.collect_coverage = false;
            config.run_after_build = false;
        }
        Commands::Collect {
            patterns,
            prefix,
            output_dir: dir,
        } => {
            config.run_before_build = false;
            config.collect_coverage = true;
            config.run_after_build = false;
            if !patterns.is_empty() {
                config.coverage_file_patterns = patterns;
            }
            if prefix.is_some() {
                config.prefix = prefix;
            }
            output_dir = dir;
        }
        Commands::AfterBuild { exit_code } => {
            config.run_before_build = false;
            config.collect_coverage = false;
            config.run_after_build = true;
            config.last_command_exit_code = Some(exit_code);
        }
    }

    if cli.executable.is_some() {
        config.executable = cli.executable;
    }
    if cli.working_directory.is_some() {
        config.working_directory = cli.working_directory;
    }
    config.debug = config.debug || cli.debug || runner_debug();

    let options = config.into_options()?;
    let repository_root = repository_root(options.working_directory.as_deref())?;

    execute(&options, &repository_root, output_dir, cli.verify_download)
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None if Path::new(CONFIG_FILE).exists() => Config::load(Path::new(CONFIG_FILE)),
        None => Ok(Config::default()),
    }
}

/// Debug logging switched on for the whole Actions run
fn runner_debug() -> bool {
    env::var("RUNNER_DEBUG").map(|v| v == "1").unwrap_or(false)
}

fn repository_root(working_directory: Option<&Path>) -> Result<PathBuf> {
    let root = match working_directory {
        Some(dir) => dir.to_path_buf(),
        None => match env::var("GITHUB_WORKSPACE") {
            Ok(workspace) if !workspace.is_empty() => PathBuf::from(workspace),
            _ => env::current_dir().context("Could not determine current directory")?,
        },
    };

    std::fs::canonicalize(&root)
        .with_context(|| format!("Could not find working directory: {}", root.display()))
}

#[tokio::main]
async fn execute(
    options: &Options,
    repository_root: &Path,
    output_dir: Option<PathBuf>,
    verify_download: bool,
) -> Result<()> {
    let signals = Signals::capture()?;
    let environment = resolve(&signals);
    console::debug(
        options.debug,
        &format!(
            "Resolved branch «{}» and commit «{}»",
            environment.git_branch, environment.git_commit_sha
        ),
    );

    let (executable, downloaded) = match options.executable {
        // Bare names are looked up on PATH; anything else must outlive the cwd change
        Some(ref path) if path.components().count() > 1 => {
            let path = std::fs::canonicalize(path)
                .with_context(|| format!("Could not find reporter executable: {}", path.display()))?;
            (path, false)
        }
        Some(ref path) => (path.clone(), false),
        None => {
            let download = DownloadOptions {
                verify_checksum: verify_download,
                debug: options.debug,
                ..DownloadOptions::default()
            };
            (download_executable(&download).await?, true)
        }
    };

    let reporter = CodeClimate::new(
        &executable,
        repository_root,
        ProcessExecutor,
        GlobMatcher::new(repository_root),
    )
    .with_debug(options.debug)
    .with_environment(environment);

    if options.run_before_build {
        console::info(&format!("{}", "Running before-build".bold()));
        reporter.run_before_build().await?;
    }

    if options.collect_coverage {
        let output_dir = output_folder(output_dir.as_deref(), &executable, downloaded);
        tokio::fs::create_dir_all(&output_dir)
            .await
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;
        let output_dir = std::fs::canonicalize(&output_dir)
            .with_context(|| format!("Could not resolve {}", output_dir.display()))?;

        console::info(&format!(
            "{} {} pattern(s)",
            "Collecting coverage from".bold(),
            options.coverage_file_patterns.len()
        ));
        reporter
            .collect_coverage(
                &options.coverage_file_patterns,
                options.prefix.as_deref(),
                &output_dir,
            )
            .await?;
    }

    if options.run_after_build {
        console::info(&format!("{}", "Running after-build".bold()));
        reporter
            .run_after_build(options.last_command_exit_code)
            .await?;
    }

    Ok(())
}
