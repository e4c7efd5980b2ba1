//! CI-visible console output
//!
//! Inside GitHub Actions messages become workflow commands so they show up
//! as annotations; anywhere else they are printed as coloured lines.

use colored::Colorize;
use std::env;

fn is_github_actions() -> bool {
    env::var("GITHUB_ACTIONS").map(|v| v == "true").unwrap_or(false)
}

/// Workflow commands end at the first newline, so it has to be escaped
fn escape_command_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

pub fn warning(message: &str) {
    if is_github_actions() {
        println!("::warning::{}", escape_command_data(message));
    } else {
        eprintln!("{} {}", "⚠".yellow(), message.yellow());
    }
}

pub fn error(message: &str) {
    if is_github_actions() {
        println!("::error::{}", escape_command_data(message));
    } else {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }
}

/// Debug lines are always handed to the Actions runner, which filters them
/// itself; locally they only print in debug mode.
pub fn debug(debug_mode: bool, message: &str) {
    if is_github_actions() {
        println!("::debug::{}", escape_command_data(message));
    } else if debug_mode {
        println!("{} {}", "·".dimmed(), message.dimmed());
    }
}

pub fn info(message: &str) {
    println!("{} {}", "→".blue(), message);
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_command_data() {
        assert_eq!(escape_command_data("50% done\nnext"), "50%25 done%0Anext");
        assert_eq!(escape_command_data("plain"), "plain");
    }
}
