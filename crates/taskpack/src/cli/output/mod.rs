//! Terminal output for stage results

mod reporter;

pub use reporter::ConsoleReporter;

use std::fmt::Display;
use std::path::Path;

use console::{style, StyledObject};

pub const DONE: &str = "✓";
pub const FAILED: &str = "✗";
pub const STARTED: &str = "→";

/// Closing line of a command that completed
pub fn done(message: &str) {
    println!("{} {}", style(DONE).green().bold(), message);
}

/// Print an error message to stderr
pub fn error(message: &str) {
    eprintln!("{} {}", style(FAILED).red().bold(), message);
}

pub fn warning(message: &str) {
    println!("{} {}", style("!").yellow().bold(), message);
}

/// `n` followed by `noun`, with a plural `s` unless `n` is one
pub fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", n, noun)
    }
}

pub fn task(name: &str) -> StyledObject<&str> {
    style(name).cyan()
}

pub fn path(path: &Path) -> StyledObject<std::path::Display<'_>> {
    style(path.display()).blue()
}

pub fn version<T: Display>(version: T) -> StyledObject<T> {
    style(version).green().bold()
}

/// Indented task line with a detail such as its output directory
pub fn task_line(name: &str, detail: impl Display) -> String {
    format!("  {} {}", task(name), detail)
}

/// Indented `label value` line for produced artifacts
pub fn field(label: &str, value: impl Display) -> String {
    format!("  {} {}", style(format!("{:<8}", label)).dim(), value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use console::strip_ansi_codes;

    #[test]
    fn test_count_pluralizes() {
        assert_eq!(count(0, "task"), "0 tasks");
        assert_eq!(count(1, "extension"), "1 extension");
        assert_eq!(count(3, "test spec"), "3 test specs");
    }

    #[test]
    fn test_field_aligns_values() {
        let nuspec = field("nuspec", path(Path::new("_package/pack-source/Tasks.nuspec")));
        let output = field("output", path(Path::new("_package/package")));
        assert_eq!(strip_ansi_codes(&nuspec), "  nuspec   _package/pack-source/Tasks.nuspec");
        assert_eq!(strip_ansi_codes(&output), "  output   _package/package");
    }

    #[test]
    fn test_task_line() {
        let line = task_line("Alpha", version(8));
        assert_eq!(strip_ansi_codes(&line), "  Alpha 8");
    }
}
