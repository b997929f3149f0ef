//! Terminal output
//!
//! All progress output goes to stderr so command stdout stays clean. Colour
//! is handled by `colored`, which disables itself for non-terminals and when
//! `NO_COLOR` is set.

use colored::Colorize;
use indexmap::IndexMap;
use std::fmt::Display;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent,
    Quiet,
    #[default]
    Normal,
    Verbose,
}

/// Logger that reports task progress as execution proceeds
#[derive(Debug, Clone, Default)]
pub struct Logger {
    pub verbosity: Verbosity,
}

impl Logger {
    pub fn new(verbosity: Verbosity) -> Self {
        Logger { verbosity }
    }

    /// Print a task starting.
    pub fn task(&self, name: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{} {}", name.bold(), "...".dimmed());
        }
    }

    /// Print a task being skipped.
    pub fn task_skipped(&self, name: &str, reason: &str) {
        if self.verbosity >= Verbosity::Normal {
            let note = format!("skipped: {reason}");
            eprintln!("{} {}", name.bold(), note.as_str().yellow());
        }
    }

    /// Print a task entering its finally list.
    pub fn task_finally(&self, name: &str) {
        if self.verbosity >= Verbosity::Verbose {
            eprintln!("{} {}", name.bold(), "finally".dimmed());
        }
    }

    /// Print a task finishing.
    pub fn task_completed(&self, name: &str) {
        if self.verbosity >= Verbosity::Verbose {
            eprintln!("{} {}", name.bold(), "done".dimmed());
        }
    }

    /// Echo a command about to run, with the task breadcrumb when nested.
    pub fn command(&self, print: &str, task_names: &[&str]) {
        self.command_with_parenthetical(print, None, task_names);
    }

    /// Echo a finally-list command.
    pub fn command_finally(&self, print: &str, task_names: &[&str]) {
        self.command_with_parenthetical(print, Some("finally"), task_names);
    }

    fn command_with_parenthetical(
        &self,
        print: &str,
        parenthetical: Option<&str>,
        task_names: &[&str],
    ) {
        if self.verbosity < Verbosity::Normal {
            return;
        }

        let mut label = if task_names.len() > 1 {
            task_names.join(" > ")
        } else {
            String::new()
        };
        if let Some(extra) = parenthetical {
            if label.is_empty() {
                label = extra.to_string();
            } else {
                label = format!("{label} {extra}");
            }
        }

        if label.is_empty() {
            eprintln!("{} {print}", "$".green().bold());
        } else {
            let prefix = format!("({label}) $");
            eprintln!("{} {print}", prefix.as_str().green().bold());
        }
    }

    /// Report a failed command.
    pub fn command_error(&self, err: &dyn Display) {
        if self.verbosity >= Verbosity::Quiet {
            eprintln!("{} {err}", "error:".red().bold());
        }
    }

    /// Report environment mutations.
    pub fn environment(&self, mutations: &IndexMap<String, Option<String>>) {
        if self.verbosity < Verbosity::Verbose {
            return;
        }
        for (key, value) in mutations {
            match value {
                Some(v) => self.debug(&format!("set {key}={v}")),
                None => self.debug(&format!("unset {key}")),
            }
        }
    }

    /// Print a debug message.
    pub fn debug(&self, message: &str) {
        if self.verbosity >= Verbosity::Verbose {
            let line = format!("debug: {message}");
            eprintln!("{}", line.as_str().dimmed());
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        if self.verbosity >= Verbosity::Quiet {
            eprintln!("{} {message}", "error:".red().bold());
        }
    }
}
