//! When clause evaluation
//!
//! Predicates inside one clause are checked cheapest-first: variable
//! comparisons, then the environment, the operating system, path existence,
//! and finally commands, which spawn a process. The first failing predicate
//! short-circuits. Within one predicate, matching any listed value passes.

use crate::config::When;
use crate::error::Result;
use crate::runner::{command, interpolate, Context};
use indexmap::IndexMap;
use std::env;

/// Evaluate a list of when clauses; all must pass.
pub fn validate_list(
    when_list: &[When],
    vars: &IndexMap<String, String>,
    ctx: &Context,
) -> Result<bool> {
    for when in when_list {
        if !validate(when, vars, ctx)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Evaluate a single when clause.
pub fn validate(when: &When, vars: &IndexMap<String, String>, ctx: &Context) -> Result<bool> {
    for (name, allowed) in &when.equal {
        match vars.get(name) {
            Some(actual) if allowed.contains(actual) => {}
            _ => return Ok(false),
        }
    }

    for (name, banned) in &when.not_equal {
        match vars.get(name) {
            Some(actual) if !banned.contains(actual) => {}
            _ => return Ok(false),
        }
    }

    for (var, accepted) in &when.environment {
        let actual = env::var(var).ok();
        let matches = accepted.iter().any(|want| match (want, &actual) {
            (None, None) => true,
            (Some(want), Some(actual)) => want == actual,
            _ => false,
        });
        if !matches {
            return Ok(false);
        }
    }

    if !when.os.is_empty() && !when.os.iter().any(|name| os_matches(name)) {
        return Ok(false);
    }

    for path in &when.exists {
        if !ctx.dir().join(path).exists() {
            return Ok(false);
        }
    }

    for path in &when.not_exists {
        if ctx.dir().join(path).exists() {
            return Ok(false);
        }
    }

    for cmd in &when.command {
        let exec = interpolate::finalize(cmd)?;
        if !command::check_command(&exec, ctx)? {
            return Ok(false);
        }
    }

    Ok(true)
}

fn os_matches(name: &str) -> bool {
    let name = name.to_lowercase();
    // "darwin" is a common spelling for macOS in task configurations.
    if name == "darwin" {
        return env::consts::OS == "macos";
    }
    name == env::consts::OS
}
