//! Variable interpolation
//!
//! Options are substituted into a task as `${name}` occurrences, one variable
//! per pass. A pass serializes the task to a YAML value tree, rewrites every
//! string scalar, and decodes the tree back, so each substitution is followed
//! by a reparse. `$$` escapes a literal `$` and is collapsed only by the
//! final pass, after unresolved `${name}` occurrences have been rejected.

use crate::config::{parse, Task};
use crate::error::{ConfigError, ConfigResult, Result};
use regex::{NoExpand, Regex};
use serde_yaml::Value;
use std::sync::OnceLock;

fn any_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\$|\$\{([^{}]+)\}").unwrap())
}

fn escape_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\$").unwrap())
}

fn substitution_pattern(name: &str) -> Regex {
    Regex::new(&format!(r"\$\$|\$\{{{}\}}", regex::escape(name))).unwrap()
}

fn replace_with(pattern: &Regex, text: &str, value: &str) -> String {
    pattern
        .replace_all(text, |caps: &regex::Captures| {
            let matched = caps.get(0).map_or("", |m| m.as_str());
            if matched == "$$" {
                "$$".to_string()
            } else {
                value.to_string()
            }
        })
        .into_owned()
}

/// Replace `${name}` with `value`, leaving `$$` pairs untouched so that
/// `$${name}` survives as an escaped literal.
pub fn substitute(text: &str, name: &str, value: &str) -> String {
    replace_with(&substitution_pattern(name), text, value)
}

/// Variable names referenced by `${name}` occurrences in a string.
pub fn references(text: &str) -> Vec<String> {
    any_var_pattern()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Collapse `$$` escapes to a literal `$`.
pub fn escape(text: &str) -> String {
    escape_pattern().replace_all(text, NoExpand("$")).into_owned()
}

/// Reject any remaining `${name}`, then collapse escapes.
pub fn finalize(text: &str) -> ConfigResult<String> {
    for caps in any_var_pattern().captures_iter(text) {
        if let Some(name) = caps.get(1) {
            return Err(ConfigError::UndefinedVariable {
                name: name.as_str().to_string(),
            });
        }
    }
    Ok(escape(text))
}

/// Substitute one variable across every textual field of a task, reparsing
/// the result. Computed fields survive the round trip.
pub fn apply_to_task(task: &Task, name: &str, value: &str) -> Result<Task> {
    let pattern = substitution_pattern(name);
    let mut node = serde_yaml::to_value(task)?;
    substitute_node(&mut node, &pattern, value);

    let mut rewritten: Task = serde_yaml::from_value(node)?;
    parse::restore_task_names(&mut rewritten, &task.name, task.vars.clone());
    Ok(rewritten)
}

fn substitute_node(node: &mut Value, pattern: &Regex, value: &str) {
    match node {
        Value::String(s) => *s = replace_with(pattern, s, value),
        Value::Sequence(seq) => {
            for item in seq.iter_mut() {
                substitute_node(item, pattern, value);
            }
        }
        Value::Mapping(map) => {
            let entries = std::mem::take(map);
            for (mut key, mut val) in entries {
                substitute_node(&mut key, pattern, value);
                substitute_node(&mut val, pattern, value);
                map.insert(key, val);
            }
        }
        Value::Tagged(tagged) => substitute_node(&mut tagged.value, pattern, value),
        _ => {}
    }
}

/// Final interpolation pass over the run and finally lists: every remaining
/// `${name}` is an undefined-variable error, and `$$` escapes collapse.
pub fn finalize_run_items(task: &mut Task) -> Result<()> {
    for item in task.run.iter_mut().chain(task.finally.iter_mut()) {
        let mut node = serde_yaml::to_value(&*item)?;
        finalize_node(&mut node)?;
        *item = serde_yaml::from_value(node)?;
    }
    Ok(())
}

fn finalize_node(node: &mut Value) -> ConfigResult<()> {
    match node {
        Value::String(s) => *s = finalize(s)?,
        Value::Sequence(seq) => {
            for item in seq.iter_mut() {
                finalize_node(item)?;
            }
        }
        Value::Mapping(map) => {
            let entries = std::mem::take(map);
            for (mut key, mut val) in entries {
                finalize_node(&mut key)?;
                finalize_node(&mut val)?;
                map.insert(key, val);
            }
        }
        Value::Tagged(tagged) => finalize_node(&mut tagged.value)?,
        _ => {}
    }
    Ok(())
}
