//! Option and argument resolution
//!
//! For each invocation the resolver binds positional args, orders the task's
//! options by their dependencies, and computes one concrete value per option:
//! an explicitly passed flag wins, then the environment, then the first
//! default candidate whose guard passes, then the required check, then the
//! type's zero value. After each value lands, `${name}` is substituted across
//! the whole task so later options and run items observe it.

use crate::config::{OptionType, Task, TaskOption};
use crate::error::{ConfigError, ConfigResult, Result};
use crate::runner::{command, interpolate, when, Context};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::env;

/// Resolve a task's args and options into `task.vars`, interpolating as each
/// value is computed and finalizing the run items.
pub fn resolve(
    task: &mut Task,
    passed_args: &[String],
    passed_opts: &IndexMap<String, String>,
    ctx: &Context,
) -> Result<()> {
    if passed_args.len() != task.args.len() {
        return Err(ConfigError::WrongArgCount {
            task: task.name.clone(),
            expected: task.args.len(),
            actual: passed_args.len(),
        }
        .into());
    }

    for name in passed_opts.keys() {
        if !task.options.contains_key(name) {
            return Err(ConfigError::UnknownOption {
                task: task.name.clone(),
                name: name.clone(),
            }
            .into());
        }
    }

    // Positional args bind first, in declaration order.
    let bindings: Vec<(String, OptionType, Vec<String>)> = task
        .args
        .values()
        .map(|arg| (arg.name.clone(), arg.opt_type, arg.values.clone()))
        .collect();
    for ((name, opt_type, values), raw) in bindings.iter().zip(passed_args) {
        let value = coerce(name, *opt_type, values, raw)?;
        task.vars.insert(name.clone(), value.clone());
        *task = interpolate::apply_to_task(task, name, &value)?;
    }

    for name in resolution_order(task)? {
        let Some(opt) = task.options.get(&name).cloned() else {
            continue;
        };
        let value = resolve_option(&opt, passed_opts, task, ctx)?;
        let substituted = interpolation_value(&opt, &value);
        task.vars.insert(name.clone(), value);
        *task = interpolate::apply_to_task(task, &name, &substituted)?;
    }

    interpolate::finalize_run_items(task)?;
    Ok(())
}

/// Compute one option's value by the first rule that applies.
fn resolve_option(
    opt: &TaskOption,
    passed: &IndexMap<String, String>,
    task: &Task,
    ctx: &Context,
) -> Result<String> {
    if let Some(raw) = passed.get(&opt.name) {
        return Ok(coerce(&opt.name, opt.opt_type, &opt.values, raw)?);
    }

    if let Some(env_name) = &opt.environment {
        if let Ok(raw) = env::var(env_name) {
            return Ok(coerce(&opt.name, opt.opt_type, &opt.values, &raw)?);
        }
    }

    for candidate in &opt.default {
        if !when::validate_list(&candidate.when, &task.vars, ctx)? {
            continue;
        }

        let raw = if let Some(value) = &candidate.value {
            value.clone()
        } else if let Some(cmd) = &candidate.command {
            let exec = interpolate::finalize(cmd)?;
            ctx.logger
                .debug(&format!("option {:?}: running {exec:?}", opt.name));
            command::capture_command(&exec, ctx)?
        } else {
            String::new()
        };

        return Ok(coerce(&opt.name, opt.opt_type, &opt.values, &raw)?);
    }

    if opt.required {
        return Err(ConfigError::MissingRequired {
            option: opt.name.clone(),
        }
        .into());
    }

    Ok(opt.opt_type.zero_value().to_string())
}

/// What `${name}` expands to, given the resolved value.
fn interpolation_value(opt: &TaskOption, resolved: &str) -> String {
    match &opt.rewrite {
        Some(template) if opt.is_bool() => {
            if resolved == "true" {
                template.clone()
            } else {
                String::new()
            }
        }
        Some(template) => interpolate::substitute(template, "value", resolved),
        None => resolved.to_string(),
    }
}

/// Validate a raw value against an option's type and allow-list, returning
/// the canonical form.
fn coerce(
    name: &str,
    opt_type: OptionType,
    allowed: &[String],
    raw: &str,
) -> ConfigResult<String> {
    let value = match opt_type {
        OptionType::String => raw.to_string(),
        OptionType::Bool => match raw.to_lowercase().as_str() {
            "true" => "true".to_string(),
            "false" => "false".to_string(),
            _ => {
                return Err(ConfigError::InvalidValue {
                    name: name.to_string(),
                    value: raw.to_string(),
                    reason: "expected true or false".into(),
                })
            }
        },
        OptionType::Int => {
            raw.parse::<i64>().map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                value: raw.to_string(),
                reason: "expected an integer".into(),
            })?;
            raw.to_string()
        }
        OptionType::Float => {
            raw.parse::<f64>().map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                value: raw.to_string(),
                reason: "expected a number".into(),
            })?;
            raw.to_string()
        }
    };

    if !allowed.is_empty() && !allowed.iter().any(|candidate| candidate == &value) {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value,
            reason: format!("must be one of: {}", allowed.join(", ")),
        });
    }

    Ok(value)
}

/// Order options so that every option resolves after the options it
/// references. A cycle is a configuration error.
fn resolution_order(task: &Task) -> ConfigResult<Vec<String>> {
    let names: HashSet<&str> = task.options.keys().map(String::as_str).collect();

    let mut graph: HashMap<&str, Vec<String>> = HashMap::new();
    for (name, opt) in &task.options {
        let deps: Vec<String> = option_dependencies(opt)
            .into_iter()
            .filter(|dep| names.contains(dep.as_str()))
            .collect();
        graph.insert(name, deps);
    }

    let mut order = Vec::new();
    let mut done = HashSet::new();
    let mut path = Vec::new();
    for name in task.options.keys() {
        visit(name, &graph, &mut done, &mut path, &mut order)?;
    }
    Ok(order)
}

fn visit(
    name: &str,
    graph: &HashMap<&str, Vec<String>>,
    done: &mut HashSet<String>,
    path: &mut Vec<String>,
    order: &mut Vec<String>,
) -> ConfigResult<()> {
    if done.contains(name) {
        return Ok(());
    }
    if path.iter().any(|seen| seen == name) {
        path.push(name.to_string());
        return Err(ConfigError::OptionCycle {
            chain: path.join(" -> "),
        });
    }

    path.push(name.to_string());
    if let Some(deps) = graph.get(name) {
        for dep in deps {
            visit(dep, graph, done, path, order)?;
        }
    }
    path.pop();

    done.insert(name.to_string());
    order.push(name.to_string());
    Ok(())
}

/// Names an option's value may depend on: guard comparisons plus `${name}`
/// mentions in candidate values, candidate commands, guard commands, and the
/// rewrite template.
fn option_dependencies(opt: &TaskOption) -> Vec<String> {
    let mut deps = Vec::new();

    for candidate in &opt.default {
        if let Some(value) = &candidate.value {
            deps.extend(interpolate::references(value));
        }
        if let Some(cmd) = &candidate.command {
            deps.extend(interpolate::references(cmd));
        }
        for clause in &candidate.when {
            deps.extend(clause.dependencies().cloned());
            for cmd in &clause.command {
                deps.extend(interpolate::references(cmd));
            }
        }
    }

    if let Some(template) = &opt.rewrite {
        deps.extend(
            interpolate::references(template)
                .into_iter()
                .filter(|name| name != "value"),
        );
    }

    deps
}
