//! Polymorphic YAML shape decoding
//!
//! Most nodes in a whisk.yml accept more than one shape: a run item is a bare
//! command string or a full mapping, an option default is a scalar or a list
//! of guarded candidates, and so on. Each node declares an ordered list of
//! shape functions over a raw [`serde_yaml::Value`]. A shape reports a
//! mismatch when the value is the wrong kind (the next shape is tried) and a
//! hard error when the kind matches but the content is invalid. If no shape
//! matches, the error names every shape that was attempted.

use indexmap::IndexMap;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

use crate::config::types::{Command, DefaultValue, RunItem, SubTaskRef, When};

/// Outcome of attempting a single shape.
enum Attempt<T> {
    Match(T),
    Mismatch,
}

type ShapeFn<T> = fn(&Value) -> Result<Attempt<T>, String>;

/// Try shapes in order, committing to the first that matches.
fn first_match<T>(value: &Value, shapes: &[(&'static str, ShapeFn<T>)]) -> Result<T, String> {
    for (_, shape) in shapes {
        match shape(value)? {
            Attempt::Match(decoded) => return Ok(decoded),
            Attempt::Mismatch => continue,
        }
    }
    let names: Vec<&str> = shapes.iter().map(|(name, _)| *name).collect();
    Err(format!("expected one of: {}", names.join(", ")))
}

/// Decode a node that is either a single element or a sequence of elements.
fn list_of<T>(
    value: &Value,
    what: &str,
    shapes: &[(&'static str, ShapeFn<T>)],
) -> Result<Vec<T>, String> {
    let decoded = match value {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(seq) => seq.iter().map(|item| first_match(item, shapes)).collect(),
        other => first_match(other, shapes).map(|item| vec![item]),
    };
    decoded.map_err(|err| format!("{what}: {err}"))
}

/// The string form of a YAML scalar, if the value is one.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn run_item_string(value: &Value) -> Result<Attempt<RunItem>, String> {
    match value {
        Value::String(exec) => Ok(Attempt::Match(RunItem::from_exec(exec.clone()))),
        _ => Ok(Attempt::Mismatch),
    }
}

fn run_item_mapping(value: &Value) -> Result<Attempt<RunItem>, String> {
    if !value.is_mapping() {
        return Ok(Attempt::Mismatch);
    }
    let item: RunItem = serde_yaml::from_value(value.clone()).map_err(|e| e.to_string())?;
    item.check_actions()?;
    Ok(Attempt::Match(item))
}

/// Deserialize `run`/`finally`: a command string, a run-item mapping, or a
/// sequence of either.
pub(crate) fn run_list<'de, D>(deserializer: D) -> Result<Vec<RunItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    list_of(
        &value,
        "run item",
        &[
            ("command string", run_item_string as ShapeFn<RunItem>),
            ("run item mapping", run_item_mapping),
        ],
    )
    .map_err(D::Error::custom)
}

fn command_string(value: &Value) -> Result<Attempt<Command>, String> {
    match value {
        Value::String(exec) => Ok(Attempt::Match(Command::from_exec(exec.clone()))),
        _ => Ok(Attempt::Mismatch),
    }
}

fn command_mapping(value: &Value) -> Result<Attempt<Command>, String> {
    if !value.is_mapping() {
        return Ok(Attempt::Mismatch);
    }
    let cmd: Command = serde_yaml::from_value(value.clone()).map_err(|e| e.to_string())?;
    if cmd.exec.is_empty() {
        return Err("command must define exec".into());
    }
    Ok(Attempt::Match(cmd))
}

/// Deserialize a command list: a string, a mapping, or a sequence of either.
pub(crate) fn command_list<'de, D>(deserializer: D) -> Result<Vec<Command>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    list_of(
        &value,
        "command",
        &[
            ("command string", command_string as ShapeFn<Command>),
            ("command mapping", command_mapping),
        ],
    )
    .map_err(D::Error::custom)
}

fn subtask_string(value: &Value) -> Result<Attempt<SubTaskRef>, String> {
    match value {
        Value::String(name) => Ok(Attempt::Match(SubTaskRef {
            name: name.clone(),
            ..Default::default()
        })),
        _ => Ok(Attempt::Mismatch),
    }
}

fn subtask_mapping(value: &Value) -> Result<Attempt<SubTaskRef>, String> {
    if !value.is_mapping() {
        return Ok(Attempt::Mismatch);
    }
    let sub: SubTaskRef = serde_yaml::from_value(value.clone()).map_err(|e| e.to_string())?;
    if sub.name.is_empty() {
        return Err("sub-task must define name".into());
    }
    Ok(Attempt::Match(sub))
}

/// Deserialize sub-task references: a task name, a mapping, or a sequence of
/// either.
pub(crate) fn subtask_list<'de, D>(deserializer: D) -> Result<Vec<SubTaskRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    list_of(
        &value,
        "sub-task",
        &[
            ("task name", subtask_string as ShapeFn<SubTaskRef>),
            ("sub-task mapping", subtask_mapping),
        ],
    )
    .map_err(D::Error::custom)
}

fn when_string(value: &Value) -> Result<Attempt<When>, String> {
    match value {
        Value::String(command) => Ok(Attempt::Match(When::from_command(command.clone()))),
        _ => Ok(Attempt::Mismatch),
    }
}

fn when_mapping(value: &Value) -> Result<Attempt<When>, String> {
    if !value.is_mapping() {
        return Ok(Attempt::Mismatch);
    }
    let when: When = serde_yaml::from_value(value.clone()).map_err(|e| e.to_string())?;
    Ok(Attempt::Match(when))
}

/// Deserialize a when list: a command string, a clause mapping, or a sequence
/// of either. A bare string guards on that command succeeding.
pub(crate) fn when_list<'de, D>(deserializer: D) -> Result<Vec<When>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    list_of(
        &value,
        "when clause",
        &[
            ("command string", when_string as ShapeFn<When>),
            ("when mapping", when_mapping),
        ],
    )
    .map_err(D::Error::custom)
}

fn default_scalar(value: &Value) -> Result<Attempt<DefaultValue>, String> {
    match scalar_string(value) {
        Some(literal) => Ok(Attempt::Match(DefaultValue {
            value: Some(literal),
            ..Default::default()
        })),
        None => Ok(Attempt::Mismatch),
    }
}

fn default_mapping(value: &Value) -> Result<Attempt<DefaultValue>, String> {
    if !value.is_mapping() {
        return Ok(Attempt::Mismatch);
    }
    let candidate: DefaultValue =
        serde_yaml::from_value(value.clone()).map_err(|e| e.to_string())?;
    if candidate.value.is_some() && candidate.command.is_some() {
        return Err("default may not define both value and command".into());
    }
    Ok(Attempt::Match(candidate))
}

/// Deserialize an option's `default`: a literal scalar, a candidate mapping,
/// or a sequence of either.
pub(crate) fn default_values<'de, D>(deserializer: D) -> Result<Vec<DefaultValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    list_of(
        &value,
        "default",
        &[
            ("literal value", default_scalar as ShapeFn<DefaultValue>),
            ("default mapping", default_mapping),
        ],
    )
    .map_err(D::Error::custom)
}

fn string_scalar(value: &Value) -> Result<Attempt<String>, String> {
    match scalar_string(value) {
        Some(s) => Ok(Attempt::Match(s)),
        None => Ok(Attempt::Mismatch),
    }
}

/// Deserialize a scalar-or-sequence node into a list of strings.
pub(crate) fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    list_of(&value, "value", &[("string", string_scalar as ShapeFn<String>)])
        .map_err(D::Error::custom)
}

/// Deserialize `equal`/`not-equal`: a mapping of name to a scalar or a list
/// of scalars.
pub(crate) fn value_map<'de, D>(deserializer: D) -> Result<IndexMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let mapping = match value {
        Value::Mapping(m) => m,
        _ => return Err(D::Error::custom("expected a mapping of name to value(s)")),
    };

    let mut out = IndexMap::new();
    for (key, val) in mapping {
        let name = scalar_string(&key)
            .ok_or_else(|| D::Error::custom("mapping keys must be strings"))?;
        let values =
            list_of(&val, &name, &[("string", string_scalar as ShapeFn<String>)])
                .map_err(D::Error::custom)?;
        out.insert(name, values);
    }
    Ok(out)
}

fn nullable_scalar(value: &Value) -> Result<Attempt<Option<String>>, String> {
    match value {
        Value::Null => Ok(Attempt::Match(None)),
        other => match scalar_string(other) {
            Some(s) => Ok(Attempt::Match(Some(s))),
            None => Ok(Attempt::Mismatch),
        },
    }
}

/// Deserialize a when clause's `environment`: a mapping of variable to a
/// nullable scalar or a list of them. Null entries match an unset variable.
pub(crate) fn env_map<'de, D>(
    deserializer: D,
) -> Result<IndexMap<String, Vec<Option<String>>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let mapping = match value {
        Value::Mapping(m) => m,
        _ => return Err(D::Error::custom("expected a mapping of variable to value(s)")),
    };

    let mut out = IndexMap::new();
    for (key, val) in mapping {
        let name = scalar_string(&key)
            .ok_or_else(|| D::Error::custom("mapping keys must be strings"))?;
        let values = match &val {
            // A bare null means "matches unset", not "no values".
            Value::Null => vec![None],
            other => list_of(
                other,
                &name,
                &[("string or null", nullable_scalar as ShapeFn<Option<String>>)],
            )
            .map_err(D::Error::custom)?,
        };
        out.insert(name, values);
    }
    Ok(out)
}
