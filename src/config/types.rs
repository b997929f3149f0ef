//! Core configuration types
//!
//! This module defines the data structures that represent a whisk.yml
//! configuration file. Every type serializes back to YAML that parses to an
//! equivalent value; the interpolator depends on that symmetry to rewrite a
//! task by round-tripping it through `serde_yaml::Value`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::decode;

fn is_false(b: &bool) -> bool {
    !*b
}

/// Top-level configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Application name (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Application usage description (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,

    /// Interpreter the command text is handed to (default: ["sh", "-c"])
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<Vec<String>>,

    /// Options shared by every task
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub options: IndexMap<String, TaskOption>,

    /// Tasks defined in the configuration
    pub tasks: IndexMap<String, Task>,
}

/// A task definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Task {
    /// Usage description for help text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,

    /// Longer description for help text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Private tasks can only be run as sub-tasks, not from the CLI
    #[serde(skip_serializing_if = "is_false")]
    pub private: bool,

    /// Quiet tasks suppress command echo for themselves and their sub-tasks
    #[serde(skip_serializing_if = "is_false")]
    pub quiet: bool,

    /// Positional arguments, bound in declaration order
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub args: IndexMap<String, Arg>,

    /// Named options (flags)
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub options: IndexMap<String, TaskOption>,

    /// Run items to execute
    #[serde(
        deserialize_with = "decode::run_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub run: Vec<RunItem>,

    /// Run items that execute after `run`, even on error
    #[serde(
        deserialize_with = "decode::run_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub finally: Vec<RunItem>,

    /// Source globs for the up-to-date check
    #[serde(
        deserialize_with = "decode::string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub source: Vec<String>,

    /// Target globs for the up-to-date check
    #[serde(
        deserialize_with = "decode::string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub target: Vec<String>,

    /// Replace this task with the definition in another file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,

    /// Task name, injected from the mapping key after decode
    #[serde(skip)]
    pub name: String,

    /// Resolved variable values, materialized per invocation
    #[serde(skip)]
    pub vars: IndexMap<String, String>,
}

impl Task {
    /// All run items referenced, including `run` and `finally`.
    pub fn all_run_items(&self) -> impl Iterator<Item = &RunItem> {
        self.run.iter().chain(self.finally.iter())
    }

    /// Copy mapping keys into the `name` fields of args and options.
    pub fn assign_member_names(&mut self) {
        for (name, arg) in self.args.iter_mut() {
            arg.name = name.clone();
        }
        for (name, opt) in self.options.iter_mut() {
            opt.name = name.clone();
        }
    }

    /// Whether any field other than `include` is set.
    pub fn has_fields_besides_include(&self) -> bool {
        self.usage.is_some()
            || self.description.is_some()
            || self.private
            || self.quiet
            || !self.args.is_empty()
            || !self.options.is_empty()
            || !self.run.is_empty()
            || !self.finally.is_empty()
            || !self.source.is_empty()
            || !self.target.is_empty()
    }
}

/// One step in a task's execution list.
///
/// Exactly one of `command`, `task`, or `set-environment` is populated; the
/// decoder rejects items mixing them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RunItem {
    /// Guard clauses; all must pass or the item is skipped
    #[serde(
        deserialize_with = "decode::when_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub when: Vec<When>,

    /// Commands to execute
    #[serde(
        deserialize_with = "decode::command_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub command: Vec<Command>,

    /// Sub-tasks to execute
    #[serde(
        deserialize_with = "decode::subtask_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub task: Vec<SubTaskRef>,

    /// Environment mutations; a null value unsets the variable
    #[serde(
        rename = "set-environment",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub set_environment: IndexMap<String, Option<String>>,
}

impl RunItem {
    /// A run item holding a single shell command.
    pub fn from_exec(exec: String) -> Self {
        RunItem {
            command: vec![Command::from_exec(exec)],
            ..Default::default()
        }
    }

    pub(crate) fn check_actions(&self) -> std::result::Result<(), String> {
        let actions = usize::from(!self.command.is_empty())
            + usize::from(!self.task.is_empty())
            + usize::from(!self.set_environment.is_empty());
        match actions {
            0 => Err("run item must define one of command, task, set-environment".into()),
            1 => Ok(()),
            _ => Err(
                "run item may only define one of command, task, set-environment".into(),
            ),
        }
    }
}

/// A command passed to the interpreter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Command {
    /// The text handed to the interpreter
    pub exec: String,

    /// What to print when running (defaults to exec)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print: Option<String>,

    /// Working directory override, relative to the config directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    /// Suppress the command echo
    #[serde(skip_serializing_if = "is_false")]
    pub quiet: bool,
}

impl Command {
    pub fn from_exec(exec: String) -> Self {
        Command {
            exec,
            ..Default::default()
        }
    }

    /// The display form of this command.
    pub fn print_text(&self) -> &str {
        self.print.as_deref().unwrap_or(&self.exec)
    }
}

/// A reference to another task to run as a sub-task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SubTaskRef {
    /// Name of the task to run
    pub name: String,

    /// Positional arguments to pass
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Option values to pass, as if set on the command line
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub options: IndexMap<String, String>,
}

/// A conditional guard
///
/// Predicates within one clause are combined conjunctively and evaluated
/// cheapest-first; the value list attached to a single predicate passes when
/// any entry matches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct When {
    /// Option values that must match
    #[serde(
        deserialize_with = "decode::value_map",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub equal: IndexMap<String, Vec<String>>,

    /// Option values that must not match
    #[serde(
        rename = "not-equal",
        deserialize_with = "decode::value_map",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub not_equal: IndexMap<String, Vec<String>>,

    /// Environment variables that must hold one of the values; null matches unset
    #[serde(
        deserialize_with = "decode::env_map",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub environment: IndexMap<String, Vec<Option<String>>>,

    /// Operating systems on which the clause passes
    #[serde(
        deserialize_with = "decode::string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub os: Vec<String>,

    /// Paths (relative to the config directory) that must exist
    #[serde(
        deserialize_with = "decode::string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub exists: Vec<String>,

    /// Paths that must not exist
    #[serde(
        rename = "not-exists",
        deserialize_with = "decode::string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub not_exists: Vec<String>,

    /// Commands that must exit zero
    #[serde(
        deserialize_with = "decode::string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub command: Vec<String>,
}

impl When {
    /// A clause guarding on a single command's success.
    pub fn from_command(command: String) -> Self {
        When {
            command: vec![command],
            ..Default::default()
        }
    }

    /// Option names this clause compares against.
    pub fn dependencies(&self) -> impl Iterator<Item = &String> {
        self.equal.keys().chain(self.not_equal.keys())
    }
}

/// One candidate for an option's default value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DefaultValue {
    /// Guard clauses; the candidate applies only if all pass
    #[serde(
        deserialize_with = "decode::when_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub when: Vec<When>,

    /// Literal value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Command whose stdout becomes the value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

/// The type an option or argument value is coerced to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    #[default]
    String,
    #[serde(alias = "boolean")]
    Bool,
    #[serde(alias = "integer")]
    Int,
    Float,
}

impl OptionType {
    fn is_string(&self) -> bool {
        *self == OptionType::String
    }

    /// The value an unset, non-required option resolves to.
    pub fn zero_value(&self) -> &'static str {
        match self {
            OptionType::String => "",
            OptionType::Bool => "false",
            OptionType::Int | OptionType::Float => "0",
        }
    }
}

/// An option (flag) definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TaskOption {
    /// Usage description for help text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,

    /// Short flag (single character)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,

    /// Value type
    #[serde(rename = "type", skip_serializing_if = "OptionType::is_string")]
    pub opt_type: OptionType,

    /// Environment variable to read when no flag is passed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// Default value candidates, first passing guard wins
    #[serde(
        deserialize_with = "decode::default_values",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub default: Vec<DefaultValue>,

    /// The option must be provided by flag or environment
    #[serde(skip_serializing_if = "is_false")]
    pub required: bool,

    /// Template interpolated in place of the raw value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<String>,

    /// Allowed values
    #[serde(
        deserialize_with = "decode::string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub values: Vec<String>,

    /// Private options are not exposed as CLI flags
    #[serde(skip_serializing_if = "is_false")]
    pub private: bool,

    /// Option name, injected from the mapping key after decode
    #[serde(skip)]
    pub name: String,
}

impl TaskOption {
    pub fn is_bool(&self) -> bool {
        self.opt_type == OptionType::Bool
    }
}

/// An argument (positional parameter) definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Arg {
    /// Usage description for help text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,

    /// Value type
    #[serde(rename = "type", skip_serializing_if = "OptionType::is_string")]
    pub opt_type: OptionType,

    /// Allowed values
    #[serde(
        deserialize_with = "decode::string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub values: Vec<String>,

    /// Argument name, injected from the mapping key after decode
    #[serde(skip)]
    pub name: String,
}
