//! Main CLI application
//!
//! The clap command is built from the parsed configuration: one subcommand
//! per non-private task, with the task's options as flags and its args as
//! positionals. Only values the user explicitly passed are handed to the
//! resolver, so environment variables and defaults keep their precedence.

use crate::config::{self, Config, Task};
use crate::error::{ConfigError, Result};
use crate::runner::{self, Cache, Context, TaskRunner};
use crate::ui::{Logger, Verbosity};
use clap::{Arg, ArgAction, ArgMatches, Command};
use indexmap::IndexMap;
use std::env;
use std::path::PathBuf;

/// Run the CLI application.
pub fn run() -> Result<()> {
    runner::install_interrupt_handler();

    let args: Vec<String> = env::args().collect();
    let config_path = match extract_file_arg(&args) {
        Some(path) => path,
        None => config::find_config_file()?,
    };

    let config = config::parse_config_file(&config_path)?;
    let command = build_command(&config);
    let matches = command.clone().get_matches();

    let logger = Logger::new(get_verbosity(&matches));

    if matches.get_flag("clean") {
        let cache = Cache::new(&config_path)?;
        let task_name = matches.subcommand().map(|(name, _)| name);
        cache.clean(task_name)?;
        return Ok(());
    }

    let Some((task_name, task_matches)) = matches.subcommand() else {
        let mut command = command;
        command.print_help()?;
        println!();
        return Ok(());
    };

    let task = config
        .tasks
        .get(task_name)
        .ok_or_else(|| ConfigError::TaskNotFound(task_name.to_string()))?;

    let passed_args = collect_args(task, task_matches);
    let passed_opts = collect_options(task, task_matches);

    let mut ctx = Context::new(config_path.clone(), logger);
    if let Some(interpreter) = &config.interpreter {
        ctx = ctx.with_interpreter(interpreter.clone());
    }

    let cache = Cache::new(&config_path)?;
    TaskRunner::new(&config, cache).run(task_name, &passed_args, &passed_opts, &ctx)
}

/// Build the clap command from configuration
fn build_command(config: &Config) -> Command {
    let mut cmd = Command::new(config.name.clone().unwrap_or_else(|| "whisk".to_string()))
        .version(crate::VERSION)
        .about(
            config
                .usage
                .clone()
                .unwrap_or_else(|| "A YAML-driven task runner".to_string()),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Path to the config file")
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print command output and errors")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("clean")
                .long("clean")
                .help("Drop the cache for one task, or for all tasks")
                .action(ArgAction::SetTrue)
                .global(true),
        );

    for (task_name, task) in &config.tasks {
        if task.private {
            continue;
        }
        cmd = cmd.subcommand(build_task_command(task_name, task));
    }

    cmd
}

fn build_task_command(task_name: &str, task: &Task) -> Command {
    let mut task_cmd =
        Command::new(task_name.to_string()).about(task.usage.clone().unwrap_or_default());

    if let Some(description) = &task.description {
        task_cmd = task_cmd.long_about(description.clone());
    }

    for (arg_name, arg) in &task.args {
        let mut arg_def = Arg::new(arg_name.clone())
            .value_name(arg_name.to_uppercase())
            .help(arg.usage.clone().unwrap_or_default())
            .required(true);

        if !arg.values.is_empty() {
            arg_def = arg_def.help(format!(
                "{} [{}]",
                arg.usage.clone().unwrap_or_default(),
                arg.values.join(", ")
            ));
        }

        task_cmd = task_cmd.arg(arg_def);
    }

    for (opt_name, opt) in &task.options {
        if opt.private {
            continue;
        }

        let mut opt_def = Arg::new(opt_name.clone())
            .long(opt_name.clone())
            .help(opt.usage.clone().unwrap_or_default());

        if let Some(short) = &opt.short {
            if let Some(c) = short.chars().next() {
                opt_def = opt_def.short(c);
            }
        }

        if opt.is_bool() {
            opt_def = opt_def.action(ArgAction::SetTrue);
        } else {
            opt_def = opt_def.value_name(opt_name.to_uppercase());
        }

        task_cmd = task_cmd.arg(opt_def);
    }

    task_cmd
}

/// Positional values for the task's args, in declaration order.
fn collect_args(task: &Task, matches: &ArgMatches) -> Vec<String> {
    task.args
        .keys()
        .filter_map(|name| matches.get_one::<String>(name).cloned())
        .collect()
}

/// Option values the user explicitly set.
fn collect_options(task: &Task, matches: &ArgMatches) -> IndexMap<String, String> {
    let mut passed = IndexMap::new();

    for (name, opt) in &task.options {
        if opt.private {
            continue;
        }

        if opt.is_bool() {
            if matches.get_flag(name) {
                passed.insert(name.clone(), "true".to_string());
            }
        } else if let Some(value) = matches.get_one::<String>(name) {
            passed.insert(name.clone(), value.clone());
        }
    }

    passed
}

/// Map the global flags to a verbosity level.
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Extract the --file argument before clap parsing, so the configuration can
/// define the command tree.
fn extract_file_arg(args: &[String]) -> Option<PathBuf> {
    for i in 0..args.len() {
        if (args[i] == "--file" || args[i] == "-f") && i + 1 < args.len() {
            return Some(PathBuf::from(&args[i + 1]));
        }
    }
    None
}
