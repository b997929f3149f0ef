//! Task execution
//!
//! `TaskRunner` drives a resolved task: the cache gate, the run list, the
//! finally list, and sub-task recursion. Run items execute strictly in
//! declared order; a sub-task runs to completion before the caller proceeds.

use crate::config::{Config, RunItem, SubTaskRef, Task};
use crate::error::{ConfigError, Result, RunError, WhiskError};
use crate::runner::{command, option, when, Cache, Context};
use std::env;

/// Whether a run item executes as part of `run` or `finally`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExecutionState {
    Running,
    Finally,
}

/// Executes tasks from a catalogue
pub struct TaskRunner<'a> {
    config: &'a Config,
    cache: Cache,
}

impl<'a> TaskRunner<'a> {
    pub fn new(config: &'a Config, cache: Cache) -> Self {
        TaskRunner { config, cache }
    }

    /// Resolve and execute a task by name with passed args and options.
    pub fn run(
        &self,
        name: &str,
        args: &[String],
        opts: &indexmap::IndexMap<String, String>,
        ctx: &Context,
    ) -> Result<()> {
        let source = self
            .config
            .tasks
            .get(name)
            .ok_or_else(|| ConfigError::TaskNotFound(name.to_string()))?;

        let mut task = source.clone();
        option::resolve(&mut task, args, opts, ctx)?;
        self.execute(&task, ctx)
    }

    /// Execute a resolved task.
    pub fn execute(&self, task: &Task, ctx: &Context) -> Result<()> {
        let ctx = ctx.with_task(task);

        if self.cache.is_up_to_date(task, &ctx) {
            ctx.logger.task_skipped(&task.name, "all targets up to date");
            return Ok(());
        }

        ctx.logger.task(&task.name);

        let mut result = self.run_items(task, &ctx);
        if result.is_ok() {
            result = self.cache.write(task, &ctx).map_err(WhiskError::from);
        }
        let result = self.run_finally(task, &ctx, result);

        ctx.logger.task_completed(&task.name);
        result
    }

    fn run_items(&self, task: &Task, ctx: &Context) -> Result<()> {
        for item in &task.run {
            if command::interrupted() {
                return Err(RunError::Interrupted.into());
            }
            self.run_item(task, item, ctx, ExecutionState::Running)?;
        }
        Ok(())
    }

    /// Run the finally list, keeping an error from the run list over any
    /// error raised here.
    fn run_finally(&self, task: &Task, ctx: &Context, result: Result<()>) -> Result<()> {
        if task.finally.is_empty() {
            return result;
        }

        ctx.logger.task_finally(&task.name);

        for item in &task.finally {
            if let Err(finally_err) = self.run_item(task, item, ctx, ExecutionState::Finally) {
                return match result {
                    Ok(()) => Err(finally_err),
                    Err(_) => result,
                };
            }
        }

        result
    }

    fn run_item(
        &self,
        task: &Task,
        item: &RunItem,
        ctx: &Context,
        state: ExecutionState,
    ) -> Result<()> {
        if !when::validate_list(&item.when, &task.vars, ctx)? {
            return Ok(());
        }

        self.run_commands(item, ctx, state)?;
        self.run_subtasks(item, ctx)?;
        self.run_environment(item, ctx)?;
        Ok(())
    }

    fn run_commands(&self, item: &RunItem, ctx: &Context, state: ExecutionState) -> Result<()> {
        for cmd in &item.command {
            if !ctx.should_be_quiet(cmd.quiet) {
                let names = ctx.task_names();
                match state {
                    ExecutionState::Finally => ctx.logger.command_finally(cmd.print_text(), &names),
                    ExecutionState::Running => ctx.logger.command(cmd.print_text(), &names),
                }
            }

            command::execute_command(cmd, ctx).map_err(|err| {
                ctx.logger.command_error(&err);
                err
            })?;
        }
        Ok(())
    }

    fn run_subtasks(&self, item: &RunItem, ctx: &Context) -> Result<()> {
        for sub in &item.task {
            self.run_subtask(sub, ctx)?;
        }
        Ok(())
    }

    fn run_subtask(&self, sub: &SubTaskRef, ctx: &Context) -> Result<()> {
        if ctx.has_task(&sub.name) {
            let mut stack: Vec<&str> = ctx.stack_names();
            stack.push(&sub.name);
            return Err(RunError::TaskCycle {
                stack: stack.join(" -> "),
            }
            .into());
        }

        self.run(&sub.name, &sub.args, &sub.options, ctx)
    }

    fn run_environment(&self, item: &RunItem, ctx: &Context) -> Result<()> {
        if item.set_environment.is_empty() {
            return Ok(());
        }

        ctx.logger.environment(&item.set_environment);
        for (key, value) in &item.set_environment {
            match value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }
        Ok(())
    }
}
