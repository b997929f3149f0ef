//! Execution context for task running
//!
//! The context carries the configuration path, logger, interpreter, and the
//! stack of executing tasks. Contexts are passed by value; pushing a task
//! clones the stack first, so recursion branches never alias.

use crate::config::Task;
use crate::ui::Logger;
use std::path::PathBuf;

/// The interpreter used when the configuration does not name one.
pub const DEFAULT_INTERPRETER: &[&str] = &["sh", "-c"];

/// Contextual information about a run
#[derive(Debug, Clone)]
pub struct Context {
    /// Full path of the configuration file
    pub cfg_path: PathBuf,

    /// Logger for progress output
    pub logger: Logger,

    /// How command text is executed (e.g. ["sh", "-c"])
    pub interpreter: Vec<String>,

    task_stack: Vec<StackEntry>,
}

/// The slice of task state the stack needs to remember
#[derive(Debug, Clone)]
struct StackEntry {
    name: String,
    quiet: bool,
    private: bool,
}

impl Context {
    pub fn new(cfg_path: PathBuf, logger: Logger) -> Self {
        Context {
            cfg_path,
            logger,
            interpreter: DEFAULT_INTERPRETER.iter().map(|s| s.to_string()).collect(),
            task_stack: Vec::new(),
        }
    }

    /// Set the interpreter, keeping the default when the list is empty.
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        if !interpreter.is_empty() {
            self.interpreter = interpreter;
        }
        self
    }

    /// The directory that defines the config file, which is the relative
    /// directory for all command execution.
    pub fn dir(&self) -> PathBuf {
        match self.cfg_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// A context with `task` pushed onto a copy of the stack.
    pub fn with_task(&self, task: &Task) -> Context {
        let mut ctx = self.clone();
        ctx.task_stack.push(StackEntry {
            name: task.name.clone(),
            quiet: task.quiet,
            private: task.private,
        });
        ctx
    }

    /// Whether a task with this name is currently executing.
    pub fn has_task(&self, name: &str) -> bool {
        self.task_stack.iter().any(|entry| entry.name == name)
    }

    /// Task names in the stack, in order, private tasks filtered out.
    pub fn task_names(&self) -> Vec<&str> {
        self.task_stack
            .iter()
            .filter(|entry| !entry.private)
            .map(|entry| entry.name.as_str())
            .collect()
    }

    /// Every task name in the stack, for cycle reporting.
    pub fn stack_names(&self) -> Vec<&str> {
        self.task_stack
            .iter()
            .map(|entry| entry.name.as_str())
            .collect()
    }

    /// A command is silent if it is quiet itself or any task in the stack is.
    pub fn should_be_quiet(&self, command_quiet: bool) -> bool {
        command_quiet || self.task_stack.iter().any(|entry| entry.quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str, quiet: bool) -> Task {
        Task {
            name: name.to_string(),
            quiet,
            ..Default::default()
        }
    }

    fn test_context() -> Context {
        Context::new(PathBuf::from("/tmp/whisk.yml"), Logger::default())
    }

    #[test]
    fn test_context_defaults() {
        let ctx = test_context();
        assert_eq!(ctx.interpreter, DEFAULT_INTERPRETER);
        assert!(ctx.task_names().is_empty());
    }

    #[test]
    fn test_dir_is_config_parent() {
        let ctx = test_context();
        assert_eq!(ctx.dir(), PathBuf::from("/tmp"));
    }

    #[test]
    fn test_with_task_does_not_mutate_parent() {
        let ctx = test_context();
        let child = ctx.with_task(&task("build", false));

        assert!(child.has_task("build"));
        assert!(!ctx.has_task("build"));
        assert_eq!(child.task_names(), ["build"]);
    }

    #[test]
    fn test_branches_do_not_alias() {
        let base = test_context().with_task(&task("all", false));
        let left = base.with_task(&task("left", false));
        let right = base.with_task(&task("right", false));

        assert!(left.has_task("left"));
        assert!(!left.has_task("right"));
        assert!(right.has_task("right"));
        assert!(!right.has_task("left"));
    }

    #[test]
    fn test_private_tasks_hidden_from_names() {
        let mut private = task("hidden", false);
        private.private = true;

        let ctx = test_context()
            .with_task(&task("outer", false))
            .with_task(&private);

        assert_eq!(ctx.task_names(), ["outer"]);
        assert_eq!(ctx.stack_names(), ["outer", "hidden"]);
    }

    #[test]
    fn test_quiet_inheritance() {
        let ctx = test_context().with_task(&task("loud", false));
        assert!(!ctx.should_be_quiet(false));
        assert!(ctx.should_be_quiet(true));

        let quiet_ctx = ctx.with_task(&task("hush", true));
        assert!(quiet_ctx.should_be_quiet(false));
    }

    #[test]
    fn test_empty_interpreter_keeps_default() {
        let ctx = test_context().with_interpreter(Vec::new());
        assert_eq!(ctx.interpreter, DEFAULT_INTERPRETER);

        let ctx = ctx.with_interpreter(vec!["bash".into(), "-c".into()]);
        assert_eq!(ctx.interpreter, ["bash", "-c"]);
    }
}
