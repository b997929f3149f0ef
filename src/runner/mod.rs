//! Task execution engine
//!
//! This module handles the execution of tasks: option and argument
//! resolution, interpolation, conditional run items, sub-task recursion, and
//! the source/target cache.

pub mod cache;
pub mod command;
pub mod context;
pub mod interpolate;
pub mod option;
pub mod task;
pub mod when;

// Re-export main types
pub use cache::Cache;
pub use command::{capture_command, check_command, execute_command, install_interrupt_handler};
pub use context::{Context, DEFAULT_INTERPRETER};
pub use task::TaskRunner;
