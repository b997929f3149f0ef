//! Command execution
//!
//! Thin adapter between run items and the process spawner. All commands are
//! handed to the context's interpreter and run from the configuration file's
//! directory unless a command overrides it.

use crate::config::Command;
use crate::error::{RunError, RunResult};
use crate::runner::Context;
use std::process::{Command as StdCommand, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Install the SIGINT handler.
///
/// The child process receives the signal from the terminal; this process
/// survives, notices the flag after the child exits, and aborts the run so
/// the finally list still executes.
pub fn install_interrupt_handler() {
    let _ = ctrlc::set_handler(|| INTERRUPTED.store(true, Ordering::SeqCst));
}

pub(crate) fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

fn interpreter_command(ctx: &Context, exec: &str) -> StdCommand {
    let mut command = StdCommand::new(&ctx.interpreter[0]);
    command.args(&ctx.interpreter[1..]);
    command.arg(exec);
    command
}

/// Execute a command with inherited stdio.
pub fn execute_command(cmd: &Command, ctx: &Context) -> RunResult<()> {
    let working_dir = match &cmd.dir {
        Some(dir) => ctx.dir().join(dir),
        None => ctx.dir(),
    };

    let status = interpreter_command(ctx, &cmd.exec)
        .current_dir(&working_dir)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|source| RunError::CommandSpawn {
            command: cmd.exec.clone(),
            source,
        })?;

    if interrupted() {
        return Err(RunError::Interrupted);
    }

    if !status.success() {
        return Err(RunError::CommandFailed {
            command: cmd.print_text().to_string(),
            code: status.code(),
        });
    }

    Ok(())
}

/// Run a command for a when guard: output discarded, exit status is the
/// answer. A non-zero exit is a failed predicate, not an error.
pub fn check_command(exec: &str, ctx: &Context) -> RunResult<bool> {
    let status = interpreter_command(ctx, exec)
        .current_dir(ctx.dir())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|source| RunError::CommandSpawn {
            command: exec.to_string(),
            source,
        })?;

    if interrupted() {
        return Err(RunError::Interrupted);
    }

    Ok(status.success())
}

/// Run a command for a default value: stdout captured, one trailing newline
/// trimmed. Non-zero exit is an error here.
pub fn capture_command(exec: &str, ctx: &Context) -> RunResult<String> {
    let output = interpreter_command(ctx, exec)
        .current_dir(ctx.dir())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|source| RunError::CommandSpawn {
            command: exec.to_string(),
            source,
        })?;

    if interrupted() {
        return Err(RunError::Interrupted);
    }

    if !output.status.success() {
        return Err(RunError::CommandFailed {
            command: exec.to_string(),
            code: output.status.code(),
        });
    }

    let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if stdout.ends_with('\n') {
        stdout.pop();
        if stdout.ends_with('\r') {
            stdout.pop();
        }
    }

    Ok(stdout)
}
