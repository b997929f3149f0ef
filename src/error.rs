//! Error types for Whisk

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Whisk operations
pub type Result<T> = std::result::Result<T, WhiskError>;

/// Main error type for Whisk
#[derive(Error, Debug)]
pub enum WhiskError {
    /// Configuration and validation errors
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Task execution errors
    #[error("{0}")]
    Run(#[from] RunError),

    /// YAML parsing errors
    #[error("parsing config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O errors
    #[error("{0}")]
    Io(#[from] io::Error),
}

impl WhiskError {
    /// The process exit code this error maps to.
    ///
    /// Configuration and validation problems exit 2; a failed command
    /// propagates the child's exit code; an interrupt exits 130; everything
    /// else exits 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            WhiskError::Config(_) | WhiskError::Yaml(_) | WhiskError::Io(_) => 2,
            WhiskError::Run(RunError::CommandFailed { code, .. }) => code.unwrap_or(1),
            WhiskError::Run(RunError::Interrupted) => 130,
            WhiskError::Run(_) => 1,
        }
    }
}

/// Configuration parsing and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no config file found (searched: {0})")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("task {task:?}: source cannot be defined without target")]
    SourceWithoutTarget { task: String },

    #[error("task {task:?}: target cannot be defined without source")]
    TargetWithoutSource { task: String },

    #[error("task {task:?}: argument and option {name:?} must have unique names")]
    DuplicateName { task: String, name: String },

    #[error("task {task:?}: cannot redefine global option {name:?}")]
    GlobalOptionCollision { task: String, name: String },

    #[error("task {0:?} is not defined")]
    TaskNotFound(String),

    #[error("including {path:?}: {detail}")]
    Include { path: PathBuf, detail: String },

    #[error("option {option:?} is required and cannot have a default value")]
    RequiredWithDefault { option: String },

    #[error("options have a circular dependency: {chain}")]
    OptionCycle { chain: String },

    #[error("variable {name:?} is not defined")]
    UndefinedVariable { name: String },

    #[error("invalid value {value:?} for {name:?}: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },

    #[error("option {option:?} is required")]
    MissingRequired { option: String },

    #[error("task {task:?} requires exactly {expected} args, got {actual}")]
    WrongArgCount {
        task: String,
        expected: usize,
        actual: usize,
    },

    #[error("task {task:?} has no option {name:?}")]
    UnknownOption { task: String, name: String },
}

/// Task execution errors
#[derive(Error, Debug)]
pub enum RunError {
    #[error("command {command:?} exited with status {}", .code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    CommandFailed { command: String, code: Option<i32> },

    #[error("running {command:?}: {source}")]
    CommandSpawn { command: String, source: io::Error },

    #[error("task cycle detected: {stack}")]
    TaskCycle { stack: String },

    #[error("cache: {0}")]
    Cache(String),

    #[error("interrupted")]
    Interrupted,
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for execution operations
pub type RunResult<T> = std::result::Result<T, RunError>;
