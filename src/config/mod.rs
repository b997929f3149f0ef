//! Configuration parsing and validation
//!
//! This module handles parsing of whisk.yml configuration files
//! and validation of configuration structure.

mod decode;
pub mod parse;
pub mod types;
pub mod validate;

// Re-export main types
pub use parse::*;
pub use types::*;
pub use validate::*;
