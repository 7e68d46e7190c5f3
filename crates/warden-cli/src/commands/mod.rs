//! CLI command implementations

pub mod login;
pub mod profile;

use crate::OutputFormat;
use warden_core::WardenConfig;

/// Context passed to all commands
pub struct CommandContext {
    pub config: WardenConfig,
    pub output_format: OutputFormat,
}

impl CommandContext {
    /// Check if output should be JSON
    pub fn is_json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }
}
