//! Warden Core Library
//!
//! Identity values, the security-manager capability, and configuration
//! shared by the Warden identity providers.

pub mod config;
pub mod error;
pub mod identity;

pub use config::WardenConfig;
pub use error::{Error, LoginError, Result};
pub use identity::{Identity, SecurityManager, UserInfo};

/// Warden version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
