//! Identity types and the security-manager capability

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LoginError;

/// Profile of an authenticated user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    pub username: String,
    pub email: String,
}

/// Result of a successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    roles: Vec<String>,
    user_info: UserInfo,
}

impl Identity {
    pub fn new(roles: Vec<String>, user_info: UserInfo) -> Self {
        Self { roles, user_info }
    }

    /// Group names the user belongs to. Order carries no meaning.
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn user_info(&self) -> &UserInfo {
        &self.user_info
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Identity backend consumed by the authorization layer.
///
/// Implementations verify a username/password pair and report group
/// membership. They must not keep per-call state: concurrent `login`
/// calls are independent.
#[async_trait]
pub trait SecurityManager: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<Identity, LoginError>;

    /// Seconds a successful login may be cached by the caller
    fn ttl(&self) -> i64;
}
