//! LDAP identity provider
//!
//! Orchestrates one directory session per login and maps the outcome onto
//! [`Identity`] or [`LoginError`].

use crate::ldap::profile::ConnectionProfile;
use crate::ldap::session::{
    Authentication, DirectoryConnector, DirectorySession, Ldap3Connector,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use warden_core::{Identity, LoginError, SecurityManager, UserInfo};

/// Directory-backed [`SecurityManager`]
pub struct LdapProvider<C = Ldap3Connector> {
    profile: Arc<ConnectionProfile>,
    connector: C,
}

impl LdapProvider {
    /// Create a provider from raw configuration
    pub fn new(raw: &HashMap<String, String>) -> Self {
        for key in ConnectionProfile::malformed_keys(raw) {
            warn!("LDAP profile key '{}' is malformed, using its default value", key);
        }

        let profile = ConnectionProfile::load(raw);
        if profile.server_name_mismatch() {
            warn!(
                "LDAP serverName '{}' differs from host '{}'; certificates are verified against the host",
                profile.server_name, profile.host
            );
        }

        Self::with_connector(profile, Ldap3Connector)
    }
}

impl<C: DirectoryConnector> LdapProvider<C> {
    pub fn with_connector(profile: ConnectionProfile, connector: C) -> Self {
        info!("LDAP provider configured for {}", profile.url());
        Self {
            profile: Arc::new(profile),
            connector,
        }
    }

    pub fn profile(&self) -> &ConnectionProfile {
        &self.profile
    }

    async fn login_with(
        &self,
        session: &mut C::Session,
        username: &str,
        password: &str,
    ) -> Result<Identity, LoginError> {
        let attributes = match session.authenticate(username, password).await {
            Ok(Authentication::Accepted(attributes)) => attributes,
            Ok(Authentication::Rejected(reason)) => {
                debug!("Authentication rejected for {}: {}", username, reason);
                return Err(LoginError::rejected(username));
            }
            Err(e) if e.is_timeout() => {
                warn!("Directory timed out authenticating user {}", username);
                return Err(LoginError::unavailable(e));
            }
            Err(e) => {
                warn!("Error authenticating user {}: {}", username, e);
                return Err(LoginError::unavailable(e));
            }
        };

        let roles = session.groups_of(username).await.map_err(|e| {
            warn!("Error getting groups for user {}: {}", username, e);
            LoginError::group_lookup(username, e)
        })?;

        let attribute = |attr: &str| attributes.get(attr).cloned().unwrap_or_default();
        let name = attribute(&self.profile.attributes.name);
        let email = attribute(&self.profile.attributes.email);

        info!("User {} authenticated with {} groups", username, roles.len());

        Ok(Identity::new(
            roles,
            UserInfo {
                name,
                // Always the caller's input, never the directory's value
                username: username.to_string(),
                email,
            },
        ))
    }
}

#[async_trait]
impl<C: DirectoryConnector> SecurityManager for LdapProvider<C> {
    async fn login(&self, username: &str, password: &str) -> Result<Identity, LoginError> {
        let mut session = self.connector.connect(&self.profile).await.map_err(|e| {
            if e.is_timeout() {
                warn!("Directory timed out connecting for user {}", username);
            } else {
                warn!("Error connecting to directory for user {}: {}", username, e);
            }
            LoginError::unavailable(e)
        })?;

        let outcome = self.login_with(&mut session, username, password).await;
        session.close().await;
        outcome
    }

    fn ttl(&self) -> i64 {
        self.profile.ttl
    }
}
