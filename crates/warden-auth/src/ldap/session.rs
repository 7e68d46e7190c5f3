//! Directory session adapter
//!
//! A session is one connection used for exactly one login: service bind,
//! user search, user bind, then group lookup. Sessions are never shared
//! between logins.

use crate::ldap::profile::ConnectionProfile;
use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Attribute returned for each group entry
pub const GROUP_NAME_ATTRIBUTE: &str = "cn";

/// LDAP result code: invalidCredentials
const RC_INVALID_CREDENTIALS: u32 = 49;
/// LDAP result code: unwillingToPerform (disabled accounts, empty passwords)
const RC_UNWILLING_TO_PERFORM: u32 = 53;

/// User attributes keyed by directory attribute name
pub type Attributes = HashMap<String, String>;

/// Outcome of a completed authentication exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    Accepted(Attributes),
    Rejected(Rejection),
}

/// Why the directory refused a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    UnknownUser,
    InvalidCredentials,
    AccountUnusable,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::UnknownUser => write!(f, "user does not exist"),
            Rejection::InvalidCredentials => write!(f, "invalid credentials"),
            Rejection::AccountUnusable => write!(f, "account disabled or bind refused"),
        }
    }
}

/// Transport and protocol failures talking to the directory
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Failed to connect to LDAP server {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Directory operation timed out")]
    Timeout,

    #[error("Service account bind failed with code: {rc}")]
    ServiceBind { rc: u32 },

    #[error("User bind failed with code {rc}: {text}")]
    UserBind { rc: u32, text: String },

    #[error("Search failed: {0}")]
    Search(String),

    #[error("Too many entries returned for user {username}: {count}")]
    AmbiguousUser { username: String, count: usize },

    #[error("LDAP protocol error: {0}")]
    Protocol(String),
}

impl DirectoryError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DirectoryError::Timeout)
    }
}

impl From<LdapError> for DirectoryError {
    fn from(err: LdapError) -> Self {
        match err {
            LdapError::Timeout { .. } => DirectoryError::Timeout,
            other => DirectoryError::Protocol(other.to_string()),
        }
    }
}

/// Opens a fresh session per login
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    type Session: DirectorySession;

    async fn connect(
        &self,
        profile: &Arc<ConnectionProfile>,
    ) -> Result<Self::Session, DirectoryError>;
}

/// One authenticate-and-query exchange with the directory
#[async_trait]
pub trait DirectorySession: Send {
    /// Look the user up and verify the password.
    ///
    /// A refusal by the directory is `Ok(Authentication::Rejected(_))`;
    /// `Err` is reserved for transport and protocol failures.
    ///
    /// The password is forwarded as is. An empty password makes the user
    /// bind an unauthenticated simple bind, which some directories (Active
    /// Directory by default) answer with success. Deployments against such
    /// servers should refuse empty passwords before calling this.
    async fn authenticate(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<Authentication, DirectoryError>;

    /// Group names, in directory order. Only valid after a successful
    /// [`authenticate`](Self::authenticate).
    async fn groups_of(&mut self, username: &str) -> Result<Vec<String>, DirectoryError>;

    /// Release the connection. Dropping a session also releases it.
    async fn close(&mut self);
}

/// Connector backed by `ldap3`
#[derive(Debug, Clone, Copy, Default)]
pub struct Ldap3Connector;

#[async_trait]
impl DirectoryConnector for Ldap3Connector {
    type Session = Ldap3Session;

    async fn connect(
        &self,
        profile: &Arc<ConnectionProfile>,
    ) -> Result<Ldap3Session, DirectoryError> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(profile.timeout)
            .set_starttls(profile.use_starttls())
            .set_no_tls_verify(profile.insecure_skip_verify);

        let url = profile.url();
        if profile.host.trim().is_empty() {
            return Err(DirectoryError::Connect {
                url,
                message: "no host configured".to_string(),
            });
        }
        debug!("Connecting to LDAP server: {}", url);

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| match e {
                LdapError::Timeout { .. } => DirectoryError::Timeout,
                other => DirectoryError::Connect {
                    url: url.clone(),
                    message: other.to_string(),
                },
            })?;

        // The driver exits once every `Ldap` handle for the connection is dropped
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!("LDAP connection driver error: {}", e);
            }
        });

        Ok(Ldap3Session {
            ldap,
            profile: Arc::clone(profile),
            open: true,
        })
    }
}

/// Live `ldap3` connection owned by a single login
pub struct Ldap3Session {
    ldap: Ldap,
    profile: Arc<ConnectionProfile>,
    open: bool,
}

impl Ldap3Session {
    async fn service_bind(&mut self) -> Result<(), DirectoryError> {
        if !self.profile.has_service_account() {
            return Ok(());
        }

        let result = self
            .ldap
            .with_timeout(self.profile.timeout)
            .simple_bind(&self.profile.bind_dn, &self.profile.bind_password)
            .await?;

        if result.rc != 0 {
            return Err(DirectoryError::ServiceBind { rc: result.rc });
        }
        Ok(())
    }

    async fn search(
        &mut self,
        filter: &str,
        attrs: Vec<String>,
    ) -> Result<Vec<SearchEntry>, DirectoryError> {
        let (rs, _res) = self
            .ldap
            .with_timeout(self.profile.timeout)
            .search(&self.profile.base, Scope::Subtree, filter, attrs)
            .await?
            .success()
            .map_err(|e| DirectoryError::Search(e.to_string()))?;

        Ok(rs.into_iter().map(SearchEntry::construct).collect())
    }
}

#[async_trait]
impl DirectorySession for Ldap3Session {
    async fn authenticate(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<Authentication, DirectoryError> {
        self.service_bind().await?;

        let filter = self.profile.user_filter_for(username);
        let wanted: Vec<String> = self
            .profile
            .requested_attributes()
            .into_iter()
            .map(str::to_string)
            .collect();

        debug!("Searching for user with filter: {}", filter);

        let entries = self.search(&filter, wanted.clone()).await?;
        let Some(entry) = single_entry(username, entries)? else {
            return Ok(Authentication::Rejected(Rejection::UnknownUser));
        };

        debug!("Found user DN: {}", entry.dn);

        let attributes: Attributes = wanted
            .into_iter()
            .map(|attr| {
                let value = get_first_attr(&entry, &attr).unwrap_or_default();
                (attr, value)
            })
            .collect();

        let user_bind = self
            .ldap
            .with_timeout(self.profile.timeout)
            .simple_bind(&entry.dn, password)
            .await?;

        if let Some(reason) = classify_user_bind(user_bind.rc, user_bind.text)? {
            return Ok(Authentication::Rejected(reason));
        }

        // Back to the service account for the group query
        self.service_bind().await?;

        Ok(Authentication::Accepted(attributes))
    }

    async fn groups_of(&mut self, username: &str) -> Result<Vec<String>, DirectoryError> {
        let Some(filter) = self.profile.group_filter_for(username) else {
            debug!("No group filter configured, skipping group lookup");
            return Ok(Vec::new());
        };
        debug!("Searching groups with filter: {}", filter);

        let groups: Vec<String> = self
            .search(&filter, vec![GROUP_NAME_ATTRIBUTE.to_string()])
            .await?
            .iter()
            .filter_map(|entry| get_first_attr(entry, GROUP_NAME_ATTRIBUTE))
            .collect();

        debug!("Found {} groups for user", groups.len());
        Ok(groups)
    }

    async fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;

        if let Err(e) = self.ldap.unbind().await {
            debug!("LDAP unbind failed: {}", e);
        }
    }
}

/// The entry for a user search: none, or exactly one
fn single_entry(
    username: &str,
    mut entries: Vec<SearchEntry>,
) -> Result<Option<SearchEntry>, DirectoryError> {
    if entries.len() > 1 {
        return Err(DirectoryError::AmbiguousUser {
            username: username.to_string(),
            count: entries.len(),
        });
    }
    Ok(entries.pop())
}

/// Classify a user bind result code. `Ok(None)` means the bind succeeded.
fn classify_user_bind(rc: u32, text: String) -> Result<Option<Rejection>, DirectoryError> {
    match rc {
        0 => Ok(None),
        RC_INVALID_CREDENTIALS => Ok(Some(Rejection::InvalidCredentials)),
        RC_UNWILLING_TO_PERFORM => Ok(Some(Rejection::AccountUnusable)),
        rc => Err(DirectoryError::UserBind { rc, text }),
    }
}

/// First value of an attribute on an entry
fn get_first_attr(entry: &SearchEntry, attr: &str) -> Option<String> {
    entry.attrs.get(attr).and_then(|v| v.first().cloned())
}
