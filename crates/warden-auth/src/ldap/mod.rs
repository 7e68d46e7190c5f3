//! LDAP directory identity provider
//!
//! - Lenient profile loading from a raw string map
//! - One connection per login, released on every exit path
//! - Group membership lookup after a successful bind
//! - TLS/STARTTLS support

mod profile;
mod provider;
mod session;

pub use profile::{AttributeMap, ConnectionProfile, DEFAULT_TIMEOUT_SECONDS};
pub use provider::LdapProvider;
pub use session::{
    Attributes, Authentication, DirectoryConnector, DirectoryError, DirectorySession,
    Ldap3Connector, Ldap3Session, Rejection,
};
