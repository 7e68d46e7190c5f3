//! Identity providers for Warden

pub mod ldap;

pub use ldap::{
    AttributeMap, Authentication, ConnectionProfile, DirectoryConnector, DirectoryError,
    DirectorySession, Ldap3Connector, LdapProvider, Rejection,
};
