//! Directory connection profile
//!
//! A [`ConnectionProfile`] is built once from the raw string map supplied by
//! configuration and never changes afterwards. Loading is lenient: a value
//! that does not parse as the expected number or boolean becomes `0` or
//! `false` instead of failing. [`ConnectionProfile::malformed_keys`] reports
//! those keys so they can be logged at startup.

use ldap3::ldap_escape;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

pub const BASE: &str = "base";
pub const HOST: &str = "host";
pub const SERVER_NAME: &str = "serverName";
pub const PORT: &str = "port";
pub const USE_SSL: &str = "useSSL";
pub const SKIP_TLS: &str = "skipTLS";
pub const INSECURE_SKIP_VERIFY: &str = "insecureSkipVerify";
pub const BIND_DN: &str = "bindDN";
pub const BIND_PASSWORD: &str = "bindPassword";
pub const USER_FILTER: &str = "userFilter";
pub const GROUP_FILTER: &str = "groupFilter";
pub const ATTRIBUTE_USERNAME: &str = "attributeUsername";
pub const ATTRIBUTE_NAME: &str = "attributeName";
pub const ATTRIBUTE_EMAIL: &str = "attributeEmail";
pub const TTL: &str = "ttl";
pub const TIMEOUT: &str = "timeout";

/// Used when `timeout` is absent, malformed or zero
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Directory attribute names mapped onto the user profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttributeMap {
    pub username: String,
    pub name: String,
    pub email: String,
}

/// Typed, immutable directory connection parameters
#[derive(Clone, Serialize)]
pub struct ConnectionProfile {
    pub base: String,
    pub host: String,
    /// Expected TLS server name. Advisory only: certificates are verified
    /// against `host`, and a differing value is reported with
    /// [`server_name_mismatch`](Self::server_name_mismatch).
    pub server_name: String,
    pub port: u16,
    pub use_ssl: bool,
    pub skip_tls: bool,
    pub insecure_skip_verify: bool,
    pub bind_dn: String,
    #[serde(skip_serializing)]
    pub bind_password: String,
    pub user_filter: String,
    pub group_filter: String,
    pub attributes: AttributeMap,
    /// Validity window of a successful login, in seconds
    pub ttl: i64,
    #[serde(rename = "timeout_seconds", serialize_with = "serialize_secs")]
    pub timeout: Duration,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("base", &self.base)
            .field("host", &self.host)
            .field("server_name", &self.server_name)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("skip_tls", &self.skip_tls)
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"***")
            .field("user_filter", &self.user_filter)
            .field("group_filter", &self.group_filter)
            .field("attributes", &self.attributes)
            .field("ttl", &self.ttl)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ConnectionProfile {
    /// Build a profile from raw configuration. Never fails.
    pub fn load(raw: &HashMap<String, String>) -> Self {
        let text = |key: &str| raw.get(key).cloned().unwrap_or_default();
        let value = |key: &str| raw.get(key).map(String::as_str).unwrap_or("");

        let timeout = match value(TIMEOUT).parse::<u64>() {
            Ok(secs) if secs > 0 => secs,
            _ => DEFAULT_TIMEOUT_SECONDS,
        };

        Self {
            base: text(BASE),
            host: text(HOST),
            server_name: text(SERVER_NAME),
            port: value(PORT).parse().unwrap_or(0),
            use_ssl: parse_bool(value(USE_SSL)).unwrap_or(false),
            skip_tls: parse_bool(value(SKIP_TLS)).unwrap_or(false),
            insecure_skip_verify: parse_bool(value(INSECURE_SKIP_VERIFY)).unwrap_or(false),
            bind_dn: text(BIND_DN),
            bind_password: text(BIND_PASSWORD),
            user_filter: text(USER_FILTER),
            group_filter: text(GROUP_FILTER),
            attributes: AttributeMap {
                username: text(ATTRIBUTE_USERNAME),
                name: text(ATTRIBUTE_NAME),
                email: text(ATTRIBUTE_EMAIL),
            },
            ttl: value(TTL).parse().unwrap_or(0),
            timeout: Duration::from_secs(timeout),
        }
    }

    /// Keys present in `raw` whose value could not be coerced by [`load`](Self::load)
    pub fn malformed_keys(raw: &HashMap<String, String>) -> Vec<&'static str> {
        let mut malformed = Vec::new();
        let present = |key: &str| raw.get(key).filter(|v| !v.is_empty());

        if present(PORT).is_some_and(|v| v.parse::<u16>().is_err()) {
            malformed.push(PORT);
        }
        for key in [USE_SSL, SKIP_TLS, INSECURE_SKIP_VERIFY] {
            if present(key).is_some_and(|v| parse_bool(v).is_none()) {
                malformed.push(key);
            }
        }
        if present(TTL).is_some_and(|v| v.parse::<i64>().is_err()) {
            malformed.push(TTL);
        }
        if present(TIMEOUT).is_some_and(|v| v.parse::<u64>().is_err()) {
            malformed.push(TIMEOUT);
        }

        malformed
    }

    /// Connection URL; a zero port leaves the scheme default in place
    pub fn url(&self) -> String {
        let scheme = if self.use_ssl { "ldaps" } else { "ldap" };
        if self.port == 0 {
            format!("{}://{}", scheme, self.host)
        } else {
            format!("{}://{}:{}", scheme, self.host, self.port)
        }
    }

    /// Plain connections are upgraded unless TLS is explicitly skipped
    pub fn use_starttls(&self) -> bool {
        !self.use_ssl && !self.skip_tls
    }

    /// Whether a service account bind precedes user lookups
    pub fn has_service_account(&self) -> bool {
        !self.bind_dn.is_empty() && !self.bind_password.is_empty()
    }

    pub fn user_filter_for(&self, username: &str) -> String {
        apply_template(&self.user_filter, username)
    }

    /// `None` when no group filter is configured
    pub fn group_filter_for(&self, username: &str) -> Option<String> {
        if self.group_filter.is_empty() {
            return None;
        }
        Some(apply_template(&self.group_filter, username))
    }

    /// Whether an LDAPS profile names a TLS server other than its host
    pub fn server_name_mismatch(&self) -> bool {
        self.use_ssl && !self.server_name.is_empty() && self.server_name != self.host
    }

    /// Attributes fetched with the user entry, without blanks or repeats
    pub fn requested_attributes(&self) -> Vec<&str> {
        let mut attrs: Vec<&str> = Vec::with_capacity(3);
        for attr in [
            &self.attributes.username,
            &self.attributes.name,
            &self.attributes.email,
        ] {
            if !attr.is_empty() && !attrs.contains(&attr.as_str()) {
                attrs.push(attr);
            }
        }
        attrs
    }
}

/// Substitute the escaped username at `%s`, or at `{username}` when the
/// template has no `%s`
fn apply_template(template: &str, username: &str) -> String {
    let escaped = ldap_escape(username);
    if template.contains("%s") {
        template.replace("%s", &escaped)
    } else {
        template.replace("{username}", &escaped)
    }
}

/// Boolean spellings accepted by the configuration format
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_raw() -> HashMap<String, String> {
        raw(&[
            (BASE, "dc=example,dc=org"),
            (HOST, "ldap.example.org"),
            (SERVER_NAME, "ldap.example.org"),
            (PORT, "389"),
            (USE_SSL, "false"),
            (SKIP_TLS, "true"),
            (INSECURE_SKIP_VERIFY, "1"),
            (BIND_DN, "cn=admin,dc=example,dc=org"),
            (BIND_PASSWORD, "admin"),
            (USER_FILTER, "(uid=%s)"),
            (GROUP_FILTER, "(memberUid=%s)"),
            (ATTRIBUTE_USERNAME, "uid"),
            (ATTRIBUTE_NAME, "givenName"),
            (ATTRIBUTE_EMAIL, "mail"),
            (TTL, "3600"),
        ])
    }

    #[test]
    fn test_load_typed_fields() {
        let profile = ConnectionProfile::load(&full_raw());

        assert_eq!(profile.base, "dc=example,dc=org");
        assert_eq!(profile.host, "ldap.example.org");
        assert_eq!(profile.server_name, "ldap.example.org");
        assert_eq!(profile.port, 389);
        assert!(!profile.use_ssl);
        assert!(profile.skip_tls);
        assert!(profile.insecure_skip_verify);
        assert_eq!(profile.bind_dn, "cn=admin,dc=example,dc=org");
        assert_eq!(profile.bind_password, "admin");
        assert_eq!(profile.user_filter, "(uid=%s)");
        assert_eq!(profile.group_filter, "(memberUid=%s)");
        assert_eq!(profile.attributes.username, "uid");
        assert_eq!(profile.attributes.name, "givenName");
        assert_eq!(profile.attributes.email, "mail");
        assert_eq!(profile.ttl, 3600);
        assert_eq!(profile.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECONDS));
        assert!(ConnectionProfile::malformed_keys(&full_raw()).is_empty());
    }

    #[test]
    fn test_malformed_values_become_zero() {
        let input = raw(&[
            (PORT, "three-eight-nine"),
            (USE_SSL, "yes"),
            (SKIP_TLS, "maybe"),
            (INSECURE_SKIP_VERIFY, "on"),
            (TTL, "1h"),
            (TIMEOUT, "soon"),
        ]);
        let profile = ConnectionProfile::load(&input);

        assert_eq!(profile.port, 0);
        assert!(!profile.use_ssl);
        assert!(!profile.skip_tls);
        assert!(!profile.insecure_skip_verify);
        assert_eq!(profile.ttl, 0);
        assert_eq!(profile.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECONDS));

        assert_eq!(
            ConnectionProfile::malformed_keys(&input),
            vec![PORT, USE_SSL, SKIP_TLS, INSECURE_SKIP_VERIFY, TTL, TIMEOUT]
        );
    }

    #[test]
    fn test_missing_keys_are_not_malformed() {
        let input = raw(&[(HOST, "localhost"), (PORT, "")]);
        let profile = ConnectionProfile::load(&input);

        assert_eq!(profile.port, 0);
        assert!(profile.base.is_empty());
        assert!(ConnectionProfile::malformed_keys(&input).is_empty());
    }

    #[test]
    fn test_port_out_of_range() {
        let profile = ConnectionProfile::load(&raw(&[(PORT, "70000")]));
        assert_eq!(profile.port, 0);
    }

    #[test]
    fn test_url_and_tls_mode() {
        let mut profile = ConnectionProfile::load(&full_raw());
        assert_eq!(profile.url(), "ldap://ldap.example.org:389");
        assert!(!profile.use_starttls());

        profile.skip_tls = false;
        assert!(profile.use_starttls());

        profile.use_ssl = true;
        profile.port = 0;
        assert_eq!(profile.url(), "ldaps://ldap.example.org");
        assert!(!profile.use_starttls());
    }

    #[test]
    fn test_filter_building() {
        let profile = ConnectionProfile::load(&full_raw());
        assert_eq!(profile.user_filter_for("john"), "(uid=john)");
        assert_eq!(
            profile.group_filter_for("john").as_deref(),
            Some("(memberUid=john)")
        );

        let braces = ConnectionProfile::load(&raw(&[(USER_FILTER, "(sAMAccountName={username})")]));
        assert_eq!(braces.user_filter_for("jdoe"), "(sAMAccountName=jdoe)");
    }

    #[test]
    fn test_empty_group_filter_skips_lookup() {
        let profile = ConnectionProfile::load(&raw(&[(USER_FILTER, "(uid=%s)")]));
        assert_eq!(profile.group_filter_for("john"), None);
    }

    #[test]
    fn test_server_name_mismatch() {
        let mut profile = ConnectionProfile::load(&full_raw());
        profile.use_ssl = true;
        assert!(!profile.server_name_mismatch());

        profile.server_name = "dc01.corp.example.org".to_string();
        assert!(profile.server_name_mismatch());
        assert_eq!(profile.server_name, "dc01.corp.example.org");

        profile.use_ssl = false;
        assert!(!profile.server_name_mismatch());

        profile.use_ssl = true;
        profile.server_name.clear();
        assert!(!profile.server_name_mismatch());
    }

    #[test]
    fn test_filter_escapes_username() {
        let profile = ConnectionProfile::load(&full_raw());
        let filter = profile.user_filter_for("*)(uid=*").to_ascii_lowercase();
        assert_eq!(filter, "(uid=\\2a\\29\\28uid=\\2a)");
    }

    #[test]
    fn test_requested_attributes() {
        let profile = ConnectionProfile::load(&full_raw());
        assert_eq!(profile.requested_attributes(), vec!["uid", "givenName", "mail"]);

        let sparse = ConnectionProfile::load(&raw(&[
            (ATTRIBUTE_USERNAME, "uid"),
            (ATTRIBUTE_NAME, "uid"),
        ]));
        assert_eq!(sparse.requested_attributes(), vec!["uid"]);
    }

    #[test]
    fn test_password_is_redacted() {
        let profile = ConnectionProfile::load(&full_raw());

        let debug = format!("{:?}", profile);
        assert!(!debug.contains("admin\""));
        assert!(debug.contains("***"));

        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("bind_password").is_none());
        assert_eq!(json["timeout_seconds"], DEFAULT_TIMEOUT_SECONDS);
    }
}
