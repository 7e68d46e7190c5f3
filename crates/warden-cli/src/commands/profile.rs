//! profile command - show the parsed directory profile

use super::CommandContext;
use anyhow::Result;
use colored::Colorize;
use std::process::ExitCode;
use warden_auth::ldap::DEFAULT_TIMEOUT_SECONDS;
use warden_auth::ConnectionProfile;

pub fn execute(ctx: &CommandContext) -> Result<ExitCode> {
    let raw = &ctx.config.ldap;
    let profile = ConnectionProfile::load(raw);
    let malformed = ConnectionProfile::malformed_keys(raw);

    if ctx.is_json() {
        let body = serde_json::json!({
            "url": profile.url(),
            "starttls": profile.use_starttls(),
            "profile": profile,
            "malformed_keys": malformed,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", "Directory profile:".bold());
    println!();
    println!("  {}: {}", "url".cyan(), profile.url());
    println!("  {}: {}", "starttls".cyan(), profile.use_starttls());
    println!("  {}: {}", "insecureSkipVerify".cyan(), profile.insecure_skip_verify);
    println!("  {}: {}", "serverName".cyan(), profile.server_name);
    println!("  {}: {}", "base".cyan(), profile.base);
    println!("  {}: {}", "bindDN".cyan(), profile.bind_dn);
    println!(
        "  {}: {}",
        "bindPassword".cyan(),
        if profile.bind_password.is_empty() { "(not set)" } else { "***" }
    );
    println!("  {}: {}", "userFilter".cyan(), profile.user_filter);
    println!("  {}: {}", "groupFilter".cyan(), profile.group_filter);
    println!("  {}: {}", "attributeUsername".cyan(), profile.attributes.username);
    println!("  {}: {}", "attributeName".cyan(), profile.attributes.name);
    println!("  {}: {}", "attributeEmail".cyan(), profile.attributes.email);
    println!("  {}: {}s", "ttl".cyan(), profile.ttl);
    println!("  {}: {}s", "timeout".cyan(), profile.timeout.as_secs());

    if !malformed.is_empty() {
        println!();
        println!(
            "{} {}",
            "Malformed keys:".yellow().bold(),
            malformed_note(&malformed)
        );
    }

    Ok(ExitCode::SUCCESS)
}

/// List malformed keys with the value each one was loaded as
fn malformed_note(keys: &[&str]) -> String {
    keys.iter()
        .map(|key| match *key {
            "timeout" => format!("timeout (loaded as {}s default)", DEFAULT_TIMEOUT_SECONDS),
            "useSSL" | "skipTLS" | "insecureSkipVerify" => format!("{} (loaded as false)", key),
            _ => format!("{} (loaded as 0)", key),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
