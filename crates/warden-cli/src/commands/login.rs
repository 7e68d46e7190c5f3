//! login command - verify credentials against the directory

use super::CommandContext;
use anyhow::{Context, Result};
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use warden_auth::LdapProvider;
use warden_core::{LoginError, SecurityManager};

pub async fn execute(
    ctx: &CommandContext,
    username: &str,
    password: Option<String>,
) -> Result<ExitCode> {
    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };

    let provider = LdapProvider::new(&ctx.config.ldap);

    match provider.login(username, &password).await {
        Ok(identity) => {
            if ctx.is_json() {
                let body = serde_json::json!({
                    "identity": identity,
                    "ttl": provider.ttl(),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                let info = identity.user_info();
                println!("{} {}", "Authenticated".green().bold(), info.username);
                println!("  Name:  {}", info.name);
                println!("  Email: {}", info.email);
                println!("  Roles: {}", identity.roles().join(", "));
                println!("  TTL:   {}s", provider.ttl());
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            if ctx.is_json() {
                let body = serde_json::json!({
                    "code": err.code(),
                    "retryable": err.is_retryable(),
                    "error": err.to_string(),
                    "cause": err.cause().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                eprintln!("{} ({}): {}", "Login failed".red().bold(), err.code(), err);
            }
            Ok(ExitCode::from(exit_status(&err)))
        }
    }
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;

    Ok(strip_line_ending(&line).to_string())
}

/// Drop only the trailing newline; other whitespace belongs to the password
fn strip_line_ending(line: &str) -> &str {
    line.strip_suffix("\r\n")
        .or_else(|| line.strip_suffix('\n'))
        .unwrap_or(line)
}

/// 1 for credential or connectivity failures, 2 for provider faults
fn exit_status(err: &LoginError) -> u8 {
    match err.code() {
        500 => 2,
        _ => 1,
    }
}
