//! Access-token and password resolution for CLI commands.
//!
//! Token chain: `--token` flag > `FIELDOPS_TOKEN` env > saved session.
//! Password chain for `fo login`: `--password` > `FIELDOPS_PASSWORD` env >
//! one line read from stdin.

use anyhow::{Context, Result};
use fieldops_core::session::{Session, SessionStore};
use serde::Serialize;
use std::env;
use std::io::{self, BufRead, Write};

pub const TOKEN_ENV: &str = "FIELDOPS_TOKEN";
pub const PASSWORD_ENV: &str = "FIELDOPS_PASSWORD";

/// Where the active token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenSource {
    Flag,
    Env,
    Session,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    pub token: String,
    pub source: TokenSource,
}

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
    fn is_tty(&self) -> bool;
}

/// Real environment reader.
struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    fn is_tty(&self) -> bool {
        use std::io::IsTerminal;
        io::stdin().is_terminal()
    }
}

fn resolve_token_with(
    cli_flag: Option<&str>,
    env: &dyn EnvReader,
    session: Option<&Session>,
) -> Option<ResolvedToken> {
    if let Some(token) = cli_flag.map(str::trim).filter(|t| !t.is_empty()) {
        return Some(ResolvedToken {
            token: token.to_string(),
            source: TokenSource::Flag,
        });
    }

    if let Some(token) = env.get(TOKEN_ENV) {
        return Some(ResolvedToken {
            token: token.trim().to_string(),
            source: TokenSource::Env,
        });
    }

    session
        .filter(|s| !s.access_token.is_empty())
        .map(|s| ResolvedToken {
            token: s.access_token.clone(),
            source: TokenSource::Session,
        })
}

/// Resolve the bearer token for this invocation.
///
/// A session file that cannot be parsed is treated as absent.
pub fn resolve_token(cli_flag: Option<&str>, store: &SessionStore) -> Option<ResolvedToken> {
    let session = match store.load() {
        Ok(session) => session,
        Err(err) => {
            tracing::warn!("ignoring unreadable session: {err:#}");
            None
        }
    };
    resolve_token_with(cli_flag, &RealEnv, session.as_ref())
}

fn resolve_password_with(
    cli_flag: Option<&str>,
    env: &dyn EnvReader,
    input: &mut dyn BufRead,
    prompt: &mut dyn Write,
) -> Result<String> {
    if let Some(password) = cli_flag.filter(|p| !p.is_empty()) {
        return Ok(password.to_string());
    }

    if let Some(password) = env.get(PASSWORD_ENV) {
        return Ok(password);
    }

    if env.is_tty() {
        write!(prompt, "Password: ")?;
        prompt.flush()?;
    }
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("No password given. Pass --password, set {PASSWORD_ENV}, or pipe it on stdin.");
    }
    Ok(password)
}

pub fn resolve_password(cli_flag: Option<&str>) -> Result<String> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut prompt = io::stderr();
    resolve_password_with(cli_flag, &RealEnv, &mut input, &mut prompt)
}
