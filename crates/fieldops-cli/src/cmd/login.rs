//! `fo login` and `fo logout`: manage the saved access token.

use anyhow::Result;
use clap::Args;
use fieldops_core::session::Session;
use serde::Serialize;

use crate::context::AppContext;
use crate::credentials;
use crate::output::{pretty_kv, render};

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account name (usually an email address).
    #[arg(long, short)]
    pub username: String,

    /// Password. Falls back to FIELDOPS_PASSWORD, then one line on stdin.
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginOutput {
    ok: bool,
    username: String,
    token_type: String,
    must_change_password: bool,
    session_path: String,
}

#[derive(Debug, Serialize)]
struct LogoutOutput {
    ok: bool,
    removed: bool,
    session_path: String,
}

pub fn run_login(args: &LoginArgs, ctx: &AppContext) -> Result<()> {
    let username = args.username.trim();
    if username.is_empty() {
        anyhow::bail!("--username must not be empty");
    }
    let password = credentials::resolve_password(args.password.as_deref())?;

    let client = ctx.anonymous_client();
    let token = client.login(username, &password)?;

    let session = Session::new(
        token.access_token,
        token.token_type.clone(),
        Some(username.to_string()),
    );
    ctx.store().save(&session)?;

    let out = LoginOutput {
        ok: true,
        username: username.to_string(),
        token_type: token.token_type,
        must_change_password: token.must_change_password,
        session_path: ctx.store().path().display().to_string(),
    };
    render(ctx.output, &out, |o, w| {
        writeln!(w, "Logged in as {}", o.username)?;
        pretty_kv(w, "session", &o.session_path)?;
        if o.must_change_password {
            writeln!(w, "note: the server requires a password change for this account")?;
        }
        Ok(())
    })
}

pub fn run_logout(ctx: &AppContext) -> Result<()> {
    let removed = ctx.store().clear()?;
    let out = LogoutOutput {
        ok: true,
        removed,
        session_path: ctx.store().path().display().to_string(),
    };
    render(ctx.output, &out, |o, w| {
        if o.removed {
            writeln!(w, "Logged out")
        } else {
            writeln!(w, "No saved session")
        }
    })
}
