//! `fo check-in`, `fo check-out`, `fo complete`, `fo claim`.
//!
//! Each action is followed by a fresh fetch of the ticket; the printed state
//! is the server's, never a local guess.

use anyhow::Result;
use clap::Args;
use fieldops_core::client::QuickAction;
use serde::Serialize;

use crate::cmd::or_dash;
use crate::context::AppContext;
use crate::output::{pretty_kv, render};
use crate::validate;

#[derive(Args, Debug)]
pub struct QuickArgs {
    /// Ticket to act on.
    pub id: String,
}

#[derive(Args, Debug)]
pub struct ClaimArgs {
    /// Ticket to claim.
    pub id: String,

    /// Claim on behalf of this user id instead of yourself.
    #[arg(long)]
    pub by: Option<String>,
}

impl ClaimArgs {
    pub fn action(&self) -> QuickAction {
        QuickAction::Claim {
            claimed_by: self
                .by
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
struct QuickOutput {
    ok: bool,
    action: &'static str,
    ticket_id: String,
    status: Option<String>,
    workflow_state: Option<String>,
    claimed_by: Option<String>,
    ticket_version: Option<i64>,
}

pub fn run_quick(id: &str, action: &QuickAction, ctx: &AppContext) -> Result<()> {
    validate::validate_ticket_id(id)?;
    let client = ctx.client()?;
    let ticket = client.quick_action(id, action)?;

    let out = QuickOutput {
        ok: true,
        action: action.label(),
        ticket_id: ticket.ticket_id.clone(),
        status: ticket.status.clone(),
        workflow_state: ticket.workflow_state.clone(),
        claimed_by: ticket.claimed_by.clone(),
        ticket_version: ticket.ticket_version,
    };
    render(ctx.output, &out, |o, w| {
        writeln!(w, "{} {}", o.action, o.ticket_id)?;
        pretty_kv(w, "status", or_dash(o.status.as_deref()))?;
        pretty_kv(w, "workflow", or_dash(o.workflow_state.as_deref()))?;
        if let Some(by) = &o.claimed_by {
            pretty_kv(w, "claimed by", by)?;
        }
        Ok(())
    })
}
