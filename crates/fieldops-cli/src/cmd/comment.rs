//! `fo comment`: append a comment to a ticket.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use serde_json::Value;

use crate::context::AppContext;
use crate::output::render;
use crate::validate;

#[derive(Args, Debug)]
pub struct CommentArgs {
    /// Ticket to comment on.
    pub id: String,

    /// Comment text.
    pub text: String,
}

#[derive(Debug, Serialize)]
struct CommentOutput {
    ok: bool,
    ticket_id: String,
    comment: Value,
}

pub fn run_comment(args: &CommentArgs, ctx: &AppContext) -> Result<()> {
    validate::validate_ticket_id(&args.id)?;
    validate::validate_comment(&args.text)?;

    let client = ctx.client()?;
    let stored = client.add_comment(&args.id, args.text.trim())?;

    let out = CommentOutput {
        ok: true,
        ticket_id: args.id.clone(),
        comment: stored,
    };
    render(ctx.output, &out, |o, w| writeln!(w, "Comment added to {}", o.ticket_id))
}
