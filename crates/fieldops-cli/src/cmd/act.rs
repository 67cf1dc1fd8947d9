//! `fo act`: run the recommended queue action for one ticket.
//!
//! Fetches the ticket, picks the action for its workflow state, collects the
//! schedule date and notes, submits, then re-fetches the queue so the
//! reported count matches what the dispatcher would see next.

use anyhow::Result;
use clap::Args;
use fieldops_core::error::{ApiError, ErrorCode};
use fieldops_core::model::{Ticket, WorkflowState};
use fieldops_core::workflow::{
    ActionKind, Queue, QueueAction, TransitionDraft, TransitionRequest, action_for,
};
use serde::Serialize;
use tracing::info;

use crate::cmd::confirm;
use crate::context::AppContext;
use crate::output::{pretty_kv, render};
use crate::validate;

#[derive(Args, Debug)]
pub struct ActArgs {
    /// Ticket to act on.
    pub id: String,

    /// Schedule date (YYYY-MM-DD). Defaults to the ticket's current schedule.
    #[arg(long, short)]
    pub date: Option<String>,

    /// Notes sent with the transition. Defaults to the action's stock text.
    #[arg(long, short)]
    pub notes: Option<String>,

    /// Skip the approval confirmation prompt.
    #[arg(long, short)]
    pub yes: bool,

    /// Queue to re-fetch afterwards (default from config).
    #[arg(long, short)]
    pub queue: Option<Queue>,
}

#[derive(Debug, Serialize)]
struct ActOutput {
    ok: bool,
    ticket_id: String,
    action: &'static str,
    from_state: WorkflowState,
    #[serde(skip_serializing_if = "Option::is_none")]
    to_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request: Option<TransitionRequest>,
    queue: Queue,
    queue_remaining: usize,
}

/// Action for `ticket`, or an error naming why there is none.
fn pick_action(ticket: &Ticket) -> Result<(WorkflowState, QueueAction), ApiError> {
    let raw = ticket.workflow_state.as_deref().unwrap_or("");
    let state = ticket.workflow().ok_or_else(|| {
        ApiError::invalid_input(
            ErrorCode::InvalidInput,
            format!("ticket {} has unknown workflow state '{raw}'", ticket.ticket_id),
        )
    })?;
    let action = action_for(state).ok_or_else(|| {
        ApiError::invalid_input(
            ErrorCode::InvalidInput,
            format!(
                "no dispatcher action for ticket {} in state {state}",
                ticket.ticket_id
            ),
        )
    })?;
    Ok((state, action))
}

/// Build the transition body from the ticket and the flags. No request is
/// made when this fails.
fn build_transition(
    ticket: &Ticket,
    action: &QueueAction,
    date: Option<&str>,
    notes: Option<&str>,
) -> Result<Option<TransitionRequest>> {
    let ActionKind::Transition(spec) = action.kind else {
        return Ok(None);
    };
    let mut draft = TransitionDraft::new(ticket, spec);
    if let Some(date) = date {
        draft = draft.with_schedule_date(validate::validate_schedule_date(date)?);
    }
    if let Some(notes) = notes {
        draft = draft.with_notes(notes);
    }
    Ok(Some(draft.submit()?))
}

pub fn run_act(args: &ActArgs, ctx: &AppContext) -> Result<()> {
    validate::validate_ticket_id(&args.id)?;
    let client = ctx.client()?;

    let ticket = client.get_ticket(&args.id)?;
    let (state, action) = pick_action(&ticket)?;
    info!(ticket = %ticket.headline(), action = action.label, "running queue action");
    let request = build_transition(&ticket, &action, args.date.as_deref(), args.notes.as_deref())?;

    match &request {
        None => {
            confirm(args.yes, &action.title(state, &args.id))?;
            client.approve_ticket(&args.id)?;
        }
        Some(body) => {
            client.transition(&args.id, body)?;
        }
    }

    let queue = args.queue.unwrap_or(ctx.config.dispatch.default_queue);
    let remaining = client.dispatch_queue(queue, ctx.config.dispatch.queue_limit, 0)?;

    let out = ActOutput {
        ok: true,
        ticket_id: args.id.clone(),
        action: action.label,
        from_state: state,
        to_state: action.target().map(|s| s.to_string()),
        request,
        queue,
        queue_remaining: remaining.len(),
    };
    render(ctx.output, &out, |o, w| {
        writeln!(w, "{}: {}", o.action, o.ticket_id)?;
        pretty_kv(w, "from", o.from_state.as_str())?;
        match &o.to_state {
            Some(to) => pretty_kv(w, "to", to)?,
            None => pretty_kv(w, "to", "approved (archived)")?,
        }
        if let Some(date) = o.request.as_ref().and_then(|r| r.schedule_date.as_deref()) {
            pretty_kv(w, "scheduled", date)?;
        }
        pretty_kv(w, "queue", format!("{} ({} left)", o.queue.label(), o.queue_remaining))
    })
}
