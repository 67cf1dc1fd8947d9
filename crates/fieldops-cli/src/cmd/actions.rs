//! `fo actions`: print the state → action table used by `fo queue`.

use anyhow::Result;
use fieldops_core::model::WorkflowState;
use fieldops_core::workflow::{ActionKind, action_for};
use serde::Serialize;

use crate::output::{OutputMode, pretty_section, render_mode};

#[derive(Debug, Serialize)]
struct ActionRow {
    state: WorkflowState,
    action: &'static str,
    target: Option<WorkflowState>,
    convert_to_type: Option<String>,
    requires_date: bool,
    default_notes: Option<&'static str>,
}

fn action_rows() -> Vec<ActionRow> {
    WorkflowState::ALL
        .into_iter()
        .filter_map(|state| {
            let action = action_for(state)?;
            let (convert, notes) = match action.kind {
                ActionKind::Approve => (None, None),
                ActionKind::Transition(spec) => (
                    spec.convert_to_type.map(|t| t.to_string()),
                    Some(spec.default_notes),
                ),
            };
            Some(ActionRow {
                state,
                action: action.label,
                target: action.target(),
                convert_to_type: convert,
                requires_date: action.requires_date(),
                default_notes: notes,
            })
        })
        .collect()
}

pub fn run_actions(output: OutputMode) -> Result<()> {
    let rows = action_rows();
    render_mode(
        output,
        &rows,
        |rows, w| {
            writeln!(w, "STATE  ACTION  TARGET  DATE")?;
            for r in rows {
                writeln!(
                    w,
                    "{}  {}  {}  {}",
                    r.state,
                    r.action,
                    r.target.map_or_else(|| "-".to_string(), |t| t.to_string()),
                    if r.requires_date { "yes" } else { "no" }
                )?;
            }
            Ok(())
        },
        |rows, w| {
            pretty_section(w, "Dispatcher actions")?;
            for r in rows {
                let target = match (r.target, &r.convert_to_type) {
                    (Some(t), Some(ty)) => format!("{t} (as {ty})"),
                    (Some(t), None) => t.to_string(),
                    (None, _) => "approve + archive".to_string(),
                };
                let date = if r.requires_date { "  [date]" } else { "" };
                writeln!(w, "{:<36} {:<18} → {target}{date}", r.state.as_str(), r.action)?;
            }
            Ok(())
        },
    )
}
