//! Dispatcher queue actions.
//!
//! Each workflow state maps to at most one recommended action. The backend is
//! the only authority on whether a transition is legal; this table only picks
//! which button a dispatcher sees and what payload it posts.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::{ApiError, ErrorCode};
use crate::model::ticket::{ParseEnumError, Ticket, TicketType, WorkflowState};

/// Default page size for dispatcher queue fetches.
pub const QUEUE_FETCH_LIMIT: u32 = 300;

/// Named, server-filtered dispatcher worklists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Queue {
    #[default]
    All,
    Approval,
    Needstech,
    Goback,
    Returns,
}

impl Queue {
    pub const ALL: [Self; 5] = [
        Self::All,
        Self::Approval,
        Self::Needstech,
        Self::Goback,
        Self::Returns,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Approval => "approval",
            Self::Needstech => "needstech",
            Self::Goback => "goback",
            Self::Returns => "returns",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Approval => "Pending Approval",
            Self::Needstech => "Needs Tech",
            Self::Goback => "Go Back",
            Self::Returns => "Returns/Follow Up",
        }
    }

    /// Workflow states the backend currently buckets into this queue.
    ///
    /// Informational only: membership is decided server-side.
    #[must_use]
    pub fn member_states(self) -> Vec<WorkflowState> {
        match self {
            Self::Approval => vec![
                WorkflowState::PendingApproval,
                WorkflowState::NroReadyForCompletion,
            ],
            Self::Needstech => vec![
                WorkflowState::Needstech,
                WorkflowState::NroPhase1CompletePendingPhase2,
            ],
            Self::Goback => vec![
                WorkflowState::GobackRequired,
                WorkflowState::NroPhase1GobackRequired,
                WorkflowState::NroPhase2GobackRequired,
            ],
            Self::Returns => vec![WorkflowState::FollowupRequired],
            Self::All => [Self::Approval, Self::Needstech, Self::Goback, Self::Returns]
                .into_iter()
                .flat_map(Self::member_states)
                .collect(),
        }
    }
}

impl fmt::Display for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Queue {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|q| q.as_str() == normalized)
            .ok_or_else(|| ParseEnumError {
                expected: "queue",
                got: s.to_string(),
            })
    }
}

/// Parameters of a generic workflow transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionSpec {
    pub target: WorkflowState,
    pub convert_to_type: Option<TicketType>,
    pub requires_date: bool,
    pub default_notes: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// `POST /tickets/{id}/approve?approve=true`, which also archives.
    Approve,
    /// `POST /tickets/{id}/workflow-transition`.
    Transition(TransitionSpec),
}

/// The single recommended action for a queue row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueAction {
    pub label: &'static str,
    pub kind: ActionKind,
}

impl QueueAction {
    #[must_use]
    pub const fn requires_date(&self) -> bool {
        match self.kind {
            ActionKind::Approve => false,
            ActionKind::Transition(spec) => spec.requires_date,
        }
    }

    #[must_use]
    pub const fn target(&self) -> Option<WorkflowState> {
        match self.kind {
            ActionKind::Approve => None,
            ActionKind::Transition(spec) => Some(spec.target),
        }
    }

    /// Title of the dialog that collects extra data for this action.
    #[must_use]
    pub fn title(&self, state: WorkflowState, ticket_id: &str) -> String {
        match state {
            WorkflowState::PendingApproval => format!("Approve ticket {ticket_id}?"),
            WorkflowState::Needstech => format!("Convert and schedule {ticket_id}"),
            WorkflowState::GobackRequired => format!("Set go-back date for {ticket_id}"),
            WorkflowState::NroPhase1CompletePendingPhase2 => {
                format!("Schedule NRO phase 2 for {ticket_id}")
            }
            WorkflowState::NroPhase1GobackRequired => {
                format!("Reschedule NRO phase 1 for {ticket_id}")
            }
            WorkflowState::NroPhase2GobackRequired => {
                format!("Reschedule NRO phase 2 for {ticket_id}")
            }
            _ => format!("{} {ticket_id}", self.label),
        }
    }
}

const fn transition(
    label: &'static str,
    target: WorkflowState,
    convert_to_type: Option<TicketType>,
    requires_date: bool,
    default_notes: &'static str,
) -> QueueAction {
    QueueAction {
        label,
        kind: ActionKind::Transition(TransitionSpec {
            target,
            convert_to_type,
            requires_date,
            default_notes,
        }),
    }
}

/// Recommended action for a ticket in `state`, or `None` when the dispatcher
/// has nothing to do for it.
#[must_use]
pub const fn action_for(state: WorkflowState) -> Option<QueueAction> {
    use WorkflowState as S;

    let action = match state {
        S::PendingApproval => QueueAction {
            label: "Approve",
            kind: ActionKind::Approve,
        },
        S::Needstech => transition(
            "Convert/Schedule",
            S::Scheduled,
            Some(TicketType::Onsite),
            true,
            "Converted from inhouse needstech to onsite scheduled",
        ),
        S::GobackRequired => transition(
            "Set Go-Back",
            S::Scheduled,
            None,
            true,
            "Go-back date scheduled",
        ),
        S::FollowupRequired => transition(
            "Mark Reviewed",
            S::PendingDispatchReview,
            None,
            false,
            "Follow-up reviewed by dispatcher",
        ),
        S::NroPhase1Scheduled => transition(
            "Phase 1 Done",
            S::NroPhase1CompletePendingPhase2,
            None,
            false,
            "Phase 1 marked complete",
        ),
        S::NroPhase1CompletePendingPhase2 => transition(
            "Schedule Phase 2",
            S::NroPhase2Scheduled,
            None,
            true,
            "Phase 2 scheduled",
        ),
        S::NroPhase1GobackRequired => transition(
            "Reschedule P1",
            S::NroPhase1Scheduled,
            None,
            true,
            "Phase 1 go-back scheduled",
        ),
        S::NroPhase2GobackRequired => transition(
            "Reschedule P2",
            S::NroPhase2Scheduled,
            None,
            true,
            "Phase 2 go-back scheduled",
        ),
        S::NroPhase2Scheduled => transition(
            "Phase 2 Done",
            S::NroReadyForCompletion,
            None,
            false,
            "Phase 2 marked complete; ready for completion",
        ),
        S::New
        | S::Scheduled
        | S::Claimed
        | S::Onsite
        | S::Offsite
        | S::PendingDispatchReview
        | S::ReadyToArchive
        | S::NroReadyForCompletion => return None,
    };
    Some(action)
}

/// Action for a ticket row; unknown or missing states offer nothing.
#[must_use]
pub fn action_for_ticket(ticket: &Ticket) -> Option<QueueAction> {
    ticket.workflow().and_then(action_for)
}

/// Body of `POST /tickets/{id}/workflow-transition`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub workflow_state: WorkflowState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convert_to_type: Option<TicketType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub expected_ticket_version: i64,
}

/// Data collected before a transition is submitted.
///
/// Mirrors the queue dialog: the date starts from the ticket's current
/// schedule and the notes start from the action's default text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionDraft {
    pub ticket_id: String,
    pub spec: TransitionSpec,
    pub expected_version: i64,
    pub schedule_date: String,
    pub notes: String,
}

impl TransitionDraft {
    #[must_use]
    pub fn new(ticket: &Ticket, spec: TransitionSpec) -> Self {
        Self {
            ticket_id: ticket.ticket_id.clone(),
            spec,
            expected_version: ticket.expected_version(),
            schedule_date: ticket.date_scheduled.clone().unwrap_or_default(),
            notes: spec.default_notes.to_string(),
        }
    }

    #[must_use]
    pub fn with_schedule_date(mut self, date: impl Into<String>) -> Self {
        self.schedule_date = date.into();
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Validate the draft and build the request body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidInput`] when the action needs a schedule
    /// date and none was chosen. Nothing is sent in that case.
    pub fn submit(&self) -> Result<TransitionRequest, ApiError> {
        let date = self.schedule_date.trim();
        if self.spec.requires_date && date.is_empty() {
            return Err(ApiError::invalid_input(
                ErrorCode::MissingScheduleDate,
                "Please select a date before applying this action.",
            ));
        }

        let notes = self.notes.trim();
        Ok(TransitionRequest {
            workflow_state: self.spec.target,
            convert_to_type: self.spec.convert_to_type,
            schedule_date: self.spec.requires_date.then(|| date.to_string()),
            notes: (!notes.is_empty()).then(|| notes.to_string()),
            expected_ticket_version: self.expected_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ticket(state: &str, version: Option<i64>, scheduled: Option<&str>) -> Ticket {
        serde_json::from_value(json!({
            "ticket_id": "T-1",
            "site_id": "S-1",
            "workflow_state": state,
            "ticket_version": version,
            "date_scheduled": scheduled,
        }))
        .expect("ticket fixture")
    }

    #[test]
    fn action_table_matches_dispatch_rules() {
        use WorkflowState as S;
        let expected: [(S, &str, Option<S>, bool); 9] = [
            (S::PendingApproval, "Approve", None, false),
            (S::Needstech, "Convert/Schedule", Some(S::Scheduled), true),
            (S::GobackRequired, "Set Go-Back", Some(S::Scheduled), true),
            (S::FollowupRequired, "Mark Reviewed", Some(S::PendingDispatchReview), false),
            (S::NroPhase1Scheduled, "Phase 1 Done", Some(S::NroPhase1CompletePendingPhase2), false),
            (S::NroPhase1CompletePendingPhase2, "Schedule Phase 2", Some(S::NroPhase2Scheduled), true),
            (S::NroPhase1GobackRequired, "Reschedule P1", Some(S::NroPhase1Scheduled), true),
            (S::NroPhase2GobackRequired, "Reschedule P2", Some(S::NroPhase2Scheduled), true),
            (S::NroPhase2Scheduled, "Phase 2 Done", Some(S::NroReadyForCompletion), false),
        ];

        for (state, label, target, requires_date) in expected {
            let action = action_for(state).unwrap_or_else(|| panic!("{state} should have an action"));
            assert_eq!(action.label, label, "label for {state}");
            assert_eq!(action.target(), target, "target for {state}");
            assert_eq!(action.requires_date(), requires_date, "date rule for {state}");
        }

        let with_action: Vec<_> = WorkflowState::ALL
            .into_iter()
            .filter(|s| action_for(*s).is_some())
            .collect();
        assert_eq!(with_action.len(), expected.len());
    }

    #[test]
    fn states_outside_the_table_offer_nothing() {
        for state in [
            WorkflowState::New,
            WorkflowState::Scheduled,
            WorkflowState::Claimed,
            WorkflowState::Onsite,
            WorkflowState::Offsite,
            WorkflowState::PendingDispatchReview,
            WorkflowState::ReadyToArchive,
            WorkflowState::NroReadyForCompletion,
        ] {
            assert!(action_for(state).is_none(), "{state} must not offer an action");
        }
        assert!(action_for_ticket(&ticket("mystery", None, None)).is_none());
    }

    #[test]
    fn needstech_converts_to_onsite() {
        let Some(QueueAction {
            kind: ActionKind::Transition(spec),
            ..
        }) = action_for(WorkflowState::Needstech)
        else {
            panic!("needstech must be a transition");
        };
        assert_eq!(spec.convert_to_type, Some(TicketType::Onsite));
    }

    #[test]
    fn missing_date_blocks_submission() {
        let t = ticket("needstech", Some(2), None);
        let action = action_for_ticket(&t).expect("action");
        let ActionKind::Transition(spec) = action.kind else {
            panic!("expected transition");
        };

        let err = TransitionDraft::new(&t, spec)
            .with_schedule_date("   ")
            .submit()
            .expect_err("must be blocked");
        assert_eq!(err.error_code(), ErrorCode::MissingScheduleDate);
        assert!(err.to_string().contains("select a date"));
    }

    #[test]
    fn submitted_request_carries_version_date_and_conversion() {
        let t = ticket("needstech", Some(7), None);
        let ActionKind::Transition(spec) = action_for_ticket(&t).expect("action").kind else {
            panic!("expected transition");
        };

        let request = TransitionDraft::new(&t, spec)
            .with_schedule_date("2026-11-02")
            .submit()
            .expect("valid");

        assert_eq!(
            serde_json::to_value(&request).expect("serialize"),
            json!({
                "workflow_state": "scheduled",
                "convert_to_type": "onsite",
                "schedule_date": "2026-11-02",
                "notes": "Converted from inhouse needstech to onsite scheduled",
                "expected_ticket_version": 7
            })
        );
    }

    #[test]
    fn draft_prefills_date_from_ticket_schedule() {
        let t = ticket("goback_required", Some(3), Some("2026-10-20"));
        let ActionKind::Transition(spec) = action_for_ticket(&t).expect("action").kind else {
            panic!("expected transition");
        };
        let request = TransitionDraft::new(&t, spec).submit().expect("prefilled");
        assert_eq!(request.schedule_date.as_deref(), Some("2026-10-20"));
    }

    #[test]
    fn dateless_actions_omit_date_and_blank_notes() {
        let t = ticket("followup_required", None, Some("2026-10-20"));
        let ActionKind::Transition(spec) = action_for_ticket(&t).expect("action").kind else {
            panic!("expected transition");
        };
        let request = TransitionDraft::new(&t, spec)
            .with_notes("  ")
            .submit()
            .expect("valid");

        assert_eq!(request.schedule_date, None);
        assert_eq!(request.notes, None);
        assert_eq!(request.expected_ticket_version, 1);
        let body = serde_json::to_value(&request).expect("serialize");
        assert!(body.get("convert_to_type").is_none());
    }

    #[test]
    fn queue_parse_and_membership() {
        assert_eq!("GoBack".parse::<Queue>().ok(), Some(Queue::Goback));
        assert!("later".parse::<Queue>().is_err());
        assert_eq!(Queue::Returns.member_states(), vec![WorkflowState::FollowupRequired]);
        assert_eq!(Queue::All.member_states().len(), 8);
        assert_eq!(Queue::Returns.label(), "Returns/Follow Up");
    }

    #[test]
    fn dialog_titles_name_the_ticket() {
        let approve = action_for(WorkflowState::PendingApproval).expect("action");
        assert_eq!(
            approve.title(WorkflowState::PendingApproval, "T-9"),
            "Approve ticket T-9?"
        );
        let done = action_for(WorkflowState::NroPhase2Scheduled).expect("action");
        assert_eq!(done.title(WorkflowState::NroPhase2Scheduled, "T-9"), "Phase 2 Done T-9");
    }
}
