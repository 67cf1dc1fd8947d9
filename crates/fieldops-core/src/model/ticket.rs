use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};

/// Fine-grained lifecycle tag that drives dispatcher queues and row actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    New,
    Scheduled,
    Claimed,
    Onsite,
    Offsite,
    FollowupRequired,
    Needstech,
    GobackRequired,
    PendingDispatchReview,
    PendingApproval,
    ReadyToArchive,
    NroPhase1Scheduled,
    NroPhase1CompletePendingPhase2,
    NroPhase1GobackRequired,
    NroPhase2Scheduled,
    NroPhase2GobackRequired,
    NroReadyForCompletion,
}

impl WorkflowState {
    pub const ALL: [Self; 17] = [
        Self::New,
        Self::Scheduled,
        Self::Claimed,
        Self::Onsite,
        Self::Offsite,
        Self::FollowupRequired,
        Self::Needstech,
        Self::GobackRequired,
        Self::PendingDispatchReview,
        Self::PendingApproval,
        Self::ReadyToArchive,
        Self::NroPhase1Scheduled,
        Self::NroPhase1CompletePendingPhase2,
        Self::NroPhase1GobackRequired,
        Self::NroPhase2Scheduled,
        Self::NroPhase2GobackRequired,
        Self::NroReadyForCompletion,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Scheduled => "scheduled",
            Self::Claimed => "claimed",
            Self::Onsite => "onsite",
            Self::Offsite => "offsite",
            Self::FollowupRequired => "followup_required",
            Self::Needstech => "needstech",
            Self::GobackRequired => "goback_required",
            Self::PendingDispatchReview => "pending_dispatch_review",
            Self::PendingApproval => "pending_approval",
            Self::ReadyToArchive => "ready_to_archive",
            Self::NroPhase1Scheduled => "nro_phase1_scheduled",
            Self::NroPhase1CompletePendingPhase2 => "nro_phase1_complete_pending_phase2",
            Self::NroPhase1GobackRequired => "nro_phase1_goback_required",
            Self::NroPhase2Scheduled => "nro_phase2_scheduled",
            Self::NroPhase2GobackRequired => "nro_phase2_goback_required",
            Self::NroReadyForCompletion => "nro_ready_for_completion",
        }
    }

    /// NRO states only apply to tickets of type `nro`.
    #[must_use]
    pub const fn is_nro(self) -> bool {
        matches!(
            self,
            Self::NroPhase1Scheduled
                | Self::NroPhase1CompletePendingPhase2
                | Self::NroPhase1GobackRequired
                | Self::NroPhase2Scheduled
                | Self::NroPhase2GobackRequired
                | Self::NroReadyForCompletion
        )
    }
}

/// Coarse lifecycle status maintained by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    Scheduled,
    CheckedIn,
    InProgress,
    Pending,
    NeedsParts,
    GoBackScheduled,
    Completed,
    Closed,
    Approved,
    Archived,
}

impl TicketStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Scheduled => "scheduled",
            Self::CheckedIn => "checked_in",
            Self::InProgress => "in_progress",
            Self::Pending => "pending",
            Self::NeedsParts => "needs_parts",
            Self::GoBackScheduled => "go_back_scheduled",
            Self::Completed => "completed",
            Self::Closed => "closed",
            Self::Approved => "approved",
            Self::Archived => "archived",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketType {
    Inhouse,
    Onsite,
    Nro,
    Projects,
    Misc,
}

impl TicketType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inhouse => "inhouse",
            Self::Onsite => "onsite",
            Self::Nro => "nro",
            Self::Projects => "projects",
            Self::Misc => "misc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Normal,
    Critical,
    Emergency,
}

impl TicketPriority {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Critical => "critical",
            Self::Emergency => "emergency",
        }
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase()
}

macro_rules! text_enum {
    ($ty:ty, $expected:literal, [$($variant:expr),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = normalize(s);
                [$($variant),+]
                    .into_iter()
                    .find(|candidate| candidate.as_str() == normalized)
                    .ok_or_else(|| ParseEnumError {
                        expected: $expected,
                        got: s.to_string(),
                    })
            }
        }
    };
}

text_enum!(WorkflowState, "workflow state", [
    WorkflowState::New,
    WorkflowState::Scheduled,
    WorkflowState::Claimed,
    WorkflowState::Onsite,
    WorkflowState::Offsite,
    WorkflowState::FollowupRequired,
    WorkflowState::Needstech,
    WorkflowState::GobackRequired,
    WorkflowState::PendingDispatchReview,
    WorkflowState::PendingApproval,
    WorkflowState::ReadyToArchive,
    WorkflowState::NroPhase1Scheduled,
    WorkflowState::NroPhase1CompletePendingPhase2,
    WorkflowState::NroPhase1GobackRequired,
    WorkflowState::NroPhase2Scheduled,
    WorkflowState::NroPhase2GobackRequired,
    WorkflowState::NroReadyForCompletion,
]);

text_enum!(TicketStatus, "status", [
    TicketStatus::Open,
    TicketStatus::Scheduled,
    TicketStatus::CheckedIn,
    TicketStatus::InProgress,
    TicketStatus::Pending,
    TicketStatus::NeedsParts,
    TicketStatus::GoBackScheduled,
    TicketStatus::Completed,
    TicketStatus::Closed,
    TicketStatus::Approved,
    TicketStatus::Archived,
]);

text_enum!(TicketType, "ticket type", [
    TicketType::Inhouse,
    TicketType::Onsite,
    TicketType::Nro,
    TicketType::Projects,
    TicketType::Misc,
]);

text_enum!(TicketPriority, "priority", [
    TicketPriority::Normal,
    TicketPriority::Critical,
    TicketPriority::Emergency,
]);

/// Client-side copy of a ticket as returned by `GET /tickets/{id}`.
///
/// The backend owns the record; this copy may already be stale. Enum-valued
/// fields stay raw strings so a newer server vocabulary never breaks a whole
/// list fetch. Every field without a dedicated slot lands in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: String,
    #[serde(default)]
    pub site_id: Option<String>,
    #[serde(default)]
    pub inc_number: Option<String>,
    #[serde(default)]
    pub so_number: Option<String>,
    #[serde(default, rename = "type")]
    pub ticket_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub workflow_state: Option<String>,
    #[serde(default)]
    pub ticket_version: Option<i64>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub date_scheduled: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub assigned_user_id: Option<String>,
    #[serde(default)]
    pub claimed_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Ticket {
    /// Parsed workflow state, or `None` when absent or outside the known set.
    #[must_use]
    pub fn workflow(&self) -> Option<WorkflowState> {
        self.workflow_state.as_deref()?.parse().ok()
    }

    /// Version to send as `expected_ticket_version` for writes based on this copy.
    #[must_use]
    pub fn expected_version(&self) -> i64 {
        crate::concurrency::expected_version(self.ticket_version)
    }

    /// Short one-line identity used in tables and log lines.
    #[must_use]
    pub fn headline(&self) -> String {
        let site = self.site_id.as_deref().unwrap_or("-");
        let state = self.workflow_state.as_deref().unwrap_or("-");
        format!("{} @ {site} [{state}]", self.ticket_id)
    }
}
