use std::fmt;

use thiserror::Error;

/// Fixed text shown when a version-guarded ticket write is rejected.
pub const CONFLICT_MESSAGE: &str =
    "This ticket was updated by another user. Refresh and retry your changes.";

pub const TIMEOUT_MESSAGE: &str =
    "Request timed out - the server may be slow or overloaded. Please try again.";

pub const NETWORK_MESSAGE: &str = "Network error - please check if the server is running";

pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized - please log in again";

/// Machine-readable error codes for scripts that drive the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    NotLoggedIn,
    Timeout,
    NetworkUnavailable,
    Unauthorized,
    NotFound,
    VersionConflict,
    ValidationFailed,
    MissingScheduleDate,
    InvalidInput,
    ServerRejected,
    DecodeFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::NotLoggedIn => "E1002",
            Self::Timeout => "E2001",
            Self::NetworkUnavailable => "E2002",
            Self::Unauthorized => "E3001",
            Self::NotFound => "E3002",
            Self::VersionConflict => "E3003",
            Self::ValidationFailed => "E3004",
            Self::ServerRejected => "E3005",
            Self::MissingScheduleDate => "E4001",
            Self::InvalidInput => "E4002",
            Self::DecodeFailed => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::NotLoggedIn => "No access token",
            Self::Timeout => "Request timed out",
            Self::NetworkUnavailable => "Backend unreachable",
            Self::Unauthorized => "Session rejected",
            Self::NotFound => "Resource not found",
            Self::VersionConflict => "Ticket version conflict",
            Self::ValidationFailed => "Payload rejected by validation",
            Self::ServerRejected => "Request rejected by backend",
            Self::MissingScheduleDate => "Schedule date required",
            Self::InvalidInput => "Invalid input",
            Self::DecodeFailed => "Unexpected response body",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in ~/.config/fieldops/config.toml and retry."),
            Self::NotLoggedIn | Self::Unauthorized => {
                Some("Run `fo login` or set FIELDOPS_TOKEN.")
            }
            Self::Timeout => Some("Retry once the backend is less loaded."),
            Self::NetworkUnavailable => {
                Some("Check --api-url / FIELDOPS_API_URL and that the server is running.")
            }
            Self::NotFound => None,
            Self::VersionConflict => Some("Re-fetch the ticket and reapply your changes."),
            Self::ValidationFailed => Some("Correct the listed fields and resubmit."),
            Self::ServerRejected => None,
            Self::MissingScheduleDate => Some("Pass --date YYYY-MM-DD for this action."),
            Self::InvalidInput => None,
            Self::DecodeFailed => Some("Check that the CLI and backend versions match."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Every failure a backend call can surface.
///
/// Variants follow the taxonomy the dashboard shows to operators: transport
/// problems, the HTTP statuses with dedicated handling (401, 404, 409, 422),
/// and a generic fallback carrying the server's `detail`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{}", TIMEOUT_MESSAGE)]
    Timeout,

    #[error("{}", NETWORK_MESSAGE)]
    Network { reason: String },

    #[error("{}", UNAUTHORIZED_MESSAGE)]
    Unauthorized,

    #[error("{detail}")]
    NotFound { detail: String },

    #[error("{message}")]
    Conflict {
        message: String,
        current_version: Option<i64>,
        expected_version: Option<i64>,
    },

    #[error("{message}")]
    Validation { message: String },

    #[error("{detail}")]
    Http { status: u16, detail: String },

    #[error("failed to decode response from {path}: {reason}")]
    Decode { path: String, reason: String },

    /// Rejected client-side; no request was sent.
    #[error("{message}")]
    InvalidInput { code: ErrorCode, message: String },
}

impl ApiError {
    #[must_use]
    pub fn invalid_input(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Timeout => ErrorCode::Timeout,
            Self::Network { .. } => ErrorCode::NetworkUnavailable,
            Self::Unauthorized => ErrorCode::Unauthorized,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Conflict { .. } => ErrorCode::VersionConflict,
            Self::Validation { .. } => ErrorCode::ValidationFailed,
            Self::Http { .. } => ErrorCode::ServerRejected,
            Self::Decode { .. } => ErrorCode::DecodeFailed,
            Self::InvalidInput { code, .. } => *code,
        }
    }

    #[must_use]
    pub fn suggestion(&self) -> Option<String> {
        self.error_code().hint().map(str::to_string)
    }

    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::NotFound { .. } => Some(404),
            Self::Conflict { .. } => Some(409),
            Self::Validation { .. } => Some(422),
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the shared request wrapper should raise a toast for this error.
    ///
    /// Missing resources are often expected and a 401 already forces a logout,
    /// so neither produces a notification.
    #[must_use]
    pub const fn is_notifiable(&self) -> bool {
        !matches!(
            self,
            Self::NotFound { .. } | Self::Unauthorized | Self::InvalidInput { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiError, ErrorCode};
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigParseError,
            ErrorCode::NotLoggedIn,
            ErrorCode::Timeout,
            ErrorCode::NetworkUnavailable,
            ErrorCode::Unauthorized,
            ErrorCode::NotFound,
            ErrorCode::VersionConflict,
            ErrorCode::ValidationFailed,
            ErrorCode::MissingScheduleDate,
            ErrorCode::InvalidInput,
            ErrorCode::ServerRejected,
            ErrorCode::DecodeFailed,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::VersionConflict.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn timeout_displays_operator_message() {
        assert!(ApiError::Timeout.to_string().starts_with("Request timed out"));
    }

    #[test]
    fn not_found_and_unauthorized_do_not_notify() {
        assert!(
            !ApiError::NotFound {
                detail: "Ticket not found".into()
            }
            .is_notifiable()
        );
        assert!(!ApiError::Unauthorized.is_notifiable());
        assert!(
            ApiError::Http {
                status: 500,
                detail: "boom".into()
            }
            .is_notifiable()
        );
    }

    #[test]
    fn invalid_input_keeps_its_code() {
        let err = ApiError::invalid_input(ErrorCode::MissingScheduleDate, "pick a date");
        assert_eq!(err.error_code(), ErrorCode::MissingScheduleDate);
        assert_eq!(err.status(), None);
        assert!(err.suggestion().is_some());
    }
}
