use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::ticket::ParseEnumError;
use crate::error::{ApiError, ErrorCode};

/// Encode a caller-supplied id as exactly one URL path segment.
///
/// # Errors
///
/// Blank and dot-only ids are refused with [`ErrorCode::InvalidInput`]; they
/// would resolve to the collection itself or its parent.
pub fn path_segment(id: &str) -> Result<String, ApiError> {
    if matches!(id.trim(), "" | "." | "..") {
        return Err(ApiError::invalid_input(
            ErrorCode::InvalidInput,
            format!("invalid id {id:?}: must be a single non-empty path segment"),
        ));
    }
    Ok(urlencoding::encode(id).into_owned())
}

/// Record families that share the plain create/read/update/delete contract.
///
/// Tickets are not listed here: their writes carry extra rules (read-only
/// stripping and version stamping) and live in [`crate::client`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resource {
    Sites,
    Shipments,
    Inventory,
    Fieldtechs,
    FieldtechCompanies,
    Tasks,
    Users,
}

impl Resource {
    pub const ALL: [Self; 7] = [
        Self::Sites,
        Self::Shipments,
        Self::Inventory,
        Self::Fieldtechs,
        Self::FieldtechCompanies,
        Self::Tasks,
        Self::Users,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sites => "sites",
            Self::Shipments => "shipments",
            Self::Inventory => "inventory",
            Self::Fieldtechs => "fieldtechs",
            Self::FieldtechCompanies => "fieldtech-companies",
            Self::Tasks => "tasks",
            Self::Users => "users",
        }
    }

    /// Collection path, with the trailing slash the backend routes expect.
    #[must_use]
    pub fn path(self) -> String {
        format!("/{}/", self.as_str())
    }

    /// Path of one record, with `id` percent-encoded.
    ///
    /// # Errors
    ///
    /// See [`path_segment`].
    pub fn item_path(self, id: &str) -> Result<String, ApiError> {
        Ok(format!("/{}/{}", self.as_str(), path_segment(id)?))
    }

    /// Name of the primary-key field in this resource's records.
    #[must_use]
    pub const fn id_field(self) -> &'static str {
        match self {
            Self::Sites => "site_id",
            Self::Shipments => "shipment_id",
            Self::Inventory => "item_id",
            Self::Fieldtechs => "field_tech_id",
            Self::FieldtechCompanies => "company_id",
            Self::Tasks => "task_id",
            Self::Users => "user_id",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let normalized = match normalized.as_str() {
            "site" => "sites",
            "shipment" => "shipments",
            "fieldtech" | "techs" => "fieldtechs",
            "companies" | "company" => "fieldtech-companies",
            "task" => "tasks",
            "user" => "users",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == normalized)
            .ok_or_else(|| ParseEnumError {
                expected: "resource",
                got: s.to_string(),
            })
    }
}
