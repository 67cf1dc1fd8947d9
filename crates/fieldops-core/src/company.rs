//! Field-tech company payloads and technician roster planning.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::form::FormData;

/// Fields the company write schema accepts.
pub const COMPANY_SCHEMA_FIELDS: &[&str] = &[
    "company_name",
    "company_number",
    "business_phone",
    "other_phones",
    "address",
    "city",
    "state",
    "zip",
    "region",
    "notes",
    "service_radius_miles",
];

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Coerce a form value to a JSON number. Blank or unparseable input is `null`.
fn to_number(value: &Value) -> Value {
    match value {
        Value::Number(_) => value.clone(),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(Value::from)
                .or_else(|_| s.parse::<f64>().map(Value::from))
                .unwrap_or(Value::Null)
        }
        _ => Value::Null,
    }
}

/// Render an id (string or number) as text.
fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Keep only schema fields; blanks become `null` and the service radius is
/// numeric. Absent fields stay absent.
#[must_use]
pub fn clean_company_payload(data: &FormData) -> FormData {
    COMPANY_SCHEMA_FIELDS
        .iter()
        .filter_map(|key| {
            let value = data.get(*key)?;
            let cleaned = if *key == "service_radius_miles" {
                if is_blank(value) { Value::Null } else { to_number(value) }
            } else if is_blank(value) {
                Value::Null
            } else {
                value.clone()
            };
            Some(((*key).to_string(), cleaned))
        })
        .collect()
}

/// Company id of a saved or fetched company record.
#[must_use]
pub fn company_id(data: &FormData) -> Option<String> {
    data.get("company_id").and_then(id_text)
}

/// One technician row from the company form.
#[derive(Debug, Clone, PartialEq)]
pub struct TechDraft {
    pub field_tech_id: Option<String>,
    pub name: String,
    pub tech_number: Option<Value>,
    pub phone: Option<Value>,
    pub email: Option<Value>,
    pub service_radius_miles: Option<Value>,
}

impl TechDraft {
    /// Read a technician row. Rows without a name are not technicians.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let row = value.as_object()?;
        let name = row.get("name").and_then(Value::as_str)?.trim();
        if name.is_empty() {
            return None;
        }
        let present = |key: &str| row.get(key).filter(|v| !is_blank(v)).cloned();
        Some(Self {
            field_tech_id: row.get("field_tech_id").and_then(id_text),
            name: name.to_string(),
            tech_number: present("tech_number"),
            phone: present("phone"),
            email: present("email"),
            service_radius_miles: present("service_radius_miles"),
        })
    }

    /// Write payload for `POST /fieldtechs/` or `PUT /fieldtechs/{id}`.
    #[must_use]
    pub fn payload(&self, company_id: &str) -> FormData {
        let mut out = Map::new();
        out.insert("company_id".into(), Value::from(company_id));
        out.insert("name".into(), Value::from(self.name.as_str()));
        out.insert("tech_number".into(), self.tech_number.clone().unwrap_or(Value::Null));
        out.insert("phone".into(), self.phone.clone().unwrap_or(Value::Null));
        out.insert("email".into(), self.email.clone().unwrap_or(Value::Null));
        out.insert(
            "service_radius_miles".into(),
            self.service_radius_miles.as_ref().map_or(Value::Null, to_number),
        );
        out
    }
}

/// Technician rows submitted with a company form (`techs` array).
#[must_use]
pub fn submitted_techs(data: &FormData) -> Vec<TechDraft> {
    data.get("techs")
        .and_then(Value::as_array)
        .map(|rows| rows.iter().filter_map(TechDraft::from_value).collect())
        .unwrap_or_default()
}

/// Ids of technicians currently attached to a fetched company.
#[must_use]
pub fn existing_tech_ids(company: &FormData) -> Vec<String> {
    company
        .get("techs")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(|row| row.get("field_tech_id").and_then(id_text))
                .collect()
        })
        .unwrap_or_default()
}

/// Work needed to bring the stored roster in line with the submitted one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterPlan {
    /// Technicians to delete; failures here are tolerated.
    pub deletes: Vec<String>,
    /// Rows to update (with id) or create (without).
    pub upserts: Vec<TechDraft>,
}

impl RosterPlan {
    #[must_use]
    pub fn new(existing_ids: &[String], submitted: Vec<TechDraft>) -> Self {
        let kept: HashSet<&str> = submitted
            .iter()
            .filter_map(|t| t.field_tech_id.as_deref())
            .collect();
        let deletes = existing_ids
            .iter()
            .filter(|id| !kept.contains(id.as_str()))
            .cloned()
            .collect();
        Self {
            deletes,
            upserts: submitted,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.upserts.is_empty()
    }
}
