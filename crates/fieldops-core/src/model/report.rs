use serde::{Deserialize, Serialize};

/// Aging statistics for one dispatcher queue bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueAging {
    pub queue: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub avg_age_hours: f64,
    #[serde(default)]
    pub max_age_hours: f64,
}

/// Response of `GET /tickets/reports/workflow-summary`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSummary {
    pub queue_aging: Vec<QueueAging>,
    pub onsite_too_long_count: u64,
    pub nro_phase1_pending_count: u64,
    pub nro_phase2_pending_count: u64,
    pub returns_outstanding_ticket_ids: Vec<String>,
}

impl WorkflowSummary {
    #[must_use]
    pub fn queued_total(&self) -> u64 {
        self.queue_aging.iter().map(|q| q.count).sum()
    }

    #[must_use]
    pub const fn nro_pending_total(&self) -> u64 {
        self.nro_phase1_pending_count + self.nro_phase2_pending_count
    }
}

#[cfg(test)]
mod tests {
    use super::WorkflowSummary;
    use serde_json::json;

    #[test]
    fn totals_tolerate_missing_fields() {
        let summary: WorkflowSummary = serde_json::from_value(json!({
            "queue_aging": [
                {"queue": "approval", "count": 3, "avg_age_hours": 5.5, "max_age_hours": 9.0},
                {"queue": "goback", "count": 2}
            ],
            "nro_phase2_pending_count": 4
        }))
        .expect("decode");

        assert_eq!(summary.queued_total(), 5);
        assert_eq!(summary.nro_pending_total(), 4);
        assert!(summary.returns_outstanding_ticket_ids.is_empty());
    }
}
