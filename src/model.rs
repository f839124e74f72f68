use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A deferred, not-yet-acknowledged write operation destined for the backend.
///
/// Only the fields below are persisted; display metadata is derived from
/// `method` and `url` when a summary is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedMutation {
    pub id: i64,
    /// Resent as an idempotency key on every replay attempt.
    pub client_ref: Uuid,
    pub url: String,
    pub method: String,
    pub body: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// Insert shape for the store; `id` and `created_at` are assigned on insert.
#[derive(Debug, Clone)]
pub struct NewMutation {
    pub client_ref: Uuid,
    pub url: String,
    pub method: String,
    pub body: Option<Value>,
}

impl NewMutation {
    pub fn new(method: &str, url: &str, body: Option<Value>) -> Self {
        Self {
            client_ref: Uuid::new_v4(),
            url: url.to_string(),
            method: method.to_ascii_uppercase(),
            body,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
    Enhance,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
            MutationKind::Enhance => "enhance",
        }
    }

    /// Derive the action kind from the request shape. Enhance endpoints are
    /// POSTs but get their own bucket so the UI can label them honestly.
    pub fn classify(method: &str, url: &str) -> Self {
        if url.trim_end_matches('/').ends_with("/enhance") {
            return MutationKind::Enhance;
        }
        match method.to_ascii_uppercase().as_str() {
            "DELETE" => MutationKind::Delete,
            "PUT" | "PATCH" => MutationKind::Update,
            _ => MutationKind::Create,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    DailyReport,
    WeeklyReport,
    GeneralReport,
    Profile,
    Other,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::DailyReport => "daily_report",
            ResourceKind::WeeklyReport => "weekly_report",
            ResourceKind::GeneralReport => "general_report",
            ResourceKind::Profile => "profile",
            ResourceKind::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::DailyReport => "daily report",
            ResourceKind::WeeklyReport => "weekly report",
            ResourceKind::GeneralReport => "report",
            ResourceKind::Profile => "profile",
            ResourceKind::Other => "item",
        }
    }

    pub fn classify(url: &str) -> Self {
        if url.contains("/reports/daily") {
            ResourceKind::DailyReport
        } else if url.contains("/reports/weekly") {
            ResourceKind::WeeklyReport
        } else if url.contains("/reports") {
            ResourceKind::GeneralReport
        } else if url.contains("/profile") {
            ResourceKind::Profile
        } else {
            ResourceKind::Other
        }
    }
}

/// Human-readable description of a queued action, for toasts and the
/// sync-review list.
pub fn describe(kind: MutationKind, resource: ResourceKind) -> String {
    match kind {
        MutationKind::Create => format!("Create {}", resource.label()),
        MutationKind::Update => format!("Update {}", resource.label()),
        MutationKind::Delete => format!("Delete {}", resource.label()),
        MutationKind::Enhance => format!("AI-enhance {}", resource.label()),
    }
}

/// Display copy of a queued mutation, enriched with derived metadata. The UI
/// owns these transient copies only; it never touches the store directly.
#[derive(Debug, Clone, Serialize)]
pub struct ActionSummary {
    pub id: i64,
    pub kind: MutationKind,
    pub resource: ResourceKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl ActionSummary {
    pub fn from_mutation(record: &QueuedMutation) -> Self {
        let kind = MutationKind::classify(&record.method, &record.url);
        let resource = ResourceKind::classify(&record.url);
        Self {
            id: record.id,
            kind,
            resource,
            message: describe(kind, resource),
            created_at: record.created_at,
        }
    }
}

/// Aggregate outcome of one replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub success: u32,
    pub failed: u32,
}

impl ReplaySummary {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Observable lifecycle state of the pending queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    Idle,
    Pending,
    Syncing,
}

impl QueueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueState::Idle => "idle",
            QueueState::Pending => "pending",
            QueueState::Syncing => "syncing",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classify_kind_from_verb() {
        assert_eq!(
            MutationKind::classify("POST", "/api/reports/daily/"),
            MutationKind::Create
        );
        assert_eq!(
            MutationKind::classify("put", "/api/reports/daily/3/"),
            MutationKind::Update
        );
        assert_eq!(
            MutationKind::classify("PATCH", "/api/profile/"),
            MutationKind::Update
        );
        assert_eq!(
            MutationKind::classify("DELETE", "/api/reports/9/"),
            MutationKind::Delete
        );
    }

    #[test]
    fn enhance_endpoint_wins_over_verb() {
        assert_eq!(
            MutationKind::classify("POST", "/api/reports/7/enhance/"),
            MutationKind::Enhance
        );
        assert_eq!(
            MutationKind::classify("POST", "/api/reports/7/enhance"),
            MutationKind::Enhance
        );
    }

    #[test]
    fn classify_resource_from_url() {
        assert_eq!(
            ResourceKind::classify("/api/reports/daily/"),
            ResourceKind::DailyReport
        );
        assert_eq!(
            ResourceKind::classify("/api/reports/weekly/12/"),
            ResourceKind::WeeklyReport
        );
        assert_eq!(
            ResourceKind::classify("/api/reports/12/enhance/"),
            ResourceKind::GeneralReport
        );
        assert_eq!(ResourceKind::classify("/api/profile/"), ResourceKind::Profile);
        assert_eq!(ResourceKind::classify("/api/billing/"), ResourceKind::Other);
    }

    #[test]
    fn summary_derives_message() {
        let record = QueuedMutation {
            id: 1,
            client_ref: Uuid::new_v4(),
            url: "/api/reports/daily/".into(),
            method: "POST".into(),
            body: Some(json!({"date": "2025-07-21", "hours": 8})),
            created_at: Utc::now(),
        };
        let summary = ActionSummary::from_mutation(&record);
        assert_eq!(summary.kind, MutationKind::Create);
        assert_eq!(summary.resource, ResourceKind::DailyReport);
        assert_eq!(summary.message, "Create daily report");
    }

    #[test]
    fn new_mutation_uppercases_verb() {
        let new = NewMutation::new("post", "/api/reports/daily/", None);
        assert_eq!(new.method, "POST");
    }
}
