//! ============================================================================
//! Analysis Types - Outcome records, findings and collaborator contracts
//! ============================================================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::types::{AssistResult, TenantId};

/// Intent label used when none can be recovered
pub const UNKNOWN_INTENT: &str = "unknown";

/// Label of one customer interaction.
///
/// `Unknown` is the initial state; the three others are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Satisfied,
    Unsatisfied,
    Escalated,
    Unknown,
}

impl Outcome {
    /// Counts against the intent's success rate
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Unsatisfied | Outcome::Escalated)
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Unknown)
    }
}

impl std::str::FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "satisfied" => Ok(Outcome::Satisfied),
            "unsatisfied" => Ok(Outcome::Unsatisfied),
            "escalated" => Ok(Outcome::Escalated),
            "unknown" => Ok(Outcome::Unknown),
            other => Err(format!("unknown outcome: {}", other)),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Outcome::Satisfied => "satisfied",
            Outcome::Unsatisfied => "unsatisfied",
            Outcome::Escalated => "escalated",
            Outcome::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Append-only interaction outcome. A relabel is a new record whose
/// `corrects` points at the record it replaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub id: Uuid,
    pub tenant: TenantId,
    /// Explicit intent label, when the conversation layer set one
    pub intent: Option<String>,
    pub outcome: Outcome,
    /// Unix seconds
    pub timestamp: i64,
    pub conversation_id: Option<String>,
    /// Raw JSON written by the conversation layer; may be malformed
    pub metadata: Option<String>,
    pub corrects: Option<Uuid>,
}

impl OutcomeRecord {
    pub fn new(tenant: TenantId, intent: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant,
            intent: Some(intent.into()),
            outcome,
            timestamp: chrono::Utc::now().timestamp(),
            conversation_id: None,
            metadata: None,
            corrects: None,
        }
    }

    /// Record created before the interaction is labeled; intent comes from metadata
    pub fn from_metadata(tenant: TenantId, metadata: impl Into<String>) -> Self {
        Self {
            intent: None,
            metadata: Some(metadata.into()),
            ..Self::new(tenant, String::new(), Outcome::Unknown)
        }
    }

    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// New record relabeling this one; history is never mutated
    pub fn relabel(&self, outcome: Outcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            outcome,
            timestamp: chrono::Utc::now().timestamp(),
            corrects: Some(self.id),
            ..self.clone()
        }
    }

    /// Explicit intent, else `metadata.intent`, else `"unknown"`
    pub fn resolved_intent(&self) -> String {
        match self.intent.as_deref().map(str::trim) {
            Some(intent) if !intent.is_empty() => intent.to_lowercase(),
            _ => intent_from_metadata(self.metadata.as_deref()),
        }
    }
}

/// Extract `intent` from a metadata blob. Anything unexpected yields `"unknown"`.
pub fn intent_from_metadata(metadata: Option<&str>) -> String {
    metadata
        .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
        .and_then(|value| {
            value
                .get("intent")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_lowercase())
        })
        .filter(|intent| !intent.is_empty())
        .unwrap_or_else(|| UNKNOWN_INTENT.to_string())
}

/// Derived per run; never the system of record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaknessFinding {
    pub intent: String,
    pub total: u32,
    pub unsatisfied: u32,
    pub rate: f64,
}

/// Summary of one batch run across tenants
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub tenants_processed: usize,
    pub tenants_failed: usize,
    pub alerts_sent: usize,
}

/// Tenant-scoped append-only outcome log
#[async_trait]
pub trait OutcomeStore: Send + Sync {
    /// Tenants that have any outcomes
    async fn tenants(&self) -> AssistResult<Vec<TenantId>>;

    /// Records of `tenant` with `timestamp >= since`
    async fn outcomes_since(&self, tenant: &TenantId, since: i64) -> AssistResult<Vec<OutcomeRecord>>;

    async fn append(&self, record: OutcomeRecord) -> AssistResult<()>;
}

/// Notification collaborator
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn create_alert(
        &self,
        tenant: &TenantId,
        title: &str,
        message: &str,
        metadata: Value,
    ) -> AssistResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> TenantId {
        TenantId::new("shop-1").unwrap()
    }

    #[test]
    fn test_intent_from_metadata() {
        assert_eq!(intent_from_metadata(Some(r#"{"intent":"Refund"}"#)), "refund");
        assert_eq!(intent_from_metadata(Some("{not json")), UNKNOWN_INTENT);
        assert_eq!(intent_from_metadata(Some(r#"{"intent":42}"#)), UNKNOWN_INTENT);
        assert_eq!(intent_from_metadata(Some(r#"["intent"]"#)), UNKNOWN_INTENT);
        assert_eq!(intent_from_metadata(None), UNKNOWN_INTENT);
    }

    #[test]
    fn test_explicit_intent_wins() {
        let record = OutcomeRecord::new(tenant(), " Shipping ", Outcome::Satisfied);
        assert_eq!(record.resolved_intent(), "shipping");

        let record = OutcomeRecord::from_metadata(tenant(), r#"{"intent":"sizes"}"#);
        assert_eq!(record.resolved_intent(), "sizes");
        assert_eq!(record.outcome, Outcome::Unknown);
    }

    #[test]
    fn test_relabel_is_a_new_record() {
        let original = OutcomeRecord::new(tenant(), "refund", Outcome::Unknown);
        let labeled = original.relabel(Outcome::Unsatisfied);
        assert_ne!(labeled.id, original.id);
        assert_eq!(labeled.corrects, Some(original.id));
        assert_eq!(original.outcome, Outcome::Unknown);
        assert!(labeled.outcome.is_terminal());
    }

    #[test]
    fn test_failure_outcomes() {
        assert!(Outcome::Unsatisfied.is_failure());
        assert!(Outcome::Escalated.is_failure());
        assert!(!Outcome::Satisfied.is_failure());
        assert!(!Outcome::Unknown.is_failure());
        assert_eq!("ESCALATED".parse::<Outcome>().unwrap(), Outcome::Escalated);
    }
}
