//! ============================================================================
//! Core Types for the Support Assistant
//! ============================================================================
//! Tenant identity, caller context and the error taxonomy shared by the
//! dispatcher, retrieval, tone and analysis modules.
//! ============================================================================

use serde::{Deserialize, Serialize};

/// Isolated customer organization.
///
/// Every corpus, index and outcome query takes a `TenantId` as a required
/// argument, so an unscoped query cannot be written against these APIs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Build a tenant id, rejecting blank values
    pub fn new(id: impl Into<String>) -> AssistResult<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(AssistError::TenantIsolation(
                "tenant id must not be empty".into(),
            ));
        }
        // Control characters are reserved as key separators in the store
        if trimmed.chars().any(char::is_control) {
            return Err(AssistError::TenantIsolation(format!(
                "tenant id {:?} contains control characters",
                trimmed
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TenantId {
    type Error = AssistError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TenantId> for String {
    fn from(tenant: TenantId) -> Self {
        tenant.0
    }
}

impl std::str::FromStr for TenantId {
    type Err = AssistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Identity of whoever is asking: the tenant plus the customer or agent
/// driving the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant: TenantId,
    /// Customer id, staff id or session id, depending on the channel
    pub caller_id: Option<String>,
    pub conversation_id: Option<String>,
}

impl TenantContext {
    pub fn new(tenant: TenantId) -> Self {
        Self {
            tenant,
            caller_id: None,
            conversation_id: None,
        }
    }

    pub fn with_caller(mut self, caller_id: impl Into<String>) -> Self {
        self.caller_id = Some(caller_id.into());
        self
    }

    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }
}

/// Error types for the assistant core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum AssistError {
    /// Invalid wiring at startup (duplicate tool name, bad thresholds)
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Capability not found: {0}")]
    CapabilityNotFound(String),

    #[error("Capability '{name}' failed: {message}")]
    CapabilityExecution { name: String, message: String },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Embedding model or vector backend is down; callers move to the next tier
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("Timed out after {0} ms")]
    Timeout(u64),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl AssistError {
    /// Stable machine-readable code, used in structured tool failures
    pub fn code(&self) -> &'static str {
        match self {
            AssistError::Configuration(_) => "configuration_error",
            AssistError::CapabilityNotFound(_) => "capability_not_found",
            AssistError::CapabilityExecution { .. } => "capability_execution_error",
            AssistError::InvalidArguments(_) => "invalid_arguments",
            AssistError::ProviderUnavailable(_) => "provider_unavailable",
            AssistError::TenantIsolation(_) => "tenant_isolation_violation",
            AssistError::Timeout(_) => "timeout",
            AssistError::Storage(_) => "storage_error",
        }
    }
}

impl From<anyhow::Error> for AssistError {
    fn from(err: anyhow::Error) -> Self {
        AssistError::Storage(err.to_string())
    }
}

pub type AssistResult<T> = Result<T, AssistError>;
