//! ============================================================================
//! Tool Registry - Named capabilities behind one dispatch boundary
//! ============================================================================
//! Holds every capability the reasoning layer may call, projects them into a
//! function-calling manifest and dispatches invocations by name. Failures
//! never escape `invoke`: they come back as structured `ToolOutcome`s.
//! ============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::retry::call_with_retry;
use crate::config::DispatchConfig;
use crate::types::{AssistError, AssistResult, TenantContext};

/// A named, schema-described capability.
///
/// Implementations are stateless with respect to a call and are owned by the
/// registry once registered. `idempotent` has no default: a tool that
/// mutates state has to say so before the dispatcher will consider it.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// Description shown to the reasoning layer
    fn description(&self) -> &str;

    /// JSON Schema of the accepted arguments
    fn parameters(&self) -> Value;

    /// Whether repeating a call is harmless; gates retries
    fn idempotent(&self) -> bool;

    async fn execute(&self, args: &Value, ctx: &TenantContext) -> AssistResult<ToolOutput>;
}

/// Successful tool result before it is wrapped for the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub data: Value,
    /// Short human-readable summary
    pub message: String,
}

impl ToolOutput {
    pub fn new(data: Value, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
        }
    }
}

/// Manifest entry for function calling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A single requested call, as produced by the reasoning layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// What the caller sees: `{success, data | error, message}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub tool: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Machine-readable error code on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
}

impl ToolOutcome {
    fn succeeded(tool: &str, output: ToolOutput) -> Self {
        Self {
            tool: tool.to_string(),
            success: true,
            data: Some(output.data),
            error: None,
            message: output.message,
        }
    }

    fn failed(tool: &str, err: &AssistError) -> Self {
        let message = match err {
            AssistError::Timeout(ms) => {
                format!("Result unknown: '{}' did not answer within {} ms", tool, ms)
            }
            other => other.to_string(),
        };
        Self {
            tool: tool.to_string(),
            success: false,
            data: None,
            error: Some(err.code().to_string()),
            message,
        }
    }

    /// The call did not settle in time; its answer is unknown, not negative
    pub fn is_unknown(&self) -> bool {
        self.error.as_deref() == Some("timeout")
    }
}

/// Registry and dispatcher for tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    config: DispatchConfig,
}

impl ToolRegistry {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            tools: HashMap::new(),
            config,
        }
    }

    /// Add a tool. A duplicate name is a configuration error and should abort
    /// startup.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> AssistResult<()> {
        let name = tool.name().to_string();
        if name.trim().is_empty() {
            return Err(AssistError::Configuration("tool name must not be empty".into()));
        }
        if self.tools.contains_key(&name) {
            return Err(AssistError::Configuration(format!(
                "duplicate tool name '{}'",
                name
            )));
        }

        info!("Registered tool: {} (idempotent: {})", name, tool.idempotent());
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Function-calling manifest, sorted by name
    pub fn list_definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke by name, returning the raw result. Unknown names yield
    /// `CapabilityNotFound`.
    pub async fn try_invoke(
        &self,
        name: &str,
        args: &Value,
        ctx: &TenantContext,
    ) -> AssistResult<ToolOutput> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| AssistError::CapabilityNotFound(name.to_string()))?;

        debug!(tool = name, tenant = %ctx.tenant, "Dispatching tool call");

        call_with_retry(name, tool.idempotent(), &self.config, || {
            tool.execute(args, ctx)
        })
        .await
        .map_err(|err| match err {
            // Keep the taxonomy intact for callers; anything else from the
            // tool is an execution error at this boundary.
            AssistError::Timeout(_)
            | AssistError::InvalidArguments(_)
            | AssistError::CapabilityExecution { .. }
            | AssistError::TenantIsolation(_) => err,
            other => AssistError::CapabilityExecution {
                name: name.to_string(),
                message: other.to_string(),
            },
        })
    }

    /// Invoke by name; never fails, every error becomes a structured outcome
    pub async fn invoke(&self, name: &str, args: &Value, ctx: &TenantContext) -> ToolOutcome {
        match self.try_invoke(name, args, ctx).await {
            Ok(output) => ToolOutcome::succeeded(name, output),
            Err(err) => {
                warn!(tool = name, tenant = %ctx.tenant, error = %err, "Tool call failed");
                ToolOutcome::failed(name, &err)
            }
        }
    }

    /// Dispatch independent calls concurrently and wait for all of them to
    /// settle or time out. Outcomes keep the order of `calls`.
    pub async fn invoke_all(&self, calls: &[ToolCall], ctx: &TenantContext) -> Vec<ToolOutcome> {
        let futures = calls
            .iter()
            .map(|call| self.invoke(&call.name, &call.args, ctx));
        join_all(futures).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TenantId;
    use serde_json::json;
    use std::time::Duration;

    struct EchoTool {
        name: &'static str,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "Echo the arguments back"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        fn idempotent(&self) -> bool {
            true
        }

        async fn execute(&self, args: &Value, _ctx: &TenantContext) -> AssistResult<ToolOutput> {
            Ok(ToolOutput::new(
                json!({"tool": self.name, "args": args}),
                format!("{} ok", self.name),
            ))
        }
    }

    struct BrokenTool;

    #[async_trait]
    impl Tool for BrokenTool {
        fn name(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }

        fn idempotent(&self) -> bool {
            true
        }

        async fn execute(&self, _args: &Value, _ctx: &TenantContext) -> AssistResult<ToolOutput> {
            Err(AssistError::Storage("table products is missing".into()))
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "Never answers in time"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }

        fn idempotent(&self) -> bool {
            true
        }

        async fn execute(&self, _args: &Value, _ctx: &TenantContext) -> AssistResult<ToolOutput> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ToolOutput::new(json!(null), "late"))
        }
    }

    fn ctx() -> TenantContext {
        TenantContext::new(TenantId::new("shop-1").unwrap()).with_caller("customer-9")
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new(DispatchConfig {
            call_timeout_ms: 50,
            max_retries: 1,
            base_delay_ms: 1,
            max_delay_ms: 2,
            jitter: false,
        });
        registry.register(Arc::new(EchoTool { name: "alpha" })).unwrap();
        registry.register(Arc::new(EchoTool { name: "beta" })).unwrap();
        registry.register(Arc::new(BrokenTool)).unwrap();
        registry.register(Arc::new(SlowTool)).unwrap();
        registry
    }

    #[test]
    fn test_duplicate_name_is_configuration_error() {
        let mut registry = registry();
        let err = registry
            .register(Arc::new(EchoTool { name: "alpha" }))
            .unwrap_err();
        assert!(matches!(err, AssistError::Configuration(_)));
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_definitions_are_sorted_projection() {
        let defs = registry().list_definitions();
        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta", "broken", "slow"]);
        assert_eq!(defs[0].description, "Echo the arguments back");
    }

    #[tokio::test]
    async fn test_invoke_routes_to_named_tool() {
        let registry = registry();
        for name in ["alpha", "beta"] {
            let outcome = registry.invoke(name, &json!({"q": 1}), &ctx()).await;
            assert!(outcome.success);
            assert_eq!(outcome.data.unwrap()["tool"], json!(name));
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_not_thrown() {
        let registry = registry();
        let err = registry
            .try_invoke("nonexistent", &json!({}), &ctx())
            .await
            .unwrap_err();
        assert_eq!(err, AssistError::CapabilityNotFound("nonexistent".into()));

        let outcome = registry.invoke("nonexistent", &json!({}), &ctx()).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("capability_not_found"));
    }

    #[tokio::test]
    async fn test_execution_failure_becomes_structured_outcome() {
        let outcome = registry().invoke("broken", &json!({}), &ctx()).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("capability_execution_error"));
        assert!(outcome.message.contains("table products is missing"));
    }

    #[tokio::test]
    async fn test_invoke_all_settles_with_partial_results() {
        let registry = registry();
        let calls = vec![
            ToolCall::new("alpha", json!({})),
            ToolCall::new("slow", json!({})),
            ToolCall::new("missing", json!({})),
        ];

        let outcomes = registry.invoke_all(&calls, &ctx()).await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].success);
        assert!(outcomes[1].is_unknown());
        assert_eq!(outcomes[2].error.as_deref(), Some("capability_not_found"));
    }
}
