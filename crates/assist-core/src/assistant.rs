//! ============================================================================
//! Assistant - The surface exposed to the orchestration layer
//! ============================================================================
//! Owns one instance of each service, constructed once at process start:
//! tool registry, knowledge search, tone analyzer and pattern analyzer.
//! ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::analysis::{AlertSink, BatchReport, OutcomeRecord, OutcomeStore, PatternAnalyzer, WeaknessFinding};
use crate::config::AssistConfig;
use crate::db::AssistDb;
use crate::retrieval::{
    EmbeddingService, KnowledgeCorpus, KnowledgeItem, KnowledgeSearch, QdrantIndex, SearchStrategy,
    SimilarityResult, VectorIndex,
};
use crate::tone::{self, Adaptation, ToneAnalysis, ToneAnalyzer};
use crate::tools::{
    PriceLookupTool, ProductCatalog, ShippingLookupTool, ShippingRates, ToolCall, ToolDefinition,
    ToolOutcome, ToolRegistry,
};
use crate::types::{AssistResult, TenantContext, TenantId};

/// Collaborators the assistant reads from and writes to
#[derive(Clone)]
pub struct Collaborators {
    pub corpus: Arc<dyn KnowledgeCorpus>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub shipping: Arc<dyn ShippingRates>,
    pub outcomes: Arc<dyn OutcomeStore>,
    pub alerts: Arc<dyn AlertSink>,
}

impl Collaborators {
    /// Every collaborator backed by the embedded store
    pub fn from_db(db: Arc<AssistDb>) -> Self {
        Self {
            corpus: db.clone(),
            catalog: db.clone(),
            shipping: db.clone(),
            outcomes: db.clone(),
            alerts: db,
        }
    }
}

pub struct Assistant {
    tools: ToolRegistry,
    search: KnowledgeSearch,
    tone: ToneAnalyzer,
    analyzer: Arc<PatternAnalyzer>,
    outcomes: Arc<dyn OutcomeStore>,
    default_k: usize,
}

impl Assistant {
    /// Wire every service from config. Registers the built-in tools, probes
    /// the retrieval backends once and fixes the search strategy.
    pub async fn start(config: AssistConfig, collaborators: Collaborators) -> AssistResult<Self> {
        config.validate()?;

        let mut tools = ToolRegistry::new(config.dispatch.clone());
        tools.register(Arc::new(PriceLookupTool::new(collaborators.catalog.clone())))?;
        tools.register(Arc::new(ShippingLookupTool::new(collaborators.shipping.clone())))?;

        let index: Option<Arc<dyn VectorIndex>> = match &config.retrieval.qdrant_url {
            Some(url) => match QdrantIndex::connect(url, &config.retrieval.collection).await {
                Ok(index) => Some(Arc::new(index)),
                Err(e) => {
                    warn!("Vector backend unavailable, continuing without it: {}", e);
                    None
                }
            },
            None => None,
        };

        let search = KnowledgeSearch::start(
            collaborators.corpus.clone(),
            index,
            EmbeddingService::from_config(&config.retrieval),
            &config.retrieval,
        )
        .await;

        let analyzer = Arc::new(PatternAnalyzer::new(
            collaborators.outcomes.clone(),
            collaborators.alerts.clone(),
            config.analysis.clone(),
        ));

        info!(
            tools = tools.len(),
            strategy = %search.strategy(),
            "Assistant ready"
        );

        Ok(Self {
            tools,
            search,
            tone: ToneAnalyzer::new(config.tone.clone()),
            analyzer,
            outcomes: collaborators.outcomes,
            default_k: config.retrieval.default_k,
        })
    }

    // ========================================================================
    // Tools
    // ========================================================================

    pub fn list_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.list_definitions()
    }

    pub async fn invoke_tool(&self, name: &str, args: &Value, ctx: &TenantContext) -> ToolOutcome {
        self.tools.invoke(name, args, ctx).await
    }

    /// Independent lookups from one reasoning turn, dispatched concurrently
    pub async fn invoke_tools(&self, calls: &[ToolCall], ctx: &TenantContext) -> Vec<ToolOutcome> {
        self.tools.invoke_all(calls, ctx).await
    }

    // ========================================================================
    // Retrieval
    // ========================================================================

    pub fn search_strategy(&self) -> SearchStrategy {
        self.search.strategy()
    }

    /// `k = None` uses the configured default
    pub async fn search_knowledge(
        &self,
        query: &str,
        tenant: &TenantId,
        k: Option<usize>,
    ) -> AssistResult<Vec<SimilarityResult>> {
        self.search
            .search_knowledge(query, tenant, k.unwrap_or(self.default_k))
            .await
    }

    pub async fn index_item(&self, item: KnowledgeItem) -> AssistResult<KnowledgeItem> {
        self.search.index_item(item).await
    }

    // ========================================================================
    // Tone
    // ========================================================================

    pub fn analyze_tone<S: AsRef<str>>(&self, recent_messages: &[S]) -> ToneAnalysis {
        self.tone.analyze_tone(recent_messages)
    }

    pub fn adapt_reply(&self, draft: &str, analysis: &ToneAnalysis) -> Adaptation {
        tone::adapt(draft, analysis)
    }

    // ========================================================================
    // Outcomes & analysis
    // ========================================================================

    pub async fn record_outcome(&self, record: OutcomeRecord) -> AssistResult<()> {
        self.outcomes.append(record).await
    }

    pub async fn run_daily_pattern_analysis(
        &self,
        tenant: &TenantId,
    ) -> AssistResult<Vec<WeaknessFinding>> {
        self.analyzer.run_daily_pattern_analysis(tenant).await
    }

    pub async fn run_pattern_batch(&self) -> BatchReport {
        self.analyzer.run_batch().await
    }

    /// Start the nightly job; it runs detached from request handling
    pub fn spawn_pattern_scheduler(&self) -> JoinHandle<()> {
        self.analyzer.clone().spawn_scheduler()
    }
}
