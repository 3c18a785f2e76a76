//! ============================================================================
//! Pattern Analyzer - Nightly per-tenant weakness detection
//! ============================================================================
//! For each tenant: load the trailing window of outcomes, tally per intent,
//! and send at most one aggregated alert. Tenants run with bounded
//! parallelism; a failing tenant is logged and the batch continues.
//! ============================================================================

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use futures_util::future::join_all;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::types::{AlertSink, BatchReport, OutcomeStore, WeaknessFinding};
use super::weakness::{find_weaknesses, format_alert};
use crate::config::AnalysisConfig;
use crate::types::{AssistResult, TenantId};

pub const ALERT_TITLE: &str = "Recurring weak topics detected";

pub struct PatternAnalyzer {
    store: Arc<dyn OutcomeStore>,
    alerts: Arc<dyn AlertSink>,
    config: AnalysisConfig,
}

impl PatternAnalyzer {
    pub fn new(
        store: Arc<dyn OutcomeStore>,
        alerts: Arc<dyn AlertSink>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            store,
            alerts,
            config,
        }
    }

    /// Findings for `tenant` over the window ending at `now`, without alerting
    pub async fn findings_at(
        &self,
        tenant: &TenantId,
        now: DateTime<Utc>,
    ) -> AssistResult<Vec<WeaknessFinding>> {
        let since = now.timestamp() - self.config.window_hours * 3600;
        let records = self.store.outcomes_since(tenant, since).await?;

        // The store is trusted for scoping, but a stray record must not skew
        // another tenant's statistics
        let before = records.len();
        let records: Vec<_> = records
            .into_iter()
            .filter(|r| &r.tenant == tenant && r.timestamp <= now.timestamp())
            .collect();
        if records.len() != before {
            warn!(
                tenant = %tenant,
                dropped = before - records.len(),
                "Outcome store returned records outside tenant or window"
            );
        }

        debug!(tenant = %tenant, records = records.len(), "Analyzing outcomes");
        Ok(find_weaknesses(&records, &self.config))
    }

    /// Analyze one tenant and send zero or one alert. Returns the findings.
    pub async fn run_daily_pattern_analysis(
        &self,
        tenant: &TenantId,
    ) -> AssistResult<Vec<WeaknessFinding>> {
        self.run_at(tenant, Utc::now()).await
    }

    pub async fn run_at(
        &self,
        tenant: &TenantId,
        now: DateTime<Utc>,
    ) -> AssistResult<Vec<WeaknessFinding>> {
        let findings = self.findings_at(tenant, now).await?;
        if findings.is_empty() {
            debug!(tenant = %tenant, "No weak topics");
            return Ok(findings);
        }

        let message = format_alert(&findings, self.config.window_hours);
        let metadata = json!({
            "window_hours": self.config.window_hours,
            "min_samples": self.config.min_samples,
            "failure_rate_threshold": self.config.failure_rate_threshold,
            "findings": findings,
        });
        self.alerts
            .create_alert(tenant, ALERT_TITLE, &message, metadata)
            .await?;

        info!(
            tenant = %tenant,
            weak_topics = findings.len(),
            "Weak topic alert sent"
        );
        Ok(findings)
    }

    /// Run every tenant the store knows about
    pub async fn run_batch(&self) -> BatchReport {
        let tenants = match self.store.tenants().await {
            Ok(tenants) => tenants,
            Err(e) => {
                error!("Failed to list tenants for pattern analysis: {}", e);
                return BatchReport::default();
            }
        };
        self.run_batch_for(tenants).await
    }

    pub async fn run_batch_for(&self, tenants: Vec<TenantId>) -> BatchReport {
        let now = Utc::now();
        let parallelism = self.config.max_parallel_tenants.max(1);

        let mut report = BatchReport::default();
        for chunk in tenants.chunks(parallelism) {
            let results = join_all(chunk.iter().map(|tenant| self.run_at(tenant, now))).await;

            for (tenant, result) in chunk.iter().zip(results) {
                match result {
                    Ok(findings) => {
                        report.tenants_processed += 1;
                        if !findings.is_empty() {
                            report.alerts_sent += 1;
                        }
                    }
                    Err(e) => {
                        report.tenants_failed += 1;
                        error!(tenant = %tenant, error = %e, "Pattern analysis failed for tenant");
                    }
                }
            }
        }

        info!(
            processed = report.tenants_processed,
            failed = report.tenants_failed,
            alerts = report.alerts_sent,
            "Pattern analysis batch finished"
        );
        report
    }

    /// Background daily schedule. Failures are logged, never propagated.
    pub fn spawn_scheduler(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(hour_utc = self.config.run_hour_utc, "Pattern analysis scheduler started");
            loop {
                let now = Utc::now();
                let next = next_run_after(now, self.config.run_hour_utc);
                let wait = (next - now).to_std().unwrap_or(Duration::from_secs(60));
                debug!("Next pattern analysis at {}", next);
                tokio::time::sleep(wait).await;

                self.run_batch().await;
            }
        })
    }
}

/// Next occurrence of `hour:00 UTC` strictly after `now`
pub fn next_run_after(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let hour = hour.min(23);
    let today = now
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive));

    match today {
        Some(at) if at > now => at,
        Some(at) => at + chrono::Duration::days(1),
        None => now + chrono::Duration::days(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::{Outcome, OutcomeRecord};
    use crate::types::AssistError;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        records: Mutex<Vec<OutcomeRecord>>,
        broken: Option<TenantId>,
    }

    #[async_trait]
    impl OutcomeStore for MemoryStore {
        async fn tenants(&self) -> AssistResult<Vec<TenantId>> {
            let mut tenants: Vec<TenantId> = self
                .records
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.tenant.clone())
                .collect();
            tenants.extend(self.broken.clone());
            tenants.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            tenants.dedup();
            Ok(tenants)
        }

        async fn outcomes_since(&self, tenant: &TenantId, since: i64) -> AssistResult<Vec<OutcomeRecord>> {
            if self.broken.as_ref() == Some(tenant) {
                return Err(AssistError::Storage("corrupt outcome row".into()));
            }
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| &r.tenant == tenant && r.timestamp >= since)
                .cloned()
                .collect())
        }

        async fn append(&self, record: OutcomeRecord) -> AssistResult<()> {
            self.records.lock().unwrap().push(record);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        alerts: Mutex<HashMap<String, Vec<(String, Value)>>>,
    }

    impl RecordingSink {
        fn count(&self, tenant: &str) -> usize {
            self.alerts.lock().unwrap().get(tenant).map(Vec::len).unwrap_or(0)
        }
    }

    #[async_trait]
    impl AlertSink for RecordingSink {
        async fn create_alert(
            &self,
            tenant: &TenantId,
            _title: &str,
            message: &str,
            metadata: Value,
        ) -> AssistResult<()> {
            self.alerts
                .lock()
                .unwrap()
                .entry(tenant.to_string())
                .or_default()
                .push((message.to_string(), metadata));
            Ok(())
        }
    }

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id).unwrap()
    }

    async fn seed(store: &MemoryStore, t: &TenantId, intent: &str, ok: usize, bad: usize) {
        for _ in 0..ok {
            store.append(OutcomeRecord::new(t.clone(), intent, Outcome::Satisfied)).await.unwrap();
        }
        for _ in 0..bad {
            store.append(OutcomeRecord::new(t.clone(), intent, Outcome::Unsatisfied)).await.unwrap();
        }
    }

    fn analyzer(store: Arc<MemoryStore>, sink: Arc<RecordingSink>) -> PatternAnalyzer {
        PatternAnalyzer::new(store, sink, AnalysisConfig::default())
    }

    #[tokio::test]
    async fn test_one_aggregated_alert_per_tenant() {
        let store = Arc::new(MemoryStore::default());
        let sink = Arc::new(RecordingSink::default());
        let t = tenant("shop-1");
        seed(&store, &t, "refund", 3, 2).await;
        seed(&store, &t, "exchange", 0, 3).await;
        seed(&store, &t, "greeting", 0, 2).await;

        let findings = analyzer(store, sink.clone())
            .run_daily_pattern_analysis(&t)
            .await
            .unwrap();

        assert_eq!(findings.len(), 2);
        assert_eq!(sink.count("shop-1"), 1);
        let alerts = sink.alerts.lock().unwrap();
        let (message, metadata) = &alerts["shop-1"][0];
        assert!(message.contains("refund"));
        assert!(message.contains("exchange"));
        assert!(!message.contains("greeting"));
        assert_eq!(metadata["findings"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_no_findings_no_alert() {
        let store = Arc::new(MemoryStore::default());
        let sink = Arc::new(RecordingSink::default());
        let t = tenant("shop-1");
        seed(&store, &t, "greeting", 0, 2).await;

        let findings = analyzer(store, sink.clone())
            .run_daily_pattern_analysis(&t)
            .await
            .unwrap();
        assert!(findings.is_empty());
        assert_eq!(sink.count("shop-1"), 0);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let store = Arc::new(MemoryStore::default());
        let sink = Arc::new(RecordingSink::default());
        let t = tenant("shop-1");
        seed(&store, &t, "refund", 3, 2).await;
        seed(&store, &t, "sizes", 1, 2).await;

        let analyzer = analyzer(store, sink);
        let now = Utc::now();
        let first = analyzer.run_at(&t, now).await.unwrap();
        let second = analyzer.run_at(&t, now).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_window_excludes_old_records() {
        let store = Arc::new(MemoryStore::default());
        let sink = Arc::new(RecordingSink::default());
        let t = tenant("shop-1");
        let two_days_ago = Utc::now().timestamp() - 48 * 3600;
        for _ in 0..5 {
            store
                .append(OutcomeRecord::new(t.clone(), "refund", Outcome::Unsatisfied).at(two_days_ago))
                .await
                .unwrap();
        }

        let findings = analyzer(store, sink).run_daily_pattern_analysis(&t).await.unwrap();
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn test_bad_tenant_does_not_abort_batch() {
        let store = Arc::new(MemoryStore {
            broken: Some(tenant("broken")),
            ..MemoryStore::default()
        });
        let sink = Arc::new(RecordingSink::default());
        seed(&store, &tenant("shop-a"), "refund", 3, 2).await;
        seed(&store, &tenant("shop-b"), "refund", 5, 0).await;
        seed(&store, &tenant("shop-c"), "returns", 0, 4).await;

        let report = analyzer(store, sink.clone()).run_batch().await;
        assert_eq!(
            report,
            BatchReport {
                tenants_processed: 3,
                tenants_failed: 1,
                alerts_sent: 2,
            }
        );
        assert_eq!(sink.count("shop-a"), 1);
        assert_eq!(sink.count("shop-b"), 0);
        assert_eq!(sink.count("shop-c"), 1);
    }

    #[test]
    fn test_next_run_after() {
        let at = |s: &str| DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc);

        assert_eq!(next_run_after(at("2026-03-01T01:30:00Z"), 3), at("2026-03-01T03:00:00Z"));
        assert_eq!(next_run_after(at("2026-03-01T03:00:00Z"), 3), at("2026-03-02T03:00:00Z"));
        assert_eq!(next_run_after(at("2026-03-01T22:10:00Z"), 3), at("2026-03-02T03:00:00Z"));
    }
}
