//! Pure weakness detection over a window of outcome records.

use std::collections::{BTreeMap, HashSet};

use uuid::Uuid;

use super::types::{OutcomeRecord, WeaknessFinding};
use crate::config::AnalysisConfig;

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    total: u32,
    unsatisfied: u32,
}

/// Tally per intent and flag `total >= min_samples && rate > threshold`.
///
/// A record corrected by another record in the same window is skipped.
/// Output order is rate descending, then intent, so identical input always
/// yields identical findings.
pub fn find_weaknesses(records: &[OutcomeRecord], config: &AnalysisConfig) -> Vec<WeaknessFinding> {
    let superseded: HashSet<Uuid> = records.iter().filter_map(|r| r.corrects).collect();

    let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
    for record in records.iter().filter(|r| !superseded.contains(&r.id)) {
        let tally = tallies.entry(record.resolved_intent()).or_default();
        tally.total += 1;
        if record.outcome.is_failure() {
            tally.unsatisfied += 1;
        }
    }

    let mut findings: Vec<WeaknessFinding> = tallies
        .into_iter()
        .filter(|(_, t)| t.total >= config.min_samples && t.total > 0)
        .map(|(intent, t)| WeaknessFinding {
            intent,
            total: t.total,
            unsatisfied: t.unsatisfied,
            rate: t.unsatisfied as f64 / t.total as f64,
        })
        .filter(|f| f.rate > config.failure_rate_threshold)
        .collect();

    findings.sort_by(|a, b| {
        b.rate
            .partial_cmp(&a.rate)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.intent.cmp(&b.intent))
    });
    findings
}

/// Human-readable alert body listing every finding
pub fn format_alert(findings: &[WeaknessFinding], window_hours: i64) -> String {
    let mut message = format!(
        "{} topic(s) failed often in the last {}h:\n",
        findings.len(),
        window_hours
    );
    for f in findings {
        message.push_str(&format!(
            "- {}: {}/{} unsatisfied ({:.0}%)\n",
            f.intent,
            f.unsatisfied,
            f.total,
            f.rate * 100.0
        ));
    }
    message
}
