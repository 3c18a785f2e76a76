//! In-process retrieval tiers: brute-force cosine and keyword fallback.
//!
//! Both take the tenant's item slice as loaded by the corpus; neither can see
//! items the corpus did not return for that tenant.

use std::cmp::Ordering;

use super::types::{KnowledgeItem, Provenance, SimilarityResult, EMBEDDING_DIM, KEYWORD_SCORE};

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

/// Map a cosine similarity (`1 - cosine_distance`) into [0, 1]
pub fn normalize_score(similarity: f32) -> f32 {
    if similarity.is_nan() {
        0.0
    } else {
        similarity.clamp(0.0, 1.0)
    }
}

/// Rank every embedded active item by cosine similarity to `query`
pub fn brute_force_search(
    items: &[KnowledgeItem],
    query: &[f32],
    k: usize,
    degraded: bool,
) -> Vec<SimilarityResult> {
    if query.len() != EMBEDDING_DIM || k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(f32, &KnowledgeItem)> = items
        .iter()
        .filter(|item| item.active)
        .filter_map(|item| {
            let embedding = item.embedding.as_ref()?;
            if embedding.len() != EMBEDDING_DIM {
                return None;
            }
            Some((cosine_similarity(query, embedding), item))
        })
        .collect();

    // Descending similarity == ascending distance; ties broken by id
    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.id.cmp(&b.1.id))
    });
    scored.truncate(k);

    scored
        .into_iter()
        .map(|(similarity, item)| SimilarityResult {
            item_id: item.id.clone(),
            name: item.name.clone(),
            score: normalize_score(similarity),
            provenance: Provenance::BruteForce,
            degraded,
        })
        .collect()
}

/// Case-insensitive substring match on name, then description.
/// Name matches rank before description matches; every hit scores 0.5.
pub fn keyword_search(items: &[KnowledgeItem], query: &str, k: usize) -> Vec<SimilarityResult> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut name_hits = Vec::new();
    let mut description_hits = Vec::new();
    for item in items.iter().filter(|item| item.active) {
        if item.name.to_lowercase().contains(&needle) {
            name_hits.push(item);
        } else if item.description.to_lowercase().contains(&needle) {
            description_hits.push(item);
        }
    }

    name_hits
        .into_iter()
        .chain(description_hits)
        .take(k)
        .map(|item| SimilarityResult {
            item_id: item.id.clone(),
            name: item.name.clone(),
            score: KEYWORD_SCORE,
            provenance: Provenance::Keyword,
            degraded: false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TenantId;

    fn tenant() -> TenantId {
        TenantId::new("shop-1").unwrap()
    }

    fn axis(i: usize) -> Vec<f32> {
        let mut v = vec![0.0; EMBEDDING_DIM];
        v[i] = 1.0;
        v
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_normalize_score_clamps() {
        assert_eq!(normalize_score(-0.4), 0.0);
        assert_eq!(normalize_score(0.7), 0.7);
        assert_eq!(normalize_score(f32::NAN), 0.0);
    }

    #[test]
    fn test_brute_force_orders_and_limits() {
        let mut near = axis(0);
        near[1] = 0.2;
        let items = vec![
            KnowledgeItem::new(tenant(), "far", "Far").with_embedding(axis(1)),
            KnowledgeItem::new(tenant(), "exact", "Exact").with_embedding(axis(0)),
            KnowledgeItem::new(tenant(), "near", "Near").with_embedding(near),
            KnowledgeItem::new(tenant(), "bare", "No vector"),
        ];

        let results = brute_force_search(&items, &axis(0), 2, false);
        let ids: Vec<_> = results.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near"]);
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert!(results.iter().all(|r| r.provenance == Provenance::BruteForce));
    }

    #[test]
    fn test_brute_force_skips_inactive() {
        let mut item = KnowledgeItem::new(tenant(), "1", "Hidden").with_embedding(axis(0));
        item.active = false;
        assert!(brute_force_search(&[item], &axis(0), 5, false).is_empty());
    }

    #[test]
    fn test_keyword_name_before_description() {
        let items = vec![
            KnowledgeItem::new(tenant(), "1", "Gift card").with_description("Works with any shirt"),
            KnowledgeItem::new(tenant(), "2", "Red Shirt"),
        ];

        let results = keyword_search(&items, "SHIRT", 5);
        let ids: Vec<_> = results.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert!(results.iter().all(|r| r.score == KEYWORD_SCORE));
    }

    #[test]
    fn test_keyword_whole_phrase() {
        let items = vec![
            KnowledgeItem::new(tenant(), "1", "Red Shirt"),
            KnowledgeItem::new(tenant(), "2", "Blue Shirt"),
        ];

        let results = keyword_search(&items, "red shirt", 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].item_id, "1");
    }
}
