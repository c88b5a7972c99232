//! Pattern mining over a finished result set.
//!
//! Runs after merge and enrichment, on whatever the request returns:
//! recurring entities, a price profile scanned out of result content, and
//! per-tenant trends. Everything here is derived from the results alone —
//! no backend calls.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{EntityCount, MergedResult, Patterns, PriceRange, TenantTrend};

/// Keep an entity only when it recurs across the result set.
const MIN_ENTITY_OCCURRENCES: usize = 2;

/// Cap on reported recurring entities.
const COMMON_ENTITY_LIMIT: usize = 10;

/// Dollar amounts with optional thousands separators and cents.
static PRICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$[0-9][0-9,]*(?:\.[0-9]{2})?").unwrap()
});

/// Mine cross-result patterns from a ranked result set.
pub fn mine_patterns(results: &[MergedResult]) -> Patterns {
    Patterns {
        common_entities: common_entities(results),
        price_range: price_range(results),
        tenant_trends: tenant_trends(results),
    }
}

/// Entities appearing in more than one result, top ten by count. Ties
/// break by type then value ascending so identical inputs report
/// identical patterns.
fn common_entities(results: &[MergedResult]) -> Vec<EntityCount> {
    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    for result in results {
        if let Some(entities) = &result.document.entities {
            for entity in entities {
                *counts
                    .entry((entity.entity_type.clone(), entity.value.clone()))
                    .or_insert(0) += 1;
            }
        }
    }

    let mut common: Vec<EntityCount> = counts
        .into_iter()
        .filter(|(_, count)| *count >= MIN_ENTITY_OCCURRENCES)
        .map(|((entity_type, value), count)| EntityCount {
            entity_type,
            value,
            count,
        })
        .collect();
    common.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.entity_type.cmp(&b.entity_type))
            .then_with(|| a.value.cmp(&b.value))
    });
    common.truncate(COMMON_ENTITY_LIMIT);
    common
}

/// Scan result content for dollar amounts and profile them.
fn price_range(results: &[MergedResult]) -> Option<PriceRange> {
    let mut prices: Vec<f64> = Vec::new();
    for result in results {
        for matched in PRICE_RE.find_iter(&result.document.content) {
            let cleaned: String = matched
                .as_str()
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if let Ok(value) = cleaned.parse::<f64>() {
                prices.push(value);
            }
        }
    }
    if prices.is_empty() {
        return None;
    }

    prices.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let min = prices[0];
    let max = prices[prices.len() - 1];
    let average = prices.iter().sum::<f64>() / prices.len() as f64;

    Some(PriceRange {
        min,
        max,
        average,
        median: median(&prices),
    })
}

/// Median of an already-sorted slice. Even lengths average the two
/// middle values.
fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Per-tenant document counts, distinct categories, and average native
/// relevance. Keyed by tenant in a sorted map for stable output.
fn tenant_trends(results: &[MergedResult]) -> BTreeMap<String, TenantTrend> {
    let mut counts: HashMap<String, (usize, BTreeSet<String>, f64)> = HashMap::new();
    for result in results {
        let entry = counts
            .entry(result.document.tenant.clone())
            .or_insert_with(|| (0, BTreeSet::new(), 0.0));
        entry.0 += 1;
        if !result.document.category.is_empty() {
            entry.1.insert(result.document.category.clone());
        }
        entry.2 += result.document.score;
    }

    counts
        .into_iter()
        .map(|(tenant, (count, categories, score_sum))| {
            (
                tenant,
                TenantTrend {
                    document_count: count,
                    categories: categories.into_iter().collect(),
                    avg_score: score_sum / count as f64,
                },
            )
        })
        .collect()
}
