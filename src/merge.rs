//! Result merging and score fusion.
//!
//! Deduplicates hits from the content index and the graph index by document
//! id and fuses their scores. Graph evidence is weighted by the configured
//! boost (default 1.2) — graph-index entity matches have higher precision
//! than raw keyword relevance, but the two backends' score scales are not
//! normalized, so the boost is an approximation to calibrate, not a derived
//! weight.
//!
//! Output ordering is deterministic: combined score descending, then
//! document id ascending.

use std::collections::HashMap;

use crate::models::{DocumentHit, MergedResult, Source};

/// Merge main-index and graph-index hits into a deduplicated, ranked list.
pub fn merge_results(
    main_hits: Vec<DocumentHit>,
    graph_hits: Vec<DocumentHit>,
    graph_boost: f64,
) -> Vec<MergedResult> {
    let mut merged: HashMap<String, MergedResult> = HashMap::new();

    for hit in main_hits {
        merged.insert(hit.id.clone(), MergedResult::from_hit(hit, Source::Main));
    }

    for hit in graph_hits {
        match merged.get_mut(&hit.id) {
            Some(existing) => {
                existing.sources.push(Source::Graph);
                existing.combined_score += hit.score * graph_boost;
                // Graph-side annotations win; the main index does not carry them.
                existing.document.graph_metadata = hit.graph_metadata;
                existing.document.entities = hit.entities;
                existing.document.relationships = hit.relationships;
            }
            None => {
                let mut result = MergedResult::from_hit(hit, Source::Graph);
                result.combined_score = result.document.score * graph_boost;
                merged.insert(result.document.id.clone(), result);
            }
        }
    }

    let mut results: Vec<MergedResult> = merged.into_values().collect();
    sort_deterministic(&mut results);
    results
}

/// Combined score descending, document id ascending on ties. Identical
/// inputs always produce identical orderings.
pub fn sort_deterministic(results: &mut [MergedResult]) {
    results.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.document.id.cmp(&b.document.id))
    });
}
