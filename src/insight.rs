//! Insight annotation for top-ranked results.
//!
//! Only the top [`INSIGHT_RESULT_LIMIT`] results of the final ordering get
//! an insight, whatever the total result count — generation is the most
//! expensive call in the pipeline and this is its cost ceiling. Prompts are
//! mode-specific and each call sees at most [`INSIGHT_EXCERPT_CHARS`]
//! characters of content.
//!
//! Calls run on the same bounded-pool pattern as connection enrichment.
//! Every call is isolated: a failure leaves that result's insight unset and
//! never aborts the request.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::models::{MergedResult, SearchMode};
use crate::providers::InsightGenerator;

/// How many results receive an insight.
pub const INSIGHT_RESULT_LIMIT: usize = 5;

/// Content excerpt cap per generation call.
pub const INSIGHT_EXCERPT_CHARS: usize = 2000;

/// Build the mode-specific generation prompt.
pub fn insight_prompt(mode: SearchMode, query: &str, tenant: &str) -> String {
    match mode {
        SearchMode::AllTenants => format!(
            "Based on this document from {}, identify transferable patterns or \
             insights that could apply to other projects. Focus on costs, methods, \
             or specifications.",
            tenant
        ),
        SearchMode::KnowledgeGraph => "Analyze the connections between this document \
             and related entities. Explain what insights can be drawn from these \
             relationships."
            .to_string(),
        SearchMode::SingleTenant => format!(
            "Provide a brief summary of how this document relates to the query: \"{}\"",
            query
        ),
    }
}

/// Annotate the top results in place.
pub async fn annotate_top_results(
    generator: &Arc<dyn InsightGenerator>,
    mode: SearchMode,
    query: &str,
    results: &mut [MergedResult],
    concurrency: usize,
) {
    let count = results.len().min(INSIGHT_RESULT_LIMIT);
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks: JoinSet<(usize, Option<String>)> = JoinSet::new();

    for (idx, result) in results.iter().take(count).enumerate() {
        let prompt = insight_prompt(mode, query, &result.document.tenant);
        let excerpt = if result.document.content.is_empty() {
            result.document.file_name.clone()
        } else {
            result
                .document
                .content
                .chars()
                .take(INSIGHT_EXCERPT_CHARS)
                .collect()
        };
        let id = result.document.id.clone();
        let generator = Arc::clone(generator);
        let semaphore = Arc::clone(&semaphore);

        tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return (idx, None),
            };
            match generator.generate(&prompt, &excerpt).await {
                Ok(insight) => (idx, Some(insight)),
                Err(err) => {
                    tracing::warn!(
                        document_id = %id,
                        error = %err,
                        "insight generation failed; leaving insight unset"
                    );
                    (idx, None)
                }
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        if let Ok((idx, insight)) = joined {
            results[idx].insight = insight;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentHit, Source};
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn result_with_content(id: &str, content: &str) -> MergedResult {
        MergedResult::from_hit(
            DocumentHit {
                id: id.to_string(),
                file_name: format!("{}.pdf", id),
                tenant: "Acme".to_string(),
                category: String::new(),
                content: content.to_string(),
                last_modified: None,
                size: 0,
                score: 1.0,
                highlights: None,
                entities: None,
                relationships: None,
                graph_metadata: None,
            },
            Source::Main,
        )
    }

    /// Generator that counts calls and records excerpt lengths.
    struct CountingGenerator {
        calls: AtomicUsize,
        excerpt_lens: Mutex<Vec<usize>>,
        fail_excerpt_containing: Option<String>,
    }

    impl CountingGenerator {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                excerpt_lens: Mutex::new(Vec::new()),
                fail_excerpt_containing: None,
            }
        }
    }

    #[async_trait]
    impl InsightGenerator for CountingGenerator {
        async fn generate(&self, _prompt: &str, excerpt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.excerpt_lens
                .lock()
                .unwrap()
                .push(excerpt.chars().count());
            if let Some(marker) = &self.fail_excerpt_containing {
                if excerpt.contains(marker.as_str()) {
                    bail!("simulated insight failure");
                }
            }
            Ok("generated insight".to_string())
        }
    }

    #[tokio::test]
    async fn test_exactly_five_calls_for_large_result_sets() {
        let generator = Arc::new(CountingGenerator::new());
        let dyn_gen: Arc<dyn InsightGenerator> = generator.clone();
        let mut results: Vec<MergedResult> = (0..50)
            .map(|i| result_with_content(&format!("doc-{i}"), "content"))
            .collect();

        annotate_top_results(&dyn_gen, SearchMode::AllTenants, "q", &mut results, 4).await;

        assert_eq!(generator.calls.load(Ordering::SeqCst), 5);
        assert!(results[..5].iter().all(|r| r.insight.is_some()));
        assert!(results[5..].iter().all(|r| r.insight.is_none()));
    }

    #[tokio::test]
    async fn test_fewer_results_than_limit() {
        let generator = Arc::new(CountingGenerator::new());
        let dyn_gen: Arc<dyn InsightGenerator> = generator.clone();
        let mut results = vec![
            result_with_content("a", "x"),
            result_with_content("b", "y"),
        ];

        annotate_top_results(&dyn_gen, SearchMode::SingleTenant, "q", &mut results, 4).await;

        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_excerpt_is_bounded() {
        let generator = Arc::new(CountingGenerator::new());
        let dyn_gen: Arc<dyn InsightGenerator> = generator.clone();
        let long_content = "x".repeat(INSIGHT_EXCERPT_CHARS * 3);
        let mut results = vec![result_with_content("a", &long_content)];

        annotate_top_results(&dyn_gen, SearchMode::AllTenants, "q", &mut results, 4).await;

        let lens = generator.excerpt_lens.lock().unwrap();
        assert_eq!(lens[0], INSIGHT_EXCERPT_CHARS);
    }

    #[tokio::test]
    async fn test_failed_call_leaves_insight_unset() {
        let generator = Arc::new(CountingGenerator {
            calls: AtomicUsize::new(0),
            excerpt_lens: Mutex::new(Vec::new()),
            fail_excerpt_containing: Some("poison".to_string()),
        });
        let dyn_gen: Arc<dyn InsightGenerator> = generator.clone();
        let mut results = vec![
            result_with_content("a", "fine content"),
            result_with_content("b", "poison content"),
        ];

        annotate_top_results(&dyn_gen, SearchMode::AllTenants, "q", &mut results, 4).await;

        assert!(results[0].insight.is_some());
        assert!(results[1].insight.is_none());
    }

    #[test]
    fn test_prompts_are_mode_specific() {
        let cross = insight_prompt(SearchMode::AllTenants, "q", "Acme");
        assert!(cross.contains("Acme"));
        assert!(cross.contains("transferable"));

        let graph = insight_prompt(SearchMode::KnowledgeGraph, "q", "Acme");
        assert!(graph.contains("relationships"));

        let single = insight_prompt(SearchMode::SingleTenant, "steel cost", "Acme");
        assert!(single.contains("steel cost"));
    }
}
