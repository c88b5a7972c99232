//! The search engine: request validation, mode routing, and the
//! per-request pipeline.
//!
//! One engine instance is shared across requests; it owns only handles to
//! the backends and the retrieval settings. All per-request state (merged
//! results, extracted entities, mined patterns) lives on the stack of
//! [`SearchEngine::execute`] and is dropped when the response is built.
//!
//! Mode routing:
//! - `all-tenants` — parallel fan-out to the content and graph indexes,
//!   score fusion, then connection enrichment.
//! - `knowledge-graph` — entity extraction, bounded graph traversal,
//!   document expansion, traversal ranking.
//! - `single-tenant` — filtered content-index search for one tenant.
//!
//! Every path finishes the same way: insight annotation for the top
//! results, pattern mining over the final set, response assembly.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Result;

use crate::config::{Config, RetrievalConfig};
use crate::connect::apply_graph_connections;
use crate::error::SearchError;
use crate::filter::FilterExpr;
use crate::graph::{GraphStore, HttpGraphStore};
use crate::index::{FullTextIndex, HttpFullTextIndex};
use crate::insight::annotate_top_results;
use crate::merge::{merge_results, sort_deterministic};
use crate::models::{
    MergedResult, ResponseMetadata, SearchMode, SearchQuery, SearchResponse, Source,
};
use crate::patterns::mine_patterns;
use crate::providers::{create_extractor, create_generator, EntityExtractor, InsightGenerator};
use crate::traverse::{expand_traversal, rank_traversal_results, TraversalPredicate};

/// Shared, request-independent engine state.
pub struct SearchEngine {
    fulltext: Arc<dyn FullTextIndex>,
    graph: Arc<dyn GraphStore>,
    extractor: Arc<dyn EntityExtractor>,
    insights: Arc<dyn InsightGenerator>,
    retrieval: RetrievalConfig,
}

impl SearchEngine {
    /// Assemble an engine from explicit backends. Tests and embedders
    /// inject fakes here.
    pub fn new(
        fulltext: Arc<dyn FullTextIndex>,
        graph: Arc<dyn GraphStore>,
        extractor: Arc<dyn EntityExtractor>,
        insights: Arc<dyn InsightGenerator>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            fulltext,
            graph,
            extractor,
            insights,
            retrieval,
        }
    }

    /// Build an engine with HTTP backends from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fulltext: Arc<dyn FullTextIndex> = Arc::new(HttpFullTextIndex::new(&config.search)?);
        let graph: Arc<dyn GraphStore> =
            Arc::new(HttpGraphStore::new(&config.search, &config.graph)?);
        let extractor: Arc<dyn EntityExtractor> = Arc::from(create_extractor(&config.extraction)?);
        let insights: Arc<dyn InsightGenerator> = Arc::from(create_generator(&config.insights)?);
        Ok(Self::new(
            fulltext,
            graph,
            extractor,
            insights,
            config.retrieval.clone(),
        ))
    }

    /// Run one search request end to end.
    pub async fn execute(&self, query: SearchQuery) -> Result<SearchResponse, SearchError> {
        if query.text.trim().is_empty() {
            return Err(SearchError::Validation(
                "query text must not be empty".to_string(),
            ));
        }
        if query.mode == SearchMode::SingleTenant
            && query.tenant.as_deref().map_or(true, str::is_empty)
        {
            return Err(SearchError::Validation(
                "tenant is required for single-tenant mode".to_string(),
            ));
        }

        tracing::info!(
            query = %query.text,
            mode = query.mode.as_str(),
            top = query.top,
            skip = query.skip,
            "executing search"
        );

        let mut results = match query.mode {
            SearchMode::AllTenants => self.cross_tenant_search(&query).await?,
            SearchMode::KnowledgeGraph => self.graph_search(&query).await?,
            SearchMode::SingleTenant => self.single_tenant_search(&query).await?,
        };

        annotate_top_results(
            &self.insights,
            query.mode,
            &query.text,
            &mut results,
            self.retrieval.enrich_concurrency,
        )
        .await;

        let patterns = mine_patterns(&results);
        let tenants: BTreeSet<&str> = results
            .iter()
            .map(|r| r.document.tenant.as_str())
            .collect();

        Ok(SearchResponse {
            success: true,
            metadata: ResponseMetadata {
                total_results: results.len(),
                tenants_covered: tenants.len(),
                // A full page means the backends may hold more; a short
                // page is definitive.
                has_more_results: results.len() == query.top,
            },
            query: query.text,
            mode: query.mode,
            results,
            patterns,
        })
    }

    /// Dual-index fan-out across all tenants with score fusion.
    async fn cross_tenant_search(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<MergedResult>, SearchError> {
        let filter = FilterExpr::from_filters(&query.filters);

        // The content index is over-fetched so merge still fills a page
        // after deduplication against graph hits.
        let (main, graph) = tokio::join!(
            self.fulltext
                .search(&query.text, filter.as_ref(), query.top * 2, query.skip),
            self.graph.search(&query.text, filter.as_ref(), query.top),
        );
        let main_hits = main.map_err(|e| SearchError::upstream("full-text index", e))?;
        let graph_hits = graph.map_err(|e| SearchError::upstream("graph index", e))?;

        let mut results = merge_results(main_hits, graph_hits, self.retrieval.graph_boost);
        results.truncate(query.top);

        apply_graph_connections(
            &self.graph,
            &mut results,
            self.retrieval.enrich_concurrency,
        )
        .await;
        // Connection counts do not feed the score; the merge ordering stands.
        Ok(results)
    }

    /// Entity-driven traversal of the knowledge graph.
    async fn graph_search(&self, query: &SearchQuery) -> Result<Vec<MergedResult>, SearchError> {
        let entities = match self.extractor.extract(&query.text).await {
            Ok(entities) => entities,
            Err(err) => {
                tracing::warn!(error = %err, "entity extraction failed; traversing unfiltered");
                Vec::new()
            }
        };
        tracing::debug!(count = entities.len(), "entities extracted");

        let predicate = TraversalPredicate::build(&entities, &query.filters);
        let nodes = self
            .graph
            .traverse(&predicate)
            .await
            .map_err(|e| SearchError::upstream("graph index", e))?;

        let docs = expand_traversal(&self.fulltext, nodes)
            .await
            .map_err(|e| SearchError::upstream("full-text index", e))?;

        Ok(rank_traversal_results(docs, &entities, query.top))
    }

    /// Filtered full-text search scoped to one tenant.
    async fn single_tenant_search(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<MergedResult>, SearchError> {
        // Validated above; the tenant is present on this path.
        let tenant = query.tenant.as_deref().unwrap_or_default();
        let filter = FilterExpr::for_tenant(tenant, &query.filters);

        let hits = self
            .fulltext
            .search(&query.text, Some(&filter), query.top, query.skip)
            .await
            .map_err(|e| SearchError::upstream("full-text index", e))?;

        let mut results: Vec<MergedResult> = hits
            .into_iter()
            .map(|hit| MergedResult::from_hit(hit, Source::Main))
            .collect();
        sort_deterministic(&mut results);
        Ok(results)
    }
}
