//! Graph-connection enrichment for merged results.
//!
//! For each result, the graph store is asked for nodes that reference the
//! document (directly or via their connected-documents list). Lookups run
//! on a bounded worker pool — a semaphore caps outstanding calls so the
//! graph store is neither hammered by an unbounded fan-out nor serialized
//! into one call at a time.
//!
//! A failed lookup is non-fatal: that result keeps an empty connection list
//! and the failure is logged.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::graph::GraphStore;
use crate::models::{Connection, GraphNode, MergedResult};

/// Populate `connections` and `crossTenantConnectionCount` on every result.
pub async fn apply_graph_connections(
    graph: &Arc<dyn GraphStore>,
    results: &mut [MergedResult],
    concurrency: usize,
) {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks: JoinSet<(usize, Vec<GraphNode>)> = JoinSet::new();

    for (idx, result) in results.iter().enumerate() {
        let id = result.document.id.clone();
        let graph = Arc::clone(graph);
        let semaphore = Arc::clone(&semaphore);

        tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return (idx, Vec::new()),
            };
            match graph.query_connections(&id).await {
                Ok(nodes) => (idx, nodes),
                Err(err) => {
                    tracing::warn!(
                        document_id = %id,
                        error = %err,
                        "connection lookup failed; leaving connections empty"
                    );
                    (idx, Vec::new())
                }
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let Ok((idx, nodes)) = joined else { continue };
        let result = &mut results[idx];

        result.connections = nodes
            .iter()
            .map(|node| Connection {
                document_id: node.id.clone(),
                tenant: node.tenant.clone(),
                connection_type: node.connection_type.clone(),
                strength: node.strength,
            })
            .collect();

        result.cross_tenant_connection_count = result
            .connections
            .iter()
            .filter(|c| c.tenant != result.document.tenant)
            .count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterExpr;
    use crate::models::{DocumentHit, Source};
    use crate::traverse::TraversalPredicate;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn result_for(id: &str, tenant: &str) -> MergedResult {
        MergedResult::from_hit(
            DocumentHit {
                id: id.to_string(),
                file_name: String::new(),
                tenant: tenant.to_string(),
                category: String::new(),
                content: String::new(),
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

    fn node(id: &str, tenant: &str) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            node_type: "document".to_string(),
            value: String::new(),
            connected_documents: Vec::new(),
            tenant: tenant.to_string(),
            connection_type: Some("shared-entity".to_string()),
            strength: Some(0.8),
            connection_strength: None,
        }
    }

    /// Graph store that tracks in-flight call concurrency.
    struct TrackingGraphStore {
        current: AtomicUsize,
        peak: AtomicUsize,
        fail_for: Option<String>,
    }

    impl TrackingGraphStore {
        fn new(fail_for: Option<String>) -> Self {
            Self {
                current: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                fail_for,
            }
        }
    }

    #[async_trait]
    impl GraphStore for TrackingGraphStore {
        async fn search(
            &self,
            _text: &str,
            _filter: Option<&FilterExpr>,
            _top: usize,
        ) -> Result<Vec<DocumentHit>> {
            Ok(Vec::new())
        }

        async fn query_connections(&self, document_id: &str) -> Result<Vec<GraphNode>> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);

            if self.fail_for.as_deref() == Some(document_id) {
                bail!("simulated graph store failure");
            }
            Ok(vec![
                node("conn-same", "Acme"),
                node("conn-other-1", "Globex"),
                node("conn-other-2", "Initech"),
            ])
        }

        async fn traverse(&self, _predicate: &TraversalPredicate) -> Result<Vec<GraphNode>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_cross_tenant_connection_count() {
        let graph: Arc<dyn GraphStore> = Arc::new(TrackingGraphStore::new(None));
        let mut results = vec![result_for("doc-1", "Acme")];

        apply_graph_connections(&graph, &mut results, 4).await;

        assert_eq!(results[0].connections.len(), 3);
        assert_eq!(results[0].cross_tenant_connection_count, 2);
        let same_tenant = results[0]
            .connections
            .iter()
            .filter(|c| c.tenant == "Acme")
            .count();
        assert_eq!(results[0].connections.len() - same_tenant, 2);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let store = Arc::new(TrackingGraphStore::new(None));
        let graph: Arc<dyn GraphStore> = store.clone();
        let mut results: Vec<MergedResult> =
            (0..12).map(|i| result_for(&format!("doc-{i}"), "Acme")).collect();

        apply_graph_connections(&graph, &mut results, 3).await;

        assert!(
            store.peak.load(Ordering::SeqCst) <= 3,
            "peak concurrency {} exceeded the limit",
            store.peak.load(Ordering::SeqCst)
        );
        // Every result was still enriched.
        assert!(results.iter().all(|r| !r.connections.is_empty()));
    }

    #[tokio::test]
    async fn test_single_lookup_failure_is_non_fatal() {
        let graph: Arc<dyn GraphStore> =
            Arc::new(TrackingGraphStore::new(Some("doc-bad".to_string())));
        let mut results = vec![result_for("doc-ok", "Acme"), result_for("doc-bad", "Acme")];

        apply_graph_connections(&graph, &mut results, 2).await;

        assert!(!results[0].connections.is_empty());
        assert!(results[1].connections.is_empty());
        assert_eq!(results[1].cross_tenant_connection_count, 0);
    }
}
