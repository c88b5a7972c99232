//! Knowledge-graph capability and HTTP client.
//!
//! The [`GraphStore`] trait covers the three graph operations the engine
//! needs: scored search over the graph *index* (entity-annotated document
//! hits), connection lookups for a document, and bounded outward traversal.
//!
//! [`HttpGraphStore`] talks to two services, mirroring how the graph data
//! is deployed: the graph index lives on the same search service as the
//! content index (under its own index name), while connections and
//! traversals go to the graph database's query endpoint.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::{GraphStoreConfig, SearchServiceConfig};
use crate::filter::FilterExpr;
use crate::index::parse_search_hits;
use crate::models::{DocumentHit, GraphNode};
use crate::traverse::TraversalPredicate;

/// Capability contract for the knowledge graph.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Scored search over the graph index. Hits carry entity and
    /// relationship annotations alongside the usual document fields.
    async fn search(
        &self,
        text: &str,
        filter: Option<&FilterExpr>,
        top: usize,
    ) -> Result<Vec<DocumentHit>>;

    /// All graph nodes connected to a document: nodes for the document
    /// itself plus nodes listing it among their connected documents.
    async fn query_connections(&self, document_id: &str) -> Result<Vec<GraphNode>>;

    /// Execute a bounded one-hop traversal.
    async fn traverse(&self, predicate: &TraversalPredicate) -> Result<Vec<GraphNode>>;
}

/// HTTP-backed graph store client.
pub struct HttpGraphStore {
    search_client: reqwest::Client,
    search_endpoint: String,
    graph_index: String,
    search_key: String,
    store_client: reqwest::Client,
    store_endpoint: String,
    database: String,
    container: String,
    store_key: String,
}

const API_VERSION: &str = "2023-11-01";

impl HttpGraphStore {
    /// Build a client from the search-service and graph-store configs.
    ///
    /// API keys are read from the environment variables named in config;
    /// construction fails if either is not set.
    pub fn new(search: &SearchServiceConfig, store: &GraphStoreConfig) -> Result<Self> {
        let search_key = std::env::var(&search.api_key_env)
            .map_err(|_| anyhow!("{} environment variable not set", search.api_key_env))?;
        let store_key = std::env::var(&store.api_key_env)
            .map_err(|_| anyhow!("{} environment variable not set", store.api_key_env))?;

        let search_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(search.timeout_secs))
            .build()?;
        let store_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(store.timeout_secs))
            .build()?;

        Ok(Self {
            search_client,
            search_endpoint: search.endpoint.trim_end_matches('/').to_string(),
            graph_index: search.graph_index.clone(),
            search_key,
            store_client,
            store_endpoint: store.endpoint.trim_end_matches('/').to_string(),
            database: store.database.clone(),
            container: store.container.clone(),
            store_key,
        })
    }

    async fn run_store_query(&self, body: serde_json::Value) -> Result<Vec<GraphNode>> {
        let url = format!("{}/query", self.store_endpoint);

        let response = self
            .store_client
            .post(&url)
            .header("x-api-key", &self.store_key)
            .json(&body)
            .send()
            .await
            .context("graph store query failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("graph store returned {}: {}", status, text);
        }

        let json: serde_json::Value = response.json().await?;
        let resources = json
            .get("resources")
            .cloned()
            .ok_or_else(|| anyhow!("invalid graph store response: missing resources"))?;
        serde_json::from_value(resources).context("invalid graph node payload")
    }
}

#[async_trait]
impl GraphStore for HttpGraphStore {
    async fn search(
        &self,
        text: &str,
        filter: Option<&FilterExpr>,
        top: usize,
    ) -> Result<Vec<DocumentHit>> {
        let url = format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.search_endpoint, self.graph_index, API_VERSION
        );

        let mut body = serde_json::json!({
            "search": text,
            "top": top,
            "searchMode": "all",
            "searchFields": "entityValues,fileName",
            "select": "id,fileName,tenant,category,entities,relationships,graphMetadata",
        });
        if let Some(filter) = filter {
            body["filter"] = serde_json::Value::String(filter.render());
        }

        let response = self
            .search_client
            .post(&url)
            .header("api-key", &self.search_key)
            .json(&body)
            .send()
            .await
            .context("graph index search failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("graph index search returned {}: {}", status, text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_search_hits(&json)
    }

    async fn query_connections(&self, document_id: &str) -> Result<Vec<GraphNode>> {
        // Parameterized query; the document id never lands in the query text.
        let body = serde_json::json!({
            "database": self.database,
            "container": self.container,
            "query": "SELECT * FROM c WHERE c.documentId = @docId \
                      OR ARRAY_CONTAINS(c.connectedDocuments, @docId)",
            "parameters": [ { "name": "@docId", "value": document_id } ],
        });
        self.run_store_query(body).await
    }

    async fn traverse(&self, predicate: &TraversalPredicate) -> Result<Vec<GraphNode>> {
        let body = serde_json::json!({
            "database": self.database,
            "container": self.container,
            "gremlin": predicate.to_gremlin(),
        });
        self.run_store_query(body).await
    }
}
