//! Core data models for the discovery engine.
//!
//! These types represent the search request, the hits coming back from the
//! full-text and graph indexes, the merged results assembled per request,
//! and the cross-result patterns returned alongside them. Wire names follow
//! the JSON contract (camelCase) and everything is built fresh per request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which retrieval path a query takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SearchMode {
    /// Fan out to the full-text and graph indexes across every tenant.
    #[default]
    #[serde(rename = "all-tenants")]
    AllTenants,
    /// Entity-driven traversal of the knowledge graph.
    #[serde(rename = "knowledge-graph")]
    KnowledgeGraph,
    /// Full-text search scoped to one tenant.
    #[serde(rename = "single-tenant")]
    SingleTenant,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::AllTenants => "all-tenants",
            SearchMode::KnowledgeGraph => "knowledge-graph",
            SearchMode::SingleTenant => "single-tenant",
        }
    }
}

/// A search request. Immutable for the lifetime of the request.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    /// Free-text query string.
    #[serde(rename = "query")]
    pub text: String,
    #[serde(rename = "searchMode", default)]
    pub mode: SearchMode,
    /// Required for single-tenant mode, ignored otherwise.
    #[serde(default)]
    pub tenant: Option<String>,
    #[serde(default)]
    pub filters: SearchFilters,
    /// Page size.
    #[serde(default = "default_top")]
    pub top: usize,
    /// Page offset.
    #[serde(default)]
    pub skip: usize,
}

fn default_top() -> usize {
    20
}

impl SearchQuery {
    /// Minimal query for a given mode, used by the CLI and tests.
    pub fn new(text: impl Into<String>, mode: SearchMode) -> Self {
        Self {
            text: text.into(),
            mode,
            tenant: None,
            filters: SearchFilters::default(),
            top: default_top(),
            skip: 0,
        }
    }
}

/// Structured filter options attached to a query.
///
/// The typed fields map to filter clauses on the document indexes. Any
/// additional key/value pairs (captured via `extra`) only apply to the
/// knowledge-graph traversal path, where they become equality predicates
/// on node properties.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub date_range: Option<DateRange>,
    #[serde(default)]
    pub size_range: Option<SizeRange>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SizeRange {
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
}

/// A typed value extracted from text (query or document content).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub value: String,
}

/// A scored document returned by either index. Read-only external data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentHit {
    pub id: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub tenant: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub score: f64,
    /// Highlighted content fragments (full-text index only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Vec<String>>,
    /// Entities attached by the graph index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Entity>>,
    /// Relationship records attached by the graph index (passed through).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_metadata: Option<serde_json::Value>,
}

/// A node in the knowledge graph. Read-only external data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub connected_documents: Vec<String>,
    #[serde(default)]
    pub tenant: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    /// Edge weight when this node came back from a connection query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
    /// Traversal weight when this node came back from a graph traversal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_strength: Option<f64>,
}

/// An explicit graph connection attached to a merged result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub document_id: String,
    pub tenant: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
}

/// Which indexes contributed evidence for a merged result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Main,
    Graph,
}

/// A deduplicated, score-fused result. Scoped to a single request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedResult {
    #[serde(flatten)]
    pub document: DocumentHit,
    pub sources: Vec<Source>,
    pub combined_score: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<Connection>,
    pub cross_tenant_connection_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight: Option<String>,
    /// Score from the graph-traversal ranking path only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

impl MergedResult {
    /// Wrap a hit from a single index with no fused evidence yet.
    pub fn from_hit(document: DocumentHit, source: Source) -> Self {
        let combined_score = document.score;
        Self {
            document,
            sources: vec![source],
            combined_score,
            connections: Vec::new(),
            cross_tenant_connection_count: 0,
            insight: None,
            relevance_score: None,
        }
    }
}

/// An entity observed across multiple results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityCount {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub value: String,
    pub count: usize,
}

/// Summary statistics over currency amounts found in result content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub median: f64,
}

/// Per-tenant aggregate over the final result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantTrend {
    pub document_count: usize,
    pub categories: Vec<String>,
    pub avg_score: f64,
}

/// Corpus-wide patterns mined from the final result set of one request.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Patterns {
    pub common_entities: Vec<EntityCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
    pub tenant_trends: BTreeMap<String, TenantTrend>,
}

/// Counts describing the final result set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub total_results: usize,
    pub tenants_covered: usize,
    pub has_more_results: bool,
}

/// The full response envelope for one search request.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub query: String,
    pub mode: SearchMode,
    pub results: Vec<MergedResult>,
    pub patterns: Patterns,
    pub metadata: ResponseMetadata,
}
