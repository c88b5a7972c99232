//! Knowledge-graph traversal: predicate construction, result expansion,
//! and traversal-specific ranking.
//!
//! The traversal starts from all vertices, narrows by extracted entity
//! values (disjunctive) and property filters (conjunctive), then steps one
//! hop outward. Returned nodes are capped at [`TRAVERSAL_NODE_LIMIT`] — a
//! cost ceiling on the traversal itself, not a page size.
//!
//! Document nodes are expanded to full hits via the content index's
//! key lookup, then ranked by entity matches, connection strength, and
//! cross-tenant reach.

use std::sync::Arc;

use anyhow::Result;

use crate::index::FullTextIndex;
use crate::models::{DocumentHit, Entity, GraphNode, MergedResult, SearchFilters, Source};

/// Hard ceiling on nodes returned by one outward traversal step.
pub const TRAVERSAL_NODE_LIMIT: usize = 50;

/// A parameterized graph-traversal predicate.
///
/// Built from extracted entities and query filters; rendered to the graph
/// store's traversal syntax in one place with all values escaped.
#[derive(Debug, Clone, PartialEq)]
pub struct TraversalPredicate {
    /// Disjunctive entity-value matches (`value == v1 OR value == v2 ...`).
    pub entity_values: Vec<String>,
    /// Conjunctive property equality filters.
    pub property_filters: Vec<(String, String)>,
    pub node_limit: usize,
}

impl TraversalPredicate {
    /// Build the predicate for a traversal query.
    ///
    /// `category` and any extra scalar filter values become property
    /// equality predicates; range filters have no traversal equivalent and
    /// are ignored here.
    pub fn build(entities: &[Entity], filters: &SearchFilters) -> Self {
        let entity_values = entities.iter().map(|e| e.value.clone()).collect();

        let mut property_filters = Vec::new();
        if let Some(category) = &filters.category {
            property_filters.push(("category".to_string(), category.clone()));
        }
        for (key, value) in &filters.extra {
            let value = match value.as_str() {
                Some(s) => s.to_string(),
                None if value.is_number() || value.is_boolean() => value.to_string(),
                None => continue,
            };
            property_filters.push((key.clone(), value));
        }

        Self {
            entity_values,
            property_filters,
            node_limit: TRAVERSAL_NODE_LIMIT,
        }
    }

    /// Render to the graph store's Gremlin-style traversal syntax.
    pub fn to_gremlin(&self) -> String {
        let mut query = String::from("g.V()");

        if !self.entity_values.is_empty() {
            let clauses: Vec<String> = self
                .entity_values
                .iter()
                .map(|v| format!("has('value','{}')", escape(v)))
                .collect();
            query.push_str(&format!(".where({})", clauses.join(".or().")));
        }

        for (key, value) in &self.property_filters {
            query.push_str(&format!(".has('{}','{}')", escape(key), escape(value)));
        }

        query.push_str(&format!(".out().limit({})", self.node_limit));
        query
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// A traversal-returned document node resolved to its full hit.
#[derive(Debug, Clone)]
pub struct TraversedDocument {
    pub document: DocumentHit,
    pub node: GraphNode,
    pub connection_strength: f64,
}

/// Resolve traversal nodes of type `document` to full document hits.
///
/// Non-document nodes (entities, relationships) are skipped. Node counts
/// beyond the traversal limit are silently dropped before any lookup.
pub async fn expand_traversal(
    fulltext: &Arc<dyn FullTextIndex>,
    mut nodes: Vec<GraphNode>,
) -> Result<Vec<TraversedDocument>> {
    nodes.truncate(TRAVERSAL_NODE_LIMIT);

    let mut expanded = Vec::new();
    for node in nodes {
        if node.node_type != "document" {
            continue;
        }
        let document = fulltext.get_by_id(&node.id).await?;
        let connection_strength = node.connection_strength.unwrap_or(1.0);
        expanded.push(TraversedDocument {
            document,
            node,
            connection_strength,
        });
    }
    Ok(expanded)
}

/// Score and rank expanded traversal results, truncating to `top`.
///
/// Score = 10 × entity matches + 5 × connection strength +
/// 2 × cross-tenant connections. Connection enrichment runs only on the
/// cross-tenant path, so the cross-tenant term is zero for fresh results.
pub fn rank_traversal_results(
    docs: Vec<TraversedDocument>,
    entities: &[Entity],
    top: usize,
) -> Vec<MergedResult> {
    let mut ranked: Vec<MergedResult> = docs
        .into_iter()
        .map(|doc| {
            let matched = entities
                .iter()
                .filter(|e| doc.node.value.contains(&e.value) || doc.document.content.contains(&e.value))
                .count();

            let mut result = MergedResult::from_hit(doc.document, Source::Graph);
            let score = 10.0 * matched as f64
                + 5.0 * doc.connection_strength
                + 2.0 * result.cross_tenant_connection_count as f64;
            result.relevance_score = Some(score);
            // One ordering rule covers every mode: the traversal score is
            // the combined score on this path.
            result.combined_score = score;
            result
        })
        .collect();

    crate::merge::sort_deterministic(&mut ranked);
    ranked.truncate(top);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(entity_type: &str, value: &str) -> Entity {
        Entity {
            entity_type: entity_type.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_predicate_entities_and_property_filter() {
        let entities = vec![entity("material", "steel"), entity("material", "concrete")];
        let mut filters = SearchFilters::default();
        filters
            .extra
            .insert("phase".to_string(), json!("framing"));

        let predicate = TraversalPredicate::build(&entities, &filters);
        assert_eq!(
            predicate.to_gremlin(),
            "g.V().where(has('value','steel').or().has('value','concrete'))\
             .has('phase','framing').out().limit(50)"
        );
    }

    #[test]
    fn test_predicate_without_entities_traverses_all_vertices() {
        let predicate = TraversalPredicate::build(&[], &SearchFilters::default());
        assert_eq!(predicate.to_gremlin(), "g.V().out().limit(50)");
    }

    #[test]
    fn test_predicate_includes_category_and_skips_ranges() {
        let filters = SearchFilters {
            category: Some("estimates".to_string()),
            date_range: Some(crate::models::DateRange {
                start: Some("2024-01-01".to_string()),
                end: None,
            }),
            ..Default::default()
        };
        let predicate = TraversalPredicate::build(&[], &filters);
        assert_eq!(
            predicate.to_gremlin(),
            "g.V().has('category','estimates').out().limit(50)"
        );
    }

    #[test]
    fn test_predicate_escapes_quotes() {
        let entities = vec![entity("supplier", "O'Brien")];
        let predicate = TraversalPredicate::build(&entities, &SearchFilters::default());
        assert!(predicate.to_gremlin().contains("has('value','O\\'Brien')"));
    }

    fn traversed(id: &str, node_value: &str, content: &str, strength: f64) -> TraversedDocument {
        TraversedDocument {
            document: DocumentHit {
                id: id.to_string(),
                file_name: String::new(),
                tenant: "Acme".to_string(),
                category: String::new(),
                content: content.to_string(),
                last_modified: None,
                size: 0,
                score: 0.0,
                highlights: None,
                entities: None,
                relationships: None,
                graph_metadata: None,
            },
            node: GraphNode {
                id: id.to_string(),
                node_type: "document".to_string(),
                value: node_value.to_string(),
                connected_documents: Vec::new(),
                tenant: "Acme".to_string(),
                connection_type: None,
                strength: None,
                connection_strength: Some(strength),
            },
            connection_strength: strength,
        }
    }

    #[test]
    fn test_ranking_formula() {
        let entities = vec![entity("material", "steel"), entity("material", "concrete")];
        // Two entity matches in content, strength 2.0 → 10*2 + 5*2 = 30.
        let docs = vec![traversed("a", "", "steel and concrete pour", 2.0)];
        let ranked = rank_traversal_results(docs, &entities, 10);
        assert_eq!(ranked[0].relevance_score, Some(30.0));
        assert_eq!(ranked[0].combined_score, 30.0);
    }

    #[test]
    fn test_ranking_matches_node_value_too() {
        let entities = vec![entity("material", "steel")];
        let docs = vec![traversed("a", "steel", "unrelated content", 1.0)];
        let ranked = rank_traversal_results(docs, &entities, 10);
        assert_eq!(ranked[0].relevance_score, Some(15.0));
    }

    #[test]
    fn test_ranking_orders_and_truncates() {
        let entities = vec![entity("material", "steel")];
        let docs = vec![
            traversed("c", "", "nothing relevant", 1.0),  // 5
            traversed("a", "", "steel beams", 1.0),       // 15
            traversed("b", "", "steel frame", 1.0),       // 15
        ];
        let ranked = rank_traversal_results(docs, &entities, 2);
        let ids: Vec<&str> = ranked.iter().map(|r| r.document.id.as_str()).collect();
        // Ties break by id ascending; truncated to top 2.
        assert_eq!(ids, vec!["a", "b"]);
    }
}
