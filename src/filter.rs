//! Filter expression builder for the document indexes.
//!
//! Structured filter options are assembled into a small expression tree and
//! rendered to the backend's OData-style filter syntax in one place. User
//! values never reach the filter string directly: text values are quoted
//! with embedded quotes doubled, and datetime/numeric literals are reduced
//! to their literal character sets.

use crate::models::SearchFilters;

/// Comparison operators supported by the index filter syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ge,
    Le,
}

impl CompareOp {
    fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ge => "ge",
            CompareOp::Le => "le",
        }
    }
}

/// A literal operand in a filter comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Quoted string literal.
    Text(String),
    /// Unquoted integer literal.
    Int(i64),
    /// Unquoted datetime literal (e.g. `2024-01-01T00:00:00Z`).
    Timestamp(String),
}

/// A filter expression tree.
///
/// Only conjunctions and field comparisons exist; that is all the engine
/// ever emits against the indexes.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Compare {
        field: &'static str,
        op: CompareOp,
        value: FilterValue,
    },
    And(Vec<FilterExpr>),
}

impl FilterExpr {
    pub fn eq_text(field: &'static str, value: impl Into<String>) -> Self {
        FilterExpr::Compare {
            field,
            op: CompareOp::Eq,
            value: FilterValue::Text(value.into()),
        }
    }

    pub fn cmp_int(field: &'static str, op: CompareOp, value: i64) -> Self {
        FilterExpr::Compare {
            field,
            op,
            value: FilterValue::Int(value),
        }
    }

    pub fn cmp_date(field: &'static str, op: CompareOp, value: impl Into<String>) -> Self {
        FilterExpr::Compare {
            field,
            op,
            value: FilterValue::Timestamp(value.into()),
        }
    }

    /// Conjunction of the given clauses. Returns `None` when empty.
    pub fn and(mut clauses: Vec<FilterExpr>) -> Option<Self> {
        match clauses.len() {
            0 => None,
            1 => clauses.pop(),
            _ => Some(FilterExpr::And(clauses)),
        }
    }

    /// Build the conjunctive filter for structured query filters, omitting
    /// clauses whose input is absent.
    pub fn from_filters(filters: &SearchFilters) -> Option<Self> {
        let mut clauses = Vec::new();

        if let Some(category) = &filters.category {
            clauses.push(FilterExpr::eq_text("category", category));
        }
        if let Some(range) = &filters.date_range {
            if let Some(start) = &range.start {
                clauses.push(FilterExpr::cmp_date("lastModified", CompareOp::Ge, start));
            }
            if let Some(end) = &range.end {
                clauses.push(FilterExpr::cmp_date("lastModified", CompareOp::Le, end));
            }
        }
        if let Some(range) = &filters.size_range {
            if let Some(min) = range.min {
                clauses.push(FilterExpr::cmp_int("size", CompareOp::Ge, min));
            }
            if let Some(max) = range.max {
                clauses.push(FilterExpr::cmp_int("size", CompareOp::Le, max));
            }
        }

        FilterExpr::and(clauses)
    }

    /// Build the single-tenant filter: `tenant eq '<tenant>'` prefixed to
    /// whatever the structured filters produce.
    pub fn for_tenant(tenant: &str, filters: &SearchFilters) -> Self {
        let tenant_clause = FilterExpr::eq_text("tenant", tenant);
        match FilterExpr::from_filters(filters) {
            Some(FilterExpr::And(mut rest)) => {
                rest.insert(0, tenant_clause);
                FilterExpr::And(rest)
            }
            Some(clause) => FilterExpr::And(vec![tenant_clause, clause]),
            None => tenant_clause,
        }
    }

    /// Render to the backend filter syntax.
    pub fn render(&self) -> String {
        match self {
            FilterExpr::Compare { field, op, value } => {
                format!("{} {} {}", field, op.as_str(), render_value(value))
            }
            FilterExpr::And(clauses) => clauses
                .iter()
                .map(|c| c.render())
                .collect::<Vec<_>>()
                .join(" and "),
        }
    }
}

fn render_value(value: &FilterValue) -> String {
    match value {
        // Single quotes inside string literals are doubled per the filter
        // grammar, which also neutralizes quote injection.
        FilterValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        FilterValue::Int(n) => n.to_string(),
        // Datetime literals are unquoted; anything outside the literal
        // charset is dropped rather than forwarded.
        FilterValue::Timestamp(s) => s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | ':' | '.' | '+'))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateRange, SizeRange};

    #[test]
    fn test_single_tenant_with_category() {
        let filters = SearchFilters {
            category: Some("estimates".into()),
            ..Default::default()
        };
        let expr = FilterExpr::for_tenant("Acme", &filters);
        assert_eq!(expr.render(), "tenant eq 'Acme' and category eq 'estimates'");
    }

    #[test]
    fn test_tenant_only() {
        let expr = FilterExpr::for_tenant("Acme", &SearchFilters::default());
        assert_eq!(expr.render(), "tenant eq 'Acme'");
    }

    #[test]
    fn test_absent_clauses_are_omitted() {
        assert!(FilterExpr::from_filters(&SearchFilters::default()).is_none());

        let filters = SearchFilters {
            date_range: Some(DateRange {
                start: Some("2024-01-01T00:00:00Z".into()),
                end: None,
            }),
            ..Default::default()
        };
        let expr = FilterExpr::from_filters(&filters).unwrap();
        assert_eq!(expr.render(), "lastModified ge 2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_full_conjunction_ordering() {
        let filters = SearchFilters {
            category: Some("estimates".into()),
            date_range: Some(DateRange {
                start: Some("2024-01-01T00:00:00Z".into()),
                end: Some("2024-06-30T00:00:00Z".into()),
            }),
            size_range: Some(SizeRange {
                min: Some(1024),
                max: Some(1048576),
            }),
            ..Default::default()
        };
        let expr = FilterExpr::from_filters(&filters).unwrap();
        assert_eq!(
            expr.render(),
            "category eq 'estimates' and lastModified ge 2024-01-01T00:00:00Z \
             and lastModified le 2024-06-30T00:00:00Z and size ge 1024 and size le 1048576"
        );
    }

    #[test]
    fn test_quote_injection_is_neutralized() {
        let expr = FilterExpr::eq_text("tenant", "O'Brien' or tenant ne '");
        assert_eq!(expr.render(), "tenant eq 'O''Brien'' or tenant ne '''");
    }

    #[test]
    fn test_timestamp_charset_is_enforced() {
        let expr = FilterExpr::cmp_date(
            "lastModified",
            CompareOp::Ge,
            "2024-01-01 or tenant eq 'x'",
        );
        // Spaces and quotes are stripped; the literal cannot break out.
        assert_eq!(expr.render(), "lastModified ge 2024-01-01ortenanteqx");
    }
}
