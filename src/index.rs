//! Full-text index capability and HTTP client.
//!
//! The engine consumes the content index as a black box through the
//! [`FullTextIndex`] trait. [`HttpFullTextIndex`] implements it against an
//! OData-style search service (keyword search with highlighting plus
//! key-based document lookup). Every call carries the configured timeout.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::SearchServiceConfig;
use crate::filter::FilterExpr;
use crate::models::DocumentHit;

/// Capability contract for the content index.
#[async_trait]
pub trait FullTextIndex: Send + Sync {
    /// Keyword search with an optional filter expression and paging.
    async fn search(
        &self,
        text: &str,
        filter: Option<&FilterExpr>,
        top: usize,
        skip: usize,
    ) -> Result<Vec<DocumentHit>>;

    /// Fetch one document by its index key.
    async fn get_by_id(&self, id: &str) -> Result<DocumentHit>;
}

/// HTTP-backed content index client.
pub struct HttpFullTextIndex {
    client: reqwest::Client,
    endpoint: String,
    index: String,
    api_key: String,
}

const API_VERSION: &str = "2023-11-01";

/// Fields requested from the content index.
const SELECT_FIELDS: &str = "id,fileName,tenant,category,content,lastModified,size";

impl HttpFullTextIndex {
    /// Build a client from configuration.
    ///
    /// The API key is read from the environment variable named by
    /// `api_key_env`; construction fails if it is not set.
    pub fn new(config: &SearchServiceConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow!("{} environment variable not set", config.api_key_env))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            index: config.index.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl FullTextIndex for HttpFullTextIndex {
    async fn search(
        &self,
        text: &str,
        filter: Option<&FilterExpr>,
        top: usize,
        skip: usize,
    ) -> Result<Vec<DocumentHit>> {
        let url = format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.endpoint, self.index, API_VERSION
        );

        let mut body = serde_json::json!({
            "search": text,
            "top": top,
            "skip": skip,
            "searchMode": "all",
            "queryType": "full",
            "searchFields": "content,fileName,category",
            "select": SELECT_FIELDS,
            "highlight": "content",
            "highlightPreTag": "<mark>",
            "highlightPostTag": "</mark>",
        });
        if let Some(filter) = filter {
            body["filter"] = serde_json::Value::String(filter.render());
        }

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("full-text search request failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("full-text search returned {}: {}", status, text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_search_hits(&json)
    }

    async fn get_by_id(&self, id: &str) -> Result<DocumentHit> {
        // Key lookup; embedded quotes are doubled per the key-literal syntax.
        let url = format!(
            "{}/indexes/{}/docs('{}')?api-version={}",
            self.endpoint,
            self.index,
            id.replace('\'', "''"),
            API_VERSION
        );

        let response = self
            .client
            .get(&url)
            .header("api-key", &self.api_key)
            .send()
            .await
            .context("document lookup request failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("document lookup for '{}' returned {}: {}", id, status, text);
        }

        let json: serde_json::Value = response.json().await?;
        serde_json::from_value(json).context("invalid document lookup response")
    }
}

/// Parse a search service response body into hits.
///
/// Each element of `value` is a document payload with service-scoped
/// annotations (`@search.score`, `@search.highlights`) folded into the
/// typed hit. Shared with the graph-index client.
pub(crate) fn parse_search_hits(json: &serde_json::Value) -> Result<Vec<DocumentHit>> {
    let values = json
        .get("value")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("invalid search response: missing value array"))?;

    let mut hits = Vec::with_capacity(values.len());
    for item in values {
        let score = item
            .get("@search.score")
            .and_then(|s| s.as_f64())
            .unwrap_or(0.0);
        let highlights = item
            .get("@search.highlights")
            .and_then(|h| h.get("content"))
            .and_then(|c| c.as_array())
            .map(|fragments| {
                fragments
                    .iter()
                    .filter_map(|f| f.as_str().map(str::to_string))
                    .collect::<Vec<_>>()
            });

        let mut hit: DocumentHit =
            serde_json::from_value(item.clone()).context("invalid search hit")?;
        hit.score = score;
        hit.highlights = highlights;
        hits.push(hit);
    }

    Ok(hits)
}
