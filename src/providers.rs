//! Text-understanding provider abstraction.
//!
//! Two best-effort collaborators sit behind traits here:
//! - [`EntityExtractor`] — pulls typed entities out of a free-text query
//!   for the graph-traversal path.
//! - [`InsightGenerator`] — produces a short natural-language insight for a
//!   top-ranked result.
//!
//! Concrete implementations:
//! - **Disabled** — used when no provider is configured. Extraction yields
//!   no entities; insight generation returns an error the annotator treats
//!   as "no insight".
//! - **OpenAI** — calls the chat completions API with the configured model
//!   and timeout. Requires the `OPENAI_API_KEY` environment variable.
//!
//! Both services are non-fatal by contract: the engine degrades when they
//! fail, so neither implementation retries.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::models::Entity;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

const EXTRACTION_INSTRUCTION: &str = "Extract domain entities from the search query \
    (materials, costs, dates, methods, specifications, phases). Return a JSON object \
    with an \"entities\" array of objects, each with \"type\" and \"value\" fields.";

/// Extracts typed entities from free text.
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<Vec<Entity>>;
}

/// Generates a short insight for a document excerpt.
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, excerpt: &str) -> Result<String>;
}

// ============ Disabled providers ============

/// No-op extractor used when `extraction.provider = "disabled"`.
pub struct DisabledExtractor;

#[async_trait]
impl EntityExtractor for DisabledExtractor {
    async fn extract(&self, _text: &str) -> Result<Vec<Entity>> {
        Ok(Vec::new())
    }
}

/// No-op generator used when `insights.provider = "disabled"`.
pub struct DisabledGenerator;

#[async_trait]
impl InsightGenerator for DisabledGenerator {
    async fn generate(&self, _prompt: &str, _excerpt: &str) -> Result<String> {
        bail!("insight provider is disabled")
    }
}

// ============ OpenAI providers ============

/// Entity extraction via the OpenAI chat completions API.
pub struct OpenAiExtractor {
    client: reqwest::Client,
    model: String,
    api_key: String,
    max_tokens: u32,
}

impl OpenAiExtractor {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let (client, model, api_key) = openai_parts(config)?;
        Ok(Self {
            client,
            model,
            api_key,
            max_tokens: config.max_tokens.unwrap_or(500),
        })
    }
}

#[async_trait]
impl EntityExtractor for OpenAiExtractor {
    async fn extract(&self, text: &str) -> Result<Vec<Entity>> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": EXTRACTION_INSTRUCTION },
                { "role": "user", "content": text },
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.3,
            "max_tokens": self.max_tokens,
        });

        let content = chat_completion(&self.client, &self.api_key, &body).await?;
        // A malformed payload is not an error for extraction; the traversal
        // path proceeds with no entity filter.
        Ok(parse_entities(&content))
    }
}

/// Insight generation via the OpenAI chat completions API.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    model: String,
    api_key: String,
    max_tokens: u32,
}

impl OpenAiGenerator {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let (client, model, api_key) = openai_parts(config)?;
        Ok(Self {
            client,
            model,
            api_key,
            max_tokens: config.max_tokens.unwrap_or(150),
        })
    }
}

#[async_trait]
impl InsightGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str, excerpt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": prompt },
                { "role": "user", "content": excerpt },
            ],
            "temperature": 0.5,
            "max_tokens": self.max_tokens,
        });

        chat_completion(&self.client, &self.api_key, &body).await
    }
}

fn openai_parts(config: &ProviderConfig) -> Result<(reqwest::Client, String, String)> {
    let model = config
        .model
        .clone()
        .ok_or_else(|| anyhow!("model required for OpenAI provider"))?;
    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok((client, model, api_key))
}

/// One chat completion round-trip, returning the first choice's content.
async fn chat_completion(
    client: &reqwest::Client,
    api_key: &str,
    body: &serde_json::Value,
) -> Result<String> {
    let response = client
        .post(OPENAI_CHAT_URL)
        .header("Authorization", format!("Bearer {}", api_key))
        .json(body)
        .send()
        .await
        .context("chat completion request failed")?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        bail!("chat completion returned {}: {}", status, text);
    }

    let json: serde_json::Value = response.json().await?;
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("invalid chat completion response: missing content"))
}

/// Parse an extraction payload. Anything that is not a well-formed
/// `{ "entities": [{type, value}, ...] }` object yields an empty list.
fn parse_entities(content: &str) -> Vec<Entity> {
    let json: serde_json::Value = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };
    json.get("entities")
        .and_then(|e| e.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

// ============ Factories ============

/// Create the configured entity extractor.
pub fn create_extractor(config: &ProviderConfig) -> Result<Box<dyn EntityExtractor>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledExtractor)),
        "openai" => Ok(Box::new(OpenAiExtractor::new(config)?)),
        other => bail!("Unknown extraction provider: {}", other),
    }
}

/// Create the configured insight generator.
pub fn create_generator(config: &ProviderConfig) -> Result<Box<dyn InsightGenerator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledGenerator)),
        "openai" => Ok(Box::new(OpenAiGenerator::new(config)?)),
        other => bail!("Unknown insight provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entities_well_formed() {
        let entities = parse_entities(
            r#"{ "entities": [
                { "type": "material", "value": "steel" },
                { "type": "material", "value": "concrete" }
            ] }"#,
        );
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].entity_type, "material");
        assert_eq!(entities[1].value, "concrete");
    }

    #[test]
    fn test_parse_entities_malformed_json() {
        assert!(parse_entities("not json at all").is_empty());
    }

    #[test]
    fn test_parse_entities_missing_array() {
        assert!(parse_entities(r#"{ "items": [] }"#).is_empty());
    }

    #[test]
    fn test_parse_entities_skips_bad_items() {
        let entities = parse_entities(
            r#"{ "entities": [
                { "type": "material", "value": "steel" },
                { "kind": "wrong-shape" }
            ] }"#,
        );
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].value, "steel");
    }

    #[tokio::test]
    async fn test_disabled_extractor_yields_no_entities() {
        let entities = DisabledExtractor.extract("steel beams").await.unwrap();
        assert!(entities.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_generator_errors() {
        assert!(DisabledGenerator.generate("p", "e").await.is_err());
    }
}
