use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub search: SearchServiceConfig,
    pub graph: GraphStoreConfig,
    #[serde(default)]
    pub extraction: ProviderConfig,
    #[serde(default)]
    pub insights: ProviderConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// The search service hosting both the content index and the graph index.
#[derive(Debug, Deserialize, Clone)]
pub struct SearchServiceConfig {
    pub endpoint: String,
    #[serde(default = "default_index")]
    pub index: String,
    #[serde(default = "default_graph_index")]
    pub graph_index: String,
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_index() -> String {
    "documents".to_string()
}
fn default_graph_index() -> String {
    "knowledge-graph".to_string()
}
fn default_search_key_env() -> String {
    "SEARCH_API_KEY".to_string()
}

/// The graph database serving connection queries and traversals.
#[derive(Debug, Deserialize, Clone)]
pub struct GraphStoreConfig {
    pub endpoint: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_container")]
    pub container: String,
    #[serde(default = "default_graph_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_database() -> String {
    "KnowledgeGraph".to_string()
}
fn default_container() -> String {
    "Documents".to_string()
}
fn default_graph_key_env() -> String {
    "GRAPH_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}

/// A text-understanding provider (entity extraction or insight generation).
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Completion token cap; implementations pick a sensible default
    /// when unset.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            timeout_secs: default_timeout_secs(),
            max_tokens: None,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}

impl ProviderConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Multiplier applied to graph-index scores during merge. Fixed boost
    /// over unnormalized backend scores; tune here, not in code.
    #[serde(default = "default_graph_boost")]
    pub graph_boost: f64,
    #[serde(default = "default_top")]
    pub default_top: usize,
    /// Concurrent outstanding calls for per-result enrichment
    /// (connection lookups, insight generation).
    #[serde(default = "default_enrich_concurrency")]
    pub enrich_concurrency: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            graph_boost: default_graph_boost(),
            default_top: default_top(),
            enrich_concurrency: default_enrich_concurrency(),
        }
    }
}

fn default_graph_boost() -> f64 {
    1.2
}
fn default_top() -> usize {
    20
}
fn default_enrich_concurrency() -> usize {
    8
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Config {
    /// A minimal config for tests and offline commands. Backend endpoints
    /// point nowhere; use it only with injected backends.
    pub fn minimal() -> Self {
        Self {
            search: SearchServiceConfig {
                endpoint: "http://127.0.0.1:0".to_string(),
                index: default_index(),
                graph_index: default_graph_index(),
                api_key_env: default_search_key_env(),
                timeout_secs: default_timeout_secs(),
            },
            graph: GraphStoreConfig {
                endpoint: "http://127.0.0.1:0".to_string(),
                database: default_database(),
                container: default_container(),
                api_key_env: default_graph_key_env(),
                timeout_secs: default_timeout_secs(),
            },
            extraction: ProviderConfig::default(),
            insights: ProviderConfig::default(),
            retrieval: RetrievalConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.retrieval.default_top < 1 {
        anyhow::bail!("retrieval.default_top must be >= 1");
    }
    if config.retrieval.graph_boost <= 0.0 {
        anyhow::bail!("retrieval.graph_boost must be > 0");
    }
    if config.retrieval.enrich_concurrency < 1 {
        anyhow::bail!("retrieval.enrich_concurrency must be >= 1");
    }

    for (section, provider) in [
        ("extraction", &config.extraction),
        ("insights", &config.insights),
    ] {
        match provider.provider.as_str() {
            "disabled" | "openai" => {}
            other => anyhow::bail!(
                "Unknown {} provider: '{}'. Must be disabled or openai.",
                section,
                other
            ),
        }
        if provider.is_enabled() && provider.model.is_none() {
            anyhow::bail!(
                "{}.model must be specified when provider is '{}'",
                section,
                provider.provider
            );
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_minimal_file() {
        let file = write_config(
            r#"
[search]
endpoint = "https://search.example.net"

[graph]
endpoint = "https://graph.example.net"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.search.index, "documents");
        assert_eq!(config.search.graph_index, "knowledge-graph");
        assert_eq!(config.retrieval.graph_boost, 1.2);
        assert_eq!(config.retrieval.default_top, 20);
        assert_eq!(config.retrieval.enrich_concurrency, 8);
        assert!(!config.extraction.is_enabled());
        assert!(!config.insights.is_enabled());
    }

    #[test]
    fn test_enabled_provider_requires_model() {
        let file = write_config(
            r#"
[search]
endpoint = "https://search.example.net"

[graph]
endpoint = "https://graph.example.net"

[extraction]
provider = "openai"
"#,
        );
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let file = write_config(
            r#"
[search]
endpoint = "https://search.example.net"

[graph]
endpoint = "https://graph.example.net"

[insights]
provider = "oracle"
model = "m"
"#,
        );
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_invalid_retrieval_settings_rejected() {
        let file = write_config(
            r#"
[search]
endpoint = "https://search.example.net"

[graph]
endpoint = "https://graph.example.net"

[retrieval]
graph_boost = 0.0
"#,
        );
        assert!(load_config(file.path()).is_err());
    }
}
