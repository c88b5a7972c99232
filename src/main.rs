//! # Docscout CLI (`docscout`)
//!
//! The `docscout` binary fronts the cross-tenant document discovery engine.
//! It provides a one-shot search command and the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! docscout --config ./config/docscout.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docscout search "<query>"` | Run one search and print ranked results |
//! | `docscout serve` | Start the HTTP search server |
//!
//! ## Examples
//!
//! ```bash
//! # Cross-tenant search (default mode)
//! docscout search "foundation cost overruns" --config ./config/docscout.toml
//!
//! # Entity-driven knowledge-graph traversal
//! docscout search "steel suppliers" --mode knowledge-graph
//!
//! # One tenant only
//! docscout search "change orders" --mode single-tenant --tenant Acme
//!
//! # Start the HTTP server
//! docscout serve --config ./config/docscout.toml
//! ```

mod config;
mod connect;
mod engine;
mod error;
mod filter;
mod graph;
mod index;
mod insight;
mod merge;
mod models;
mod patterns;
mod providers;
mod server;
mod traverse;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::engine::SearchEngine;
use crate::models::{SearchMode, SearchQuery, SearchResponse};

/// Docscout CLI — cross-tenant document discovery over a content index and
/// a knowledge graph.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docscout.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docscout",
    about = "Docscout — cross-tenant document discovery over a content index and a knowledge graph",
    version,
    long_about = "Docscout fans search requests out to a full-text content index and a \
    knowledge-graph index, fuses and deduplicates the scored results, enriches them with \
    graph connections and generated insights, and mines cross-result patterns. Exposed as \
    a CLI and a JSON HTTP server."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/docscout.toml`. Backend endpoints, provider,
    /// retrieval, and server settings are read from this file.
    #[arg(long, global = true, default_value = "./config/docscout.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Run one search and print ranked results.
    ///
    /// Routes the query through the selected mode (`all-tenants`,
    /// `knowledge-graph`, or `single-tenant`) and prints merged results,
    /// insights, and mined patterns.
    Search {
        /// The search query string.
        query: String,

        /// Search mode: `all-tenants` (dual-index fan-out),
        /// `knowledge-graph` (entity traversal), or `single-tenant`.
        #[arg(long, default_value = "all-tenants")]
        mode: String,

        /// Tenant name. Required for `single-tenant` mode.
        #[arg(long)]
        tenant: Option<String>,

        /// Filter results to a document category (e.g., `estimates`).
        #[arg(long)]
        category: Option<String>,

        /// Maximum number of results to return.
        #[arg(long)]
        top: Option<usize>,

        /// Number of results to skip (paging offset).
        #[arg(long, default_value_t = 0)]
        skip: usize,
    },

    /// Start the HTTP search server.
    ///
    /// Binds to the address configured in `[server].bind` and serves
    /// `POST /search` and `GET /health`.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docscout=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Search {
            query,
            mode,
            tenant,
            category,
            top,
            skip,
        } => {
            let mode = parse_mode(&mode)?;
            let mut request = SearchQuery::new(query, mode);
            request.tenant = tenant;
            request.filters.category = category;
            request.top = top.unwrap_or(cfg.retrieval.default_top);
            request.skip = skip;

            let engine = SearchEngine::from_config(&cfg)?;
            let response = engine.execute(request).await?;
            print_response(&response);
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

fn parse_mode(mode: &str) -> Result<SearchMode> {
    match mode {
        "all-tenants" => Ok(SearchMode::AllTenants),
        "knowledge-graph" => Ok(SearchMode::KnowledgeGraph),
        "single-tenant" => Ok(SearchMode::SingleTenant),
        other => anyhow::bail!(
            "unknown search mode '{}'; expected all-tenants, knowledge-graph, or single-tenant",
            other
        ),
    }
}

/// Print a search response in the CLI's human-readable format.
fn print_response(response: &SearchResponse) {
    if response.results.is_empty() {
        println!("No results.");
        return;
    }

    for (i, result) in response.results.iter().enumerate() {
        println!(
            "{}. [{:.2}] {} / {}",
            i + 1,
            result.combined_score,
            result.document.tenant,
            result.document.file_name
        );
        if !result.document.category.is_empty() {
            println!("    category: {}", result.document.category);
        }
        if result.cross_tenant_connection_count > 0 {
            println!(
                "    cross-tenant connections: {}",
                result.cross_tenant_connection_count
            );
        }
        if let Some(insight) = &result.insight {
            println!("    insight: {}", insight.replace('\n', " ").trim());
        }
        println!("    id: {}", result.document.id);
        println!();
    }

    if !response.patterns.common_entities.is_empty() {
        println!("Recurring entities:");
        for entity in &response.patterns.common_entities {
            println!(
                "  {} ({}) x{}",
                entity.value, entity.entity_type, entity.count
            );
        }
        println!();
    }
    if let Some(prices) = &response.patterns.price_range {
        println!(
            "Prices: min ${:.2}  median ${:.2}  avg ${:.2}  max ${:.2}",
            prices.min, prices.median, prices.average, prices.max
        );
        println!();
    }

    println!(
        "{} results across {} tenant(s){}",
        response.metadata.total_results,
        response.metadata.tenants_covered,
        if response.metadata.has_more_results {
            " (more available)"
        } else {
            ""
        }
    );
}
