//! # Docscout
//!
//! Cross-tenant document discovery over a content index and a knowledge
//! graph.
//!
//! Docscout fans search requests out to a full-text content index and a
//! knowledge-graph index, fuses and deduplicates the scored results,
//! enriches them with graph connections and generated insights, and mines
//! cross-result patterns. Exposed as a CLI and a JSON HTTP server.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────────────────┐   ┌────────────┐
//! │   CLI    │──▶│       SearchEngine         │◀──│   HTTP     │
//! │(docscout)│   │ validate → route → enrich  │   │ POST /search│
//! └──────────┘   └──────┬──────────┬──────────┘   └────────────┘
//!                       ▼          ▼
//!               ┌────────────┐ ┌────────────┐
//!               │  Content   │ │ Knowledge  │
//!               │   index    │ │   graph    │
//!               └────────────┘ └────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and the wire contract |
//! | [`error`] | Request-level error taxonomy |
//! | [`filter`] | Index filter expression builder |
//! | [`index`] | Content index capability and HTTP client |
//! | [`graph`] | Knowledge-graph capability and HTTP client |
//! | [`providers`] | Entity extraction and insight generation |
//! | [`merge`] | Dual-index score fusion |
//! | [`connect`] | Graph-connection enrichment |
//! | [`traverse`] | Graph traversal and ranking |
//! | [`insight`] | Insight annotation for top results |
//! | [`patterns`] | Cross-result pattern mining |
//! | [`engine`] | Request validation and mode routing |
//! | [`server`] | JSON HTTP server |

pub mod config;
pub mod connect;
pub mod engine;
pub mod error;
pub mod filter;
pub mod graph;
pub mod index;
pub mod insight;
pub mod merge;
pub mod models;
pub mod patterns;
pub mod providers;
pub mod server;
pub mod traverse;
