//! Error taxonomy for the discovery engine.
//!
//! Two failure classes cross the engine boundary:
//! - [`SearchError::Validation`] — the request is malformed and no backend
//!   call has been made.
//! - [`SearchError::Upstream`] — a primary search backend (full-text or
//!   graph index) failed or timed out on the selected path.
//!
//! Secondary collaborators (entity extraction, insight generation, a single
//! connection lookup) never surface here; their failures are logged and the
//! corresponding optional fields are left empty.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    /// The request was rejected before any backend call.
    #[error("invalid search request: {0}")]
    Validation(String),

    /// A primary search backend failed on the selected mode's path.
    #[error("{service} request failed: {source}")]
    Upstream {
        service: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl SearchError {
    pub fn upstream(service: &'static str, source: anyhow::Error) -> Self {
        SearchError::Upstream { service, source }
    }
}
