//! Search providers.
//!
//! The export pipeline only needs two things from a bibliographic service:
//! turning a query string into record identifiers, and turning identifiers
//! into record detail. [`SearchProvider`] captures exactly that, so the
//! session can be driven by [`PubMedProvider`] in production and by
//! [`MockProvider`] in tests.

pub mod mock;
mod pubmed;

pub use mock::MockProvider;
pub use pubmed::PubMedProvider;

use crate::models::{Record, RecordId};
use async_trait::async_trait;

/// A bibliographic search service.
///
/// Calls are made one at a time by the caller; implementations do not retry.
#[async_trait]
pub trait SearchProvider: Send + Sync + std::fmt::Debug {
    /// Human-readable name of this provider
    fn name(&self) -> &str;

    /// Resolve a query string to record identifiers.
    ///
    /// An empty result is a valid answer (no hits), not an error.
    async fn resolve_ids(&self, query: &str) -> Result<Vec<RecordId>, ProviderError>;

    /// Fetch record detail for the given identifiers.
    ///
    /// The result may hold fewer records than `ids` when detail is only
    /// partially available.
    async fn fetch_records(&self, ids: &[RecordId]) -> Result<Vec<Record>, ProviderError>;
}

/// Errors that can occur when talking to a provider
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success response from the service
    #[error("API error: {0}")]
    Api(String),

    /// Parsing error (XML, JSON)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Network(err.to_string())
    }
}

impl From<quick_xml::DeError> for ProviderError {
    fn from(err: quick_xml::DeError) -> Self {
        ProviderError::Parse(format!("XML: {}", err))
    }
}
