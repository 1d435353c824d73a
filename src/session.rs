//! Per-user application state.
//!
//! A [`Session`] owns the query being built and the result set of the last
//! completed search. The provider is passed in on every call, so the same
//! session can be driven by [`PubMedProvider`](crate::sources::PubMedProvider)
//! or by [`MockProvider`](crate::sources::MockProvider).

use std::fmt;
use std::str::FromStr;

use crate::config::Config;
use crate::export::{export_archive, Archive, ExportError, ExportSettings};
use crate::models::{Condition, QueryBuilder, QueryError, QueryField, ResultSet};
use crate::sources::{ProviderError, SearchProvider};

/// How the user enters queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// One free-form query string
    #[default]
    Single,
    /// Terms and conditions added one at a time
    Builder,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Single => write!(f, "single"),
            SearchMode::Builder => write!(f, "builder"),
        }
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(SearchMode::Single),
            "builder" => Ok(SearchMode::Builder),
            other => Err(format!("Unknown search mode: {} (expected single or builder)", other)),
        }
    }
}

/// What a completed search produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Records were retrieved; the count is the size of the new result set
    Found(usize),
    /// Identifiers matched but no record detail came back
    NoDetails { ids: usize },
    /// The query matched nothing
    NoArticles,
}

impl SearchOutcome {
    /// User-facing summary line
    pub fn message(&self) -> String {
        match self {
            SearchOutcome::Found(1) => "Found 1 article.".to_string(),
            SearchOutcome::Found(n) => format!("Found {} articles.", n),
            SearchOutcome::NoDetails { .. } => "No article details available.".to_string(),
            SearchOutcome::NoArticles => "No articles found.".to_string(),
        }
    }
}

/// Errors from session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Query builder plus the current result set
#[derive(Debug, Clone, Default)]
pub struct Session {
    mode: SearchMode,
    builder: QueryBuilder,
    results: ResultSet,
    last_query: Option<String>,
}

impl Session {
    pub fn new(strict: bool) -> Self {
        Self {
            mode: SearchMode::default(),
            builder: QueryBuilder::with_strict(strict),
            results: ResultSet::default(),
            last_query: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.query.strict)
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SearchMode) {
        self.mode = mode;
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    /// Append a term to the query being built
    pub fn add_term(&mut self, field: QueryField, text: &str) -> Result<String, QueryError> {
        self.builder.add_term(field, text)?;
        Ok(self.builder.render())
    }

    /// Append a condition to the query being built
    pub fn add_condition(&mut self, condition: Condition) -> Result<String, QueryError> {
        self.builder.add_condition(condition)?;
        Ok(self.builder.render())
    }

    /// Result set of the last completed search (empty before the first one)
    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    /// Query string of the last completed search
    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    /// Run `query` against `provider` and replace the current result set.
    ///
    /// On a provider error the previous result set is kept.
    pub async fn search<P>(&mut self, provider: &P, query: &str) -> Result<SearchOutcome, ProviderError>
    where
        P: SearchProvider + ?Sized,
    {
        tracing::info!(provider = provider.name(), query, "Searching");

        let ids = provider.resolve_ids(query).await?;
        if ids.is_empty() {
            tracing::warn!(query, "No articles found");
            self.replace_results(query, ResultSet::default());
            return Ok(SearchOutcome::NoArticles);
        }

        let records = provider.fetch_records(&ids).await?;
        if records.is_empty() {
            tracing::warn!(query, ids = ids.len(), "No article details available");
            self.replace_results(query, ResultSet::default());
            return Ok(SearchOutcome::NoDetails { ids: ids.len() });
        }

        let count = records.len();
        tracing::info!(ids = ids.len(), records = count, "Search complete");
        self.replace_results(query, ResultSet::new(records));
        Ok(SearchOutcome::Found(count))
    }

    /// Build the current query and run it
    pub async fn search_built<P>(&mut self, provider: &P) -> Result<SearchOutcome, SessionError>
    where
        P: SearchProvider + ?Sized,
    {
        let query = self.builder.build()?;
        Ok(self.search(provider, &query).await?)
    }

    /// Archive of the current result set, `None` when it is empty
    pub fn export_archive(&self, settings: &ExportSettings) -> Result<Option<Archive>, ExportError> {
        export_archive(&self.results, settings)
    }

    fn replace_results(&mut self, query: &str, results: ResultSet) {
        self.results = results;
        self.last_query = Some(query.to_string());
    }
}
