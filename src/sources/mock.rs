//! Mock provider for testing purposes.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::models::{Record, RecordBuilder, RecordId};
use crate::sources::{ProviderError, SearchProvider};

/// A mock provider that returns predefined identifiers and records.
///
/// `fetch_records` returns the configured records in order, limited to the
/// number of identifiers requested, so partial detail can be simulated by
/// configuring fewer records than ids.
#[derive(Debug, Default)]
pub struct MockProvider {
    ids: Mutex<Vec<RecordId>>,
    records: Mutex<Vec<Record>>,
    failure: Mutex<Option<String>>,
    calls: Mutex<Vec<String>>,
}

impl MockProvider {
    /// Create a new mock provider with no hits.
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose every id resolves to a generated record.
    pub fn with_records(count: usize) -> Self {
        let provider = Self::new();
        provider.set_ids((1..=count).map(|i| i.to_string()).collect());
        provider.set_records((1..=count).map(make_record).collect());
        provider
    }

    /// Set the identifiers returned by `resolve_ids`.
    pub fn set_ids(&self, ids: Vec<RecordId>) {
        *self.ids.lock().unwrap() = ids;
    }

    /// Set the records returned by `fetch_records`.
    pub fn set_records(&self, records: Vec<Record>) {
        *self.records.lock().unwrap() = records;
    }

    /// Make every call fail with a network error carrying `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock().unwrap() = Some(message.into());
    }

    /// Clear the configured failure.
    pub fn clear_failure(&self) {
        *self.failure.lock().unwrap() = None;
    }

    /// Operations invoked so far, e.g. `resolve_ids:<query>` or `fetch_records:3`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn check_failure(&self) -> Result<(), ProviderError> {
        let failure = self.failure.lock().unwrap().clone();
        match failure {
            Some(message) => Err(ProviderError::Network(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SearchProvider for MockProvider {
    fn name(&self) -> &str {
        "Mock Provider"
    }

    async fn resolve_ids(&self, query: &str) -> Result<Vec<RecordId>, ProviderError> {
        self.calls.lock().unwrap().push(format!("resolve_ids:{}", query));
        self.check_failure()?;
        Ok(self.ids.lock().unwrap().clone())
    }

    async fn fetch_records(&self, ids: &[RecordId]) -> Result<Vec<Record>, ProviderError> {
        self.calls.lock().unwrap().push(format!("fetch_records:{}", ids.len()));
        self.check_failure()?;
        let records: Vec<Record> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .take(ids.len())
            .cloned()
            .collect();
        Ok(records)
    }
}

/// Helper function to create a mock record for testing.
pub fn make_record(n: usize) -> Record {
    RecordBuilder::new(format!("Article title {}", n))
        .abstract_text(format!("Abstract of article {}", n))
        .keywords("kawasaki, adalimumab")
        .year("2024")
        .first_author(format!("Author {}", n))
        .link(format!("https://pubmed.ncbi.nlm.nih.gov/{}/", n))
        .access_type("Subscription")
        .build()
}
