//! Record model representing one article returned by a search provider.

use serde::{Deserialize, Serialize};

/// Placeholder written for attributes the provider could not supply.
pub const MISSING: &str = "N/A";

/// Column order of the tabular export and of every record section in a report.
pub const COLUMNS: [&str; 7] = [
    "Title",
    "Abstract",
    "Keywords",
    "Year",
    "First Author",
    "Link",
    "Access Type",
];

/// Identifier of a record at the provider (a PMID for PubMed).
pub type RecordId = String;

/// A bibliographic record with a fixed attribute set.
///
/// Records are opaque values: the provider fills them in and the export
/// pipeline writes them out without validating their contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "Title")]
    pub title: String,

    #[serde(rename = "Abstract")]
    pub r#abstract: String,

    /// Keywords (comma-separated)
    #[serde(rename = "Keywords")]
    pub keywords: String,

    /// Publication year as a display string
    #[serde(rename = "Year")]
    pub year: String,

    #[serde(rename = "First Author")]
    pub first_author: String,

    #[serde(rename = "Link")]
    pub link: String,

    #[serde(rename = "Access Type")]
    pub access_type: String,
}

impl Record {
    /// Attribute values in [`COLUMNS`] order.
    pub fn values(&self) -> [&str; 7] {
        [
            self.title.as_str(),
            self.r#abstract.as_str(),
            self.keywords.as_str(),
            self.year.as_str(),
            self.first_author.as_str(),
            self.link.as_str(),
            self.access_type.as_str(),
        ]
    }
}

/// Builder for constructing Record objects
///
/// Every attribute not set explicitly is filled with [`MISSING`].
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            record: Record {
                title: title.into(),
                r#abstract: MISSING.to_string(),
                keywords: MISSING.to_string(),
                year: MISSING.to_string(),
                first_author: MISSING.to_string(),
                link: MISSING.to_string(),
                access_type: MISSING.to_string(),
            },
        }
    }

    pub fn abstract_text(mut self, abstract_text: impl Into<String>) -> Self {
        self.record.r#abstract = non_empty(abstract_text.into());
        self
    }

    pub fn keywords(mut self, keywords: impl Into<String>) -> Self {
        self.record.keywords = non_empty(keywords.into());
        self
    }

    pub fn year(mut self, year: impl Into<String>) -> Self {
        self.record.year = non_empty(year.into());
        self
    }

    pub fn first_author(mut self, author: impl Into<String>) -> Self {
        self.record.first_author = non_empty(author.into());
        self
    }

    pub fn link(mut self, link: impl Into<String>) -> Self {
        self.record.link = non_empty(link.into());
        self
    }

    pub fn access_type(mut self, access_type: impl Into<String>) -> Self {
        self.record.access_type = non_empty(access_type.into());
        self
    }

    pub fn build(self) -> Record {
        let mut record = self.record;
        record.title = non_empty(record.title);
        record
    }
}

fn non_empty(value: String) -> String {
    if value.trim().is_empty() {
        MISSING.to_string()
    } else {
        value
    }
}

/// The ordered records produced by one completed search.
///
/// A result set is never mutated after construction; a new search replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    records: Vec<Record>,
}

impl ResultSet {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl From<Vec<Record>> for ResultSet {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_fills_missing() {
        let record = RecordBuilder::new("Kawasaki disease")
            .year("2021")
            .keywords("")
            .build();

        assert_eq!(record.title, "Kawasaki disease");
        assert_eq!(record.year, "2021");
        assert_eq!(record.keywords, MISSING);
        assert_eq!(record.first_author, MISSING);
    }

    #[test]
    fn test_values_follow_column_order() {
        let record = RecordBuilder::new("T")
            .abstract_text("A")
            .keywords("K")
            .year("Y")
            .first_author("F")
            .link("L")
            .access_type("AT")
            .build();

        assert_eq!(record.values(), ["T", "A", "K", "Y", "F", "L", "AT"]);
    }

    #[test]
    fn test_serialize_uses_column_names() {
        let record = RecordBuilder::new("Title here").build();
        let json = serde_json::to_value(&record).unwrap();

        for column in COLUMNS {
            assert!(json.get(column).is_some(), "missing column {column}");
        }
    }

    #[test]
    fn test_result_set_access() {
        let set = ResultSet::from(vec![RecordBuilder::new("a").build(), RecordBuilder::new("b").build()]);

        assert_eq!(set.len(), 2);
        assert!(!set.is_empty());
        assert_eq!(set.get(1).map(|r| r.title.as_str()), Some("b"));
        assert_eq!(set.iter().count(), 2);
        assert!(ResultSet::default().is_empty());
    }
}
