//! ZIP packaging of the tabular export and the rendered reports.

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::export::ExportError;

/// Names and writes the archive entries for one export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveAssembler {
    stem: String,
}

impl ArchiveAssembler {
    /// `stem` prefixes every entry, e.g. `pubmed_articles`
    pub fn new(stem: impl Into<String>) -> Self {
        Self { stem: stem.into() }
    }

    /// Name of the tabular entry
    pub fn table_name(&self) -> String {
        format!("{}.csv", self.stem)
    }

    /// Name of the report for 1-based page `number`
    pub fn page_name(&self, number: usize) -> String {
        format!("{}_batch_{}.pdf", self.stem, number)
    }

    /// Write the table first, then every page in order.
    ///
    /// Entries carry a fixed timestamp so identical input yields identical bytes.
    pub fn assemble(&self, table: &[u8], pages: &[Vec<u8>]) -> Result<Vec<u8>, ExportError> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        zip.start_file(self.table_name(), options)?;
        zip.write_all(table)?;

        for (i, page) in pages.iter().enumerate() {
            zip.start_file(self.page_name(i + 1), options)?;
            zip.write_all(page)?;
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}
