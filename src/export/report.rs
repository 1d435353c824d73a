//! Batching of a result set into fixed-size PDF reports.

use crate::export::pdf::{PageLayout, PdfWriter};
use crate::export::sanitize::sanitize;
use crate::export::ExportError;
use crate::models::{Record, ResultSet};

/// A contiguous slice of a result set rendered as one document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPage<'a> {
    number: usize,
    offset: usize,
    records: &'a [Record],
}

impl<'a> ReportPage<'a> {
    /// 1-based page number
    pub fn number(&self) -> usize {
        self.number
    }

    /// 0-based index of the first record in the whole result set
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn records(&self) -> &'a [Record] {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sanitized sections, one per record, numbered by overall position
    pub fn sections(&self) -> Vec<ReportSection> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, record)| ReportSection::new(self.offset + i + 1, record))
            .collect()
    }

    /// Render the page as a PDF document
    pub fn render(&self, layout: &PageLayout) -> Result<Vec<u8>, ExportError> {
        let mut writer = PdfWriter::new(layout.clone());

        for section in self.sections() {
            for line in &section.lines {
                writer.write_line(line);
            }
            writer.blank_line();
        }

        tracing::debug!(
            page = self.number,
            records = self.records.len(),
            pdf_pages = writer.page_count(),
            "rendered report page"
        );
        writer.finish()
    }
}

/// The labelled lines describing one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    /// 1-based position of the record in the whole result set
    pub article: usize,
    pub lines: Vec<String>,
}

impl ReportSection {
    fn new(article: usize, record: &Record) -> Self {
        let lines = [
            format!("Article {}", article),
            format!("Title: {}", record.title),
            format!("Abstract: {}", record.r#abstract),
            format!("Keywords: {}", record.keywords),
            format!("Year: {}", record.year),
            format!("First Author: {}", record.first_author),
            format!("Link: {}", record.link),
            format!("Access Type: {}", record.access_type),
        ]
        .iter()
        .map(|line| sanitize(line))
        .collect();

        Self { article, lines }
    }
}

/// Partitions result sets into pages of at most `batch_size` records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportBatcher {
    batch_size: usize,
}

impl ReportBatcher {
    pub fn new(batch_size: usize) -> Result<Self, ExportError> {
        if batch_size == 0 {
            return Err(ExportError::InvalidBatchSize);
        }
        Ok(Self { batch_size })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of pages needed for `records` records
    pub fn page_count(&self, records: usize) -> usize {
        records.div_ceil(self.batch_size)
    }

    /// Split `results` into pages; an empty set yields no pages
    pub fn batch<'a>(&self, results: &'a ResultSet) -> Vec<ReportPage<'a>> {
        results
            .records()
            .chunks(self.batch_size)
            .enumerate()
            .map(|(i, records)| ReportPage {
                number: i + 1,
                offset: i * self.batch_size,
                records,
            })
            .collect()
    }
}
