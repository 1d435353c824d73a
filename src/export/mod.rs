//! Export pipeline: a result set becomes one ZIP archive holding a CSV table
//! and a series of PDF reports of at most `batch_size` records each.
//!
//! - [`write_table`]: delimited table of every record, unsanitized
//! - [`sanitize`]: drops characters the PDF font encoding cannot show
//! - [`ReportBatcher`]: splits the result set into [`ReportPage`]s
//! - [`ArchiveAssembler`]: packages the table and the rendered pages
//!
//! ```rust,no_run
//! use pubmed_export::export::{export_archive, ExportSettings};
//! use pubmed_export::models::ResultSet;
//!
//! # fn example(results: ResultSet) -> Result<(), Box<dyn std::error::Error>> {
//! if let Some(archive) = export_archive(&results, &ExportSettings::default())? {
//!     std::fs::write(&archive.file_name, &archive.bytes)?;
//! }
//! # Ok(())
//! # }
//! ```

mod archive;
mod pdf;
mod report;
mod sanitize;
mod tabular;

pub use archive::ArchiveAssembler;
pub use pdf::{wrap_text, PageLayout, PdfWriter};
pub use report::{ReportBatcher, ReportPage, ReportSection};
pub use sanitize::{encode_latin1, is_representable, sanitize, MAX_REPRESENTABLE};
pub use tabular::write_table;

use crate::config::Config;
use crate::models::ResultSet;

/// Errors that can occur while building an archive
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Batch size must be greater than zero")]
    InvalidBatchSize,

    #[error("Invalid delimiter '{0}': expected a single ASCII character")]
    InvalidDelimiter(String),

    #[error("CSV error: {0}")]
    Table(#[from] csv::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("ZIP error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Settings for one export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    pub delimiter: u8,
    pub batch_size: usize,
    pub file_stem: String,
    pub layout: PageLayout,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            delimiter: b';',
            batch_size: 20,
            file_stem: "pubmed_articles".to_string(),
            layout: PageLayout::default(),
        }
    }
}

impl ExportSettings {
    pub fn from_config(config: &Config) -> Result<Self, ExportError> {
        let delimiter = config
            .export
            .delimiter_byte()
            .ok_or_else(|| ExportError::InvalidDelimiter(config.export.delimiter.clone()))?;
        if config.export.batch_size == 0 {
            return Err(ExportError::InvalidBatchSize);
        }

        Ok(Self {
            delimiter,
            batch_size: config.export.batch_size,
            file_stem: config.export.file_stem.clone(),
            layout: PageLayout::from_config(&config.report),
        })
    }
}

/// An assembled archive ready to be written or downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    /// Suggested file name, e.g. `pubmed_articles.zip`
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Number of entries (the table plus one per report page)
    pub entries: usize,
    pub records: usize,
}

/// Build the archive for `results`.
///
/// Returns `Ok(None)` for an empty result set: nothing is rendered and no
/// archive is assembled.
pub fn export_archive(
    results: &ResultSet,
    settings: &ExportSettings,
) -> Result<Option<Archive>, ExportError> {
    let batcher = ReportBatcher::new(settings.batch_size)?;

    if results.is_empty() {
        tracing::info!("No records to export");
        return Ok(None);
    }

    let table = write_table(results, settings.delimiter)?;

    let pages = batcher
        .batch(results)
        .iter()
        .map(|page| page.render(&settings.layout))
        .collect::<Result<Vec<_>, _>>()?;

    let assembler = ArchiveAssembler::new(settings.file_stem.clone());
    let bytes = assembler.assemble(&table, &pages)?;

    tracing::info!(
        records = results.len(),
        reports = pages.len(),
        bytes = bytes.len(),
        "Archive assembled"
    );

    Ok(Some(Archive {
        file_name: format!("{}.zip", settings.file_stem),
        bytes,
        entries: 1 + pages.len(),
        records: results.len(),
    }))
}
