//! # PubMed Export
//!
//! Build boolean PubMed queries, run them against NCBI E-utilities and export
//! the results as one ZIP archive holding a CSV table and paginated PDF
//! reports.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (QueryBuilder, Record, ResultSet)
//! - [`sources`]: The [`SearchProvider`] trait, the PubMed client and a mock
//! - [`session`]: Per-user state tying a query to its result set
//! - [`export`]: CSV table, PDF reports and archive assembly
//! - [`utils`]: HTTP client
//! - [`config`]: Configuration management
//! - [`ui`]: Terminal output for the CLI
//!
//! ```rust,no_run
//! use pubmed_export::export::ExportSettings;
//! use pubmed_export::models::{Condition, QueryField};
//! use pubmed_export::{PubMedProvider, Session};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = PubMedProvider::new()?;
//! let mut session = Session::new(true);
//!
//! session.add_term(QueryField::TitleAbstract, "Kawasaki")?;
//! session.add_condition(Condition::And)?;
//! session.add_term(QueryField::Text, "Adalimumab")?;
//!
//! let outcome = session.search_built(&provider).await?;
//! println!("{}", outcome.message());
//!
//! if let Some(archive) = session.export_archive(&ExportSettings::default())? {
//!     std::fs::write(&archive.file_name, &archive.bytes)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod export;
pub mod models;
pub mod session;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use models::{QueryBuilder, Record, ResultSet};
pub use session::{SearchMode, SearchOutcome, Session, SessionError};
pub use sources::{MockProvider, ProviderError, PubMedProvider, SearchProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
