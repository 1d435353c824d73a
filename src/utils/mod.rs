//! Utility modules supporting provider operations.
//!
//! - [`HttpClient`]: shared reqwest client with timeouts and a user agent
//!
//! ```rust,no_run
//! use pubmed_export::utils::HttpClient;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::with_timeout(Duration::from_secs(10))?;
//! let response = client
//!     .get("https://eutils.ncbi.nlm.nih.gov/entrez/eutils/einfo.fcgi")
//!     .send()
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod http;

pub use http::HttpClient;
