//! Basic usage example for the PubMed Export library.
//!
//! Builds a two-term query, runs it against PubMed and writes the resulting
//! archive to the working directory.

use pubmed_export::config::{find_config_file, load_config};
use pubmed_export::export::ExportSettings;
use pubmed_export::models::{Condition, QueryField};
use pubmed_export::{PubMedProvider, SearchOutcome, Session};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(find_config_file().as_deref())?;
    let provider = PubMedProvider::from_config(&config.provider)?;
    let mut session = Session::from_config(&config);

    session.add_term(QueryField::TitleAbstract, "Kawasaki")?;
    session.add_condition(Condition::And)?;
    let query = session.add_term(QueryField::Text, "Adalimumab")?;
    println!("Query: {}", query);

    let outcome = session.search_built(&provider).await?;
    println!("{}", outcome.message());

    if let SearchOutcome::Found(_) = outcome {
        for (i, record) in session.results().iter().take(5).enumerate() {
            println!("{}. {} ({}, {})", i + 1, record.title, record.first_author, record.year);
        }

        let settings = ExportSettings::from_config(&config)?;
        if let Some(archive) = session.export_archive(&settings)? {
            std::fs::write(&archive.file_name, &archive.bytes)?;
            println!("Wrote {} with {} files", archive.file_name, archive.entries);
        }
    }

    Ok(())
}
