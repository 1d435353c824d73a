//! Integration tests for PubMed Export
//!
//! These tests drive a session end to end: query assembly, search against a
//! mock provider, and export to an archive that is read back.

use pubmed_export::export::{export_archive, ExportSettings};
use pubmed_export::models::{Condition, QueryError, QueryField, RecordBuilder};
use pubmed_export::sources::mock::make_record;
use pubmed_export::{MockProvider, SearchOutcome, Session, SessionError};
use std::io::{Cursor, Read};
use zip::ZipArchive;

fn entry_names(bytes: &[u8]) -> Vec<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

fn read_entry(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut data = Vec::new();
    archive.by_name(name).unwrap().read_to_end(&mut data).unwrap();
    data
}

fn pdf_text(bytes: &[u8]) -> Vec<String> {
    let doc = lopdf::Document::load_mem(bytes).unwrap();
    let mut lines = Vec::new();
    for page_id in doc.get_pages().values() {
        let content =
            lopdf::content::Content::decode(&doc.get_page_content(*page_id).unwrap()).unwrap();
        for op in content.operations.iter().filter(|op| op.operator == "Tj") {
            if let Some(lopdf::Object::String(text, _)) = op.operands.first() {
                lines.push(text.iter().map(|&b| b as char).collect());
            }
        }
    }
    lines
}

#[tokio::test]
async fn test_builder_search_and_export() {
    let provider = MockProvider::with_records(45);
    let mut session = Session::new(true);

    session.add_term(QueryField::TitleAbstract, "Kawasaki").unwrap();
    session.add_condition(Condition::And).unwrap();
    session.add_term(QueryField::Text, "Adalimumab").unwrap();

    let outcome = session.search_built(&provider).await.unwrap();
    assert_eq!(outcome, SearchOutcome::Found(45));
    assert_eq!(
        session.last_query(),
        Some("Kawasaki[Title/Abstract] AND Adalimumab[Text]")
    );

    let archive = session
        .export_archive(&ExportSettings::default())
        .unwrap()
        .unwrap();
    assert_eq!(
        entry_names(&archive.bytes),
        vec![
            "pubmed_articles.csv",
            "pubmed_articles_batch_1.pdf",
            "pubmed_articles_batch_2.pdf",
            "pubmed_articles_batch_3.pdf",
        ]
    );

    let table = read_entry(&archive.bytes, "pubmed_articles.csv");
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_reader(table.as_slice());
    assert_eq!(
        reader.headers().unwrap().iter().collect::<Vec<_>>(),
        vec!["Title", "Abstract", "Keywords", "Year", "First Author", "Link", "Access Type"]
    );
    assert_eq!(reader.records().count(), 45);

    let articles_per_page: Vec<usize> = (1..=3)
        .map(|k| {
            let pdf = read_entry(&archive.bytes, &format!("pubmed_articles_batch_{}.pdf", k));
            pdf_text(&pdf).iter().filter(|l| l.starts_with("Article ")).count()
        })
        .collect();
    assert_eq!(articles_per_page, vec![20, 20, 5]);
}

#[tokio::test]
async fn test_no_ids_means_no_fetch_and_no_archive() {
    let provider = MockProvider::new();
    let mut session = Session::new(true);

    let outcome = session.search(&provider, "no hits").await.unwrap();

    assert_eq!(outcome, SearchOutcome::NoArticles);
    assert_eq!(provider.calls(), vec!["resolve_ids:no hits"]);
    assert!(session
        .export_archive(&ExportSettings::default())
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_entry_count_for_various_sizes() {
    for n in [1usize, 20, 21, 40, 61] {
        let provider = MockProvider::with_records(n);
        let mut session = Session::new(true);
        session.search(&provider, "kawasaki").await.unwrap();

        let archive = session
            .export_archive(&ExportSettings::default())
            .unwrap()
            .unwrap();
        assert_eq!(entry_names(&archive.bytes).len(), 1 + n.div_ceil(20), "n = {n}");
    }
}

#[tokio::test]
async fn test_strict_and_lenient_sessions() {
    let provider = MockProvider::with_records(2);

    let mut strict = Session::new(true);
    strict.add_term(QueryField::Title, "Kawasaki").unwrap();
    strict.add_condition(Condition::And).unwrap();
    assert_eq!(
        strict.add_condition(Condition::Or).unwrap_err(),
        QueryError::ConsecutiveOperators
    );
    assert!(matches!(
        strict.search_built(&provider).await,
        Err(SessionError::Query(QueryError::DanglingOperator))
    ));

    let mut lenient = Session::new(false);
    lenient.add_term(QueryField::Title, "Kawasaki").unwrap();
    lenient.add_condition(Condition::And).unwrap();
    lenient.add_condition(Condition::Or).unwrap();
    lenient.search_built(&provider).await.unwrap();
    assert_eq!(provider.calls()[0], "resolve_ids:Kawasaki[Title] AND OR");
}

#[test]
fn test_report_text_is_latin1_but_table_is_not() {
    let record = RecordBuilder::new("Anti-TNF-α therapy in 川崎病")
        .abstract_text("Fièvre persistante")
        .build();
    let results = pubmed_export::ResultSet::new(vec![record, make_record(2)]);

    let archive = export_archive(&results, &ExportSettings::default())
        .unwrap()
        .unwrap();

    let table = String::from_utf8(read_entry(&archive.bytes, "pubmed_articles.csv")).unwrap();
    assert!(table.contains("Anti-TNF-α therapy in 川崎病"));

    let lines = pdf_text(&read_entry(&archive.bytes, "pubmed_articles_batch_1.pdf"));
    assert!(lines.contains(&"Title: Anti-TNF- therapy in".to_string()));
    assert!(lines.contains(&"Abstract: Fièvre persistante".to_string()));
    assert!(lines.contains(&"Keywords: N/A".to_string()));
}
