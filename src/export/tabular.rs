//! Delimited tabular export of a result set.
//!
//! The table is written verbatim: no sanitization is applied, so it keeps
//! every character the provider returned.

use crate::export::ExportError;
use crate::models::{ResultSet, COLUMNS};

/// Write a header row followed by one row per record
pub fn write_table(results: &ResultSet, delimiter: u8) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(COLUMNS)?;
    for record in results {
        writer.write_record(record.values())?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordBuilder;
    use crate::sources::mock::make_record;

    fn read_rows(bytes: &[u8], delimiter: u8) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .from_reader(bytes);
        reader
            .records()
            .map(|row| row.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_header_and_rows() {
        let results = ResultSet::new((1..=45).map(make_record).collect());
        let bytes = write_table(&results, b';').unwrap();

        let rows = read_rows(&bytes, b';');
        assert_eq!(rows.len(), 46);
        assert_eq!(rows[0], COLUMNS.to_vec());
        assert_eq!(rows[1][0], "Article title 1");
        assert_eq!(rows[45][4], "Author 45");
    }

    #[test]
    fn test_default_delimiter_is_semicolon() {
        let results = ResultSet::new(vec![make_record(1)]);
        let text = String::from_utf8(write_table(&results, b';').unwrap()).unwrap();

        assert!(text.starts_with("Title;Abstract;Keywords;Year;First Author;Link;Access Type\n"));
    }

    #[test]
    fn test_fields_with_delimiter_are_quoted() {
        let record = RecordBuilder::new("A; B")
            .abstract_text("line one\nline \"two\"")
            .build();
        let bytes = write_table(&ResultSet::new(vec![record]), b';').unwrap();

        let rows = read_rows(&bytes, b';');
        assert_eq!(rows[1][0], "A; B");
        assert_eq!(rows[1][1], "line one\nline \"two\"");
    }

    #[test]
    fn test_not_sanitized() {
        let record = RecordBuilder::new("TNF-α and 川崎病").build();
        let bytes = write_table(&ResultSet::new(vec![record]), b',').unwrap();

        let rows = read_rows(&bytes, b',');
        assert_eq!(rows[1][0], "TNF-α and 川崎病");
    }

    #[test]
    fn test_empty_result_set_has_header_only() {
        let bytes = write_table(&ResultSet::default(), b';').unwrap();
        assert_eq!(read_rows(&bytes, b';').len(), 1);
    }
}
