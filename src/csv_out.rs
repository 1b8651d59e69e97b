use std::io::Write;
use std::path::Path;

use csv::{Writer, WriterBuilder};

use crate::error::ExtractError;
use crate::model::MergedOutput;

fn finish(writer: Writer<Vec<u8>>) -> Result<String, ExtractError> {
    let bytes = writer
        .into_inner()
        .map_err(|error| ExtractError::Csv(error.into_error().into()))?;
    String::from_utf8(bytes)
        .map_err(|error| ExtractError::InvalidOption(format!("invalid utf-8 csv output: {error}")))
}

fn write_merged<W: Write>(
    writer: &mut Writer<W>,
    merged: &MergedOutput,
    include_header: bool,
) -> Result<(), ExtractError> {
    if include_header {
        writer.write_record(&merged.headers)?;
    }
    for row in &merged.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Renders one grid as CSV, one record per row.
///
/// Fields holding the delimiter, a quote or a line break are quoted and
/// inner quotes doubled. A grid without any cell renders as an empty string.
pub fn grid_to_csv(grid: &[Vec<String>], delimiter: u8) -> Result<String, ExtractError> {
    if grid.iter().all(Vec::is_empty) {
        return Ok(String::new());
    }

    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(Vec::<u8>::new());
    for row in grid {
        writer.write_record(row)?;
    }
    writer.flush()?;
    finish(writer)
}

pub(crate) fn write_csv(
    path: &Path,
    merged: &MergedOutput,
    delimiter: u8,
    include_header: bool,
) -> Result<(), ExtractError> {
    let mut writer = WriterBuilder::new().delimiter(delimiter).from_path(path)?;
    write_merged(&mut writer, merged, include_header)
}

pub(crate) fn write_csv_to_string(
    merged: &MergedOutput,
    delimiter: u8,
    include_header: bool,
) -> Result<String, ExtractError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::<u8>::new());
    write_merged(&mut writer, merged, include_header)?;
    finish(writer)
}

#[cfg(test)]
mod tests {
    use csv::ReaderBuilder;
    use pretty_assertions::assert_eq;

    use super::{grid_to_csv, write_csv_to_string};
    use crate::model::MergedOutput;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect()
    }

    fn parse(text: &str, delimiter: u8) -> Vec<Vec<String>> {
        ReaderBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .from_reader(text.as_bytes())
            .records()
            .map(|record| {
                record
                    .expect("record should parse")
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn plain_grid_renders_unquoted() {
        let csv = grid_to_csv(&grid(&[&["Tag", "Service"], &["P-101", "Crude"]]), b',')
            .expect("csv should render");
        assert_eq!(csv, "Tag,Service\nP-101,Crude\n");
    }

    #[test]
    fn special_characters_are_quoted_and_survive_a_reread() {
        let original = grid(&[
            &["a,b", "say \"hi\""],
            &["two\nlines", ""],
        ]);
        let csv = grid_to_csv(&original, b',').expect("csv should render");

        assert!(csv.starts_with("\"a,b\",\"say \"\"hi\"\"\"\n"));
        assert_eq!(parse(&csv, b','), original);
    }

    #[test]
    fn custom_delimiter_is_used() {
        let original = grid(&[&["1", "2;3"]]);
        let csv = grid_to_csv(&original, b';').expect("csv should render");
        assert_eq!(csv, "1;\"2;3\"\n");
        assert_eq!(parse(&csv, b';'), original);
    }

    #[test]
    fn empty_grid_renders_empty_string() {
        assert_eq!(grid_to_csv(&[], b',').expect("csv should render"), "");
        assert_eq!(
            grid_to_csv(&[Vec::new(), Vec::new()], b',').expect("csv should render"),
            ""
        );
    }

    #[test]
    fn merged_output_header_is_optional() {
        let merged = MergedOutput {
            headers: vec!["page".to_string(), "col_1".to_string()],
            rows: vec![vec!["1".to_string(), "x".to_string()]],
            table_count: 1,
            row_count: 1,
        };

        let with_header = write_csv_to_string(&merged, b',', true).expect("csv should render");
        assert_eq!(with_header, "page,col_1\n1,x\n");
        let without = write_csv_to_string(&merged, b',', false).expect("csv should render");
        assert_eq!(without, "1,x\n");
    }
}
