//! Reconstructs tables from OCR text fragments.
//!
//! Fragments are grouped into rows, rows into table regions, and each region
//! into a rectangular grid of cell text that can be written as CSV. Forms
//! with known identifiers or right-aligned row labels have their own
//! strategies; see [`Strategy`].

mod anchor;
mod columns;
mod csv_out;
mod document;
mod error;
mod fragment;
mod grid;
mod merge;
mod model;
mod options;
mod refine;
mod row_labels;
mod rows;
mod table_detect;
mod warning;

use std::path::Path;

use rayon::prelude::*;
use tracing::debug;

use crate::csv_out::{write_csv, write_csv_to_string};
use crate::merge::{apply_output_column_filters, merge_tables};

pub use anchor::{AnchorOutcome, extract_anchor_table};
pub use columns::detect_columns;
pub use csv_out::grid_to_csv;
pub use document::{
    BoundingPoly, OcrBlock, OcrDocument, OcrPage, TableRegionRecord, read_document,
    write_document,
};
pub use error::ExtractError;
pub use fragment::{Fragment, index_fragments};
pub use grid::{build_grid, extract_region_grid};
pub use model::{BoundingBox, ExtractedTable, Grid, MergedOutput, Point, Row, TableRegion};
pub use options::{
    AnchorOptions, ColumnOptions, ColumnPosition, DetectOptions, ExtractOptions, GridOptions,
    PageSelection, RegionSpec, RowLabelOptions, RowOptions, SegmentOptions, Strategy,
};
pub use refine::refine_region;
pub use row_labels::extract_row_labelled_table;
pub use rows::cluster_rows;
pub use table_detect::{detect_tables, segment_row_groups, segment_tables};
pub use warning::{ExtractWarning, WarningCode};

const REGION_ID_PREFIX: &str = "table-region";
const ANCHOR_ID_PREFIX: &str = "table-anchor";
const ROW_LABEL_ID_PREFIX: &str = "table-row-labels";

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionReport {
    pub row_count: usize,
    pub table_count: usize,
    pub warnings: Vec<ExtractWarning>,
}

/// Tables recovered from a page or a whole document, plus the regions that
/// could not be extracted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub tables: Vec<ExtractedTable>,
    pub warnings: Vec<ExtractWarning>,
}

impl Extraction {
    fn push_grid(
        &mut self,
        page: u32,
        region_id: String,
        bounding_box: Option<BoundingBox>,
        grid: Grid,
    ) {
        if grid.is_empty() {
            self.warnings.push(
                ExtractWarning::new(WarningCode::EmptyRegion, "region contains no text")
                    .with_page(page)
                    .with_region(region_id),
            );
            return;
        }

        self.tables.push(ExtractedTable {
            page,
            table_id: self.tables.len() + 1,
            region_id,
            bounding_box,
            grid,
        });
    }

    fn warn(&mut self, code: WarningCode, message: &str, page: u32, region_id: String) {
        self.warnings.push(
            ExtractWarning::new(code, message)
                .with_page(page)
                .with_region(region_id),
        );
    }
}

pub fn detect_page_tables(
    page: &OcrPage,
    page_number: u32,
    options: &DetectOptions,
) -> Result<Vec<TableRegion>, ExtractError> {
    let fragments = index_fragments(page, page_number)?;
    Ok(detect_tables(&fragments, options))
}

/// Replaces every page's `tables` with the regions detected on it and
/// returns how many were found in total.
pub fn annotate_document(
    document: &mut OcrDocument,
    options: &DetectOptions,
) -> Result<usize, ExtractError> {
    options.validate()?;

    let counts = document
        .pages
        .par_iter_mut()
        .enumerate()
        .map(|(index, page)| {
            let page_number = page.page_number(index);
            let regions = detect_page_tables(page, page_number, options)?;
            page.tables = regions.iter().map(TableRegionRecord::from).collect();
            Ok(regions.len())
        })
        .collect::<Result<Vec<_>, ExtractError>>()?;

    let total: usize = counts.iter().sum();
    debug!(
        pages = document.pages.len(),
        regions = total,
        "annotated document"
    );
    Ok(total)
}

fn caller_regions(
    fragments: &[Fragment],
    page: u32,
    options: &ExtractOptions,
) -> Vec<(String, BoundingBox)> {
    options
        .regions
        .iter()
        .filter(|region| region.page == page)
        .enumerate()
        .map(|(index, region)| {
            let bounds = if options.refine_regions {
                refine_region(fragments, &region.bounds)
            } else {
                region.bounds
            };
            (format!("{REGION_ID_PREFIX}-{}", index + 1), bounds)
        })
        .collect()
}

fn scopes(
    fragments: &[Fragment],
    regions: Vec<(String, BoundingBox)>,
    prefix: &str,
) -> Vec<(String, Vec<Fragment>)> {
    if regions.is_empty() {
        return vec![(format!("{prefix}-1"), fragments.to_vec())];
    }

    regions
        .into_iter()
        .map(|(region_id, bounds)| {
            let inside = fragments
                .iter()
                .filter(|fragment| bounds.contains(fragment.center()))
                .cloned()
                .collect();
            (region_id, inside)
        })
        .collect()
}

/// Extracts every table on one page with the configured strategy.
///
/// Caller regions for the page replace geometric detection; for the form
/// strategies they restrict which fragments are considered. Regions that
/// yield nothing are reported as warnings. Table ids are numbered from 1
/// within the page.
pub fn extract_page_tables(
    fragments: &[Fragment],
    page: u32,
    options: &ExtractOptions,
) -> Result<Extraction, ExtractError> {
    let regions = caller_regions(fragments, page, options);
    let mut extraction = Extraction::default();

    match &options.strategy {
        Strategy::Geometric => {
            let regions: Vec<(String, BoundingBox)> = if regions.is_empty() {
                detect_tables(fragments, &options.detect)
                    .into_iter()
                    .map(|region| (region.id, region.bounding_box))
                    .collect()
            } else {
                regions
            };
            for (region_id, bounds) in regions {
                let grid = extract_region_grid(fragments, &bounds, &options.grid);
                extraction.push_grid(page, region_id, Some(bounds), grid);
            }
        }
        Strategy::AnchorBased(anchor) => {
            for (region_id, scope) in scopes(fragments, regions, ANCHOR_ID_PREFIX) {
                match extract_anchor_table(&scope, anchor)? {
                    AnchorOutcome::Table { grid, bounds } => {
                        extraction.push_grid(page, region_id, Some(bounds), grid);
                    }
                    AnchorOutcome::NoColumnAnchors => extraction.warn(
                        WarningCode::NoColumnAnchors,
                        "no fragment matched the column anchor pattern",
                        page,
                        region_id,
                    ),
                    AnchorOutcome::NoRowLabels => extraction.warn(
                        WarningCode::NoRowLabels,
                        "column anchors found but no row label inside their span",
                        page,
                        region_id,
                    ),
                }
            }
        }
        Strategy::RowLabelled(labelled) => {
            for (region_id, scope) in scopes(fragments, regions, ROW_LABEL_ID_PREFIX) {
                match extract_row_labelled_table(&scope, labelled) {
                    Some(grid) => extraction.push_grid(page, region_id, None, grid),
                    None => extraction.warn(
                        WarningCode::NoRowLabels,
                        "no right-aligned row header found",
                        page,
                        region_id,
                    ),
                }
            }
        }
    }

    debug!(
        page,
        tables = extraction.tables.len(),
        warnings = extraction.warnings.len(),
        "extracted page"
    );
    Ok(extraction)
}

/// Extracts the selected pages of a document in parallel.
///
/// Tables come back in page order with ids renumbered across the document.
pub fn extract_document(
    document: &OcrDocument,
    options: &ExtractOptions,
) -> Result<Extraction, ExtractError> {
    options.validate()?;

    let selected = document
        .pages
        .iter()
        .enumerate()
        .map(|(index, page)| (page.page_number(index), page))
        .filter(|(number, _)| {
            options
                .pages
                .as_ref()
                .is_none_or(|selection| selection.contains(*number))
        })
        .collect::<Vec<_>>();
    if options.pages.is_some() && selected.is_empty() && !document.pages.is_empty() {
        return Err(ExtractError::InvalidPageSelection(
            "no page of the document matches the selection".to_string(),
        ));
    }

    let pages = selected
        .par_iter()
        .map(|&(number, page)| {
            let fragments = index_fragments(page, number)?;
            extract_page_tables(&fragments, number, options)
        })
        .collect::<Result<Vec<_>, ExtractError>>()?;

    let mut extraction = Extraction::default();
    for region in &options.regions {
        if !selected.iter().any(|(number, _)| *number == region.page) {
            extraction.warnings.push(
                ExtractWarning::new(
                    WarningCode::RegionPageMissing,
                    "region refers to a page that was not processed",
                )
                .with_page(region.page),
            );
        }
    }

    for page in pages {
        extraction.warnings.extend(page.warnings);
        for mut table in page.tables {
            table.table_id = extraction.tables.len() + 1;
            extraction.tables.push(table);
        }
    }

    if extraction.tables.is_empty() {
        extraction.warnings.push(ExtractWarning::new(
            WarningCode::NoTablesDetected,
            "no table rows were detected in the selected pages",
        ));
    }

    debug!(
        pages = selected.len(),
        tables = extraction.tables.len(),
        "extracted document"
    );
    Ok(extraction)
}

fn merged_output(
    document: &OcrDocument,
    options: &ExtractOptions,
) -> Result<(MergedOutput, Vec<ExtractWarning>), ExtractError> {
    let extraction = extract_document(document, options)?;
    let merged = merge_tables(&extraction.tables);
    Ok((
        apply_output_column_filters(merged, options),
        extraction.warnings,
    ))
}

/// Extracts a document and renders every table as one merged CSV.
pub fn extract_document_to_csv_string(
    document: &OcrDocument,
    options: &ExtractOptions,
) -> Result<(String, ExtractionReport), ExtractError> {
    let (merged, warnings) = merged_output(document, options)?;
    let csv = write_csv_to_string(&merged, options.delimiter, !options.no_header)?;

    Ok((
        csv,
        ExtractionReport {
            row_count: merged.row_count,
            table_count: merged.table_count,
            warnings,
        },
    ))
}

pub fn extract_json_to_csv(
    input_json: &Path,
    output_csv: &Path,
    options: &ExtractOptions,
) -> Result<ExtractionReport, ExtractError> {
    options.validate()?;

    let document = read_document(input_json)?;
    let (merged, warnings) = merged_output(&document, options)?;
    write_csv(output_csv, &merged, options.delimiter, !options.no_header)?;

    Ok(ExtractionReport {
        row_count: merged.row_count,
        table_count: merged.table_count,
        warnings,
    })
}

/// Reads an OCR document, annotates it with detected regions and writes it
/// back out. Returns the number of regions found.
pub fn detect_json_tables(
    input_json: &Path,
    output_json: &Path,
    options: &DetectOptions,
) -> Result<usize, ExtractError> {
    options.validate()?;

    let mut document = read_document(input_json)?;
    let total = annotate_document(&mut document, options)?;
    write_document(output_json, &document)?;
    Ok(total)
}

pub fn region_to_csv(
    fragments: &[Fragment],
    bounds: &BoundingBox,
    options: &GridOptions,
    delimiter: u8,
) -> Result<String, ExtractError> {
    grid_to_csv(&extract_region_grid(fragments, bounds, options), delimiter)
}

#[cfg(test)]
mod tests {
    use super::{
        ExtractOptions, Fragment, RegionSpec, Strategy, WarningCode, extract_page_tables,
    };
    use crate::model::BoundingBox;
    use crate::options::{AnchorOptions, RowLabelOptions};

    fn at(text: &str, x: f64, y: f64) -> Fragment {
        let extent = BoundingBox::from_corners(x - 0.03, y - 0.005, x + 0.03, y + 0.005)
            .expect("valid extent");
        Fragment::from_extent(text, text, 0.9, extent).expect("valid fragment")
    }

    fn two_column_table() -> Vec<Fragment> {
        vec![
            at("Tag", 0.2, 0.10),
            at("Service", 0.5, 0.10),
            at("P-101", 0.2, 0.15),
            at("Crude", 0.5, 0.15),
            at("P-102", 0.2, 0.20),
            at("Water", 0.5, 0.20),
        ]
    }

    #[test]
    fn geometric_strategy_extracts_detected_region() {
        let extraction = extract_page_tables(&two_column_table(), 1, &ExtractOptions::default())
            .expect("extraction should succeed");

        assert_eq!(extraction.tables.len(), 1);
        let table = &extraction.tables[0];
        assert_eq!(table.region_id, "table-heuristic-1");
        assert_eq!(table.grid[1], vec!["P-101", "Crude"]);
        assert!(extraction.warnings.is_empty());
    }

    #[test]
    fn empty_caller_region_becomes_a_warning() {
        let options = ExtractOptions {
            regions: vec![
                RegionSpec {
                    page: 1,
                    bounds: BoundingBox::from_corners(0.0, 0.0, 1.0, 0.3).expect("valid"),
                },
                RegionSpec {
                    page: 1,
                    bounds: BoundingBox::from_corners(0.0, 0.8, 1.0, 0.9).expect("valid"),
                },
                RegionSpec {
                    page: 2,
                    bounds: BoundingBox::from_corners(0.0, 0.0, 1.0, 1.0).expect("valid"),
                },
            ],
            ..ExtractOptions::default()
        };

        let extraction = extract_page_tables(&two_column_table(), 1, &options)
            .expect("extraction should succeed");
        assert_eq!(extraction.tables.len(), 1);
        assert_eq!(extraction.tables[0].region_id, "table-region-1");
        assert_eq!(extraction.warnings.len(), 1);
        assert_eq!(extraction.warnings[0].code, WarningCode::EmptyRegion);
        assert_eq!(extraction.warnings[0].region.as_deref(), Some("table-region-2"));
    }

    #[test]
    fn anchor_strategy_without_identifiers_warns() {
        let options = ExtractOptions {
            strategy: Strategy::AnchorBased(AnchorOptions::default()),
            ..ExtractOptions::default()
        };
        let extraction = extract_page_tables(&two_column_table(), 4, &options)
            .expect("extraction should succeed");

        assert!(extraction.tables.is_empty());
        assert_eq!(extraction.warnings[0].code, WarningCode::NoColumnAnchors);
        assert_eq!(extraction.warnings[0].page, Some(4));
    }

    #[test]
    fn row_label_strategy_without_headers_warns() {
        let options = ExtractOptions {
            strategy: Strategy::RowLabelled(RowLabelOptions::default()),
            ..ExtractOptions::default()
        };
        let extraction = extract_page_tables(&two_column_table(), 1, &options)
            .expect("extraction should succeed");

        assert!(extraction.tables.is_empty());
        assert_eq!(extraction.warnings[0].code, WarningCode::NoRowLabels);
    }
}
