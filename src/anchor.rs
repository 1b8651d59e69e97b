//! Extraction for forms whose columns are headed by recognizable identifiers
//! (equipment tags such as `P-T6201A`) and whose rows are named by
//! right-aligned labels.

use tracing::debug;

use crate::error::ExtractError;
use crate::fragment::Fragment;
use crate::grid::{append_text, midpoint_edges, pad_rows};
use crate::model::{BoundingBox, Grid};
use crate::options::AnchorOptions;

#[derive(Debug, Clone, PartialEq)]
pub enum AnchorOutcome {
    /// Header row first: an empty corner cell followed by the column anchors.
    Table { grid: Grid, bounds: BoundingBox },
    NoColumnAnchors,
    NoRowLabels,
}

fn matches_keyword(text: &str, keywords: &[String]) -> bool {
    let upper = text.to_uppercase();
    keywords.iter().any(|keyword| upper.contains(keyword.as_str()))
}

fn cell_text(fragments: &[Fragment], columns: (f64, f64), rows: (f64, f64)) -> String {
    let mut cell = String::new();
    for fragment in fragments.iter().filter(|fragment| {
        let center = fragment.center();
        (columns.0..=columns.1).contains(&center.x) && (rows.0..=rows.1).contains(&center.y)
    }) {
        append_text(&mut cell, fragment.text().trim());
    }
    cell
}

/// Folds rows with a blank label into the row above, filling only its empty
/// cells. A leading unlabelled row has nothing to merge into and is kept.
pub(crate) fn merge_continuation_rows(rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let mut merged: Vec<Vec<String>> = Vec::with_capacity(rows.len());
    for row in rows {
        let continuation = row.first().is_none_or(|label| label.trim().is_empty());
        if continuation {
            if let Some(previous) = merged.last_mut() {
                for (target, value) in previous.iter_mut().zip(row).skip(1) {
                    if target.is_empty() && !value.is_empty() {
                        *target = value;
                    }
                }
                continue;
            }
        }
        merged.push(row);
    }
    merged
}

/// Reconstructs an anchor-based form table.
///
/// Column anchors are fragments whose trimmed text matches
/// `column_pattern`; row labels are fragments extending past
/// `label_x_threshold` whose text contains one of `row_keywords`. The table
/// spans from just above the topmost label to the bottom of the lowest column
/// anchor. Cell edges sit halfway between neighbouring anchors.
pub fn extract_anchor_table(
    fragments: &[Fragment],
    options: &AnchorOptions,
) -> Result<AnchorOutcome, ExtractError> {
    let pattern = options.compile_pattern()?;
    let keywords = options
        .row_keywords
        .iter()
        .map(|keyword| keyword.trim().to_uppercase())
        .filter(|keyword| !keyword.is_empty())
        .collect::<Vec<_>>();

    let mut columns = fragments
        .iter()
        .filter(|fragment| {
            fragment.y_center() > options.column_anchor_min_y
                && pattern.is_match(fragment.text().trim())
        })
        .collect::<Vec<_>>();
    columns.sort_by(|left, right| left.x_center().total_cmp(&right.x_center()));
    let (Some(first), Some(last)) = (columns.first(), columns.last()) else {
        debug!("no column anchors matched");
        return Ok(AnchorOutcome::NoColumnAnchors);
    };
    let column_edges = midpoint_edges(
        &columns.iter().map(|f| f.x_center()).collect::<Vec<_>>(),
        first.x_center() - options.column_margin,
        last.x_center() + options.column_margin,
    );

    let is_label = |fragment: &&Fragment| {
        fragment.x_max() > options.label_x_threshold && matches_keyword(fragment.text(), &keywords)
    };
    let Some(top) = fragments
        .iter()
        .filter(is_label)
        .map(Fragment::y_min)
        .reduce(f64::min)
        .map(|y| y - options.vertical_buffer)
    else {
        debug!(columns = columns.len(), "no row labels matched");
        return Ok(AnchorOutcome::NoRowLabels);
    };
    let bottom = columns
        .iter()
        .map(|fragment| fragment.y_max())
        .fold(f64::NEG_INFINITY, f64::max);

    let mut labels = fragments
        .iter()
        .filter(is_label)
        .filter(|fragment| (top..=bottom).contains(&fragment.y_center()))
        .collect::<Vec<_>>();
    if labels.is_empty() {
        debug!(top, bottom, "row labels all fall outside the column span");
        return Ok(AnchorOutcome::NoRowLabels);
    }
    labels.sort_by(|left, right| left.y_center().total_cmp(&right.y_center()));
    let row_edges = midpoint_edges(
        &labels.iter().map(|f| f.y_center()).collect::<Vec<_>>(),
        top,
        bottom,
    );

    let body = labels
        .iter()
        .zip(&row_edges)
        .map(|(label, &row_span)| {
            let mut row = Vec::with_capacity(column_edges.len() + 1);
            row.push(label.text().trim().to_string());
            row.extend(
                column_edges
                    .iter()
                    .map(|&column_span| cell_text(fragments, column_span, row_span)),
            );
            row
        })
        .collect::<Vec<_>>();

    let mut header = vec![String::new()];
    header.extend(columns.iter().map(|f| f.text().trim().to_string()));
    let mut grid = vec![header];
    grid.extend(merge_continuation_rows(body));
    pad_rows(&mut grid);

    let bounds = BoundingBox {
        x_min: column_edges.first().map_or(0.0, |edge| edge.0),
        x_max: column_edges.last().map_or(1.0, |edge| edge.1),
        y_min: top,
        y_max: bottom,
    }
    .clamp_unit();

    debug!(
        columns = columns.len(),
        rows = grid.len() - 1,
        "extracted anchor table"
    );
    Ok(AnchorOutcome::Table { grid, bounds })
}
