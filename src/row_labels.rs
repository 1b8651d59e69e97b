//! Tables whose rows are named by right-aligned headers and whose columns
//! are not known in advance.

use std::ptr;

use tracing::debug;

use crate::columns::detect_columns;
use crate::fragment::Fragment;
use crate::grid::{build_grid, pad_rows};
use crate::model::{Grid, Row};
use crate::options::RowLabelOptions;

fn is_header(fragment: &Fragment, options: &RowLabelOptions) -> bool {
    let text = fragment.text().trim();
    fragment.x_max() > options.header_x_threshold
        && (options.bounds.y_min..=options.bounds.y_max).contains(&fragment.y_center())
        && text.chars().count() > options.min_header_chars
        && !text.chars().all(|c| c.is_ascii_digit())
}

fn nearest_header(headers: &[&Fragment], y: f64) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (index, header) in headers.iter().enumerate() {
        let distance = (header.y_center() - y).abs();
        if distance < best_distance {
            best = index;
            best_distance = distance;
        }
    }
    best
}

/// Builds one row per header that has data beside it, the header text in
/// the first column.
///
/// Each data fragment belongs to the header whose `y_center` is nearest, so
/// the row bands meet halfway between headers. Returns `None` when no
/// fragment qualifies as a header.
#[must_use]
pub fn extract_row_labelled_table(
    fragments: &[Fragment],
    options: &RowLabelOptions,
) -> Option<Grid> {
    let mut headers = fragments
        .iter()
        .filter(|fragment| is_header(fragment, options))
        .collect::<Vec<_>>();
    if headers.is_empty() {
        debug!("no row headers found");
        return None;
    }
    headers.sort_by(|left, right| left.y_center().total_cmp(&right.y_center()));

    let mut bands: Vec<Vec<&Fragment>> = vec![Vec::new(); headers.len()];
    for fragment in fragments.iter().filter(|fragment| {
        !headers.iter().any(|header| ptr::eq(*header, *fragment))
            && options.bounds.contains(fragment.center())
    }) {
        bands[nearest_header(&headers, fragment.y_center())].push(fragment);
    }

    let (labels, rows): (Vec<&str>, Vec<Row<'_>>) = headers
        .iter()
        .zip(bands)
        .filter(|(_, members)| !members.is_empty())
        .map(|(header, members)| (header.text().trim(), Row::new(header.y_center(), members)))
        .unzip();

    let boundaries = detect_columns(&rows, &options.columns);
    let mut grid = build_grid(&rows, &boundaries, options.columns.position)
        .into_iter()
        .zip(labels)
        .map(|(cells, label)| {
            let mut row = Vec::with_capacity(cells.len() + 1);
            row.push(label.to_string());
            row.extend(cells);
            row
        })
        .collect::<Grid>();
    pad_rows(&mut grid);

    debug!(
        headers = headers.len(),
        rows = grid.len(),
        columns = boundaries.len(),
        "extracted row-labelled table"
    );
    Some(grid)
}
