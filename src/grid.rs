use tracing::debug;

use crate::columns::detect_columns;
use crate::fragment::Fragment;
use crate::model::{BoundingBox, Grid, Row};
use crate::options::{ColumnPosition, GridOptions};
use crate::rows::cluster_rows;

pub(crate) fn append_text(cell: &mut String, text: &str) {
    if !cell.is_empty() && !text.is_empty() {
        cell.push(' ');
    }
    cell.push_str(text);
}

pub(crate) fn pad_rows(grid: &mut Grid) {
    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    for row in grid.iter_mut() {
        row.resize(width, String::new());
    }
}

/// Cell edges for sorted anchor centers: midpoints between neighbours,
/// `first` and `last` at the two ends.
pub(crate) fn midpoint_edges(centers: &[f64], first: f64, last: f64) -> Vec<(f64, f64)> {
    let count = centers.len();
    (0..count)
        .map(|index| {
            let start = if index == 0 {
                first
            } else {
                (centers[index - 1] + centers[index]) / 2.0
            };
            let end = if index + 1 == count {
                last
            } else {
                (centers[index] + centers[index + 1]) / 2.0
            };
            (start, end)
        })
        .collect()
}

fn nearest_boundary(boundaries: &[f64], position: f64) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (index, boundary) in boundaries.iter().enumerate() {
        let distance = (position - boundary).abs();
        if distance < best_distance {
            best = index;
            best_distance = distance;
        }
    }
    best
}

fn fragment_per_column(rows: &[Row<'_>]) -> Grid {
    let mut grid: Grid = rows
        .iter()
        .map(|row| {
            row.fragments()
                .iter()
                .map(|fragment| fragment.text().to_string())
                .collect::<Vec<_>>()
        })
        .collect();
    pad_rows(&mut grid);
    grid
}

/// Places every fragment of every row into the column whose boundary is
/// nearest to it; ties go to the leftmost column.
///
/// Fragments sharing a cell are joined left to right with a space. Without
/// boundaries each fragment gets its own column.
#[must_use]
pub fn build_grid(rows: &[Row<'_>], boundaries: &[f64], position: ColumnPosition) -> Grid {
    if boundaries.is_empty() {
        return fragment_per_column(rows);
    }

    rows.iter()
        .map(|row| {
            let mut cells = vec![String::new(); boundaries.len()];
            for fragment in row.fragments() {
                let column = nearest_boundary(boundaries, position.of(fragment));
                append_text(&mut cells[column], fragment.text());
            }
            cells
        })
        .collect()
}

/// Extracts the grid of every fragment centered inside `bounds`.
#[must_use]
pub fn extract_region_grid(
    fragments: &[Fragment],
    bounds: &BoundingBox,
    options: &GridOptions,
) -> Grid {
    let inside = fragments
        .iter()
        .filter(|fragment| bounds.contains(fragment.center()));
    let rows = cluster_rows(inside, &options.rows);
    if rows.is_empty() {
        return Grid::new();
    }

    let boundaries = detect_columns(&rows, &options.columns);
    let grid = build_grid(&rows, &boundaries, options.columns.position);
    debug!(
        rows = grid.len(),
        columns = boundaries.len(),
        "built region grid"
    );
    grid
}
