use tracing::debug;

use crate::model::Row;
use crate::options::ColumnOptions;

/// Derives strictly increasing column boundaries for a set of rows.
///
/// Positions are sorted and deduplicated, then swept left to right: a
/// position opens a new column only when it lies strictly more than
/// `column_cluster_tolerance` past the last accepted boundary. A position
/// exactly at the tolerance stays in the current column.
#[must_use]
pub fn detect_columns(rows: &[Row<'_>], options: &ColumnOptions) -> Vec<f64> {
    let mut positions = rows
        .iter()
        .flat_map(|row| row.fragments().iter().map(|f| options.position.of(f)))
        .collect::<Vec<_>>();
    positions.sort_by(f64::total_cmp);
    positions.dedup();

    let mut boundaries: Vec<f64> = Vec::new();
    for position in positions {
        match boundaries.last() {
            Some(&last) if position - last <= options.column_cluster_tolerance => {}
            _ => boundaries.push(position),
        }
    }

    debug!(columns = boundaries.len(), "detected column boundaries");
    boundaries
}
