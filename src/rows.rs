use tracing::{debug, trace};

use crate::fragment::Fragment;
use crate::model::Row;
use crate::options::RowOptions;

/// Groups fragments into horizontally aligned rows.
///
/// Each still-unassigned fragment, in input order, seeds a row and claims
/// every later unassigned fragment whose `y_center` is strictly within
/// `y_tolerance` of its own. The seed alone sets the reference, so a fragment
/// near the tolerance boundary of two rows joins whichever seed comes first in
/// the input. Rows below `min_fragments` are dropped. Output is sorted by
/// reference `y_center`.
pub fn cluster_rows<'a, I>(fragments: I, options: &RowOptions) -> Vec<Row<'a>>
where
    I: IntoIterator<Item = &'a Fragment>,
{
    let fragments = fragments.into_iter().collect::<Vec<_>>();
    let mut assigned = vec![false; fragments.len()];
    let mut rows = Vec::new();

    for (index, seed) in fragments.iter().enumerate() {
        if assigned[index] {
            continue;
        }
        assigned[index] = true;

        let reference_y = seed.y_center();
        let mut members = vec![*seed];
        for (other_index, other) in fragments.iter().enumerate().skip(index + 1) {
            if !assigned[other_index] && (reference_y - other.y_center()).abs() < options.y_tolerance
            {
                assigned[other_index] = true;
                members.push(*other);
            }
        }

        if members.len() >= options.min_fragments {
            rows.push(Row::new(reference_y, members));
        } else {
            trace!(
                seed = seed.id(),
                members = members.len(),
                "dropping row below minimum size"
            );
        }
    }

    rows.sort_by(|left, right| left.reference_y().total_cmp(&right.reference_y()));
    debug!(
        fragments = fragments.len(),
        rows = rows.len(),
        y_tolerance = options.y_tolerance,
        "clustered rows"
    );
    rows
}
