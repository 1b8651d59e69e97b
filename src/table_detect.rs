use tracing::{debug, trace};

use crate::fragment::Fragment;
use crate::model::{BoundingBox, Row, TableRegion};
use crate::options::{DetectOptions, SegmentOptions};
use crate::rows::cluster_rows;

pub(crate) const HEURISTIC_ID_PREFIX: &str = "table-heuristic";

fn columns_align(previous: &Row<'_>, current: &Row<'_>, tolerance: f64) -> bool {
    previous.fragments().iter().any(|above| {
        current
            .fragments()
            .iter()
            .any(|below| (above.x_center() - below.x_center()).abs() < tolerance)
    })
}

/// Splits ordered rows into contiguous runs that look like tables.
///
/// A row extends the current run when it sits less than `row_gap_tolerance`
/// below the previous row and shares at least one aligned column with it.
/// Runs shorter than `min_rows` are discarded.
#[must_use]
pub fn segment_row_groups<'r, 'a>(
    rows: &'r [Row<'a>],
    options: &SegmentOptions,
) -> Vec<&'r [Row<'a>]> {
    let mut groups = Vec::new();
    let mut start = 0;

    let flush = |start: usize, end: usize, groups: &mut Vec<&'r [Row<'a>]>| {
        let run = &rows[start..end];
        if run.len() >= options.min_rows {
            groups.push(run);
        } else if !run.is_empty() {
            trace!(rows = run.len(), "discarding short row run");
        }
    };

    for index in 1..rows.len() {
        let previous = &rows[index - 1];
        let current = &rows[index];
        let gap = current.reference_y() - previous.reference_y();

        let continues = gap < options.row_gap_tolerance
            && columns_align(previous, current, options.column_alignment_tolerance);
        if !continues {
            flush(start, index, &mut groups);
            start = index;
        }
    }
    flush(start, rows.len(), &mut groups);

    groups
}

/// Builds table regions from ordered rows, numbered top to bottom.
#[must_use]
pub fn segment_tables(rows: &[Row<'_>], options: &SegmentOptions) -> Vec<TableRegion> {
    let regions = segment_row_groups(rows, options)
        .into_iter()
        .filter_map(|group| {
            let extent = BoundingBox::enclosing(
                group.iter().flat_map(|row| row.fragments().iter().copied()),
            )?;
            Some((extent, group.len()))
        })
        .enumerate()
        .map(|(index, (extent, row_count))| TableRegion {
            id: format!("{HEURISTIC_ID_PREFIX}-{}", index + 1),
            bounding_box: extent.expand(options.padding).clamp_unit(),
            row_count,
            confidence: options.confidence,
        })
        .collect::<Vec<_>>();

    debug!(
        rows = rows.len(),
        regions = regions.len(),
        "segmented table regions"
    );
    regions
}

/// Clusters rows and segments them into table regions in one pass.
#[must_use]
pub fn detect_tables(fragments: &[Fragment], options: &DetectOptions) -> Vec<TableRegion> {
    let rows = cluster_rows(fragments, &options.rows);
    segment_tables(&rows, &options.segment)
}

#[cfg(test)]
mod tests {
    use super::{detect_tables, segment_row_groups, segment_tables};
    use crate::fragment::Fragment;
    use crate::model::BoundingBox;
    use crate::options::{DetectOptions, RowOptions, SegmentOptions};
    use crate::rows::cluster_rows;

    fn at(id: &str, x: f64, y: f64) -> Fragment {
        let extent = BoundingBox::from_corners(x - 0.03, y - 0.005, x + 0.03, y + 0.005)
            .expect("valid extent");
        Fragment::from_extent(id, id, 0.9, extent).expect("valid fragment")
    }

    fn aligned_rows(ys: &[f64]) -> Vec<Fragment> {
        ys.iter()
            .enumerate()
            .flat_map(|(index, &y)| {
                [
                    at(&format!("r{index}a"), 0.2, y),
                    at(&format!("r{index}b"), 0.5, y),
                ]
            })
            .collect()
    }

    #[test]
    fn three_aligned_rows_form_one_region() {
        let fragments = aligned_rows(&[0.10, 0.15, 0.20]);
        let regions = detect_tables(&fragments, &DetectOptions::default());

        assert_eq!(regions.len(), 1);
        let region = &regions[0];
        assert_eq!(region.id, "table-heuristic-1");
        assert_eq!(region.row_count, 3);
        assert_eq!(region.confidence, 0.85);
        assert!((region.bounding_box.x_min - 0.16).abs() < 1e-9);
        assert!((region.bounding_box.y_max - 0.215).abs() < 1e-9);
    }

    #[test]
    fn misaligned_third_row_leaves_no_region() {
        let mut fragments = aligned_rows(&[0.10, 0.15]);
        fragments.push(at("r2a", 0.30, 0.20));
        fragments.push(at("r2b", 0.70, 0.20));

        let regions = detect_tables(&fragments, &DetectOptions::default());
        assert!(regions.is_empty(), "unexpected regions: {regions:?}");
    }

    #[test]
    fn large_gap_splits_tables() {
        let fragments = aligned_rows(&[0.10, 0.15, 0.20, 0.50, 0.55, 0.60]);
        let regions = detect_tables(&fragments, &DetectOptions::default());

        assert_eq!(regions.len(), 2);
        assert_eq!(regions[1].id, "table-heuristic-2");
        assert!(regions[0].bounding_box.y_max < regions[1].bounding_box.y_min);
    }

    #[test]
    fn never_emits_region_below_min_rows() {
        let fragments = aligned_rows(&[0.10, 0.15, 0.20, 0.25, 0.50, 0.55]);
        for min_rows in 1..=5 {
            let options = DetectOptions {
                segment: SegmentOptions {
                    min_rows,
                    ..SegmentOptions::default()
                },
                ..DetectOptions::default()
            };
            for region in detect_tables(&fragments, &options) {
                assert!(region.row_count >= min_rows, "min_rows={min_rows}: {region:?}");
            }
        }
    }

    #[test]
    fn resegmenting_a_region_reproduces_it() {
        let mut fragments = aligned_rows(&[0.10, 0.14, 0.18, 0.22]);
        fragments.push(at("para1", 0.80, 0.50));
        fragments.push(at("para2", 0.95, 0.50));

        let rows = cluster_rows(&fragments, &RowOptions::default());
        let segment = SegmentOptions::default();
        let groups = segment_row_groups(&rows, &segment);
        assert_eq!(groups.len(), 1);

        let again = segment_tables(groups[0], &segment);
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].row_count, groups[0].len());
    }

    #[test]
    fn no_rows_no_regions() {
        assert!(segment_tables(&[], &SegmentOptions::default()).is_empty());
        assert!(detect_tables(&[], &DetectOptions::default()).is_empty());
    }
}
