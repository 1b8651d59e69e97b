use crate::model::{ExtractedTable, MergedOutput};
use crate::options::ExtractOptions;

/// Stacks every table under one `page, table_id, col_1..col_n` schema, `n`
/// being the widest table.
pub(crate) fn merge_tables(tables: &[ExtractedTable]) -> MergedOutput {
    let width = tables
        .iter()
        .flat_map(|table| table.grid.iter().map(Vec::len))
        .max()
        .unwrap_or(0);

    let mut headers = vec!["page".to_string(), "table_id".to_string()];
    headers.extend((1..=width).map(|index| format!("col_{index}")));

    let mut rows = Vec::new();
    for table in tables {
        for grid_row in &table.grid {
            let mut row = Vec::with_capacity(width + 2);
            row.push(table.page.to_string());
            row.push(table.table_id.to_string());
            row.extend(grid_row.iter().cloned());
            row.resize(width + 2, String::new());
            rows.push(row);
        }
    }

    MergedOutput {
        headers,
        row_count: rows.len(),
        table_count: tables.len(),
        rows,
    }
}

pub(crate) fn apply_output_column_filters(
    merged: MergedOutput,
    options: &ExtractOptions,
) -> MergedOutput {
    if !options.no_page && !options.no_table {
        return merged;
    }

    let keep_indices = merged
        .headers
        .iter()
        .enumerate()
        .filter_map(|(index, header)| {
            if options.no_page && header == "page" {
                return None;
            }
            if options.no_table && header == "table_id" {
                return None;
            }
            Some(index)
        })
        .collect::<Vec<_>>();

    let headers = keep_indices
        .iter()
        .map(|&index| merged.headers[index].clone())
        .collect::<Vec<_>>();
    let rows = merged
        .rows
        .iter()
        .map(|row| {
            keep_indices
                .iter()
                .filter_map(|&index| row.get(index).cloned())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    MergedOutput {
        headers,
        rows,
        row_count: merged.row_count,
        table_count: merged.table_count,
    }
}
