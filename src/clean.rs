//! Optional cleaning pass over a fetched table.
//!
//! The API echoes query parameters back as extra columns and pads sparse
//! cells with `-` / `00` placeholders; combining per-call results also
//! leaves duplicate rows behind. Cleaning removes that noise, splits the
//! `time` column into `YEAR` and `MONTH`, de-duplicates on the dataset's
//! natural key, and sorts the result.

use crate::models::{Dataset, TradeTable};
use anyhow::Result;
use std::collections::HashSet;

// Columns only needed to drive the API call.
const ECHO_COLUMNS: &[&str] = &["COMM_LVL", "SUMMARY_LVL"];

/// Clean `table` according to its dataset. The input is left untouched so
/// the raw rows can still be written alongside the cleaned ones.
pub fn clean(table: &TradeTable, dataset: Dataset) -> Result<TradeTable> {
    let mut t = table.clone();

    drop_echo_columns(&mut t);
    blank_placeholders(&mut t);
    drop_empty_columns(&mut t);
    dedup_rows_ignoring(&mut t, "time");
    split_time(&mut t);
    drop_rows_missing(&mut t, dataset.required_columns());
    dedup_keep_last(&mut t, &dataset.key_columns());
    sort_rows(&mut t, &dataset.sort_columns());
    keep_deepest_commodity_level(&mut t, dataset.commodity_param());

    Ok(t)
}

/// Drop API-echo columns and any later duplicate of an earlier column name.
fn drop_echo_columns(t: &mut TradeTable) {
    let mut seen = HashSet::new();
    let keep: Vec<bool> = t
        .columns
        .iter()
        .map(|c| !ECHO_COLUMNS.contains(&c.as_str()) && seen.insert(c.clone()))
        .collect();
    retain_columns(t, &keep);
}

/// Normalize `-` and `00` placeholder cells to empty strings.
fn blank_placeholders(t: &mut TradeTable) {
    for row in &mut t.rows {
        for cell in row {
            if cell == "-" || cell == "00" {
                cell.clear();
            }
        }
    }
}

/// Drop columns that are entirely empty or entirely literal `0`. A blanked
/// placeholder counts as unknown, not zero, so a column mixing blanks with
/// `0` survives.
fn drop_empty_columns(t: &mut TradeTable) {
    let keep: Vec<bool> = (0..t.columns.len())
        .map(|i| {
            let mut any_value = false;
            let mut any_nonzero = false;
            for row in &t.rows {
                if !row[i].is_empty() {
                    any_value = true;
                }
                if row[i] != "0" {
                    any_nonzero = true;
                }
            }
            any_value && any_nonzero
        })
        .collect();
    retain_columns(t, &keep);
}

/// Drop duplicate rows, comparing every column except `ignore`.
fn dedup_rows_ignoring(t: &mut TradeTable, ignore: &str) {
    let skip = t.column_index(ignore);
    let mut seen = HashSet::new();
    t.rows.retain(|row| {
        let key: Vec<&str> = row
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != skip)
            .map(|(_, c)| c.as_str())
            .collect();
        seen.insert(key.join("\u{1f}"))
    });
}

/// Replace the `time` column (YYYY-MM) with YEAR and MONTH columns.
fn split_time(t: &mut TradeTable) {
    let Some(idx) = t.column_index("time") else {
        return;
    };
    for row in &mut t.rows {
        let time = row[idx].clone();
        let (year, month) = match time.split_once('-') {
            Some((y, m)) => (y.to_string(), m.to_string()),
            None => (time, String::new()),
        };
        row.remove(idx);
        row.push(year);
        row.push(month);
    }
    t.columns.remove(idx);
    t.columns.push("YEAR".into());
    t.columns.push("MONTH".into());
}

/// Drop rows with an empty cell in any of the named columns.
fn drop_rows_missing(t: &mut TradeTable, columns: &[&str]) {
    let idx: Vec<usize> = columns.iter().filter_map(|c| t.column_index(c)).collect();
    t.rows.retain(|row| idx.iter().all(|&i| !row[i].is_empty()));
}

/// Keep only the last row for each distinct key.
fn dedup_keep_last(t: &mut TradeTable, key_columns: &[&str]) {
    let idx: Vec<usize> = key_columns
        .iter()
        .filter_map(|c| t.column_index(c))
        .collect();
    if idx.is_empty() {
        return;
    }
    let mut seen = HashSet::new();
    let mut kept: Vec<Vec<String>> = Vec::new();
    for row in t.rows.iter().rev() {
        let key: Vec<&str> = idx.iter().map(|&i| row[i].as_str()).collect();
        if seen.insert(key.join("\u{1f}")) {
            kept.push(row.clone());
        }
    }
    kept.reverse();
    t.rows = kept;
}

/// Stable lexicographic sort on the named columns (missing ones ignored).
fn sort_rows(t: &mut TradeTable, columns: &[&str]) {
    let idx: Vec<usize> = columns.iter().filter_map(|c| t.column_index(c)).collect();
    t.rows.sort_by(|a, b| {
        idx.iter()
            .map(|&i| a[i].cmp(&b[i]))
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// A wildcard query returns rows at every rollup level; keep only the rows
/// at the deepest commodity level present.
fn keep_deepest_commodity_level(t: &mut TradeTable, commodity_column: &str) {
    let Some(idx) = t.column_index(commodity_column) else {
        return;
    };
    let Some(longest) = t.rows.iter().map(|r| r[idx].len()).max() else {
        return;
    };
    t.rows.retain(|r| r[idx].len() == longest);
}

fn retain_columns(t: &mut TradeTable, keep: &[bool]) {
    let mut i = 0;
    t.columns.retain(|_| {
        let k = keep[i];
        i += 1;
        k
    });
    for row in &mut t.rows {
        let mut i = 0;
        row.retain(|_| {
            let k = keep[i];
            i += 1;
            k
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> TradeTable {
        TradeTable {
            columns: columns.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn time_splits_into_year_and_month() {
        let mut t = table(&["A", "time"], &[&["x", "2020-07"]]);
        split_time(&mut t);
        assert_eq!(t.columns, vec!["A", "YEAR", "MONTH"]);
        assert_eq!(t.rows[0], vec!["x", "2020", "07"]);
    }

    #[test]
    fn placeholders_blank_and_empty_columns_drop() {
        let mut t = table(&["A", "B", "C"], &[&["1", "-", "0"], &["2", "00", "0"]]);
        blank_placeholders(&mut t);
        drop_empty_columns(&mut t);
        assert_eq!(t.columns, vec!["A"]);
    }

    #[test]
    fn column_mixing_blanks_and_zeros_survives() {
        let mut t = table(&["A", "B"], &[&["1", "-"], &["2", "0"]]);
        blank_placeholders(&mut t);
        drop_empty_columns(&mut t);
        assert_eq!(t.columns, vec!["A", "B"]);
    }

    #[test]
    fn keep_last_wins_on_duplicate_keys() {
        let mut t = table(
            &["I_COMMODITY", "YEAR", "V"],
            &[&["8517", "2020", "1"], &["8517", "2020", "2"]],
        );
        dedup_keep_last(&mut t, &["I_COMMODITY", "YEAR"]);
        assert_eq!(t.rows, vec![vec!["8517", "2020", "2"]]);
    }

    #[test]
    fn wildcard_filter_keeps_deepest_level() {
        let mut t = table(
            &["E_COMMODITY"],
            &[&["85"], &["8517"], &["8517620000"], &["8517130000"]],
        );
        keep_deepest_commodity_level(&mut t, "E_COMMODITY");
        assert_eq!(t.rows.len(), 2);
    }
}
