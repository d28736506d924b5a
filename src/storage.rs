use crate::models::TradeTable;
use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::fs;
use std::path::{Path, PathBuf};

/// Save a whole table as CSV with header.
pub fn save_csv<P: AsRef<Path>>(table: &TradeTable, path: P) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_path(path.as_ref())?;
    wtr.write_record(&table.columns)?;
    for row in &table.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save one CSV per distinct year, named
/// `{descriptor}_{slug}_{year}_{raw|cleaned}.csv` under `dir`.
///
/// The year comes from the `YEAR` column when present (cleaned tables) and
/// otherwise from the year part of the `time` column (raw tables). Returns
/// the paths written.
pub fn save_by_year(
    table: &TradeTable,
    dir: &Path,
    descriptor: Option<&str>,
    slug: &str,
    cleaned: bool,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

    let year_of: Box<dyn Fn(&[String]) -> String> = match table.column_index("YEAR") {
        Some(i) => Box::new(move |row: &[String]| row[i].clone()),
        None => {
            let i = table
                .column_index("time")
                .ok_or_else(|| anyhow::anyhow!("table has neither YEAR nor time column"))?;
            Box::new(move |row: &[String]| {
                row[i].split('-').next().unwrap_or_default().to_string()
            })
        }
    };

    let mut years: Vec<String> = table.rows.iter().map(|r| year_of(r.as_slice())).collect();
    years.sort();
    years.dedup();

    let stem = match descriptor {
        Some(d) if !d.is_empty() => format!("{}_{}", sanitize(d), slug),
        _ => slug.to_string(),
    };
    let suffix = if cleaned { "cleaned" } else { "raw" };

    let mut written = Vec::new();
    for year in years {
        let mut yearly = TradeTable::new(table.columns.clone());
        yearly.rows.extend(
            table
                .rows
                .iter()
                .filter(|r| year_of(r.as_slice()) == year)
                .cloned(),
        );
        let path = dir.join(format!("{}_{}_{}.csv", stem, year, suffix));
        save_csv(&yearly, &path).with_context(|| format!("write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// Keep file names shell-friendly: spaces become underscores, anything
/// outside `[A-Za-z0-9._-]` is dropped.
fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> TradeTable {
        TradeTable {
            columns: vec!["I_COMMODITY".into(), "GEN_VAL_YR".into(), "time".into()],
            rows: vec![
                vec!["8517".into(), "100".into(), "2019-12".into()],
                vec!["8517".into(), "120".into(), "2020-12".into()],
            ],
        }
    }

    #[test]
    fn writes_one_file_per_year() {
        let dir = tempdir().unwrap();
        let paths = save_by_year(&sample(), dir.path(), Some("phones"), "imp_hs", false).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(dir.path().join("phones_imp_hs_2019_raw.csv").exists());
        assert!(dir.path().join("phones_imp_hs_2020_raw.csv").exists());
    }

    #[test]
    fn descriptor_is_sanitized() {
        assert_eq!(sanitize("mobile phones"), "mobile_phones");
        assert_eq!(sanitize("a/b:c"), "abc");
    }
}
