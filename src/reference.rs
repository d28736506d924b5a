//! Local reference datasets used to translate names the user types into the
//! codes the API understands.
//!
//! Everything lives as string-typed CSV under one resources directory
//! (leading zeros in codes are significant):
//! - `country.csv` (`Name,Code`)
//! - `district_port.csv` (`Name,District,Port`)
//! - `states.csv` (`State,Abbreviation`)
//! - `import_codes.csv` / `export_codes.csv` (`hts10,description_long`),
//!   the commodity concordance, refreshed from its remote source when the
//!   local copy is more than 30 days old.

use crate::models::TradeFlow;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Refresh the concordance once the local copy is older than this.
pub const CONCORDANCE_MAX_AGE_DAYS: i64 = 30;

/// Remote location of the concordance CSVs. No default: the upstream USITC
/// concordance is published as an xlsb workbook, so re-downloads only run
/// against a mirror that serves the files as CSV.
const CONCORDANCE_URL_VAR: &str = "CENSUS_TRADE_CONCORDANCE_URL";

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("reference file not found: {0}")]
    Missing(PathBuf),
    #[error("reference file {path} has no column named {column}")]
    MissingColumn { path: PathBuf, column: String },
}

/// A name/code pair matched from a reference file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeMatch {
    pub name: String,
    pub code: String,
}

/// A concordance hit: HS code (truncated to the requested level) and its
/// long description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommodityMatch {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct ReferenceData {
    dir: PathBuf,
    concordance_url: Option<String>,
}

impl ReferenceData {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            concordance_url: std::env::var(CONCORDANCE_URL_VAR).ok(),
        }
    }

    /// Set the remote concordance location explicitly.
    pub fn with_concordance_url<S: Into<String>>(mut self, url: S) -> Self {
        self.concordance_url = Some(url.into());
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Read the named columns of a reference CSV as string records.
    fn read_columns(&self, file: &str, columns: &[&str]) -> Result<Vec<Vec<String>>> {
        let path = self.path(file);
        if !path.exists() {
            return Err(ReferenceError::Missing(path).into());
        }
        let mut rdr = csv::Reader::from_path(&path)
            .with_context(|| format!("open {}", path.display()))?;
        let headers = rdr.headers().context("read csv header")?.clone();
        let mut idx = Vec::with_capacity(columns.len());
        for col in columns {
            let i = headers.iter().position(|h| h == *col).ok_or_else(|| {
                ReferenceError::MissingColumn {
                    path: path.clone(),
                    column: (*col).to_string(),
                }
            })?;
            idx.push(i);
        }
        let mut out = Vec::new();
        for record in rdr.records() {
            let record = record.with_context(|| format!("read {}", path.display()))?;
            out.push(
                idx.iter()
                    .map(|&i| record.get(i).unwrap_or_default().to_string())
                    .collect(),
            );
        }
        Ok(out)
    }

    /// Countries whose name contains `name` (case-insensitive).
    pub fn country_matches(&self, name: &str) -> Result<Vec<CodeMatch>> {
        let rows = self.read_columns("country.csv", &["Name", "Code"])?;
        Ok(filter_matches(rows, name))
    }

    pub fn is_valid_country_code(&self, code: &str) -> Result<bool> {
        let rows = self.read_columns("country.csv", &["Name", "Code"])?;
        Ok(rows.iter().any(|r| r[1] == code))
    }

    /// Customs districts whose name contains `name`.
    pub fn district_matches(&self, name: &str) -> Result<Vec<CodeMatch>> {
        let rows = self.read_columns("district_port.csv", &["Name", "District"])?;
        Ok(filter_matches(rows, name))
    }

    pub fn is_valid_district_code(&self, code: &str) -> Result<bool> {
        let rows = self.read_columns("district_port.csv", &["Name", "District"])?;
        Ok(rows.iter().any(|r| r[1] == code))
    }

    /// Ports whose name contains `name`.
    pub fn port_matches(&self, name: &str) -> Result<Vec<CodeMatch>> {
        let rows = self.read_columns("district_port.csv", &["Name", "Port"])?;
        Ok(filter_matches(rows, name))
    }

    pub fn is_valid_port_code(&self, code: &str) -> Result<bool> {
        let rows = self.read_columns("district_port.csv", &["Name", "Port"])?;
        Ok(rows.iter().any(|r| r[1] == code))
    }

    /// Full state name for a two-letter abbreviation, if valid.
    pub fn state_name(&self, abbr: &str) -> Result<Option<String>> {
        let rows = self.read_columns("states.csv", &["State", "Abbreviation"])?;
        let abbr = abbr.to_uppercase();
        Ok(rows
            .into_iter()
            .find(|r| r[1].to_uppercase() == abbr)
            .map(|r| r[0].clone()))
    }

    fn concordance_file(flow: TradeFlow) -> &'static str {
        match flow {
            TradeFlow::Imports => "import_codes.csv",
            TradeFlow::Exports => "export_codes.csv",
        }
    }

    /// Concordance rows whose long description contains `keyword`, with the
    /// 10-digit code truncated to `level` digits and de-duplicated (first
    /// description wins).
    pub fn commodity_matches(
        &self,
        keyword: &str,
        flow: TradeFlow,
        level: u8,
    ) -> Result<Vec<CommodityMatch>> {
        let rows =
            self.read_columns(Self::concordance_file(flow), &["hts10", "description_long"])?;
        let needle = keyword.to_lowercase();
        let mut out: Vec<CommodityMatch> = Vec::new();
        for row in rows {
            if !row[1].to_lowercase().contains(&needle) {
                continue;
            }
            let code: String = row[0].chars().take(level as usize).collect();
            if out.iter().any(|m| m.code == code) {
                continue;
            }
            out.push(CommodityMatch {
                code,
                description: row[1].clone(),
            });
        }
        Ok(out)
    }

    /// Re-download the concordance for `flow` when the local copy is missing
    /// or stale and a remote source is configured (the
    /// `CENSUS_TRADE_CONCORDANCE_URL` environment variable or
    /// [`with_concordance_url`](Self::with_concordance_url)). A failed
    /// download — or no configured source — degrades to whatever copy exists.
    pub fn refresh_concordance(&self, flow: TradeFlow) -> Result<()> {
        let file = Self::concordance_file(flow);
        let path = self.path(file);
        if path.exists() && !is_stale(&path)? {
            return Ok(());
        }
        let Some(base) = &self.concordance_url else {
            log::debug!("no concordance source configured; using the local copy");
            return Ok(());
        };
        if path.exists() {
            println!(
                "The local HS code file is more than {} days old; updating it now.",
                CONCORDANCE_MAX_AGE_DAYS
            );
        }
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create {}", self.dir.display()))?;

        let url = format!("{}/{}", base, file);
        match download(&url) {
            Ok(body) => {
                fs::write(&path, body).with_context(|| format!("write {}", path.display()))?;
                println!("Updated HS code file saved to {}", path.display());
            }
            Err(e) => {
                log::warn!("concordance refresh failed, keeping local copy: {:#}", e);
            }
        }
        Ok(())
    }
}

fn filter_matches(rows: Vec<Vec<String>>, name: &str) -> Vec<CodeMatch> {
    let needle = name.to_lowercase();
    let mut out: Vec<CodeMatch> = Vec::new();
    for row in rows {
        if row[0].to_lowercase().contains(&needle) && !out.iter().any(|m| m.code == row[1]) {
            out.push(CodeMatch {
                name: row[0].clone(),
                code: row[1].clone(),
            });
        }
    }
    out
}

/// Whether a local concordance copy is older than the refresh window.
fn is_stale(path: &Path) -> Result<bool> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .with_context(|| format!("stat {}", path.display()))?;
    let modified: DateTime<Utc> = modified.into();
    Ok(stale_at(modified, Utc::now()))
}

/// Pure staleness predicate: stale once `now - modified` exceeds the window.
pub fn stale_at(modified: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - modified > Duration::days(CONCORDANCE_MAX_AGE_DAYS)
}

fn download(url: &str) -> Result<Vec<u8>> {
    let http = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .user_agent(concat!("census_trade/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("reqwest client build")?;
    let resp = http.get(url).send().with_context(|| format!("GET {}", url))?;
    if !resp.status().is_success() {
        anyhow::bail!("download failed with HTTP {}", resp.status());
    }
    Ok(resp.bytes().context("read body")?.to_vec())
}
