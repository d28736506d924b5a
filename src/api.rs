//! Synchronous client for the Census **international trade timeseries API**.
//!
//! One run expands a [`QuerySpec`] into individual GET calls (one per
//! commodity code, year, and geography combination — the API rejects very
//! large single calls) and merges the array-of-arrays JSON responses into a
//! single [`TradeTable`].
//!
//! ### Notes
//! - The API answers errors either with a non-2xx status or with a plain
//!   text body; both are surfaced with the offending URL.
//! - Network timeouts use a sane default (30s total, 10s connect).
//!
//! Typical usage:
//! ```no_run
//! # use census_trade::{Client, Dataset, Endpoint, Period, QuerySpec, TradeFlow};
//! let client = Client::default();
//! let spec = QuerySpec::new(
//!     Dataset::new(TradeFlow::Imports, Endpoint::Hs),
//!     Period::new(2019, 2020)?,
//! );
//! let table = client.fetch(&spec)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::models::{QuerySpec, TradeTable};
use anyhow::{bail, Context, Result};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Client {
    pub base_url: String,
    http: HttpClient,
}

impl Default for Client {
    fn default() -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30)) // total request timeout
            .connect_timeout(Duration::from_secs(10)) // connect timeout
            .redirect(Policy::limited(5)) // cap redirects
            .user_agent(concat!("census_trade/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("reqwest client build");
        Self {
            base_url: "https://api.census.gov/data/timeseries/intltrade".into(),
            http,
        }
    }
}

// Allow -, _, . and the HS wildcard '*' unescaped in query values.
const SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'*');

fn enc(s: &str) -> String {
    percent_encoding::utf8_percent_encode(s.trim(), SAFE).to_string()
}

/// Parameters of a single GET call after combination expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallParams {
    pub commodity: Option<String>,
    pub year: i32,
    pub country: Option<String>,
    pub district: Option<String>,
    pub port: Option<String>,
    pub state: Option<String>,
}

/// Expand the optional code lists of a spec into the cartesian product of
/// individual calls. A `None` list contributes a single unconstrained slot.
pub fn call_params(spec: &QuerySpec) -> Vec<CallParams> {
    fn slots(list: &Option<Vec<String>>) -> Vec<Option<String>> {
        match list {
            Some(codes) if !codes.is_empty() => codes.iter().cloned().map(Some).collect(),
            _ => vec![None],
        }
    }

    let mut out = Vec::new();
    for commodity in slots(&spec.commodity_codes) {
        for year in spec.period.years() {
            for country in slots(&spec.country_codes) {
                for district in slots(&spec.district_codes) {
                    for port in slots(&spec.port_codes) {
                        for state in slots(&spec.states) {
                            out.push(CallParams {
                                commodity: commodity.clone(),
                                year,
                                country: country.clone(),
                                district: district.clone(),
                                port: port.clone(),
                                state: state.clone(),
                            });
                        }
                    }
                }
            }
        }
    }
    out
}

impl Client {
    /// Build the full request URL for one call. Pure string construction so
    /// tests can assert URL equality without touching the network.
    pub fn query_url(&self, spec: &QuerySpec, call: &CallParams) -> String {
        let dataset = spec.dataset;
        let mut url = format!(
            "{}/{}?get={}&SUMMARY_LVL=DET",
            self.base_url,
            dataset.base_path(),
            dataset.get_fields()
        );
        if let Some(code) = &call.commodity {
            url.push_str(&format!("&{}={}", dataset.commodity_param(), enc(code)));
        }
        url.push_str(&format!("&time={}", call.year));
        if let Some(cty) = &call.country {
            url.push_str(&format!("&CTY_CODE={}", enc(cty)));
        }
        if let Some(dist) = &call.district {
            url.push_str(&format!("&DISTRICT={}", enc(dist)));
        }
        if let Some(port) = &call.port {
            url.push_str(&format!("&PORT={}", enc(port)));
        }
        if let Some(st) = &call.state {
            url.push_str(&format!("&STATE={}", enc(st)));
        }
        if let Some(key) = &spec.api_key {
            url.push_str(&format!("&key={}", enc(key)));
        }
        url
    }

    /// Fetch every call of the spec and merge the results.
    ///
    /// A failed call is reported and skipped so a long multi-call run keeps
    /// its partial results; `Ok(None)` means every call came back empty or
    /// failed.
    pub fn fetch(&self, spec: &QuerySpec) -> Result<Option<TradeTable>> {
        // Small retry for transient failures (5xx / network errors).
        let get_json = |u: &str| -> Result<Value> {
            let mut last_err: Option<anyhow::Error> = None;
            for backoff_ms in [100u64, 300, 700] {
                match self.http.get(u).send() {
                    Ok(r) if r.status().is_success() => {
                        return r.json().context("decode json");
                    }
                    Ok(r) if r.status().is_server_error() => { /* retry */ }
                    Ok(r) => bail!("request failed with HTTP {}", r.status()),
                    Err(e) => last_err = Some(e.into()),
                }
                std::thread::sleep(Duration::from_millis(backoff_ms));
            }
            bail!("network error: {:?}", last_err);
        };

        let calls = call_params(spec);
        let mut merged: Option<TradeTable> = None;
        for call in &calls {
            let url = self.query_url(spec, call);
            log::debug!("GET {}", url);
            let v = match get_json(&url).with_context(|| format!("GET {}", url)) {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("call failed, skipping: {:#}", e);
                    eprintln!("API request failed: {:#}", e);
                    continue;
                }
            };
            // The API also reports errors in 200-status bodies (non-array
            // JSON); treat those like any other failed call.
            let table = match TradeTable::from_json(&v).with_context(|| format!("parse {}", url)) {
                Ok(t) => t,
                Err(e) => {
                    log::warn!("call failed, skipping: {:#}", e);
                    eprintln!("API response could not be parsed: {:#}", e);
                    continue;
                }
            };
            match merged.as_mut() {
                Some(t) => {
                    if let Err(e) = t.merge(table) {
                        log::warn!("call failed, skipping: {:#}", e);
                        eprintln!("API response columns did not match, skipping: {:#}", e);
                    }
                }
                None => merged = Some(table),
            }
        }

        Ok(merged.filter(|t| !t.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dataset, Endpoint, Period, TradeFlow};

    #[test]
    fn expansion_is_cartesian_over_codes_and_years() {
        let mut spec = QuerySpec::new(
            Dataset::new(TradeFlow::Imports, Endpoint::Hs),
            Period::new(2019, 2020).unwrap(),
        );
        spec.commodity_codes = Some(vec!["8517".into(), "85*".into()]);
        spec.country_codes = Some(vec!["5700".into()]);
        let calls = call_params(&spec);
        assert_eq!(calls.len(), 2 * 2);
        assert!(calls.iter().all(|c| c.country.as_deref() == Some("5700")));
    }

    #[test]
    fn unconstrained_spec_yields_one_call_per_year() {
        let spec = QuerySpec::new(
            Dataset::new(TradeFlow::Exports, Endpoint::State),
            Period::new(2020, 2022).unwrap(),
        );
        let calls = call_params(&spec);
        assert_eq!(calls.len(), 3);
        assert!(calls[0].commodity.is_none());
    }
}
