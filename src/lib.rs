//! census-trade
//!
//! A lightweight Rust library for retrieving U.S. Census Bureau
//! international trade data. Pairs with the interactive `census-trade` CLI.
//!
//! ### Features
//! - Query the six trade timeseries datasets (imports/exports × HS, port,
//!   state) with commodity, geography and time filters
//! - Translate commodity, country, district, port and state names into API
//!   codes via a local reference dataset (with staleness-driven refresh of
//!   the HS concordance)
//! - Optional cleaning pass over the fetched rows
//! - CSV output, one file per year
//!
//! ### Example
//! ```no_run
//! use census_trade::{Client, Dataset, Endpoint, Period, QuerySpec, TradeFlow};
//!
//! let client = Client::default();
//! let mut spec = QuerySpec::new(
//!     Dataset::new(TradeFlow::Imports, Endpoint::Hs),
//!     Period::new(2019, 2020)?,
//! );
//! spec.commodity_codes = Some(vec!["8517*".into()]);
//! if let Some(table) = client.fetch(&spec)? {
//!     let cleaned = census_trade::clean::clean(&table, spec.dataset)?;
//!     census_trade::storage::save_csv(&cleaned, "phones.csv")?;
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod api;
pub mod clean;
pub mod models;
pub mod prompts;
pub mod reference;
pub mod storage;

pub use api::{call_params, CallParams, Client};
pub use models::{Dataset, Endpoint, Period, QuerySpec, TradeFlow, TradeTable};
pub use reference::ReferenceData;
