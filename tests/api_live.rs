//! Live tests against the real Census API. Opt-in: cargo test --features online

#![cfg(feature = "online")]

use census_trade::{Client, Dataset, Endpoint, Period, QuerySpec, TradeFlow};

#[test]
fn fetch_one_year_of_phone_imports() {
    let client = Client::default();
    let mut spec = QuerySpec::new(
        Dataset::new(TradeFlow::Imports, Endpoint::Hs),
        Period::new(2020, 2020).unwrap(),
    );
    spec.commodity_codes = Some(vec!["851762".into()]);
    spec.country_codes = Some(vec!["5700".into()]);

    let table = client.fetch(&spec).unwrap().expect("data for 2020");
    assert!(table.column_index("I_COMMODITY").is_some());
    assert!(table.column_index("time").is_some());
    assert!(!table.is_empty());
}
