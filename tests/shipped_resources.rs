//! The reference files under resources/ must work in a fresh checkout.

use census_trade::{ReferenceData, TradeFlow};
use std::path::Path;

fn shipped() -> ReferenceData {
    ReferenceData::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("resources"))
}

#[test]
fn country_lookup_works_out_of_the_box() {
    let r = shipped();
    let m = r.country_matches("canada").unwrap();
    assert_eq!(m.len(), 1);
    assert_eq!(m[0].code, "1220");
    assert!(r.is_valid_country_code("5700").unwrap());
}

#[test]
fn district_and_port_lookups_work_out_of_the_box() {
    let r = shipped();
    let d = r.district_matches("houston").unwrap();
    assert_eq!(d[0].code, "53");
    let p = r.port_matches("long beach").unwrap();
    assert_eq!(p[0].code, "2709");
}

#[test]
fn state_lookup_works_out_of_the_box() {
    let r = shipped();
    assert_eq!(r.state_name("tx").unwrap().as_deref(), Some("Texas"));
}

#[test]
fn concordance_keyword_search_works_out_of_the_box() {
    let r = shipped();
    let imports = r.commodity_matches("smartphone", TradeFlow::Imports, 10).unwrap();
    assert!(!imports.is_empty());
    let exports = r.commodity_matches("soybean", TradeFlow::Exports, 10).unwrap();
    assert!(!exports.is_empty());
}
