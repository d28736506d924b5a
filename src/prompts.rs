//! Interactive prompts using dialoguer.
//!
//! Every prompt re-asks on invalid input rather than failing; the only hard
//! exits are the explicit "quit" answers, surfaced as [`Cancelled`] so the
//! binary can say goodbye and stop cleanly.

use crate::models::{Dataset, Endpoint, Period, TradeFlow};
use crate::reference::{CodeMatch, ReferenceData};
use anyhow::Result;
use dialoguer::{Confirm, Input};
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

/// The user chose to quit instead of answering.
#[derive(Debug, thiserror::Error)]
#[error("cancelled by user")]
pub struct Cancelled;

const KEY_SIGNUP_URL: &str = "https://api.census.gov/data/key_signup.html";

/// Prompt for a Yes/No response.
pub fn confirm(message: &str) -> Result<bool> {
    let confirmed = Confirm::new()
        .with_prompt(message)
        .default(true)
        .interact()?;
    Ok(confirmed)
}

fn input(message: &str) -> Result<String> {
    let value: String = Input::new()
        .with_prompt(message)
        .allow_empty(true)
        .interact_text()?;
    Ok(value.trim().to_string())
}

/// Census API keys are exactly 40 characters.
pub fn valid_api_key(key: &str) -> bool {
    key.len() == 40
}

/// Optional API key, with the original sign-up nudge for users without one.
pub fn api_key() -> Result<Option<String>> {
    let have_key = confirm("Do you have an API key? (Yes/No)")?;
    if !have_key {
        println!("To increase your daily API call limit, an API key is recommended.");
        println!("You can obtain a 40-character key at {}.", KEY_SIGNUP_URL);
        if confirm("Would you like to proceed without an API key? (Yes/No)")? {
            println!("Continuing without an API key. You may be limited to 500 calls per day.");
            return Ok(None);
        }
        if confirm("Would you like to quit the program? (Yes/No)")? {
            return Err(Cancelled.into());
        }
    }
    loop {
        let key = input("Enter your API key, or leave blank to proceed without one")?;
        if key.is_empty() {
            println!("Continuing without an API key. You may be limited to 500 calls per day.");
            return Ok(None);
        }
        if valid_api_key(&key) {
            println!("API key accepted.");
            return Ok(Some(key));
        }
        println!("Invalid API key: expected exactly 40 characters.");
    }
}

/// Import or export, with forgiving aliases.
pub fn trade_flow() -> Result<TradeFlow> {
    loop {
        let answer = input("Would you like to retrieve import or export data? (Import/Export)")?
            .to_lowercase();
        match answer.as_str() {
            "i" | "imp" | "import" | "imports" => return Ok(TradeFlow::Imports),
            "e" | "exp" | "export" | "exports" => return Ok(TradeFlow::Exports),
            _ => println!("Invalid entry. Please enter either 'import' or 'export'."),
        }
    }
}

/// HS, port or state endpoint, with forgiving aliases.
pub fn endpoint() -> Result<Endpoint> {
    loop {
        let answer =
            input("Would you like to pull data from the HS, port or state endpoint? (hs/port/state)")?
                .to_lowercase();
        match answer.as_str() {
            "h" | "hs" | "code" | "hs code" => return Ok(Endpoint::Hs),
            "p" | "port" | "ports" => return Ok(Endpoint::Port),
            "s" | "st" | "state" => return Ok(Endpoint::State),
            _ => println!("Invalid entry. Please enter 'hs', 'port' or 'state'."),
        }
    }
}

/// HS code shape per endpoint: 2/4/6 digits with optional `*`, or an exact
/// 10-digit code on the HS endpoint; 2/4 digits with optional `*`, or an
/// exact 6-digit code elsewhere.
pub fn valid_code_format(codes: &[String], endpoint: Endpoint) -> bool {
    static HS: OnceLock<Regex> = OnceLock::new();
    static PORT: OnceLock<Regex> = OnceLock::new();
    let re = match endpoint {
        Endpoint::Hs => HS.get_or_init(|| {
            Regex::new(r"^((\d{2}|\d{4}|\d{6})\*?|\d{10})$").expect("hs code pattern")
        }),
        _ => PORT.get_or_init(|| {
            Regex::new(r"^((\d{2}|\d{4})\*?|\d{6})$").expect("port code pattern")
        }),
    };
    !codes.is_empty() && codes.iter().all(|c| re.is_match(c))
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Direct HS code entry with format validation; `q` quits.
fn hs_codes_input(endpoint: Endpoint) -> Result<Vec<String>> {
    println!("You may enter 2, 4, 6 or 10-digit codes when pulling data by HS code.");
    println!("When pulling data by port or state you may enter 2, 4 or 6-digit codes.");
    println!("The wildcard '*' matches all codes starting with the digits you enter,");
    println!("e.g. '85*' returns every HS code beginning with 85.");
    loop {
        let answer = input("Enter the HS codes you want, separated by commas (or q to quit)")?;
        if answer.eq_ignore_ascii_case("q") {
            return Err(Cancelled.into());
        }
        let codes = split_list(&answer);
        if valid_code_format(&codes, endpoint) {
            return Ok(codes);
        }
        println!("One or more codes are in an incorrect format. Please try again.");
    }
}

fn hs_level(endpoint: Endpoint) -> Result<u8> {
    let valid = endpoint.valid_hs_levels();
    loop {
        let answer = input(&format!(
            "Enter a Harmonized System level ({}) or press Enter for the default",
            valid
                .iter()
                .map(|l| l.to_string())
                .collect::<Vec<_>>()
                .join("/")
        ))?;
        if answer.is_empty() {
            return Ok(endpoint.default_hs_level());
        }
        if let Ok(level) = answer.parse::<u8>() {
            if valid.contains(&level) {
                return Ok(level);
            }
        }
        println!("Invalid entry. Please enter a valid Harmonized System level.");
    }
}

/// Keyword search of the local concordance, with HS-level choice, optional
/// wildcard suffixing, and subset selection. A missing or unreadable
/// concordance degrades to an empty result rather than ending the run.
fn concordance_search(
    reference: &ReferenceData,
    commodity: &str,
    dataset: Dataset,
) -> Result<Vec<String>> {
    let level = hs_level(dataset.endpoint)?;
    println!("Searching the local database for HS codes related to '{}'...", commodity);
    if let Err(e) = reference.refresh_concordance(dataset.flow) {
        log::warn!("concordance refresh failed: {:#}", e);
    }

    let matches = match reference.commodity_matches(commodity, dataset.flow, level) {
        Ok(m) => m,
        Err(e) => {
            println!("Could not search the local HS code files: {:#}", e);
            return Ok(Vec::new());
        }
    };
    if matches.is_empty() {
        println!("No matches found for '{}'.", commodity);
        return Ok(Vec::new());
    }

    let deepest = *dataset.endpoint.valid_hs_levels().last().unwrap_or(&10);
    let wildcard = level < deepest
        && confirm("Use the wildcard '*' to retrieve all data beginning with these codes? (Yes/No)")?;

    let mut codes = Vec::new();
    for m in &matches {
        let code = if wildcard {
            format!("{}*", m.code)
        } else {
            m.code.clone()
        };
        println!("{}\t{}", code, m.description);
        codes.push(code);
    }

    let answer = input(
        "Press Enter to use all the codes listed above, or enter specific codes separated by commas",
    )?;
    if !answer.is_empty() {
        codes = split_list(&answer);
    }
    Ok(codes)
}

/// The full commodity selection flow. Returns the code list (if any) and the
/// commodity name used as the output-file descriptor.
pub fn commodity_selection(
    reference: &ReferenceData,
    dataset: Dataset,
) -> Result<(Option<Vec<String>>, Option<String>)> {
    let commodity =
        input("Enter the name of a commodity to query, or press Enter to continue without one")?;
    if commodity.is_empty() {
        return Ok((None, None));
    }

    if confirm("Do you have the HS codes for your desired commodity? (Yes/No)")? {
        let codes = hs_codes_input(dataset.endpoint)?;
        return Ok((Some(codes), Some(commodity)));
    }

    if confirm("Would you like to search the local files for HS codes related to your commodity? (Yes/No)")? {
        let codes = concordance_search(reference, &commodity, dataset)?;
        if codes.is_empty() {
            if confirm("Would you like to enter the HS codes directly instead? (Yes/No)")? {
                let codes = hs_codes_input(dataset.endpoint)?;
                return Ok((Some(codes), Some(commodity)));
            }
            return Ok((None, Some(commodity)));
        }
        return Ok((Some(codes), Some(commodity)));
    }

    println!("You may look up import codes at https://dataweb.usitc.gov/tariff/database");
    println!("and export codes at https://uscensus.prod.3ceonline.com/");
    if confirm("Would you like to enter the HS codes now? (Yes/No)")? {
        let codes = hs_codes_input(dataset.endpoint)?;
        return Ok((Some(codes), Some(commodity)));
    }
    if confirm("Would you like to quit the program? (Yes/No)")? {
        return Err(Cancelled.into());
    }
    println!("Continuing without specifying a commodity.");
    Ok((None, None))
}

/// Result of searching the reference files for one comma-separated answer.
#[derive(Debug, PartialEq, Eq)]
pub enum LookupOutcome {
    /// Every name matched; codes ready for selection.
    Matches(Vec<CodeMatch>),
    /// At least one name had no match; ask again.
    NoneFound,
    /// The reference file could not be read; the filter is skipped entirely
    /// rather than ending the run.
    Unavailable,
}

/// Look up each name, reporting misses and degrading a failed reference
/// read to [`LookupOutcome::Unavailable`].
pub fn gather_matches(
    names: &[String],
    lookup: impl Fn(&str) -> Result<Vec<CodeMatch>>,
) -> LookupOutcome {
    let mut matches: Vec<CodeMatch> = Vec::new();
    let mut missing = false;
    for name in names {
        match lookup(name) {
            Ok(found) => {
                if found.is_empty() {
                    println!("No matches found for '{}'.", name);
                    missing = true;
                }
                for m in found {
                    if !matches.contains(&m) {
                        matches.push(m);
                    }
                }
            }
            Err(e) => {
                println!("Could not search the local reference files: {:#}", e);
                return LookupOutcome::Unavailable;
            }
        }
    }
    if missing || matches.is_empty() {
        LookupOutcome::NoneFound
    } else {
        LookupOutcome::Matches(matches)
    }
}

/// Print matches and let the user take them all or a validated subset.
fn select_codes(
    matches: &[CodeMatch],
    is_valid: impl Fn(&str) -> Result<bool>,
) -> Result<Vec<String>> {
    for m in matches {
        println!("{}\t{}", m.name, m.code);
    }
    loop {
        let answer = input(
            "Press Enter to use all the codes listed above, or enter specific codes separated by commas",
        )?;
        if answer.is_empty() {
            return Ok(matches.iter().map(|m| m.code.clone()).collect());
        }
        let codes = split_list(&answer);
        let mut all_valid = true;
        for code in &codes {
            if !is_valid(code)? {
                all_valid = false;
                break;
            }
        }
        if all_valid {
            return Ok(codes);
        }
        println!("One or more of the codes entered is invalid. Please try again.");
    }
}

fn geography_filter(
    what: &str,
    prompt: &str,
    lookup: impl Fn(&str) -> Result<Vec<CodeMatch>>,
    is_valid: impl Fn(&str) -> Result<bool>,
) -> Result<Option<Vec<String>>> {
    loop {
        let answer = input(prompt)?;
        if answer.is_empty() {
            return Ok(None);
        }
        match gather_matches(&split_list(&answer), &lookup) {
            LookupOutcome::Matches(matches) => {
                let codes = select_codes(&matches, &is_valid)?;
                println!("Data will be requested for {} codes: {:?}", what, codes);
                return Ok(Some(codes));
            }
            LookupOutcome::NoneFound => continue,
            LookupOutcome::Unavailable => {
                println!("Continuing without a {} filter.", what);
                return Ok(None);
            }
        }
    }
}

/// Optional country filter: substring search of `country.csv`.
pub fn countries(reference: &ReferenceData) -> Result<Option<Vec<String>>> {
    geography_filter(
        "country",
        "Enter the name of a country (or countries, comma-separated), or press Enter to skip",
        |n| reference.country_matches(n),
        |c| reference.is_valid_country_code(c),
    )
}

/// Optional customs-district filter (HS endpoint only).
pub fn districts(reference: &ReferenceData) -> Result<Option<Vec<String>>> {
    geography_filter(
        "district",
        "Enter the name of a district (or districts, comma-separated), or press Enter to skip",
        |n| reference.district_matches(n),
        |c| reference.is_valid_district_code(c),
    )
}

/// Optional port filter (port endpoint only).
pub fn ports(reference: &ReferenceData) -> Result<Option<Vec<String>>> {
    geography_filter(
        "port",
        "Enter the name of a port (or ports, comma-separated), or press Enter to skip",
        |n| reference.port_matches(n),
        |c| reference.is_valid_port_code(c),
    )
}

/// Optional state filter (state endpoint only): two-letter abbreviations
/// validated against `states.csv`.
pub fn states(reference: &ReferenceData) -> Result<Option<Vec<String>>> {
    loop {
        let answer = input(
            "Enter two-letter state abbreviations (comma-separated), or press Enter to skip",
        )?;
        if answer.is_empty() {
            return Ok(None);
        }
        let mut abbrs = Vec::new();
        let mut all_valid = true;
        for abbr in split_list(&answer) {
            let abbr = abbr.to_uppercase();
            match reference.state_name(&abbr) {
                Ok(Some(name)) => {
                    println!("Data for {} will be requested.", name);
                    abbrs.push(abbr);
                }
                Ok(None) => {
                    println!("Invalid state: '{}'.", abbr);
                    all_valid = false;
                }
                Err(e) => {
                    println!("Could not read the local state file: {:#}", e);
                    println!("Continuing without a state filter.");
                    return Ok(None);
                }
            }
        }
        if all_valid && !abbrs.is_empty() {
            return Ok(Some(abbrs));
        }
    }
}

fn year(message: &str) -> Result<i32> {
    loop {
        let answer = input(message)?;
        if answer.len() == 4 {
            if let Ok(y) = answer.parse::<i32>() {
                return Ok(y);
            }
        }
        println!("Invalid input. Please enter a 4-digit year.");
    }
}

/// Inclusive year range; re-prompts until start <= end.
pub fn period() -> Result<Period> {
    println!("What time period would you like to pull data for?");
    loop {
        let start = year("Enter the 4-digit year to start from (e.g. 2010)")?;
        let end = year("Enter the 4-digit year to end at (e.g. 2020)")?;
        match Period::new(start, end) {
            Ok(p) => return Ok(p),
            Err(_) => {
                println!("The start year cannot be greater than the end year. Please enter the years again.")
            }
        }
    }
}

/// Output directory, defaulting to `saved_data`.
pub fn output_dir() -> Result<PathBuf> {
    if confirm("Would you like to save the data to a specific directory? (Yes/No)")? {
        let dir = input("Enter the directory where you would like to save the data")?;
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    Ok(PathBuf::from("saved_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn hs_endpoint_accepts_wildcards_and_ten_digits() {
        assert!(valid_code_format(&codes(&["85*", "8517", "8517620000"]), Endpoint::Hs));
        assert!(!valid_code_format(&codes(&["851"]), Endpoint::Hs));
        assert!(!valid_code_format(&codes(&["8517620000*"]), Endpoint::Hs));
    }

    #[test]
    fn port_endpoint_caps_at_six_digits() {
        assert!(valid_code_format(&codes(&["85*", "851762"]), Endpoint::Port));
        assert!(!valid_code_format(&codes(&["8517620000"]), Endpoint::Port));
        assert!(!valid_code_format(&codes(&["851762*"]), Endpoint::State));
    }

    #[test]
    fn api_key_length_check() {
        assert!(valid_api_key(&"x".repeat(40)));
        assert!(!valid_api_key("short"));
    }

    #[test]
    fn lookup_error_degrades_instead_of_propagating() {
        let names = codes(&["china"]);
        let outcome = gather_matches(&names, |_| {
            Err(crate::reference::ReferenceError::Missing("country.csv".into()).into())
        });
        assert_eq!(outcome, LookupOutcome::Unavailable);
    }

    #[test]
    fn unmatched_name_asks_again() {
        let names = codes(&["atlantis"]);
        let outcome = gather_matches(&names, |_| Ok(Vec::new()));
        assert_eq!(outcome, LookupOutcome::NoneFound);
    }

    #[test]
    fn matches_deduplicate_across_names() {
        let names = codes(&["los angeles", "long beach"]);
        let outcome = gather_matches(&names, |_| {
            Ok(vec![CodeMatch {
                name: "Los Angeles CA".into(),
                code: "27".into(),
            }])
        });
        match outcome {
            LookupOutcome::Matches(m) => assert_eq!(m.len(), 1),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
