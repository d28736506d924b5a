use anyhow::Result;
use census_trade::prompts::{self, Cancelled};
use census_trade::{clean, storage, Client, Dataset, Endpoint, QuerySpec, ReferenceData};
use clap::Parser;
use std::path::PathBuf;

/// Interactive client for the US Census Bureau international trade API.
///
/// All query parameters are gathered through prompts; there are no query
/// flags. The reference dataset location can be overridden with the
/// CENSUS_TRADE_RESOURCES environment variable (default: ./resources).
#[derive(Parser, Debug)]
#[command(name = "census-trade", version, about)]
struct Cli {}

fn resources_dir() -> PathBuf {
    std::env::var_os("CENSUS_TRADE_RESOURCES")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("resources"))
}

fn main() -> Result<()> {
    env_logger::init();
    let _cli = Cli::parse();

    match run() {
        Err(e) if e.downcast_ref::<Cancelled>().is_some() => {
            println!("Thank you for using the US Census International Trade API program. Goodbye!");
            Ok(())
        }
        other => other,
    }
}

fn run() -> Result<()> {
    println!("Welcome to the US Census International Trade API program!");
    println!("This tool allows you to access and save international trade data.");
    println!();

    let reference = ReferenceData::new(resources_dir());

    let api_key = prompts::api_key()?;
    let flow = prompts::trade_flow()?;
    let endpoint = prompts::endpoint()?;
    let dataset = Dataset::new(flow, endpoint);

    let (commodity_codes, commodity) = prompts::commodity_selection(&reference, dataset)?;
    let country_codes = prompts::countries(&reference)?;
    let district_codes = match endpoint {
        Endpoint::Hs => prompts::districts(&reference)?,
        _ => None,
    };
    let port_codes = match endpoint {
        Endpoint::Port => prompts::ports(&reference)?,
        _ => None,
    };
    let states = match endpoint {
        Endpoint::State => prompts::states(&reference)?,
        _ => None,
    };

    let period = prompts::period()?;

    let mut spec = QuerySpec::new(dataset, period);
    spec.api_key = api_key;
    spec.commodity_codes = commodity_codes;
    spec.country_codes = country_codes;
    spec.district_codes = district_codes;
    spec.port_codes = port_codes;
    spec.states = states;

    println!();
    println!("Note: the API handles many small calls better than one large one,");
    println!("so the query is broken up per code and year and the output combined.");
    println!();

    let client = Client::default();
    let table = match client.fetch(&spec)? {
        Some(t) => t,
        None => {
            println!("No data was found for the specified parameters. Please review any error messages above and try again.");
            return Ok(());
        }
    };
    println!("Data was successfully retrieved! ({} rows)", table.len());

    let out_dir = prompts::output_dir()?;
    let slug = dataset.slug();
    let descriptor = commodity.as_deref();

    if prompts::confirm("Would you like to clean the data before saving to CSV? (Yes/No)")? {
        let cleaned = clean::clean(&table, dataset)?;
        storage::save_by_year(&table, &out_dir, descriptor, slug, false)?;
        let written = storage::save_by_year(&cleaned, &out_dir, descriptor, slug, true)?;
        for path in &written {
            println!("Saved {}", path.display());
        }
    } else {
        println!("Data will be saved as is.");
        let written = storage::save_by_year(&table, &out_dir, descriptor, slug, false)?;
        for path in &written {
            println!("Saved {}", path.display());
        }
    }

    Ok(())
}
