use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Direction of trade to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeFlow {
    Imports,
    Exports,
}

impl TradeFlow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeFlow::Imports => "imports",
            TradeFlow::Exports => "exports",
        }
    }
}

/// The three data categories of the Census trade API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endpoint {
    Hs,
    Port,
    State,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Hs => "hs",
            Endpoint::Port => "port",
            Endpoint::State => "state",
        }
    }

    /// HS levels the endpoint accepts for commodity searches.
    pub fn valid_hs_levels(&self) -> &'static [u8] {
        match self {
            Endpoint::Hs => &[2, 4, 6, 10],
            _ => &[2, 4, 6],
        }
    }

    /// Default HS level when the user does not pick one.
    pub fn default_hs_level(&self) -> u8 {
        match self {
            Endpoint::Hs => 10,
            _ => 6,
        }
    }
}

/// One of the six timeseries datasets, fixed by (flow, endpoint).
///
/// The dataset decides the base URL, the `get=` field list, the commodity
/// parameter name, and the key/sort columns used by the cleaning pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub flow: TradeFlow,
    pub endpoint: Endpoint,
}

impl Dataset {
    pub fn new(flow: TradeFlow, endpoint: Endpoint) -> Self {
        Self { flow, endpoint }
    }

    /// Short identifier used in output file names.
    pub fn slug(&self) -> &'static str {
        match (self.flow, self.endpoint) {
            (TradeFlow::Imports, Endpoint::Hs) => "imp_hs",
            (TradeFlow::Imports, Endpoint::Port) => "imp_port",
            (TradeFlow::Imports, Endpoint::State) => "imp_st",
            (TradeFlow::Exports, Endpoint::Hs) => "exp_hs",
            (TradeFlow::Exports, Endpoint::Port) => "exp_port",
            (TradeFlow::Exports, Endpoint::State) => "exp_st",
        }
    }

    /// Path under the API root for this dataset.
    pub fn base_path(&self) -> &'static str {
        match (self.flow, self.endpoint) {
            (TradeFlow::Imports, Endpoint::Hs) => "imports/hs",
            (TradeFlow::Imports, Endpoint::Port) => "imports/porths",
            (TradeFlow::Imports, Endpoint::State) => "imports/statehs",
            (TradeFlow::Exports, Endpoint::Hs) => "exports/hs",
            (TradeFlow::Exports, Endpoint::Port) => "exports/porths",
            (TradeFlow::Exports, Endpoint::State) => "exports/statehs",
        }
    }

    /// The `get=` variable list requested from the API.
    pub fn get_fields(&self) -> &'static str {
        match (self.flow, self.endpoint) {
            (TradeFlow::Imports, Endpoint::Hs) => {
                "I_COMMODITY,I_COMMODITY_LDESC,CTY_CODE,CTY_NAME,DISTRICT,DIST_NAME,UNIT_QY1,UNIT_QY2,GEN_VAL_YR,GEN_QY1_YR,GEN_QY1_YR_FLAG,GEN_QY2_YR,GEN_QY2_YR_FLAG,GEN_CHA_YR,GEN_CIF_YR,CC_YR,RP,CAL_DUT_YR,DUT_VAL_YR,CNT_CHA_YR,CNT_VAL_YR,CNT_WGT_YR,VES_WGT_YR,VES_VAL_YR,VES_CHA_YR,AIR_WGT_YR,AIR_VAL_YR,AIR_CHA_YR"
            }
            (TradeFlow::Imports, Endpoint::Port) => {
                "I_COMMODITY,I_COMMODITY_LDESC,PORT,PORT_NAME,CTY_CODE,CTY_NAME,GEN_VAL_YR,CNT_VAL_YR,CNT_WGT_YR,VES_VAL_YR,VES_WGT_YR,AIR_VAL_YR,AIR_WGT_YR"
            }
            (TradeFlow::Imports, Endpoint::State) => {
                "I_COMMODITY,I_COMMODITY_LDESC,STATE,CTY_NAME,CTY_CODE,GEN_VAL_YR,VES_VAL_YR,VES_WGT_YR,CNT_VAL_YR,CNT_WGT_YR,AIR_VAL_YR,AIR_WGT_YR"
            }
            (TradeFlow::Exports, Endpoint::Hs) => {
                "E_COMMODITY,E_COMMODITY_LDESC,DF,CTY_CODE,CTY_NAME,DISTRICT,DIST_NAME,UNIT_QY1,UNIT_QY2,ALL_VAL_YR,QTY_1_YR,QTY_1_YR_FLAG,QTY_2_YR,QTY_2_YR_FLAG,CNT_VAL_YR,CNT_WGT_YR,CC_YR,AIR_VAL_YR,AIR_WGT_YR,VES_VAL_YR,VES_WGT_YR"
            }
            (TradeFlow::Exports, Endpoint::Port) => {
                "E_COMMODITY,E_COMMODITY_LDESC,PORT,PORT_NAME,CTY_CODE,CTY_NAME,ALL_VAL_YR,CNT_VAL_YR,CNT_WGT_YR,VES_VAL_YR,VES_WGT_YR,AIR_VAL_YR,AIR_WGT_YR"
            }
            (TradeFlow::Exports, Endpoint::State) => {
                "E_COMMODITY,E_COMMODITY_LDESC,STATE,CTY_NAME,CTY_CODE,ALL_VAL_YR,VES_VAL_YR,VES_WGT_YR,CNT_VAL_YR,CNT_WGT_YR,AIR_VAL_YR,AIR_WGT_YR"
            }
        }
    }

    /// Name of the commodity query parameter.
    pub fn commodity_param(&self) -> &'static str {
        match self.flow {
            TradeFlow::Imports => "I_COMMODITY",
            TradeFlow::Exports => "E_COMMODITY",
        }
    }

    /// Columns that must be populated for a row to survive cleaning.
    pub fn required_columns(&self) -> &'static [&'static str] {
        match (self.flow, self.endpoint) {
            (TradeFlow::Imports, Endpoint::Hs) => &["CTY_CODE", "DISTRICT", "RP"],
            (TradeFlow::Exports, Endpoint::Hs) => &["CTY_CODE", "DISTRICT", "DF"],
            (_, Endpoint::Port) => &["PORT", "CTY_CODE"],
            (_, Endpoint::State) => &["CTY_CODE", "STATE"],
        }
    }

    /// Natural key for keep-last de-duplication after cleaning
    /// (YEAR is a column the cleaning pass derives from `time`).
    pub fn key_columns(&self) -> Vec<&'static str> {
        let mut cols = vec![self.commodity_param()];
        match self.endpoint {
            Endpoint::Hs => cols.extend(["CTY_CODE", "DISTRICT"]),
            Endpoint::Port => cols.extend(["CTY_CODE", "PORT"]),
            Endpoint::State => cols.extend(["CTY_CODE", "STATE"]),
        }
        cols.push("YEAR");
        cols
    }

    /// Ordering applied to cleaned output.
    pub fn sort_columns(&self) -> Vec<&'static str> {
        let mut cols = vec!["YEAR", "MONTH", self.commodity_param()];
        match self.endpoint {
            Endpoint::Hs => cols.extend(["DIST_NAME", "CTY_NAME"]),
            Endpoint::Port => cols.extend(["PORT_NAME", "CTY_NAME"]),
            Endpoint::State => cols.push("CTY_NAME"),
        }
        cols
    }
}

/// Inclusive range of 4-digit years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: i32,
    pub end: i32,
}

impl Period {
    pub fn new(start: i32, end: i32) -> Result<Self> {
        if start > end {
            bail!("start year {} is greater than end year {}", start, end);
        }
        Ok(Self { start, end })
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start..=self.end
    }
}

/// Everything needed to drive one run against the API.
///
/// Optional code lists multiply out into separate calls; `None` leaves the
/// dimension unconstrained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub dataset: Dataset,
    pub period: Period,
    /// 40-character Census API key.
    pub api_key: Option<String>,
    /// HS codes, possibly wildcarded (`"85*"`).
    pub commodity_codes: Option<Vec<String>>,
    pub country_codes: Option<Vec<String>>,
    /// Only meaningful on the HS endpoint.
    pub district_codes: Option<Vec<String>>,
    /// Only meaningful on the port endpoint.
    pub port_codes: Option<Vec<String>>,
    /// Two-letter abbreviations; only meaningful on the state endpoint.
    pub states: Option<Vec<String>>,
}

impl QuerySpec {
    pub fn new(dataset: Dataset, period: Period) -> Self {
        Self {
            dataset,
            period,
            api_key: None,
            commodity_codes: None,
            country_codes: None,
            district_codes: None,
            port_codes: None,
            states: None,
        }
    }
}

/// Tabular API result: a header row plus string-typed data rows.
///
/// The Census API returns a JSON array of arrays with the column names in
/// row 0. Cells arrive as strings or nulls; nulls normalize to empty
/// strings so the table stays rectangular.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TradeTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Parse the array-of-arrays response shape.
    pub fn from_json(v: &Value) -> Result<Self> {
        let arr = v
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("unexpected response shape: not a top-level array"))?;
        if arr.is_empty() {
            bail!("unexpected response: empty array");
        }
        let columns = row_strings(&arr[0])?;
        let mut rows = Vec::with_capacity(arr.len() - 1);
        for raw in &arr[1..] {
            let row = row_strings(raw)?;
            if row.len() != columns.len() {
                bail!(
                    "row width {} does not match header width {}",
                    row.len(),
                    columns.len()
                );
            }
            rows.push(row);
        }
        Ok(Self { columns, rows })
    }

    /// Append another table's rows; headers must agree.
    pub fn merge(&mut self, other: TradeTable) -> Result<()> {
        if self.columns != other.columns {
            bail!("cannot merge tables with differing headers");
        }
        self.rows.extend(other.rows);
        Ok(())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

fn row_strings(v: &Value) -> Result<Vec<String>> {
    let arr = v
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("unexpected response shape: row is not an array"))?;
    Ok(arr
        .iter()
        .map(|cell| match cell {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect())
}
