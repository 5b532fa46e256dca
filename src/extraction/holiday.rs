use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// One element of the public holiday API response.
///
/// Only `date`, `name` and `types` are used downstream. The rest is kept so the raw
/// capture stays close to what the API returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayRecord {
    pub date: String,
    #[serde(default)]
    pub local_name: Option<String>,
    pub name: String,
    #[serde(default)]
    pub country_code: Option<String>,
    // A holiday can belong to several classification types at once
    #[serde(default)]
    pub types: Vec<String>,
}

/// Builds the raw holiday table, one row per record, with `types` as `list[str]`.
pub(crate) fn holidays_to_frame(records: &[HolidayRecord]) -> PolarsResult<DataFrame> {
    let dates: Vec<&str> = records.iter().map(|r| r.date.as_str()).collect();
    let local_names: Vec<Option<&str>> = records.iter().map(|r| r.local_name.as_deref()).collect();
    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    let country_codes: Vec<Option<&str>> =
        records.iter().map(|r| r.country_code.as_deref()).collect();
    let types: Vec<Series> = records
        .iter()
        .map(|r| Series::new(PlSmallStr::EMPTY, r.types.as_slice()))
        .collect();

    let types = Series::new("types".into(), types).cast(&DataType::List(Box::new(DataType::String)))?;

    DataFrame::new(vec![
        Column::new("date".into(), dates),
        Column::new("localName".into(), local_names),
        Column::new("name".into(), names),
        Column::new("countryCode".into(), country_codes),
        types.into(),
    ])
}
