use chrono::NaiveDate;
use serde::Deserialize;
use sift_screen::model::{FundamentalRecord, Period};
use std::collections::HashMap;
use tracing::trace;

/// Net income concepts, in order of preference.
pub const NET_INCOME_CONCEPTS: [&str; 2] = ["NetIncomeLoss", "ProfitLoss"];

/// Annual periods span roughly a year; anything outside this range (in days) is a quarter, a
/// stub period or a cumulative figure.
const ANNUAL_DAYS: std::ops::RangeInclusive<i64> = 330..=400;

pub fn url(cik: &str) -> String {
    format!("https://data.sec.gov/api/xbrl/companyfacts/CIK{cik}.json")
}

/// Annual net income from a company facts document.
///
/// Keeps USD `10-K` facts for full fiscal years, one per period end; when a period was
/// reported more than once, the latest filing wins. `None` when no net income concept exists.
pub fn net_income(facts: &Facts) -> Option<FundamentalRecord> {
    let gaap = facts.facts.get("us-gaap")?;
    let (concept, data) = NET_INCOME_CONCEPTS
        .iter()
        .find_map(|concept| gaap.get(*concept).map(|data| (concept, data)))?;
    let cells = data.units.get("USD")?;

    let mut latest: HashMap<NaiveDate, &DataCell> = HashMap::new();
    for cell in cells.iter().filter(|cell| cell.is_annual()) {
        let Some(end) = parse_date(&cell.dated) else {
            continue;
        };
        let newer = latest.get(&end).map_or(true, |seen| cell.filed > seen.filed);
        if newer {
            latest.insert(end, cell);
        }
    }
    trace!("{} annual {concept} periods", latest.len());

    let periods = latest
        .into_iter()
        .map(|(end, cell)| Period {
            end,
            net_income: cell.val,
        })
        .collect();
    Some(FundamentalRecord::new(periods))
}

fn parse_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

// de
// ----------------------------------------------------------------------------

// {
//    "facts": {
#[derive(Deserialize, Debug)]
pub struct Facts {
    //                      vvvv == "MetricName"
    facts: HashMap<String, HashMap<String, MetricData>>,
    //          ^^^^  == "dei" or "us-gaap"
}

#[derive(Deserialize, Debug)]
struct MetricData {
    units: HashMap<String, Vec<DataCell>>,
    //          ^^^^ == "shares" or "USD"
}

//  {
//      "start": "2022-09-25",
//      "end": "2023-09-30",
//      "val": 96995000000,
//      "accn": "0000320193-23-000106",
//      "fy": 2023,
//      "fp": "FY",
//      "form": "10-K",
//      "filed": "2023-11-03",
//      "frame": "CY2023"
//  }
#[derive(Deserialize, Debug)]
struct DataCell {
    start: Option<String>,
    #[serde(rename = "end")]
    dated: String,
    val: f64,
    fp: Option<String>,
    form: Option<String>,
    #[serde(default)]
    filed: String,
}

impl DataCell {
    fn is_annual(&self) -> bool {
        let form = self.form.as_deref().unwrap_or_default();
        if !(form == "10-K" || form == "10-K/A") || self.fp.as_deref() != Some("FY") {
            return false;
        }

        match (
            self.start.as_deref().and_then(parse_date),
            parse_date(&self.dated),
        ) {
            (Some(start), Some(end)) => ANNUAL_DAYS.contains(&(end - start).num_days()),
            _ => false,
        }
    }
}
