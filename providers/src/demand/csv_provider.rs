use std::collections::BTreeMap;
use std::path::Path;

use chrono::{Duration, NaiveDateTime, Timelike};
use corelib::region::RegionId;
use corelib::time::SimTime;
use tracing::warn;

use super::DemandForecastProvider;
use crate::error::ProviderError;


const ROW_TAG_INDEX: usize = 0;
const TABLE_NAME_INDEX: usize = 1;
const REGION_ID_INDEX: usize = 5;
const DISPATCH_INTERVAL_DATE_INDEX: usize = 6;
const TOTAL_DEMAND_INDEX: usize = 13;

fn parse_date(s: &str) -> Option<SimTime> {
    NaiveDateTime::parse_from_str(s.trim(), "%Y/%m/%d %H:%M:%S")
        .ok()
        .map(|t| t.with_second(0).expect("0 is a valid second"))
}

/// Canonical reader for AEMO "PUBLIC_PRICES" dispatch-interval (`DREGION`)
/// exports. This "cheats": queried at a stamp `t`, it returns the *actual*
/// recorded demand 24 hours after `t`, standing in for a forecast.
pub struct CsvPublicPricesProvider {
    actual_demand_by_region_and_stamp: BTreeMap<(RegionId, SimTime), f64>,
}

impl CsvPublicPricesProvider {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut actual_demand_by_region_and_stamp = BTreeMap::new();

        for (line, result) in reader.records().enumerate() {
            let record = match result {
                Ok(r) => r,
                Err(err) => {
                    warn!(line, %err, "skipping unreadable CSV row");
                    continue;
                }
            };
            if record.get(ROW_TAG_INDEX) != Some("D") || record.get(TABLE_NAME_INDEX) != Some("DREGION") {
                continue;
            }
            let Some(region_id) = record.get(REGION_ID_INDEX) else {
                continue;
            };
            let Some(stamp) = record.get(DISPATCH_INTERVAL_DATE_INDEX).and_then(parse_date) else {
                let err = ProviderError::MalformedRow { line, reason: "unparseable dispatch-interval date".to_string() };
                warn!(%err, "skipping DREGION row");
                continue;
            };
            let Some(demand) = record.get(TOTAL_DEMAND_INDEX).and_then(|s| s.trim().parse::<f64>().ok()) else {
                let err = ProviderError::MalformedRow { line, reason: "unparseable total demand".to_string() };
                warn!(%err, "skipping DREGION row");
                continue;
            };
            actual_demand_by_region_and_stamp.insert((RegionId::new(region_id), stamp), demand);
        }

        Ok(Self {
            actual_demand_by_region_and_stamp,
        })
    }
}

impl DemandForecastProvider for CsvPublicPricesProvider {
    fn demand_forecast(&self, region_id: &RegionId, dispatch_interval: SimTime) -> Option<f64> {
        let actual_stamp = dispatch_interval + Duration::days(1);
        self.actual_demand_by_region_and_stamp
            .get(&(region_id.clone(), actual_stamp))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn looks_up_demand_24_hours_ahead_of_the_query_stamp() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let mut fields = vec!["D".to_string(); 14];
        fields[TABLE_NAME_INDEX] = "DREGION".to_string();
        fields[REGION_ID_INDEX] = "VIC1".to_string();
        fields[DISPATCH_INTERVAL_DATE_INDEX] = "2024/01/02 00:30:00".to_string();
        fields[TOTAL_DEMAND_INDEX] = "4321.5".to_string();
        writeln!(file, "{}", fields.join(",")).unwrap();

        let provider = CsvPublicPricesProvider::from_path(file.path()).unwrap();
        let query_stamp = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 30, 0).unwrap();
        let region = RegionId::new("VIC1");
        assert_eq!(provider.demand_forecast(&region, query_stamp), Some(4321.5));
    }
}
