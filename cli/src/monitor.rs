//! Writes one CSV report per run: a TRADING section followed by a DISPATCH
//! section, covering every interval in `[start_date, end_date)` per region.
//! Pure function of the operators' info maps — the monitor holds no state.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Duration, Timelike};
use corelib::region::RegionId;
use corelib::time::{SimTime, DISPATCH_INTERVAL_MINUTES, TRADING_INTERVAL_MINUTES};
use market::MarketOperator;

const DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";
const NOT_AVAILABLE: &str = "N/A";

pub struct CsvFileMonitor;

impl CsvFileMonitor {
    /// Writes the full report to `out_path`, creating parent directories if needed.
    pub fn write_report(
        out_path: impl AsRef<Path>,
        start_date: SimTime,
        end_date: SimTime,
        operators: &HashMap<RegionId, MarketOperator>,
    ) -> Result<()> {
        let out_path = out_path.as_ref();
        if let Some(parent) = out_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| format!("creating output directory '{}'", parent.display()))?;
            }
        }
        let mut file = File::create(out_path).with_context(|| format!("creating monitor output '{}'", out_path.display()))?;

        write_trading_section(&mut file, start_date, end_date, operators)?;
        write_dispatch_section(&mut file, start_date, end_date, operators)?;
        Ok(())
    }
}

fn region_order(operators: &HashMap<RegionId, MarketOperator>) -> Vec<&RegionId> {
    let mut regions: Vec<&RegionId> = operators.keys().collect();
    regions.sort();
    regions
}

fn write_trading_section(
    file: &mut File,
    start_date: SimTime,
    end_date: SimTime,
    operators: &HashMap<RegionId, MarketOperator>,
) -> Result<()> {
    writeln!(file, "INTERVAL_TYPE,REGION_ID,TRADING_INTERVAL,SPOT_PRICE,TOTAL_DEMAND,DEMAND_SUPPLIED,GENERATORS_DISPATCHED(MW)")?;

    for region_id in region_order(operators) {
        let operator = &operators[region_id];
        let mut t = start_date;
        while t < end_date {
            if t.minute() == 0 || t.minute() == 30 {
                match operator.trading_interval_info_by_date().get(&t) {
                    Some(info) => {
                        let generators = info
                            .demand_supplied_by_generator_id
                            .iter()
                            .map(|(id, mw)| format!("{id}({mw:.2})"))
                            .collect::<Vec<_>>()
                            .join(";");
                        writeln!(
                            file,
                            "TRADING,{},{},{},{},{},{}",
                            region_id,
                            t.format(DATE_FORMAT),
                            info.spot_price,
                            info.total_demand,
                            info.total_demand_supplied,
                            generators
                        )?;
                    }
                    None => {
                        writeln!(
                            file,
                            "TRADING,{},{},{NOT_AVAILABLE},{NOT_AVAILABLE},{NOT_AVAILABLE},{NOT_AVAILABLE}",
                            region_id,
                            t.format(DATE_FORMAT)
                        )?;
                    }
                }
            }
            t += Duration::minutes(TRADING_INTERVAL_MINUTES);
        }
    }
    Ok(())
}

fn write_dispatch_section(
    file: &mut File,
    start_date: SimTime,
    end_date: SimTime,
    operators: &HashMap<RegionId, MarketOperator>,
) -> Result<()> {
    writeln!(file, "INTERVAL_TYPE,REGION_ID,DISPATCH_INTERVAL,PRICE,PRICE_BAND_NO,TOTAL_DEMAND,DEMAND_SUPPLIED,GENERATORS_DISPATCHED(PRICE,MW)")?;

    for region_id in region_order(operators) {
        let operator = &operators[region_id];
        let mut t = start_date;
        while t < end_date {
            match operator.dispatch_interval_info_by_date().get(&t) {
                Some(info) => {
                    let generators = info
                        .demand_supplied_by_generator_id
                        .iter()
                        .map(|(id, mw)| {
                            let price = info.price_by_generator_id.get(id).copied().unwrap_or(info.price);
                            format!("{id}({price:.2},{mw:.2})")
                        })
                        .collect::<Vec<_>>()
                        .join(";");
                    writeln!(
                        file,
                        "DISPATCH,{},{},{},{},{},{},{}",
                        region_id,
                        t.format(DATE_FORMAT),
                        info.price,
                        info.price_band_no,
                        info.total_demand,
                        info.total_demand_supplied,
                        generators
                    )?;
                }
                None => {
                    writeln!(
                        file,
                        "DISPATCH,{},{},{NOT_AVAILABLE},{NOT_AVAILABLE},{NOT_AVAILABLE},{NOT_AVAILABLE},{NOT_AVAILABLE}",
                        region_id,
                        t.format(DATE_FORMAT)
                    )?;
                }
            }
            t += Duration::minutes(DISPATCH_INTERVAL_MINUTES);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use corelib::message::{DispatchOffer, Message, TradingIntervalAvailabilityBid};
    use market::MarketOperator;

    fn dt(h: u32, m: u32) -> SimTime {
        chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn flat_bid(band0: f64) -> TradingIntervalAvailabilityBid {
        let mut availability_per_band = [0.0; 10];
        availability_per_band[0] = band0;
        TradingIntervalAvailabilityBid {
            availability_per_band,
            max_availability: band0,
            physical_availability: band0,
            rate_of_change_up_per_min: 0.0,
            rate_of_change_down_per_min: 0.0,
        }
    }

    #[test]
    fn dispatch_and_trading_rows_carry_both_price_and_mw_per_generator() {
        let region = RegionId::new("VIC1");
        let settlement = dt(0, 0);
        let now = dt(10, 0);
        let offer_submission_time = (settlement - chrono::Duration::days(1)).date().and_hms_opt(10, 0, 0).unwrap();

        let mut price_per_band = [0.0; 10];
        price_per_band[0] = 30.0;
        let mut availability_bid_by_trading_interval = BTreeMap::new();
        availability_bid_by_trading_interval.insert(now, flat_bid(1000.0));
        let offer = DispatchOffer {
            generator_id: "GEN1".to_string(),
            settlement,
            offer_submission_time,
            price_per_band,
            availability_bid_by_trading_interval,
        };

        let mut operator = MarketOperator::new(region.clone());
        let mut dispatcher = corelib::dispatch::MessageDispatcher::new();
        operator.handle_messages(offer_submission_time, &[Message::DispatchOffer(offer)]).unwrap();
        operator
            .handle_messages(
                now,
                &[Message::DemandForecast(corelib::message::DemandForecast {
                    consumer_id: "CONS1".to_string(),
                    region_id: region.clone(),
                    dispatch_interval: now,
                    demand_mw: 100.0,
                })],
            )
            .unwrap();
        operator.run_dispatch_schedule(now, &mut dispatcher, false);

        let info = operator.dispatch_interval_info_by_date().get(&now).expect("dispatch interval recorded");
        assert_eq!(info.price_by_generator_id.get("GEN1"), Some(&30.0));
        assert_eq!(info.demand_supplied_by_generator_id.get("GEN1"), Some(&100.0));

        let out_path = std::env::temp_dir().join("nem_sim_monitor_test_output.csv");
        let mut operators = HashMap::new();
        operators.insert(region, operator);
        CsvFileMonitor::write_report(&out_path, now, now + Duration::minutes(DISPATCH_INTERVAL_MINUTES), &operators).unwrap();

        let contents = std::fs::read_to_string(&out_path).unwrap();
        std::fs::remove_file(&out_path).ok();
        assert!(contents.contains("GEN1(30.00,100.00)"), "dispatch row was: {contents}");
    }
}
