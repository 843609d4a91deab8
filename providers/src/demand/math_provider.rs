use corelib::region::RegionId;
use corelib::time::{dispatch_interval_of_day, SimTime};

use super::DemandForecastProvider;

const BASE_DEMAND_MW: f64 = 4000.0;
const PEAK_WINDOW_START: i64 = 97;
const PEAK_WINDOW_END: i64 = 287;
const PEAK_CENTRE: f64 = 192.0;
const PEAK_HEIGHT_MW: f64 = 2000.0;
const PEAK_WIDTH_COEFFICIENT: f64 = 0.22;

/// Deterministic, provider-free demand curve: a flat base load plus a single
/// parabolic afternoon peak across the trading day's 288 dispatch intervals.
#[derive(Debug, Default, Clone, Copy)]
pub struct MathDemandForecastProvider;

impl MathDemandForecastProvider {
    pub fn new() -> Self {
        Self
    }

    fn peak_term(n: i64) -> f64 {
        if !(PEAK_WINDOW_START..=PEAK_WINDOW_END).contains(&n) {
            return 0.0;
        }
        let x = (n as f64) - PEAK_CENTRE;
        -PEAK_WIDTH_COEFFICIENT * x * x + PEAK_HEIGHT_MW
    }
}

impl DemandForecastProvider for MathDemandForecastProvider {
    fn demand_forecast(&self, _region_id: &RegionId, dispatch_interval: SimTime) -> Option<f64> {
        let n = dispatch_interval_of_day(dispatch_interval);
        Some((BASE_DEMAND_MW + Self::peak_term(n)).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn flat_outside_the_peak_window() {
        let provider = MathDemandForecastProvider::new();
        let region = RegionId::new("VIC1");
        let t = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(4, 0, 0).unwrap();
        assert_eq!(provider.demand_forecast(&region, t), Some(4000.0));
    }

    #[test]
    fn peaks_near_the_window_centre() {
        let provider = MathDemandForecastProvider::new();
        let region = RegionId::new("VIC1");
        // n = 192 dispatch intervals (16h) after the 04:00 trading-day start is 20:00.
        let t = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(20, 0, 0).unwrap();
        assert_eq!(provider.demand_forecast(&region, t), Some(6000.0));
    }
}
