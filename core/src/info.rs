//! Write-once records produced by the market operator at the moment a
//! dispatch or trading interval is resolved.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchIntervalInfo {
    pub price: f64,
    pub price_band_no: usize,
    pub total_demand: f64,
    pub total_demand_supplied: f64,
    pub demand_supplied_by_generator_id: BTreeMap<String, f64>,
    /// Clearing price paid to each dispatched generator. Dispatch is
    /// uniform-priced within an interval, so every entry equals `price`;
    /// kept per generator rather than as a single scalar so the monitor's
    /// `GENERATORS_DISPATCHED(PRICE,MW)` column doesn't have to reach back
    /// into the interval-level field.
    pub price_by_generator_id: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradingIntervalInfo {
    pub spot_price: f64,
    pub total_demand: f64,
    pub total_demand_supplied: f64,
    /// Per-generator MW supplied, summed across the six dispatch intervals
    /// that make up the trading interval — the same summing aggregation
    /// `total_demand_supplied` itself uses (as opposed to `spot_price`'s mean).
    pub demand_supplied_by_generator_id: BTreeMap<String, f64>,
}
