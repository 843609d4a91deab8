//! Bid/offer/forecast value types and the closed `Message` sum exchanged
//! between agents via the [`crate::dispatch::MessageDispatcher`].

use std::collections::BTreeMap;

use crate::region::RegionId;
use crate::time::{SimTime, NUM_PRICE_BANDS};

/// One trading interval's worth of availability for a single [`DispatchOffer`].
#[derive(Debug, Clone, PartialEq)]
pub struct TradingIntervalAvailabilityBid {
    pub availability_per_band: [f64; NUM_PRICE_BANDS],
    pub max_availability: f64,
    pub physical_availability: f64,
    pub rate_of_change_up_per_min: f64,
    pub rate_of_change_down_per_min: f64,
}

impl TradingIntervalAvailabilityBid {
    /// `sum(availability_per_band[0..=band])`.
    pub fn cumulative_availability(&self, band: usize) -> f64 {
        self.availability_per_band[..=band].iter().sum()
    }
}

/// A generator's accepted offer for one trading day, keyed externally by
/// `(generator_id, settlement)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOffer {
    pub generator_id: String,
    pub settlement: SimTime,
    pub offer_submission_time: SimTime,
    pub price_per_band: [f64; NUM_PRICE_BANDS],
    pub availability_bid_by_trading_interval: BTreeMap<SimTime, TradingIntervalAvailabilityBid>,
}

/// An availability-only amendment to a previously accepted [`DispatchOffer`].
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityRebid {
    pub generator_id: String,
    pub settlement: SimTime,
    pub offer_submission_time: SimTime,
    pub availability_bid_by_trading_interval: BTreeMap<SimTime, TradingIntervalAvailabilityBid>,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemandForecast {
    pub consumer_id: String,
    pub region_id: RegionId,
    pub dispatch_interval: SimTime,
    pub demand_mw: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchNotification {
    pub dispatch_interval: SimTime,
    pub demand_to_supply_mw: f64,
}

/// The closed set of messages agents may exchange. Dispatch on this enum is
/// exhaustive — new message kinds require updating every `match` site, by design.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    DispatchOffer(DispatchOffer),
    AvailabilityRebid(AvailabilityRebid),
    DemandForecast(DemandForecast),
    DispatchNotification(DispatchNotification),
}
