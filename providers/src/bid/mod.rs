mod csv_provider;

pub use csv_provider::CsvYestBidProvider;

use std::collections::BTreeMap;

use corelib::message::{AvailabilityRebid, DispatchOffer};
use corelib::time::SimTime;

/// One bid submitted at a given offer time: either a brand new offer or an
/// amendment to one already on file.
#[derive(Debug, Clone, PartialEq)]
pub enum Bid {
    Offer(DispatchOffer),
    Rebid(AvailabilityRebid),
}

/// Returns bids keyed by offer submission time. Implementations are read-only
/// from the simulation's perspective; an [`crate::bid`]-holding generator may
/// have its provider reference swapped wholesale by an event.
pub trait BidDataProvider: Send + Sync {
    /// Bids submitted by `generator_id` exactly at `offer_time`.
    fn bids_at(&self, generator_id: &str, offer_time: SimTime) -> Vec<Bid>;

    /// All of `generator_id`'s bids submitted strictly before `horizon_time`,
    /// keyed by submission time. Used to pre-roll historical offers.
    fn bids_before(&self, generator_id: &str, horizon_time: SimTime) -> BTreeMap<SimTime, Vec<Bid>>;
}
