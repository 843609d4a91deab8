use std::sync::Arc;

use corelib::dispatch::MessageDispatcher;
use corelib::message::Message;
use corelib::region::RegionId;
use corelib::time::SimTime;
use providers::{Bid, BidDataProvider};
use tracing::info;

/// Submits bids at their offer submission times; receives dispatch
/// notifications (logged, no behavioral effect — see the project's design
/// notes on `ChangeGeneratorMarkup`).
pub struct Generator {
    id: String,
    region_id: RegionId,
    bid_provider: Arc<dyn BidDataProvider>,
    fuel_type: Option<String>,
    markup: f64,
}

impl Generator {
    pub fn new(id: impl Into<String>, region_id: RegionId, bid_provider: Arc<dyn BidDataProvider>) -> Self {
        Self {
            id: id.into(),
            region_id,
            bid_provider,
            fuel_type: None,
            markup: 0.0,
        }
    }

    pub fn with_fuel_type(mut self, fuel_type: impl Into<String>) -> Self {
        self.fuel_type = Some(fuel_type.into());
        self
    }

    pub fn with_markup(mut self, markup: f64) -> Self {
        self.markup = markup;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn region_id(&self) -> &RegionId {
        &self.region_id
    }

    pub fn fuel_type(&self) -> Option<&str> {
        self.fuel_type.as_deref()
    }

    pub fn markup(&self) -> f64 {
        self.markup
    }

    pub fn set_markup(&mut self, markup: f64) {
        self.markup = markup;
    }

    pub fn set_bid_provider(&mut self, provider: Arc<dyn BidDataProvider>) {
        self.bid_provider = provider;
    }

    fn operator_id(&self) -> String {
        format!("operator:{}", self.region_id)
    }

    pub fn step(&self, now: SimTime, dispatcher: &mut MessageDispatcher) {
        let operator_id = self.operator_id();
        for bid in self.bid_provider.bids_at(&self.id, now) {
            match bid {
                Bid::Offer(offer) => dispatcher.send(Message::DispatchOffer(offer), now, operator_id.clone()),
                Bid::Rebid(rebid) => dispatcher.send(Message::AvailabilityRebid(rebid), now, operator_id.clone()),
            }
        }
    }

    pub fn handle_messages(&self, messages: &[Message]) {
        for message in messages {
            if let Message::DispatchNotification(notification) = message {
                info!(
                    generator_id = %self.id,
                    dispatch_interval = %notification.dispatch_interval,
                    demand_to_supply_mw = notification.demand_to_supply_mw,
                    "received dispatch notification",
                );
            }
        }
    }

    /// Every submission time strictly before `start_date` for which the
    /// provider holds a bid, so the driver can pre-roll this generator.
    pub fn get_initialisation_times(&self, start_date: SimTime) -> Vec<SimTime> {
        self.bid_provider.bids_before(&self.id, start_date).keys().copied().collect()
    }
}
