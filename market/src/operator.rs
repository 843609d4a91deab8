//! The regional market operator: offer intake, cut-off enforcement,
//! stack-pricing dispatch, and spot-price aggregation.

use std::collections::BTreeMap;

use chrono::Duration;
use corelib::dispatch::MessageDispatcher;
use corelib::info::{DispatchIntervalInfo, TradingIntervalInfo};
use corelib::message::{AvailabilityRebid, DemandForecast, DispatchNotification, DispatchOffer, Message};
use corelib::region::RegionId;
use corelib::time::{
    clamp_price, cutoff_for, is_dispatch_interval_boundary, trading_day_settlement_for,
    trading_interval_end_for, SimTime, DISPATCH_INTERVAL_MINUTES, DISPATCH_INTERVALS_PER_TRADING_INTERVAL,
    MARKET_FLOOR_CAP, MARKET_PRICE_CAP, NUM_PRICE_BANDS,
};
use tracing::{info, warn};

use crate::error::OperatorError;

/// Minimum lead time a rebid must arrive before the trading interval it
/// would affect. Rebids arriving closer than this are rejected (see the
/// resolved open question in the project's design notes).
const REBID_MIN_LEAD: Duration = Duration::minutes(5);

pub struct MarketOperator {
    region_id: RegionId,
    offers: BTreeMap<String, BTreeMap<SimTime, DispatchOffer>>,
    forecasts: BTreeMap<SimTime, BTreeMap<String, f64>>,
    dispatch_interval_info_by_date: BTreeMap<SimTime, DispatchIntervalInfo>,
    trading_interval_info_by_date: BTreeMap<SimTime, TradingIntervalInfo>,
}

impl MarketOperator {
    pub fn new(region_id: RegionId) -> Self {
        Self {
            region_id,
            offers: BTreeMap::new(),
            forecasts: BTreeMap::new(),
            dispatch_interval_info_by_date: BTreeMap::new(),
            trading_interval_info_by_date: BTreeMap::new(),
        }
    }

    pub fn region_id(&self) -> &RegionId {
        &self.region_id
    }

    /// The recipient id agents use to address this operator in the dispatcher.
    pub fn agent_id(&self) -> String {
        format!("operator:{}", self.region_id)
    }

    pub fn dispatch_interval_info_by_date(&self) -> &BTreeMap<SimTime, DispatchIntervalInfo> {
        &self.dispatch_interval_info_by_date
    }

    pub fn trading_interval_info_by_date(&self) -> &BTreeMap<SimTime, TradingIntervalInfo> {
        &self.trading_interval_info_by_date
    }

    /// Offer/rebid/forecast intake. Runs once per tick with the batch of
    /// messages drained for this operator at `now`. A message kind the
    /// operator never legitimately receives (it only ever sends
    /// `DispatchNotification`) is a programmer error: it aborts the rest of
    /// the batch and propagates to the caller rather than being swallowed.
    pub fn handle_messages(&mut self, now: SimTime, messages: &[Message]) -> Result<(), OperatorError> {
        for message in messages {
            match message {
                Message::DispatchOffer(offer) => self.handle_dispatch_offer(now, offer.clone()),
                Message::AvailabilityRebid(rebid) => self.handle_availability_rebid(now, rebid.clone()),
                Message::DemandForecast(forecast) => self.handle_demand_forecast(forecast.clone()),
                Message::DispatchNotification(_) => return Err(OperatorError::UnknownMessageKind),
            }
        }
        Ok(())
    }

    fn handle_dispatch_offer(&mut self, now: SimTime, offer: DispatchOffer) {
        if let Err(err) = validate_offer(&offer) {
            tracing::error!(%err, generator_id = %offer.generator_id, "rejecting invariant-violating offer");
            return;
        }
        let cutoff = cutoff_for(offer.settlement);
        if now >= cutoff {
            info!(
                generator_id = %offer.generator_id,
                settlement = %offer.settlement,
                %now,
                %cutoff,
                "rejecting dispatch offer submitted at or after cut-off"
            );
            return;
        }
        info!(generator_id = %offer.generator_id, settlement = %offer.settlement, "accepted dispatch offer");
        self.offers
            .entry(offer.generator_id.clone())
            .or_default()
            .insert(offer.settlement, offer);
    }

    fn handle_availability_rebid(&mut self, now: SimTime, rebid: AvailabilityRebid) {
        let target_trading_interval = trading_interval_end_for(now);
        if target_trading_interval - now < REBID_MIN_LEAD {
            warn!(
                generator_id = %rebid.generator_id,
                %now,
                %target_trading_interval,
                "rejecting rebid arriving within 5 minutes of the trading interval it would affect"
            );
            return;
        }

        let Some(existing) = self
            .offers
            .get_mut(&rebid.generator_id)
            .and_then(|by_settlement| by_settlement.get_mut(&rebid.settlement))
        else {
            warn!(
                generator_id = %rebid.generator_id,
                settlement = %rebid.settlement,
                "rejecting rebid with no prior dispatch offer on file"
            );
            return;
        };

        info!(generator_id = %rebid.generator_id, settlement = %rebid.settlement, "accepted availability rebid");
        existing.availability_bid_by_trading_interval = rebid.availability_bid_by_trading_interval;
    }

    fn handle_demand_forecast(&mut self, forecast: DemandForecast) {
        self.forecasts
            .entry(forecast.dispatch_interval)
            .or_default()
            .insert(forecast.consumer_id, forecast.demand_mw);
    }

    /// Runs the stack-pricing solver and, when aligned to a trading-interval
    /// end, the spot-price aggregation. `suppress` disables both during
    /// pre-roll, when offer intake and forecast accumulation still happen
    /// but no schedule should be produced for times before `start_date`.
    pub fn run_dispatch_schedule(&mut self, now: SimTime, dispatcher: &mut MessageDispatcher, suppress: bool) {
        if suppress || !is_dispatch_interval_boundary(now) {
            return;
        }

        if let Some((price, price_band_no, total_demand, dispatched)) = self.solve_stack_pricing(now) {
            let total_demand_supplied = dispatched.values().sum();
            for (generator_id, demand_to_supply_mw) in &dispatched {
                dispatcher.send(
                    Message::DispatchNotification(DispatchNotification {
                        dispatch_interval: now,
                        demand_to_supply_mw: *demand_to_supply_mw,
                    }),
                    now,
                    generator_id.clone(),
                );
            }
            let price_by_generator_id = dispatched.keys().map(|generator_id| (generator_id.clone(), price)).collect();
            self.dispatch_interval_info_by_date.insert(
                now,
                DispatchIntervalInfo {
                    price,
                    price_band_no,
                    total_demand,
                    total_demand_supplied,
                    demand_supplied_by_generator_id: dispatched,
                    price_by_generator_id,
                },
            );
        }

        self.maybe_aggregate_spot_price(now);
    }

    fn solve_stack_pricing(&self, now: SimTime) -> Option<(f64, usize, f64, BTreeMap<String, f64>)> {
        let settlement = trading_day_settlement_for(now);
        let total_demand: f64 = self.forecasts.get(&now).map(|by_consumer| by_consumer.values().sum()).unwrap_or(0.0);

        let offers_for_settlement: Vec<&DispatchOffer> = self
            .offers
            .values()
            .filter_map(|by_settlement| by_settlement.get(&settlement))
            .collect();

        if total_demand <= 0.0 || offers_for_settlement.is_empty() {
            return None;
        }

        let trading_interval_end = trading_interval_end_for(now);
        let mut result: Option<(f64, usize, BTreeMap<String, f64>)> = None;

        for band in 0..NUM_PRICE_BANDS {
            let mut candidates = offers_for_settlement.clone();
            candidates.sort_by(|a, b| {
                a.price_per_band[band]
                    .partial_cmp(&b.price_per_band[band])
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.generator_id.cmp(&b.generator_id))
            });

            let mut supplied = 0.0;
            let mut dispatched = BTreeMap::new();
            let mut band_price = 0.0;

            for offer in &candidates {
                let avail = offer
                    .availability_bid_by_trading_interval
                    .get(&trading_interval_end)
                    .map(|bid| bid.cumulative_availability(band))
                    .unwrap_or(0.0);
                if avail <= 0.0 {
                    continue;
                }
                let give = avail.min(total_demand - supplied);
                if give <= 0.0 {
                    continue;
                }
                dispatched.insert(offer.generator_id.clone(), give);
                supplied += give;
                band_price = offer.price_per_band[band];
                if supplied >= total_demand {
                    break;
                }
            }

            let is_final_band = band == NUM_PRICE_BANDS - 1;
            if supplied >= total_demand || is_final_band {
                result = Some((band_price, band, dispatched));
            }
            if supplied >= total_demand {
                break;
            }
        }

        result.map(|(price, band, dispatched)| (price, band, total_demand, dispatched))
    }

    fn maybe_aggregate_spot_price(&mut self, now: SimTime) {
        let minute = chrono::Timelike::minute(&now);
        if minute != 0 && minute != 30 {
            return;
        }

        let stamps: Vec<SimTime> = (0..DISPATCH_INTERVALS_PER_TRADING_INTERVAL)
            .map(|k| now - Duration::minutes(DISPATCH_INTERVAL_MINUTES * k))
            .collect();

        let records: Option<Vec<&DispatchIntervalInfo>> = stamps
            .iter()
            .map(|t| self.dispatch_interval_info_by_date.get(t))
            .collect();

        let Some(records) = records else {
            return;
        };

        let mean_price = records.iter().map(|r| r.price).sum::<f64>() / records.len() as f64;
        let spot_price = clamp_price(mean_price);
        let total_demand = records.iter().map(|r| r.total_demand).sum();
        let total_demand_supplied = records.iter().map(|r| r.total_demand_supplied).sum();
        let mut demand_supplied_by_generator_id: BTreeMap<String, f64> = BTreeMap::new();
        for record in &records {
            for (generator_id, mw) in &record.demand_supplied_by_generator_id {
                *demand_supplied_by_generator_id.entry(generator_id.clone()).or_insert(0.0) += mw;
            }
        }

        self.trading_interval_info_by_date.insert(
            now,
            TradingIntervalInfo {
                spot_price,
                total_demand,
                total_demand_supplied,
                demand_supplied_by_generator_id,
            },
        );
    }
}

fn validate_offer(offer: &DispatchOffer) -> Result<(), OperatorError> {
    for (band, &price) in offer.price_per_band.iter().enumerate() {
        if !(MARKET_FLOOR_CAP..=MARKET_PRICE_CAP).contains(&price) {
            return Err(OperatorError::PriceOutOfRange { band, price });
        }
    }
    for bid in offer.availability_bid_by_trading_interval.values() {
        for (band, &availability) in bid.availability_per_band.iter().enumerate() {
            if availability < 0.0 {
                return Err(OperatorError::NegativeAvailability {
                    generator_id: offer.generator_id.clone(),
                    band,
                });
            }
        }
    }
    Ok(())
}
