use std::collections::BTreeMap;
use std::sync::Arc;

use agents::{Consumer, Generator};
use chrono::{Duration, NaiveDate};
use corelib::message::{DispatchOffer, TradingIntervalAvailabilityBid};
use corelib::region::RegionId;
use corelib::time::SimTime;
use providers::{Bid, BidDataProvider, DemandForecastProvider};
use scheduler::{RegionAgents, Simulation};

struct FixedBidProvider {
    offer: DispatchOffer,
    offer_submission_time: SimTime,
}

impl BidDataProvider for FixedBidProvider {
    fn bids_at(&self, _generator_id: &str, offer_time: SimTime) -> Vec<Bid> {
        if offer_time == self.offer_submission_time {
            vec![Bid::Offer(self.offer.clone())]
        } else {
            vec![]
        }
    }

    fn bids_before(&self, _generator_id: &str, horizon_time: SimTime) -> BTreeMap<SimTime, Vec<Bid>> {
        let mut out = BTreeMap::new();
        if self.offer_submission_time < horizon_time {
            out.insert(self.offer_submission_time, vec![Bid::Offer(self.offer.clone())]);
        }
        out
    }
}

struct ConstantDemandProvider(f64);

impl DemandForecastProvider for ConstantDemandProvider {
    fn demand_forecast(&self, _region_id: &RegionId, _dispatch_interval: SimTime) -> Option<f64> {
        Some(self.0)
    }
}

fn dt(h: u32, m: u32) -> SimTime {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(h, m, 0).unwrap()
}

fn flat_availability(band0: f64) -> TradingIntervalAvailabilityBid {
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
fn a_generator_and_consumer_are_dispatched_every_interval_across_a_short_run() {
    let region = RegionId::new("VIC1");
    let start_date = dt(4, 0);
    let end_date = dt(7, 0);

    let mut price_per_band = [0.0; 10];
    for (i, p) in price_per_band.iter_mut().enumerate() {
        *p = 30.0 + 10.0 * i as f64;
    }
    let settlement = start_date.date().and_hms_opt(0, 0, 0).unwrap();
    let offer_submission_time = (start_date - Duration::days(1)).date().and_hms_opt(10, 0, 0).unwrap();

    let trading_interval_ends = [dt(4, 0), dt(4, 30), dt(5, 0), dt(5, 30), dt(6, 0), dt(6, 30), dt(7, 0)];
    let mut availability_bid_by_trading_interval = BTreeMap::new();
    for end in trading_interval_ends {
        availability_bid_by_trading_interval.insert(end, flat_availability(1000.0));
    }

    let offer = DispatchOffer {
        generator_id: "GEN1".to_string(),
        settlement,
        offer_submission_time,
        price_per_band,
        availability_bid_by_trading_interval,
    };

    let bid_provider = Arc::new(FixedBidProvider { offer, offer_submission_time });
    let demand_provider = Arc::new(ConstantDemandProvider(100.0));

    let generator = Generator::new("GEN1", region.clone(), bid_provider);
    let consumer = Consumer::new("CONS1", region.clone(), demand_provider);

    let mut simulation = Simulation::new(
        start_date,
        end_date,
        vec![RegionAgents {
            region_id: region.clone(),
            generators: vec![generator],
            consumers: vec![consumer],
        }],
        vec![],
    );

    simulation.run();

    let operator = simulation.operators().get(&region).expect("operator exists for region");

    let mut t = start_date;
    while t <= end_date {
        let info = operator
            .dispatch_interval_info_by_date()
            .get(&t)
            .unwrap_or_else(|| panic!("missing dispatch interval record at {t}"));
        assert_eq!(info.price, 30.0);
        assert_eq!(info.price_band_no, 0);
        assert_eq!(info.total_demand_supplied, 100.0);
        assert_eq!(info.demand_supplied_by_generator_id.get("GEN1"), Some(&100.0));
        t += Duration::minutes(5);
    }

    let spot_price_at_0430 = operator
        .trading_interval_info_by_date()
        .get(&dt(4, 30))
        .expect("trading interval aggregated at the half-hour mark");
    assert_eq!(spot_price_at_0430.spot_price, 30.0);
    assert_eq!(spot_price_at_0430.total_demand_supplied, 600.0);
    assert_eq!(spot_price_at_0430.demand_supplied_by_generator_id.get("GEN1"), Some(&600.0));
}

#[test]
fn pre_roll_does_not_advance_the_clock_past_start_date() {
    let region = RegionId::new("VIC1");
    let start_date = dt(4, 0);
    let end_date = dt(4, 0);

    let demand_provider = Arc::new(ConstantDemandProvider(50.0));
    let consumer = Consumer::new("CONS1", region.clone(), demand_provider);

    let simulation = Simulation::new(
        start_date,
        end_date,
        vec![RegionAgents {
            region_id: region.clone(),
            generators: vec![],
            consumers: vec![consumer],
        }],
        vec![],
    );

    assert_eq!(simulation.clock(), start_date);
}
