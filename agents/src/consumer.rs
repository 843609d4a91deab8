use std::sync::Arc;

use chrono::Duration;
use corelib::dispatch::MessageDispatcher;
use corelib::message::{DemandForecast, Message};
use corelib::region::RegionId;
use corelib::time::{is_dispatch_interval_boundary, SimTime, DISPATCH_INTERVALS_PER_DAY, DISPATCH_INTERVAL_MINUTES};
use providers::DemandForecastProvider;

/// Submits 24-hour-ahead demand forecasts once per dispatch interval.
pub struct Consumer {
    id: String,
    region_id: RegionId,
    demand_provider: Arc<dyn DemandForecastProvider>,
}

impl Consumer {
    pub fn new(id: impl Into<String>, region_id: RegionId, demand_provider: Arc<dyn DemandForecastProvider>) -> Self {
        Self {
            id: id.into(),
            region_id,
            demand_provider,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn region_id(&self) -> &RegionId {
        &self.region_id
    }

    pub fn set_demand_provider(&mut self, provider: Arc<dyn DemandForecastProvider>) {
        self.demand_provider = provider;
    }

    pub fn step(&self, now: SimTime, dispatcher: &mut MessageDispatcher) {
        if !is_dispatch_interval_boundary(now) {
            return;
        }
        let Some(demand_mw) = self.demand_provider.demand_forecast(&self.region_id, now) else {
            return;
        };
        dispatcher.send(
            Message::DemandForecast(DemandForecast {
                consumer_id: self.id.clone(),
                region_id: self.region_id.clone(),
                dispatch_interval: now + Duration::days(1),
                demand_mw,
            }),
            now,
            format!("operator:{}", self.region_id),
        );
    }

    /// The 288 dispatch-interval stamps covering the 24 hours immediately
    /// before `start_date`, ascending.
    pub fn get_initialisation_times(&self, start_date: SimTime) -> Vec<SimTime> {
        let mut times: Vec<SimTime> = (1..=DISPATCH_INTERVALS_PER_DAY)
            .map(|k| start_date - Duration::minutes(DISPATCH_INTERVAL_MINUTES * k))
            .collect();
        times.sort();
        times
    }
}
