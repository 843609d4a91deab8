//! Scheduled mutations of agent/provider state. Each event fires at most
//! once, at most `time_delta` after simulation start, then is discarded.

use std::sync::Arc;

use agents::{Consumer, Generator};
use chrono::Duration;
use corelib::region::RegionId;
use providers::{BidDataProvider, DemandForecastProvider};
use tracing::info;

#[derive(Clone)]
pub enum Event {
    ChangeGeneratorMarkup {
        markup: f64,
        relative: bool,
        region: Option<RegionId>,
        fuel_type: Option<String>,
    },
    ChangeGeneratorCapacityDataProvider {
        provider: Arc<dyn BidDataProvider>,
        region: Option<RegionId>,
        fuel_type: Option<String>,
    },
    /// Historically distinct from `ChangeConsumerDemandForecastDataProvider`
    /// in the source material; this port's `Consumer` carries a single
    /// demand-forecast provider, so both variants swap the same field (see
    /// the project's design notes).
    ChangeConsumerLoadDataProvider {
        provider: Arc<dyn DemandForecastProvider>,
        region: Option<RegionId>,
    },
    ChangeConsumerDemandForecastDataProvider {
        provider: Arc<dyn DemandForecastProvider>,
        region: Option<RegionId>,
    },
}

impl Event {
    /// Applies this event to every generator/consumer the caller hands it,
    /// alongside the region each belongs to. The caller owns agent storage;
    /// this only needs `&mut` access to the matching ones.
    pub fn process_event<'a>(
        &self,
        generators: impl IntoIterator<Item = (&'a RegionId, &'a mut Generator)>,
        consumers: impl IntoIterator<Item = (&'a RegionId, &'a mut Consumer)>,
    ) {
        match self {
            Event::ChangeGeneratorMarkup { markup, relative, region, fuel_type } => {
                for (region_id, generator) in generators {
                    if !region_matches(region, region_id) || !fuel_type_matches(fuel_type, generator) {
                        continue;
                    }
                    let new_markup = if *relative { generator.markup() + markup } else { *markup };
                    generator.set_markup(new_markup);
                }
                info!(markup, relative, "applied ChangeGeneratorMarkup event");
            }
            Event::ChangeGeneratorCapacityDataProvider { provider, region, fuel_type } => {
                for (region_id, generator) in generators {
                    if !region_matches(region, region_id) || !fuel_type_matches(fuel_type, generator) {
                        continue;
                    }
                    generator.set_bid_provider(provider.clone());
                }
                info!("applied ChangeGeneratorCapacityDataProvider event");
            }
            Event::ChangeConsumerLoadDataProvider { provider, region } => {
                for (region_id, consumer) in consumers {
                    if !region_matches(region, region_id) {
                        continue;
                    }
                    consumer.set_demand_provider(provider.clone());
                }
                info!("applied ChangeConsumerLoadDataProvider event");
            }
            Event::ChangeConsumerDemandForecastDataProvider { provider, region } => {
                for (region_id, consumer) in consumers {
                    if !region_matches(region, region_id) {
                        continue;
                    }
                    consumer.set_demand_provider(provider.clone());
                }
                info!("applied ChangeConsumerDemandForecastDataProvider event");
            }
        }
    }
}

fn region_matches(filter: &Option<RegionId>, region_id: &RegionId) -> bool {
    filter.as_ref().is_none_or(|f| f == region_id)
}

fn fuel_type_matches(filter: &Option<String>, generator: &Generator) -> bool {
    filter.as_ref().is_none_or(|f| generator.fuel_type() == Some(f.as_str()))
}

/// An [`Event`] paired with the delay from simulation start at which it fires.
#[derive(Clone)]
pub struct ScheduledEvent {
    pub time_delta: Duration,
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn gen(id: &str, region: RegionId) -> Generator {
        struct NoBids;
        impl BidDataProvider for NoBids {
            fn bids_at(&self, _: &str, _: corelib::time::SimTime) -> Vec<providers::Bid> {
                vec![]
            }
            fn bids_before(
                &self,
                _: &str,
                _: corelib::time::SimTime,
            ) -> std::collections::BTreeMap<corelib::time::SimTime, Vec<providers::Bid>> {
                Default::default()
            }
        }
        Generator::new(id, region, Arc::new(NoBids))
    }

    #[test]
    fn markup_event_with_no_filters_sets_every_generator() {
        let region = RegionId::new("VIC1");
        let mut generators_by_region: HashMap<RegionId, Vec<Generator>> = HashMap::new();
        generators_by_region.insert(region.clone(), vec![gen("GEN1", region.clone()), gen("GEN2", region.clone())]);
        let mut consumers_by_region: HashMap<RegionId, Vec<Consumer>> = HashMap::new();

        let event = Event::ChangeGeneratorMarkup {
            markup: 15.0,
            relative: false,
            region: None,
            fuel_type: None,
        };
        let generators = generators_by_region.iter_mut().flat_map(|(r, gs)| gs.iter_mut().map(move |g| (r, g)));
        let consumers = consumers_by_region.iter_mut().flat_map(|(r, cs)| cs.iter_mut().map(move |c| (r, c)));
        event.process_event(generators, consumers);

        for generator in &generators_by_region[&region] {
            assert_eq!(generator.markup(), 15.0);
        }
    }

    #[test]
    fn relative_markup_adds_to_the_existing_value() {
        let region = RegionId::new("VIC1");
        let mut g = gen("GEN1", region.clone());
        g.set_markup(5.0);
        let mut generators_by_region: HashMap<RegionId, Vec<Generator>> = HashMap::new();
        generators_by_region.insert(region.clone(), vec![g]);
        let mut consumers_by_region: HashMap<RegionId, Vec<Consumer>> = HashMap::new();

        let event = Event::ChangeGeneratorMarkup {
            markup: 2.0,
            relative: true,
            region: None,
            fuel_type: None,
        };
        let generators = generators_by_region.iter_mut().flat_map(|(r, gs)| gs.iter_mut().map(move |g| (r, g)));
        let consumers = consumers_by_region.iter_mut().flat_map(|(r, cs)| cs.iter_mut().map(move |c| (r, c)));
        event.process_event(generators, consumers);

        assert_eq!(generators_by_region[&region][0].markup(), 7.0);
    }
}
