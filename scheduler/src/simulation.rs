//! The simulation driver: owns every agent, the dispatcher, and the event
//! stack, and steps them forward one minute at a time from `start_date` to
//! `end_date`.

use std::collections::{BTreeSet, HashMap, VecDeque};

use agents::{Consumer, Generator};
use chrono::Duration;
use corelib::dispatch::MessageDispatcher;
use corelib::message::Message;
use corelib::region::RegionId;
use corelib::time::SimTime;
use events::{Event, ScheduledEvent};
use market::MarketOperator;
use tracing::{error, warn};

use crate::agent::AgentMut;

/// The generators and consumers that belong to one region. The operator for
/// that region is created internally; callers only hand over the agents that
/// have bid/forecast providers attached.
pub struct RegionAgents {
    pub region_id: RegionId,
    pub generators: Vec<Generator>,
    pub consumers: Vec<Consumer>,
}

pub struct Simulation {
    start_date: SimTime,
    end_date: SimTime,
    clock: SimTime,
    dispatcher: MessageDispatcher,
    region_ids: Vec<RegionId>,
    operators: HashMap<RegionId, MarketOperator>,
    generators: HashMap<RegionId, Vec<Generator>>,
    consumers: HashMap<RegionId, Vec<Consumer>>,
    event_queue: VecDeque<ScheduledEvent>,
}

impl Simulation {
    /// Builds the simulation and immediately pre-rolls it: every agent is
    /// stepped through its historical submission times strictly before
    /// `start_date` so operator mailboxes hold the offers/forecasts already
    /// on file when the run proper begins. Pre-roll never runs the dispatch
    /// solver and never fires events — only offer/forecast intake.
    pub fn new(
        start_date: SimTime,
        end_date: SimTime,
        regions: Vec<RegionAgents>,
        mut events: Vec<ScheduledEvent>,
    ) -> Self {
        let mut region_ids = Vec::with_capacity(regions.len());
        let mut operators = HashMap::new();
        let mut generators = HashMap::new();
        let mut consumers = HashMap::new();
        for region in regions {
            operators.insert(region.region_id.clone(), MarketOperator::new(region.region_id.clone()));
            generators.insert(region.region_id.clone(), region.generators);
            consumers.insert(region.region_id.clone(), region.consumers);
            region_ids.push(region.region_id);
        }

        events.sort_by_key(|scheduled| scheduled.time_delta);

        let mut simulation = Self {
            start_date,
            end_date,
            clock: start_date,
            dispatcher: MessageDispatcher::new(),
            region_ids,
            operators,
            generators,
            consumers,
            event_queue: events.into(),
        };
        simulation.pre_roll();
        simulation
    }

    pub fn clock(&self) -> SimTime {
        self.clock
    }

    pub fn operators(&self) -> &HashMap<RegionId, MarketOperator> {
        &self.operators
    }

    fn pre_roll(&mut self) {
        let mut times: BTreeSet<SimTime> = BTreeSet::new();
        for region_id in self.region_ids.clone() {
            if let Some(gens) = self.generators.get(&region_id) {
                for generator in gens {
                    times.extend(generator.get_initialisation_times(self.start_date));
                }
            }
            if let Some(cons) = self.consumers.get(&region_id) {
                for consumer in cons {
                    times.extend(consumer.get_initialisation_times(self.start_date));
                }
            }
        }

        for time in times {
            self.clock = time;
            self.step_agents();
            self.drain_and_deliver();
        }
        self.clock = self.start_date;
    }

    /// Runs the five-phase tick from `start_date` to `end_date` inclusive:
    /// fire due events, step every agent, drain and deliver mailboxes until
    /// empty, run each operator's dispatch schedule, advance the clock.
    pub fn run(&mut self) {
        while self.clock <= self.end_date {
            self.fire_due_events();
            self.step_agents();
            self.drain_and_deliver();
            self.run_dispatch_schedules();
            self.clock += Duration::minutes(1);
        }
    }

    fn fire_due_events(&mut self) {
        loop {
            let Some(front) = self.event_queue.front() else {
                break;
            };
            let fire_time = self.start_date + front.time_delta;
            if fire_time > self.clock {
                break;
            }
            let scheduled = self.event_queue.pop_front().expect("front already checked Some");
            self.apply_event(&scheduled.event);
        }
    }

    fn apply_event(&mut self, event: &Event) {
        let generators = self
            .generators
            .iter_mut()
            .flat_map(|(region_id, gens)| gens.iter_mut().map(move |g| (region_id, g)));
        let consumers = self
            .consumers
            .iter_mut()
            .flat_map(|(region_id, cons)| cons.iter_mut().map(move |c| (region_id, c)));
        event.process_event(generators, consumers);
    }

    fn step_agents(&mut self) {
        let now = self.clock;
        for region_id in &self.region_ids {
            if let Some(gens) = self.generators.get_mut(region_id) {
                for generator in gens.iter_mut() {
                    AgentMut::Generator(generator).step(now, &mut self.dispatcher);
                }
            }
            if let Some(cons) = self.consumers.get_mut(region_id) {
                for consumer in cons.iter_mut() {
                    AgentMut::Consumer(consumer).step(now, &mut self.dispatcher);
                }
            }
        }
    }

    fn drain_and_deliver(&mut self) {
        loop {
            let due = self.dispatcher.drain_for(self.clock);
            if due.is_empty() {
                break;
            }
            for (recipient_id, messages) in due {
                self.deliver(&recipient_id, &messages);
            }
        }
    }

    fn deliver(&mut self, recipient_id: &str, messages: &[Message]) {
        let now = self.clock;
        if let Some(region) = recipient_id.strip_prefix("operator:") {
            let region_id = RegionId::new(region);
            match self.operators.get_mut(&region_id) {
                Some(operator) => {
                    if let Err(err) = AgentMut::Operator(operator).handle_messages(now, messages) {
                        error!(%err, recipient_id, "operator failed to handle a delivered message");
                    }
                }
                None => warn!(recipient_id, "dropping messages for unknown operator"),
            }
            return;
        }

        for gens in self.generators.values_mut() {
            if let Some(generator) = gens.iter_mut().find(|g| g.id() == recipient_id) {
                let _ = AgentMut::Generator(generator).handle_messages(now, messages);
                return;
            }
        }
        warn!(recipient_id, "dropping messages for unknown agent id");
    }

    fn run_dispatch_schedules(&mut self) {
        let now = self.clock;
        for operator in self.operators.values_mut() {
            operator.run_dispatch_schedule(now, &mut self.dispatcher, false);
        }
    }
}
