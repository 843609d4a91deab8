use agents::{Consumer, Generator};
use corelib::dispatch::MessageDispatcher;
use corelib::message::Message;
use corelib::time::SimTime;
use market::{MarketOperator, OperatorError};

/// A borrowed view over the three concrete agent kinds, used wherever the
/// driver needs to treat them uniformly. Storage stays in
/// [`crate::simulation::Simulation`]'s typed per-kind maps; this replaces the
/// original's `isinstance` dispatch with an exhaustive match over a value
/// that never outlives the call that built it.
pub enum AgentMut<'a> {
    Generator(&'a mut Generator),
    Consumer(&'a mut Consumer),
    Operator(&'a mut MarketOperator),
}

impl<'a> AgentMut<'a> {
    pub fn step(&mut self, now: SimTime, dispatcher: &mut MessageDispatcher) {
        match self {
            AgentMut::Generator(g) => g.step(now, dispatcher),
            AgentMut::Consumer(c) => c.step(now, dispatcher),
            AgentMut::Operator(_) => {}
        }
    }

    pub fn handle_messages(&mut self, now: SimTime, messages: &[Message]) -> Result<(), OperatorError> {
        match self {
            AgentMut::Generator(g) => {
                g.handle_messages(messages);
                Ok(())
            }
            AgentMut::Consumer(_) => Ok(()),
            AgentMut::Operator(o) => o.handle_messages(now, messages),
        }
    }

    pub fn get_initialisation_times(&self, start_date: SimTime) -> Vec<SimTime> {
        match self {
            AgentMut::Generator(g) => g.get_initialisation_times(start_date),
            AgentMut::Consumer(c) => c.get_initialisation_times(start_date),
            AgentMut::Operator(_) => Vec::new(),
        }
    }
}
