pub mod agent;
pub mod simulation;

pub use agent::AgentMut;
pub use simulation::{RegionAgents, Simulation};
