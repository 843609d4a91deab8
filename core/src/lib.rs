pub mod dispatch;
pub mod info;
pub mod message;
pub mod region;
pub mod time;

pub use dispatch::MessageDispatcher;
pub use info::{DispatchIntervalInfo, TradingIntervalInfo};
pub use message::{
    AvailabilityRebid, DemandForecast, DispatchNotification, DispatchOffer, Message,
    TradingIntervalAvailabilityBid,
};
pub use region::RegionId;
pub use time::SimTime;
