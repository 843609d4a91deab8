pub mod bid;
pub mod demand;
pub mod error;

pub use bid::{Bid, BidDataProvider, CsvYestBidProvider};
pub use demand::{CsvPublicPricesProvider, DemandForecastProvider, MathDemandForecastProvider, RandomDemandForecastProvider};
pub use error::ProviderError;
