mod csv_provider;
mod math_provider;
mod random_provider;

pub use csv_provider::CsvPublicPricesProvider;
pub use math_provider::MathDemandForecastProvider;
pub use random_provider::RandomDemandForecastProvider;

use corelib::region::RegionId;
use corelib::time::SimTime;

/// Per-region, per-dispatch-interval demand lookup. Implementations are pure
/// functions of time and region except where noted (the CSV reader looks
/// ahead at actual recorded demand).
pub trait DemandForecastProvider: Send + Sync {
    fn demand_forecast(&self, region_id: &RegionId, dispatch_interval: SimTime) -> Option<f64>;
}
