//! YAML run configuration: deserialization, two-bucket validation, and
//! wiring into a runnable [`scheduler::Simulation`].

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use agents::{Consumer, Generator};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use corelib::region::RegionId;
use corelib::time::normalize_to_trading_day_start;
use events::{Event, ScheduledEvent};
use providers::{BidDataProvider, CsvPublicPricesProvider, CsvYestBidProvider, DemandForecastProvider, MathDemandForecastProvider, RandomDemandForecastProvider};
use scheduler::{RegionAgents, Simulation};
use serde::Deserialize;
use tracing::warn;

fn default_out_path() -> String {
    "./output.csv".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidSourceConfig {
    YestbidCsv(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandSourceConfig {
    PublicPricesCsv(String),
    Math,
    Random { seed: u64, min: f64, max: f64 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    pub id: String,
    pub region: String,
    pub bid_source: BidSourceConfig,
    pub fuel_type: Option<String>,
    #[serde(default)]
    pub markup: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsumerConfig {
    pub id: String,
    pub region: String,
    pub demand_source: DemandSourceConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventConfig {
    ChangeGeneratorMarkup {
        time_delta_minutes: i64,
        markup: f64,
        #[serde(default)]
        relative: bool,
        region: Option<String>,
        fuel_type: Option<String>,
    },
    ChangeGeneratorCapacityDataProvider {
        time_delta_minutes: i64,
        bid_source: BidSourceConfig,
        region: Option<String>,
        fuel_type: Option<String>,
    },
    ChangeConsumerDemandForecastDataProvider {
        time_delta_minutes: i64,
        demand_source: DemandSourceConfig,
        region: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataMonitorConfig {
    #[serde(default = "default_out_path")]
    pub out_path: String,
}

impl Default for DataMonitorConfig {
    fn default() -> Self {
        Self { out_path: default_out_path() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggerConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub regions: Vec<String>,
    #[serde(default)]
    pub generators: Vec<GeneratorConfig>,
    #[serde(default)]
    pub consumers: Vec<ConsumerConfig>,
    #[serde(default)]
    pub events: Vec<EventConfig>,
    #[serde(default)]
    pub data_monitor: DataMonitorConfig,
    #[serde(default)]
    pub logger: LoggerConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_context(|| format!("reading config file '{}'", path.display()))?;
        let config: Config =
            serde_yaml::from_str(&text).with_context(|| format!("parsing config file '{}'", path.display()))?;
        Ok(config)
    }

    /// Normalizes dates to the trading-day start and runs the two-bucket
    /// validation: critical errors abort before any `Simulation` is built;
    /// non-critical ones are fixed up in place and logged as warnings.
    pub fn validate_and_normalize(mut self) -> Result<Self, Vec<String>> {
        self.start_date = normalize_to_trading_day_start(self.start_date);
        self.end_date = normalize_to_trading_day_start(self.end_date);

        let mut critical = Vec::new();

        if self.end_date <= self.start_date {
            critical.push(format!("end_date ({}) must be after start_date ({})", self.end_date, self.start_date));
        }
        if self.regions.is_empty() {
            critical.push("regions must not be empty".to_string());
        }

        let mut seen_regions = HashSet::new();
        self.regions.retain(|region| {
            if seen_regions.insert(region.clone()) {
                true
            } else {
                warn!(region, "duplicate region in config, dropping later occurrence");
                false
            }
        });
        let known_regions: HashSet<&str> = self.regions.iter().map(String::as_str).collect();

        let mut seen_generator_ids = HashSet::new();
        self.generators.retain(|generator| {
            if !known_regions.contains(generator.region.as_str()) {
                critical.push(format!("generator '{}' references undeclared region '{}'", generator.id, generator.region));
                return false;
            }
            if !seen_generator_ids.insert(generator.id.clone()) {
                warn!(generator_id = %generator.id, "duplicate generator id in config, dropping later occurrence");
                return false;
            }
            if let BidSourceConfig::YestbidCsv(path) = &generator.bid_source {
                if !Path::new(path).exists() {
                    critical.push(format!("generator '{}' bid source '{}' does not exist", generator.id, path));
                }
            }
            true
        });

        let mut seen_consumer_ids = HashSet::new();
        self.consumers.retain(|consumer| {
            if !known_regions.contains(consumer.region.as_str()) {
                critical.push(format!("consumer '{}' references undeclared region '{}'", consumer.id, consumer.region));
                return false;
            }
            if !seen_consumer_ids.insert(consumer.id.clone()) {
                warn!(consumer_id = %consumer.id, "duplicate consumer id in config, dropping later occurrence");
                return false;
            }
            if let DemandSourceConfig::PublicPricesCsv(path) = &consumer.demand_source {
                if !Path::new(path).exists() {
                    critical.push(format!("consumer '{}' demand source '{}' does not exist", consumer.id, path));
                }
            }
            true
        });

        if !critical.is_empty() {
            return Err(critical);
        }
        Ok(self)
    }

    /// Builds the region/agent/event scaffolding and hands it to
    /// [`Simulation::new`], which pre-rolls before returning.
    pub fn build_simulation(&self) -> Result<Simulation> {
        let mut regions = Vec::with_capacity(self.regions.len());
        for region_name in &self.regions {
            let region_id = RegionId::new(region_name.as_str());
            let generators = self
                .generators
                .iter()
                .filter(|g| g.region == *region_name)
                .map(|g| build_generator(g, region_id.clone()))
                .collect::<Result<Vec<_>>>()?;
            let consumers = self
                .consumers
                .iter()
                .filter(|c| c.region == *region_name)
                .map(|c| build_consumer(c, region_id.clone()))
                .collect::<Result<Vec<_>>>()?;
            regions.push(RegionAgents { region_id, generators, consumers });
        }

        let events = self.events.iter().map(build_scheduled_event).collect::<Result<Vec<_>>>()?;

        Ok(Simulation::new(self.start_date, self.end_date, regions, events))
    }
}

fn build_bid_provider(source: &BidSourceConfig) -> Result<Arc<dyn BidDataProvider>> {
    match source {
        BidSourceConfig::YestbidCsv(path) => {
            Ok(Arc::new(CsvYestBidProvider::from_path(path).with_context(|| format!("loading bid source '{path}'"))?))
        }
    }
}

fn build_demand_provider(source: &DemandSourceConfig) -> Result<Arc<dyn DemandForecastProvider>> {
    match source {
        DemandSourceConfig::PublicPricesCsv(path) => Ok(Arc::new(
            CsvPublicPricesProvider::from_path(path).with_context(|| format!("loading demand source '{path}'"))?,
        )),
        DemandSourceConfig::Math => Ok(Arc::new(MathDemandForecastProvider::new())),
        DemandSourceConfig::Random { seed, min, max } => Ok(Arc::new(RandomDemandForecastProvider::new(*seed, *min, *max))),
    }
}

fn build_generator(config: &GeneratorConfig, region_id: RegionId) -> Result<Generator> {
    let provider = build_bid_provider(&config.bid_source)?;
    let mut generator = Generator::new(config.id.clone(), region_id, provider).with_markup(config.markup);
    if let Some(fuel_type) = &config.fuel_type {
        generator = generator.with_fuel_type(fuel_type.clone());
    }
    Ok(generator)
}

fn build_consumer(config: &ConsumerConfig, region_id: RegionId) -> Result<Consumer> {
    let provider = build_demand_provider(&config.demand_source)?;
    Ok(Consumer::new(config.id.clone(), region_id, provider))
}

fn build_scheduled_event(config: &EventConfig) -> Result<ScheduledEvent> {
    let (time_delta_minutes, event) = match config {
        EventConfig::ChangeGeneratorMarkup { time_delta_minutes, markup, relative, region, fuel_type } => (
            *time_delta_minutes,
            Event::ChangeGeneratorMarkup {
                markup: *markup,
                relative: *relative,
                region: region.as_deref().map(RegionId::new),
                fuel_type: fuel_type.clone(),
            },
        ),
        EventConfig::ChangeGeneratorCapacityDataProvider { time_delta_minutes, bid_source, region, fuel_type } => (
            *time_delta_minutes,
            Event::ChangeGeneratorCapacityDataProvider {
                provider: build_bid_provider(bid_source)?,
                region: region.as_deref().map(RegionId::new),
                fuel_type: fuel_type.clone(),
            },
        ),
        EventConfig::ChangeConsumerDemandForecastDataProvider { time_delta_minutes, demand_source, region } => (
            *time_delta_minutes,
            Event::ChangeConsumerDemandForecastDataProvider {
                provider: build_demand_provider(demand_source)?,
                region: region.as_deref().map(RegionId::new),
            },
        ),
    };
    Ok(ScheduledEvent { time_delta: chrono::Duration::minutes(time_delta_minutes), event })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            start_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(4, 0, 0).unwrap(),
            end_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(4, 0, 0).unwrap(),
            regions: vec!["VIC1".to_string()],
            generators: vec![],
            consumers: vec![],
            events: vec![],
            data_monitor: DataMonitorConfig::default(),
            logger: LoggerConfig::default(),
        }
    }

    #[test]
    fn end_date_before_start_date_is_a_critical_error() {
        let mut config = base_config();
        config.end_date = config.start_date - chrono::Duration::days(1);
        let errors = config.validate_and_normalize().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("end_date")));
    }

    #[test]
    fn empty_regions_is_a_critical_error() {
        let mut config = base_config();
        config.regions = vec![];
        let errors = config.validate_and_normalize().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("regions")));
    }

    #[test]
    fn generator_referencing_undeclared_region_is_a_critical_error() {
        let mut config = base_config();
        config.generators.push(GeneratorConfig {
            id: "GEN1".to_string(),
            region: "NSW1".to_string(),
            bid_source: BidSourceConfig::YestbidCsv("nonexistent.csv".to_string()),
            fuel_type: None,
            markup: 0.0,
        });
        let errors = config.validate_and_normalize().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("undeclared region")));
    }

    #[test]
    fn duplicate_region_is_deduplicated_not_fatal() {
        let mut config = base_config();
        config.regions.push("VIC1".to_string());
        let config = config.validate_and_normalize().unwrap();
        assert_eq!(config.regions, vec!["VIC1".to_string()]);
    }
}
