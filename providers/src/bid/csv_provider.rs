use std::collections::BTreeMap;
use std::path::Path;

use chrono::{NaiveDateTime, Timelike};
use corelib::message::{AvailabilityRebid, DispatchOffer, TradingIntervalAvailabilityBid};
use corelib::time::{SimTime, NUM_PRICE_BANDS};
use tracing::warn;

use super::{Bid, BidDataProvider};
use crate::error::ProviderError;

const ROW_TAG_INDEX: usize = 0;
const BID_OFFER_TYPE_INDEX: usize = 2;
const SETTLEMENT_DATE_INDEX: usize = 4;
const DUID_INDEX: usize = 5;
const BID_TYPE_INDEX: usize = 6;
const BID_OFFER_DATE_INDEX: usize = 8;
const TRADING_INTERVAL_DATE_INDEX: usize = 9;
const MAX_AVAILABILITY_INDEX: usize = 10;
const ROC_UP_INDEX: usize = 12;
const ROC_DOWN_INDEX: usize = 13;
const PRICE_BAND1_INDEX: usize = 13;
const AVAILABILITY_BAND1_INDEX: usize = 18;
const PHYSICAL_AVAILABILITY_INDEX: usize = 28;
const BID_ENTRY_TYPE_INDEX: usize = 32;

fn parse_date(s: &str) -> Option<SimTime> {
    NaiveDateTime::parse_from_str(s.trim(), "%Y/%m/%d %H:%M:%S")
        .ok()
        .map(|t| t.with_second(0).expect("0 is a valid second"))
}

fn parse_f64(s: &str) -> f64 {
    s.trim().parse().unwrap_or(0.0)
}

fn parse_bands(record: &csv::StringRecord, start: usize) -> [f64; NUM_PRICE_BANDS] {
    let mut bands = [0.0; NUM_PRICE_BANDS];
    for (i, band) in bands.iter_mut().enumerate() {
        *band = record.get(start + i).map(parse_f64).unwrap_or(0.0);
    }
    bands
}

struct DayOfferRow {
    duid: String,
    settlement: SimTime,
    offer_date: SimTime,
    entry_type: String,
    price_bands: [f64; NUM_PRICE_BANDS],
}

struct PerOfferRow {
    duid: String,
    offer_date: SimTime,
    trading_interval_date: SimTime,
    max_availability: f64,
    physical_availability: f64,
    roc_up: f64,
    roc_down: f64,
    availability_bands: [f64; NUM_PRICE_BANDS],
}

/// Canonical reader for AEMO "YESTBID" bid-day-offer / bid-per-offer CSV
/// exports. See the column map this is grounded on for the exact indices.
pub struct CsvYestBidProvider {
    bids_by_duid: BTreeMap<String, BTreeMap<SimTime, Vec<Bid>>>,
}

impl CsvYestBidProvider {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut day_offer_rows: Vec<DayOfferRow> = Vec::new();
        let mut per_offer_rows: Vec<PerOfferRow> = Vec::new();

        for (line, result) in reader.records().enumerate() {
            let record = match result {
                Ok(r) => r,
                Err(err) => {
                    warn!(line, %err, "skipping unreadable CSV row");
                    continue;
                }
            };
            if record.get(ROW_TAG_INDEX) != Some("D") {
                continue;
            }
            if record.get(BID_TYPE_INDEX) != Some("ENERGY") {
                continue;
            }
            let Some(duid) = record.get(DUID_INDEX) else {
                let err = ProviderError::MissingColumn { index: DUID_INDEX };
                warn!(line, %err, "skipping row");
                continue;
            };
            let Some(offer_date) = record.get(BID_OFFER_DATE_INDEX).and_then(parse_date) else {
                let err = ProviderError::MalformedRow { line, reason: "unparseable bid-offer date".to_string() };
                warn!(%err, "skipping row");
                continue;
            };

            match record.get(BID_OFFER_TYPE_INDEX) {
                Some("BIDDAYOFFER") => {
                    let Some(settlement) = record.get(SETTLEMENT_DATE_INDEX).and_then(parse_date) else {
                        let err = ProviderError::MalformedRow { line, reason: "unparseable settlement date".to_string() };
                        warn!(%err, "skipping BIDDAYOFFER row");
                        continue;
                    };
                    let entry_type = record.get(BID_ENTRY_TYPE_INDEX).unwrap_or("DAILY").to_string();
                    day_offer_rows.push(DayOfferRow {
                        duid: duid.to_string(),
                        settlement,
                        offer_date,
                        entry_type,
                        price_bands: parse_bands(&record, PRICE_BAND1_INDEX),
                    });
                }
                Some("BIDPEROFFER") => {
                    let Some(trading_interval_date) =
                        record.get(TRADING_INTERVAL_DATE_INDEX).and_then(parse_date)
                    else {
                        let err =
                            ProviderError::MalformedRow { line, reason: "unparseable trading-interval date".to_string() };
                        warn!(%err, "skipping BIDPEROFFER row");
                        continue;
                    };
                    per_offer_rows.push(PerOfferRow {
                        duid: duid.to_string(),
                        offer_date,
                        trading_interval_date,
                        max_availability: record.get(MAX_AVAILABILITY_INDEX).map(parse_f64).unwrap_or(0.0),
                        physical_availability: record
                            .get(PHYSICAL_AVAILABILITY_INDEX)
                            .map(parse_f64)
                            .unwrap_or(0.0),
                        roc_up: record.get(ROC_UP_INDEX).map(parse_f64).unwrap_or(0.0),
                        roc_down: record.get(ROC_DOWN_INDEX).map(parse_f64).unwrap_or(0.0),
                        availability_bands: parse_bands(&record, AVAILABILITY_BAND1_INDEX),
                    });
                }
                other => {
                    warn!(line, bid_offer_type = ?other, "skipping row of unknown bid-offer type");
                }
            }
        }

        Ok(Self {
            bids_by_duid: build_bid_index(day_offer_rows, per_offer_rows),
        })
    }
}

/// Assembles the final per-generator, per-offer-time bid index, applying the
/// rebid-promotion rule: a generator with only `REBID` day-offer rows and no
/// `DAILY`/`DEFAULT` row has its earliest rebid promoted into a synthesized
/// [`DispatchOffer`], since rebid rows still carry price-band columns.
fn build_bid_index(
    day_offer_rows: Vec<DayOfferRow>,
    per_offer_rows: Vec<PerOfferRow>,
) -> BTreeMap<String, BTreeMap<SimTime, Vec<Bid>>> {
    let mut by_duid: BTreeMap<String, Vec<DayOfferRow>> = BTreeMap::new();
    for row in day_offer_rows {
        by_duid.entry(row.duid.clone()).or_default().push(row);
    }

    let mut availability_by_duid_offer_date: BTreeMap<(String, SimTime), BTreeMap<SimTime, TradingIntervalAvailabilityBid>> =
        BTreeMap::new();
    for row in per_offer_rows {
        let bid = TradingIntervalAvailabilityBid {
            availability_per_band: row.availability_bands,
            max_availability: row.max_availability,
            physical_availability: row.physical_availability,
            rate_of_change_up_per_min: row.roc_up,
            rate_of_change_down_per_min: row.roc_down,
        };
        availability_by_duid_offer_date
            .entry((row.duid, row.offer_date))
            .or_default()
            .insert(row.trading_interval_date, bid);
    }

    let mut result: BTreeMap<String, BTreeMap<SimTime, Vec<Bid>>> = BTreeMap::new();

    for (duid, mut rows) in by_duid {
        rows.sort_by_key(|r| r.offer_date);
        let has_priced = rows.iter().any(|r| r.entry_type == "DAILY" || r.entry_type == "DEFAULT");

        let mut promoted = false;
        for row in rows {
            let availability = availability_by_duid_offer_date
                .remove(&(duid.clone(), row.offer_date))
                .unwrap_or_default();

            let is_rebid = row.entry_type == "REBID";
            let bid = if is_rebid && (!has_priced) && !promoted {
                promoted = true;
                Bid::Offer(DispatchOffer {
                    generator_id: duid.clone(),
                    settlement: row.settlement,
                    offer_submission_time: row.offer_date,
                    price_per_band: row.price_bands,
                    availability_bid_by_trading_interval: availability,
                })
            } else if is_rebid {
                Bid::Rebid(AvailabilityRebid {
                    generator_id: duid.clone(),
                    settlement: row.settlement,
                    offer_submission_time: row.offer_date,
                    availability_bid_by_trading_interval: availability,
                    explanation: String::new(),
                })
            } else {
                Bid::Offer(DispatchOffer {
                    generator_id: duid.clone(),
                    settlement: row.settlement,
                    offer_submission_time: row.offer_date,
                    price_per_band: row.price_bands,
                    availability_bid_by_trading_interval: availability,
                })
            };

            result
                .entry(duid.clone())
                .or_default()
                .entry(row.offer_date)
                .or_default()
                .push(bid);
        }
    }

    result
}

impl BidDataProvider for CsvYestBidProvider {
    fn bids_at(&self, generator_id: &str, offer_time: SimTime) -> Vec<Bid> {
        self.bids_by_duid
            .get(generator_id)
            .and_then(|by_time| by_time.get(&offer_time))
            .cloned()
            .unwrap_or_default()
    }

    fn bids_before(&self, generator_id: &str, horizon_time: SimTime) -> BTreeMap<SimTime, Vec<Bid>> {
        self.bids_by_duid
            .get(generator_id)
            .map(|by_time| {
                by_time
                    .range(..horizon_time)
                    .map(|(t, bids)| (*t, bids.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}
