//! Clock and interval arithmetic for the simulated timeline.
//!
//! All routines here are pure and total: given a `SimTime`, they compute
//! dispatch/trading/day alignments with no fallible paths. The simulator
//! never reads the wall clock; every `SimTime` in the system originates
//! from configuration or from stepping the clock by a fixed duration.

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};

/// A point in simulated time, minute granularity.
pub type SimTime = NaiveDateTime;

pub const DISPATCH_INTERVAL_MINUTES: i64 = 5;
pub const DISPATCH_INTERVALS_PER_TRADING_INTERVAL: i64 = 6;
pub const TRADING_INTERVAL_MINUTES: i64 = DISPATCH_INTERVAL_MINUTES * DISPATCH_INTERVALS_PER_TRADING_INTERVAL;
pub const TRADING_DAY_START_HOUR: u32 = 4;
pub const DAILY_DISPATCH_OFFER_CUTOFF_HOUR: u32 = 12;
pub const DAILY_DISPATCH_OFFER_CUTOFF_MINUTE: u32 = 30;
pub const MARKET_PRICE_CAP: f64 = 12500.0;
pub const MARKET_FLOOR_CAP: f64 = -1000.0;
pub const NUM_PRICE_BANDS: usize = 10;
pub const DISPATCH_INTERVALS_PER_DAY: i64 = 24 * 60 / DISPATCH_INTERVAL_MINUTES;

fn at_midnight(t: SimTime) -> SimTime {
    t.date().and_time(NaiveTime::MIN)
}

/// Floors `t` to the nearest (at-or-before) 5-minute dispatch-interval boundary, seconds zeroed.
pub fn floor_to_dispatch_interval(t: SimTime) -> SimTime {
    let minute = (t.minute() as i64 / DISPATCH_INTERVAL_MINUTES) * DISPATCH_INTERVAL_MINUTES;
    t.date()
        .and_hms_opt(t.hour(), minute as u32, 0)
        .expect("minute is always in range 0..60")
}

/// True iff `t` falls exactly on a dispatch-interval boundary (minute % 5 == 0, seconds == 0).
pub fn is_dispatch_interval_boundary(t: SimTime) -> bool {
    t.second() == 0 && t.minute() % (DISPATCH_INTERVAL_MINUTES as u32) == 0
}

/// The trading-interval end enclosing `t`: the next :00 or :30 mark, or `t` itself if already aligned.
pub fn trading_interval_end_for(t: SimTime) -> SimTime {
    let minute = t.minute();
    let base = t.date().and_hms_opt(t.hour(), 0, 0).expect("valid hour");
    if minute == 0 {
        base
    } else if minute <= 30 {
        base + Duration::minutes(30)
    } else {
        base + Duration::hours(1)
    }
}

/// The trading-day settlement stamp containing `t`: 00:00 of the same day if `t.hour() >= 4`,
/// else 00:00 of the previous day.
pub fn trading_day_settlement_for(t: SimTime) -> SimTime {
    if t.hour() >= TRADING_DAY_START_HOUR {
        at_midnight(t)
    } else {
        at_midnight(t) - Duration::days(1)
    }
}

/// The bid-cutoff instant for a trading day whose settlement stamp is `settlement`:
/// 12:30 of the calendar day before `settlement`.
pub fn cutoff_for(settlement: SimTime) -> SimTime {
    (settlement - Duration::days(1))
        .date()
        .and_hms_opt(DAILY_DISPATCH_OFFER_CUTOFF_HOUR, DAILY_DISPATCH_OFFER_CUTOFF_MINUTE, 0)
        .expect("cutoff hour/minute always valid")
}

/// Normalizes a configured date to the trading-day start (04:00:00).
pub fn normalize_to_trading_day_start(t: SimTime) -> SimTime {
    at_midnight(t) + Duration::hours(TRADING_DAY_START_HOUR as i64)
}

/// `n`, the dispatch-interval-of-day index (0..287) for `t`, counted from trading-day start.
pub fn dispatch_interval_of_day(t: SimTime) -> i64 {
    let settlement_start = at_midnight(t) + Duration::hours(TRADING_DAY_START_HOUR as i64);
    let delta = if t >= settlement_start {
        t - settlement_start
    } else {
        t - (settlement_start - Duration::days(1))
    };
    delta.num_minutes() / DISPATCH_INTERVAL_MINUTES
}

pub fn clamp_price(price: f64) -> f64 {
    price.clamp(MARKET_FLOOR_CAP, MARKET_PRICE_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32) -> SimTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, 0).unwrap()
    }

    #[test]
    fn trading_interval_end_rounds_up_to_next_half_hour() {
        assert_eq!(trading_interval_end_for(dt(2024, 1, 1, 10, 5)), dt(2024, 1, 1, 10, 30));
        assert_eq!(trading_interval_end_for(dt(2024, 1, 1, 10, 30)), dt(2024, 1, 1, 10, 30));
        assert_eq!(trading_interval_end_for(dt(2024, 1, 1, 10, 45)), dt(2024, 1, 1, 11, 0));
        assert_eq!(trading_interval_end_for(dt(2024, 1, 1, 10, 0)), dt(2024, 1, 1, 10, 0));
    }

    #[test]
    fn trading_day_settlement_before_4am_is_previous_day() {
        assert_eq!(trading_day_settlement_for(dt(2024, 1, 2, 3, 59)), dt(2024, 1, 1, 0, 0));
        assert_eq!(trading_day_settlement_for(dt(2024, 1, 2, 4, 0)), dt(2024, 1, 2, 0, 0));
    }

    #[test]
    fn cutoff_is_1230_the_day_before_settlement() {
        assert_eq!(cutoff_for(dt(2024, 1, 2, 0, 0)), dt(2024, 1, 1, 12, 30));
    }

    #[test]
    fn floor_to_dispatch_interval_truncates_to_5_minutes() {
        assert_eq!(floor_to_dispatch_interval(dt(2024, 1, 1, 10, 7)), dt(2024, 1, 1, 10, 5));
    }
}
