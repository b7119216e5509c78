//! Observations produced by the sources and the canonical record persisted by the sink

use chrono::NaiveDate;

/// Raw cell texts from the rate table, e.g. ("19 November 2024", "Rp 15.567,50").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateObservation {
    pub date: String,
    pub rate: String,
}

impl RateObservation {
    pub fn new(date: impl Into<String>, rate: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            rate: rate.into(),
        }
    }
}

/// Gold sell price stamped with the (ISO formatted) date it was fetched on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoldObservation {
    pub date: String,
    pub sell_price: i64,
}

impl GoldObservation {
    pub fn new(date: impl Into<String>, sell_price: i64) -> Self {
        Self {
            date: date.into(),
            sell_price,
        }
    }
}

/// One reconciled row, keyed by `date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub rate: i64,
    pub gold_sell_price: i64,
}
