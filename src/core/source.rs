//! Source and sink abstractions

use crate::core::error::{FetchError, SinkError};
use crate::core::record::{DailyRecord, GoldObservation, RateObservation};
use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, Utc};

#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rate(&self) -> Result<RateObservation, FetchError>;
}

#[async_trait]
pub trait GoldPriceSource: Send + Sync {
    async fn fetch_gold(&self, product_type: &str) -> Result<GoldObservation, FetchError>;
}

/// Durable storage for daily records. Implementations are blocking.
pub trait RecordSink: Send + Sync {
    fn upsert(&self, record: &DailyRecord) -> Result<(), SinkError>;

    /// Writes all records or none of them.
    fn upsert_all(&self, records: &[DailyRecord]) -> Result<(), SinkError>;

    fn get(&self, date: NaiveDate) -> Result<Option<DailyRecord>, SinkError>;

    /// Most recent records first.
    fn recent(&self, limit: usize) -> Result<Vec<DailyRecord>, SinkError>;
}

/// Supplies the processing date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }
}

pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
