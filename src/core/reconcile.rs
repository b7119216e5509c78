//! Aligns rate and gold observations into canonical daily records.
//!
//! Both sides are normalized independently: dates are parsed (and observations
//! with unparseable dates dropped), the locale formatted rate is turned into an
//! integer, and the surviving rows are paired by position.

use crate::core::error::{ReconcileError, Side};
use crate::core::record::{DailyRecord, GoldObservation, RateObservation};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, warn};

const RATE_DATE_FORMAT: &str = "%d %B %Y";
const GOLD_DATE_FORMAT: &str = "%Y-%m-%d";
const CURRENCY_PREFIX: &str = "rp";

const INDONESIAN_MONTHS: [(&str, &str); 9] = [
    ("januari", "January"),
    ("februari", "February"),
    ("maret", "March"),
    ("mei", "May"),
    ("juni", "June"),
    ("juli", "July"),
    ("agustus", "August"),
    ("oktober", "October"),
    ("desember", "December"),
];

/// How rate and gold rows are matched up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairingMode {
    /// Pair by position without comparing dates. The record takes the rate's date.
    #[default]
    Positional,
    /// Pair by position and reject pairs whose dates disagree.
    Strict,
}

/// Parses a `DD MonthName YYYY` date such as "19 November 2024" or "2 Desember 2024".
pub fn parse_rate_date(raw: &str) -> Option<NaiveDate> {
    let normalized = raw
        .split_whitespace()
        .map(|token| {
            INDONESIAN_MONTHS
                .iter()
                .find(|(id, _)| token.eq_ignore_ascii_case(id))
                .map_or(token, |(_, en)| *en)
        })
        .collect::<Vec<_>>()
        .join(" ");

    NaiveDate::parse_from_str(&normalized, RATE_DATE_FORMAT).ok()
}

pub fn parse_gold_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), GOLD_DATE_FORMAT).ok()
}

/// Converts "Rp 15.567,50" to 15567: the fractional part is truncated.
pub fn parse_rate_value(raw: &str) -> Result<i64, ReconcileError> {
    let malformed = || ReconcileError::MalformedRate(raw.to_string());

    let trimmed = raw.trim();
    let unprefixed = match trimmed.get(..CURRENCY_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(CURRENCY_PREFIX) => {
            &trimmed[CURRENCY_PREFIX.len()..]
        }
        _ => trimmed,
    };

    let numeric: String = unprefixed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    // Digits with at most one decimal point; rules out signs and exponents
    let well_formed = numeric.chars().any(|c| c.is_ascii_digit())
        && numeric.chars().all(|c| c.is_ascii_digit() || c == '.')
        && numeric.matches('.').count() <= 1;
    if !well_formed {
        return Err(malformed());
    }

    let value = Decimal::from_str(&numeric).map_err(|_| malformed())?;
    value.trunc().to_i64().ok_or_else(malformed)
}

/// Reconciles a single pair of observations.
pub fn reconcile(
    rate: &RateObservation,
    gold: &GoldObservation,
    mode: PairingMode,
) -> Result<DailyRecord, ReconcileError> {
    reconcile_all(std::slice::from_ref(rate), std::slice::from_ref(gold), mode)?
        .into_iter()
        .next()
        .ok_or(ReconcileError::NoValidDates)
}

/// Reconciles any number of observations on each side.
///
/// Rows with unparseable dates are dropped first. The remaining rows are paired
/// by position up to the shorter side's length; extra rows are ignored.
pub fn reconcile_all(
    rates: &[RateObservation],
    golds: &[GoldObservation],
    mode: PairingMode,
) -> Result<Vec<DailyRecord>, ReconcileError> {
    let dated_rates: Vec<(NaiveDate, &str)> = rates
        .iter()
        .filter_map(|obs| match parse_rate_date(&obs.date) {
            Some(date) => Some((date, obs.rate.as_str())),
            None => {
                warn!(date = %obs.date, "Dropping rate observation with unparseable date");
                None
            }
        })
        .collect();

    let dated_golds: Vec<(NaiveDate, i64)> = golds
        .iter()
        .filter_map(|obs| match parse_gold_date(&obs.date) {
            Some(date) => Some((date, obs.sell_price)),
            None => {
                warn!(date = %obs.date, "Dropping gold observation with unparseable date");
                None
            }
        })
        .collect();

    match (dated_rates.is_empty(), dated_golds.is_empty()) {
        (true, true) => return Err(ReconcileError::NoValidDates),
        (true, false) => return Err(ReconcileError::EmptyAfterFiltering { side: Side::Rate }),
        (false, true) => return Err(ReconcileError::EmptyAfterFiltering { side: Side::Gold }),
        (false, false) => {}
    }

    let parsed_rates = dated_rates
        .into_iter()
        .map(|(date, raw)| parse_rate_value(raw).map(|rate| (date, rate)))
        .collect::<Result<Vec<_>, _>>()?;

    if parsed_rates.len() != dated_golds.len() {
        debug!(
            rates = parsed_rates.len(),
            golds = dated_golds.len(),
            "Observation counts differ, pairing the shorter prefix"
        );
    }

    parsed_rates
        .into_iter()
        .zip(dated_golds)
        .map(|((rate_date, rate), (gold_date, gold_sell_price))| {
            if mode == PairingMode::Strict && rate_date != gold_date {
                return Err(ReconcileError::DateMismatch {
                    rate_date,
                    gold_date,
                });
            }
            if rate_date != gold_date {
                debug!(%rate_date, %gold_date, "Pairing observations with different dates");
            }
            Ok(DailyRecord {
                date: rate_date,
                rate,
                gold_sell_price,
            })
        })
        .collect()
}
