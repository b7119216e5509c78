use crate::core::error::FetchError;
use crate::core::{Clock, GoldObservation, GoldPriceSource};
use crate::providers::util::get_body;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};

const SOURCE_NAME: &str = "gold price API";

/// Reads gold sell prices from the logam-mulia price API.
pub struct IndogoldProvider {
    client: reqwest::Client,
    url: String,
    clock: Arc<dyn Clock>,
}

impl IndogoldProvider {
    pub fn new(client: reqwest::Client, url: &str, clock: Arc<dyn Clock>) -> Self {
        IndogoldProvider {
            client,
            url: url.to_string(),
            clock,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PriceListResponse {
    data: Vec<PriceItem>,
}

/// Only the fields this provider reads; other products may carry anything.
#[derive(Debug, Deserialize)]
struct PriceItem {
    #[serde(rename = "type", default)]
    product_type: Option<String>,
    #[serde(default)]
    sell: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SellValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl SellValue {
    fn to_price(&self) -> Option<i64> {
        let price = match self {
            SellValue::Integer(value) => Some(*value),
            SellValue::Float(value) if value.is_finite() => Some(value.trunc() as i64),
            SellValue::Float(_) => None,
            SellValue::Text(text) => {
                let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
                digits.parse::<i64>().ok()
            }
        }?;
        (price >= 0).then_some(price)
    }
}

/// Picks the first item of `product_type` out of a price list payload.
fn select_sell_price(body: &str, product_type: &str) -> Result<i64, FetchError> {
    let response: PriceListResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::parse(SOURCE_NAME, format!("unexpected payload shape: {e}")))?;

    let item = response
        .data
        .iter()
        .find(|item| item.product_type.as_deref() == Some(product_type))
        .ok_or_else(|| FetchError::ProductNotFound(product_type.to_string()))?;

    let raw = item.sell.as_ref().ok_or_else(|| {
        FetchError::parse(SOURCE_NAME, format!("no sell price for '{product_type}'"))
    })?;
    serde_json::from_value::<SellValue>(raw.clone())
        .ok()
        .and_then(|sell| sell.to_price())
        .ok_or_else(|| {
            FetchError::parse(
                SOURCE_NAME,
                format!("invalid sell price {raw} for '{product_type}'"),
            )
        })
}

#[async_trait]
impl GoldPriceSource for IndogoldProvider {
    #[instrument(name = "GoldPriceFetch", skip(self), fields(product_type = %product_type))]
    async fn fetch_gold(&self, product_type: &str) -> Result<GoldObservation, FetchError> {
        let body = get_body(&self.client, &self.url, SOURCE_NAME).await?;
        let sell_price = select_sell_price(&body, product_type)?;

        // The API has no as-of date per item
        let today = self.clock.today();
        debug!(%today, sell_price, "Extracted gold sell price");

        Ok(GoldObservation::new(
            today.format("%Y-%m-%d").to_string(),
            sell_price,
        ))
    }
}
