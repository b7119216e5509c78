use crate::core::error::FetchError;
use crate::core::reconcile::parse_rate_date;
use crate::core::{RateObservation, RateSource};
use crate::providers::util::get_body;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const SOURCE_NAME: &str = "JISDOR";

/// Which data row of the rate table counts as "the latest".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowSelection {
    /// The first row after the header rows.
    #[default]
    First,
    /// The row with the greatest parseable date.
    Latest,
}

/// Reads the JISDOR reference rate table published by Bank Indonesia.
pub struct JisdorProvider {
    client: reqwest::Client,
    url: String,
    container_id: String,
    header_rows: usize,
    selection: RowSelection,
}

impl JisdorProvider {
    pub fn new(client: reqwest::Client, url: &str, container_id: &str) -> Self {
        JisdorProvider {
            client,
            url: url.to_string(),
            container_id: container_id.to_string(),
            header_rows: 1,
            selection: RowSelection::First,
        }
    }

    pub fn with_header_rows(mut self, header_rows: usize) -> Self {
        self.header_rows = header_rows;
        self
    }

    pub fn with_selection(mut self, selection: RowSelection) -> Self {
        self.selection = selection;
        self
    }
}

#[async_trait]
impl RateSource for JisdorProvider {
    #[instrument(name = "JisdorFetch", skip(self), fields(url = %self.url))]
    async fn fetch_rate(&self) -> Result<RateObservation, FetchError> {
        let body = get_body(&self.client, &self.url, SOURCE_NAME).await?;
        let observation =
            parse_rate_table(&body, &self.container_id, self.header_rows, self.selection)?;
        debug!(date = %observation.date, rate = %observation.rate, "Extracted rate row");
        Ok(observation)
    }
}

fn selector(css: &str) -> Result<Selector, FetchError> {
    Selector::parse(css)
        .map_err(|e| FetchError::parse(SOURCE_NAME, format!("bad selector '{css}': {e}")))
}

fn cell_texts(row: ElementRef<'_>, cell: &Selector) -> Vec<String> {
    row.select(cell)
        .map(|td| td.text().collect::<String>().trim().to_string())
        .collect()
}

/// Extracts the (date, rate) texts of the selected data row.
///
/// Rows live under the element whose id is `container_id`; the first
/// `header_rows` rows are skipped.
pub fn parse_rate_table(
    html: &str,
    container_id: &str,
    header_rows: usize,
    selection: RowSelection,
) -> Result<RateObservation, FetchError> {
    let document = Html::parse_document(html);
    let container_selector = selector(&format!("[id=\"{container_id}\"]"))?;
    let row_selector = selector("tr")?;
    let cell_selector = selector("td")?;

    let container = document.select(&container_selector).next().ok_or_else(|| {
        FetchError::parse(SOURCE_NAME, format!("container '#{container_id}' not found"))
    })?;

    let rows: Vec<Vec<String>> = container
        .select(&row_selector)
        .skip(header_rows)
        .map(|row| cell_texts(row, &cell_selector))
        .collect();

    let row = match selection {
        RowSelection::First => rows.into_iter().next().ok_or_else(|| {
            FetchError::parse(SOURCE_NAME, format!("no data row after {header_rows} header row(s)"))
        })?,
        RowSelection::Latest => rows
            .into_iter()
            .filter_map(|cells| {
                let date = cells.first().and_then(|text| parse_rate_date(text))?;
                Some((date, cells))
            })
            .max_by_key(|(date, _)| *date)
            .map(|(_, cells)| cells)
            .ok_or_else(|| FetchError::parse(SOURCE_NAME, "no data row has a parseable date"))?,
    };

    match row.as_slice() {
        [date, rate, ..] => Ok(RateObservation::new(date.as_str(), rate.as_str())),
        _ => Err(FetchError::parse(
            SOURCE_NAME,
            format!("expected at least 2 cells in data row, found {}", row.len()),
        )),
    }
}
