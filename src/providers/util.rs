use crate::core::error::FetchError;
use reqwest::Client;
use tracing::debug;

/// Performs a single GET and returns the body of a successful response.
///
/// Transport errors and non-success statuses both map to `SourceUnavailable`.
pub async fn get_body(client: &Client, url: &str, source_name: &str) -> Result<String, FetchError> {
    debug!("Requesting {} data from {}", source_name, url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::unavailable(source_name, format!("request to {url} failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::unavailable(
            source_name,
            format!("{url} returned HTTP {status}"),
        ));
    }

    let body = response
        .text()
        .await
        .map_err(|e| FetchError::unavailable(source_name, format!("failed to read body: {e}")))?;
    debug!(bytes = body.len(), "Received {} response", source_name);
    Ok(body)
}
