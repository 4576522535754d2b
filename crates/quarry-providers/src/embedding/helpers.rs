//! Shared HTTP plumbing for embedding providers

use reqwest::Response;

use quarry_domain::error::{Error, Result};

/// Classify a provider response and parse its JSON body
///
/// Rate limits and 5xx become `Retryable`, credential rejections become
/// `Unauthorized`, anything else surfaces as `InvalidInput` with the
/// provider's message.
pub async fn check_and_parse(response: Response, provider: &str) -> Result<serde_json::Value> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| Error::invalid_input(format!("{} response parse failed: {}", provider, e)));
    }

    let body = response.text().await.unwrap_or_default();
    let detail = body.chars().take(200).collect::<String>();
    if status.as_u16() == 429 || status.is_server_error() {
        Err(Error::retryable(format!(
            "{} returned {}: {}",
            provider, status, detail
        )))
    } else if status.as_u16() == 401 || status.as_u16() == 403 {
        Err(Error::unauthorized(format!(
            "{} rejected credentials: {}",
            provider, detail
        )))
    } else {
        Err(Error::invalid_input(format!(
            "{} returned {}: {}",
            provider, status, detail
        )))
    }
}

/// Map a reqwest error to the taxonomy
pub fn classify_request_error(error: reqwest::Error, provider: &str) -> Error {
    if error.is_timeout() || error.is_connect() {
        Error::retryable_with_source(format!("{} request failed", provider), error)
    } else {
        Error::invalid_input(format!("{} request failed: {}", provider, error))
    }
}

/// Pull a float vector out of a JSON array value
pub fn parse_vector(value: &serde_json::Value, context: &str) -> Result<Vec<f32>> {
    value
        .as_array()
        .ok_or_else(|| Error::invalid_input(format!("{}: missing embedding array", context)))
        .map(|items| {
            items
                .iter()
                .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                .collect()
        })
}
