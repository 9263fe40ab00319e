//! Shared plumbing for the REST adapters

use crate::domain::{AzLearnError, RequestError, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, ClientBuilder, Response};
use std::time::Duration;

/// Builds the HTTP client used by every REST adapter
///
/// # Errors
///
/// Returns a configuration error if the TLS backend cannot be initialized
pub fn build_client(timeout_seconds: u64) -> Result<Client> {
    ClientBuilder::new()
        .timeout(Duration::from_secs(timeout_seconds))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| AzLearnError::Configuration(format!("Failed to create HTTP client: {e}")))
}

/// Maps a transport failure to a connection error
pub fn send_error(operation: &str, err: reqwest::Error) -> AzLearnError {
    AzLearnError::Connection(format!("{operation} request failed: {err}"))
}

/// Passes successful responses through and turns the rest into a
/// [`RequestError`] carrying the status and the response body
pub async fn check_status(operation: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::debug!(operation, status = status.as_u16(), body = %body, "Request failed");
    let message = format!("{operation}: {}", error_message(&body, status));
    Err(RequestError::from_status(status.as_u16(), message).into())
}

/// Pulls `error.message` out of a JSON error body, falling back to the raw text
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value
            .pointer("/error/message")
            .or_else(|| value.get("message"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
    }
    if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        body.trim().to_string()
    }
}

/// Formats a timestamp the way HTTP headers expect (RFC 1123)
///
/// ```
/// use azlearn::adapters::http::rfc1123;
/// use chrono::{TimeZone, Utc};
///
/// let at = Utc.with_ymd_and_hms(2024, 3, 5, 8, 9, 10).unwrap();
/// assert_eq!(rfc1123(at), "Tue, 05 Mar 2024 08:09:10 GMT");
/// ```
pub fn rfc1123(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_json_message() {
        let body = r#"{"error":{"code":"SecretNotFound","message":"Secret x was not found"}}"#;
        assert_eq!(
            error_message(body, reqwest::StatusCode::NOT_FOUND),
            "Secret x was not found"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_reason() {
        assert_eq!(
            error_message("", reqwest::StatusCode::CONFLICT),
            "Conflict"
        );
    }
}
