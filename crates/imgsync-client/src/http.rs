//! Request plumbing shared by both clients.

use imgsync_core::HostError;
use serde::de::DeserializeOwned;

/// Send a request and map failures onto [`HostError`].
///
/// Transport failures (nothing came back) become `Network`; non-2xx
/// statuses are classified by [`HostError::from_status`].
pub(crate) async fn send(
    request: reqwest::RequestBuilder,
    operation: &str,
) -> Result<reqwest::Response, HostError> {
    let resp = request.send().await.map_err(|e| HostError::Network {
        operation: operation.to_string(),
        detail: e.to_string(),
    })?;

    if resp.status().is_success() {
        return Ok(resp);
    }

    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    tracing::debug!(operation, status, "request failed");
    Err(HostError::from_status(operation, status, body))
}

/// Decode a JSON response body.
pub(crate) async fn decode<T: DeserializeOwned>(
    resp: reqwest::Response,
    operation: &str,
) -> Result<T, HostError> {
    resp.json().await.map_err(|e| HostError::Malformed {
        operation: operation.to_string(),
        detail: e.to_string(),
    })
}

/// Trim trailing slashes so paths can be appended with `/`.
pub(crate) fn trim_base(url: &url::Url) -> String {
    url.as_str().trim_end_matches('/').to_string()
}
