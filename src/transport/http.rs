//! JSON-over-HTTP calls to downstream services.

use std::time::Duration;

use axum::http::HeaderMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::transport::DownstreamError;

/// Build the shared outbound HTTP client.
pub fn build_client(connect_timeout: Duration, request_timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .no_proxy()
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// POST `body` as JSON to `url` and decode a JSON reply.
pub async fn post_json<Req, Resp>(
    client: &reqwest::Client,
    url: &str,
    headers: HeaderMap,
    body: &Req,
) -> Result<Resp, DownstreamError>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    tracing::debug!(url = %url, "POST downstream");

    let res = client.post(url).headers(headers).json(body).send().await?;

    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        return Err(DownstreamError::Status {
            status: status.as_u16(),
            body: text.trim_end().to_string(),
        });
    }

    Ok(serde_json::from_str(&text)?)
}
