//! Behavior request handling.
//!
//! # Responsibilities
//! - Ignore HEAD probes (empty 200)
//! - Turn the query string into behavior params
//! - Run the requested behavior and encode its entries as JSON

use std::sync::Arc;

use axum::{
    extract::{RawQuery, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::client::trace::BEHAVIOR_TRACE;
use crate::client::Dispatcher;
use crate::crossdock::{self, extract_params, Entry, Fatal, T};

/// Build the per-client router. Every path reaches the behavior handler.
pub(crate) fn build_router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/", any(behavior_request_handler))
        .fallback(behavior_request_handler)
        .with_state(dispatcher)
        .layer(TraceLayer::new_for_http())
}

async fn behavior_request_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    method: Method,
    RawQuery(query): RawQuery,
) -> Response {
    if method == Method::HEAD {
        return StatusCode::OK.into_response();
    }

    let params = extract_params(query.as_deref());
    let entries = crossdock::run(params, |t| async move { dispatcher.dispatch(&t).await }).await;

    encode_entries(&entries)
}

fn encode_entries(entries: &[Entry]) -> Response {
    match serde_json::to_vec(entries) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode entries");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

impl Dispatcher {
    pub(crate) async fn dispatch(&self, t: &T) -> Result<(), Fatal> {
        let behavior = t.behavior();
        tracing::info!(behavior = %behavior, "Client handling behavior");

        match behavior {
            BEHAVIOR_TRACE => self.trace(t).await,
            other => {
                t.error(format!("unknown behavior {:?}", other));
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, TimeoutConfig};
    use crate::crossdock::Status;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn router() -> Router {
        let config = ClientConfig::default().with_defaults();
        build_router(Arc::new(Dispatcher::new(config, &TimeoutConfig::default())))
    }

    async fn entries_for(uri: &str) -> Vec<Entry> {
        let res = router()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "application/json");
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_head_returns_empty_body() {
        let res = router()
            .oneshot(
                Request::head("/?behavior=trace&sampled=nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_behavior() {
        let entries = entries_for("/?behavior=bogus").await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, Status::Failed);
        assert!(entries[0].output.contains("bogus"), "{}", entries[0].output);
    }

    #[tokio::test]
    async fn test_missing_behavior() {
        let entries = entries_for("/").await;
        assert_eq!(entries.len(), 1);
        assert_ne!(entries[0].status, Status::Passed);
        assert_eq!(entries[0].output, "unknown behavior \"\"");
    }

    #[tokio::test]
    async fn test_last_behavior_value_wins() {
        let entries = entries_for("/?behavior=trace&behavior=other").await;
        assert_eq!(entries.len(), 1);
        assert!(entries[0].output.contains("other"));
    }

    #[tokio::test]
    async fn test_malformed_sampled_is_fatal() {
        let entries = entries_for("/?behavior=trace&sampled=maybe").await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, Status::Failed);
        assert!(entries[0].output.starts_with("Malformed param sampled"));
    }

    #[tokio::test]
    async fn test_any_path_reaches_behavior_handler() {
        for uri in ["/crossdock?behavior=bogus", "//?behavior=bogus"] {
            let entries = entries_for(uri).await;
            assert_eq!(entries.len(), 1, "{}", uri);
            assert!(entries[0].output.contains("bogus"), "{}", uri);
        }

        let res = router()
            .oneshot(Request::post("/anything").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
