//! Trace handlers shared by the HTTP and RPC front ends.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::config::TimeoutConfig;
use crate::protocol::{
    Downstream, JoinTraceRequest, ObservedSpan, StartTraceRequest, TraceResponse, Transport,
    BAGGAGE_KEY,
};
use opentelemetry::Context;

use crate::tracer::{self, HeaderExtractor, HeaderInjector, Span, Tracer};
use crate::transport::rpc::{self, RpcHandler, RpcRequest, RpcResponse};
use crate::transport::{http, DownstreamError};

/// RPC method answering a join-trace request.
pub const JOIN_TRACE_METHOD: &str = "join_trace";

/// Message returned by the placeholder transport.
pub const DUMMY_NOT_IMPLEMENTED: &str = "DUMMY transport not implemented";

/// Observes incoming traces and forwards them downstream.
pub struct TraceHandler {
    tracer: Tracer,
    http: reqwest::Client,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl TraceHandler {
    pub fn new(tracer: Tracer, timeouts: &TimeoutConfig) -> Self {
        let connect_timeout = Duration::from_secs(timeouts.connect_secs);
        let request_timeout = Duration::from_secs(timeouts.request_secs);
        Self {
            tracer,
            http: http::build_client(connect_timeout, request_timeout),
            connect_timeout,
            request_timeout,
        }
    }

    /// Start a new trace (S1) and walk the rest of the chain.
    pub async fn start_trace(
        &self,
        request: StartTraceRequest,
    ) -> Result<TraceResponse, DownstreamError> {
        let mut span = self.tracer.start_root(&request.server_role, request.sampled);
        span.set_baggage_item(BAGGAGE_KEY, request.baggage);

        tracing::info!(
            role = %request.server_role,
            trace_id = %span.trace_id_hex(),
            sampled = span.is_sampled(),
            "Trace started"
        );

        let result = self.prepare_response(&span, request.downstream.as_ref()).await;
        span.finish();
        result
    }

    /// Join the trace propagated by `parent` (S2, S3).
    pub async fn join_trace(
        &self,
        request: JoinTraceRequest,
        parent: Option<Context>,
    ) -> Result<TraceResponse, DownstreamError> {
        if parent.is_none() {
            tracing::warn!(role = %request.server_role, "No trace context on join, starting a new trace");
        }
        let span = self.tracer.start_server_span(&request.server_role, parent.as_ref());

        tracing::info!(
            role = %request.server_role,
            trace_id = %span.trace_id_hex(),
            "Trace joined"
        );

        let result = self.prepare_response(&span, request.downstream.as_ref()).await;
        span.finish();
        result
    }

    async fn prepare_response(
        &self,
        span: &Span,
        downstream: Option<&Downstream>,
    ) -> Result<TraceResponse, DownstreamError> {
        let observed = observe_span(span);
        let downstream = match downstream {
            Some(target) => Some(Box::new(self.call_downstream(span.context(), target).await?)),
            None => None,
        };
        Ok(TraceResponse {
            span: Some(observed),
            downstream,
            not_implemented_error: String::new(),
        })
    }

    async fn call_downstream(
        &self,
        context: &Context,
        target: &Downstream,
    ) -> Result<TraceResponse, DownstreamError> {
        let request = JoinTraceRequest {
            server_role: target.server_role.clone(),
            downstream: target.downstream.as_deref().cloned(),
        };

        tracing::debug!(
            role = %target.server_role,
            service = %target.service_name,
            host = %target.host,
            port = %target.port,
            transport = %target.transport,
            "Calling downstream"
        );

        match target.transport {
            Transport::Http => {
                let mut headers = HeaderMap::new();
                tracer::inject(context, &mut HeaderInjector(&mut headers));
                let url = format!("http://{}:{}/join_trace", target.host, target.port);
                http::post_json(&self.http, &url, headers, &request).await
            }
            Transport::Tchannel => {
                let mut headers: HashMap<String, String> = HashMap::new();
                tracer::inject(context, &mut headers);
                let addr = format!("{}:{}", target.host, target.port);
                rpc::call(
                    &addr,
                    JOIN_TRACE_METHOD,
                    headers,
                    &request,
                    self.connect_timeout,
                    self.request_timeout,
                )
                .await
            }
            Transport::Dummy => Ok(TraceResponse::not_implemented(DUMMY_NOT_IMPLEMENTED)),
        }
    }
}

impl RpcHandler for TraceHandler {
    async fn handle(&self, request: RpcRequest) -> RpcResponse {
        if request.method != JOIN_TRACE_METHOD {
            return RpcResponse::error(format!("unknown method '{}'", request.method));
        }

        let parent = match tracer::extract(&request.headers) {
            Ok(parent) => parent,
            Err(e) => return RpcResponse::error(e.to_string()),
        };
        let join: JoinTraceRequest = match serde_json::from_value(request.body) {
            Ok(join) => join,
            Err(e) => return RpcResponse::error(format!("invalid join_trace request: {}", e)),
        };

        match self.join_trace(join, parent).await {
            Ok(response) => match serde_json::to_value(response) {
                Ok(body) => RpcResponse::ok(body),
                Err(e) => RpcResponse::error(e.to_string()),
            },
            Err(e) => {
                tracing::error!(error = %e, "join_trace over RPC failed");
                RpcResponse::error(e.to_string())
            }
        }
    }
}

fn observe_span(span: &Span) -> ObservedSpan {
    ObservedSpan {
        trace_id: span.trace_id_hex(),
        sampled: span.is_sampled(),
        baggage: span.baggage_item(BAGGAGE_KEY).unwrap_or_default(),
    }
}

/// Readiness probe used by the orchestrator.
pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn start_trace(
    State(handler): State<Arc<TraceHandler>>,
    Json(request): Json<StartTraceRequest>,
) -> Response {
    match handler.start_trace(request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "start_trace failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub async fn join_trace(
    State(handler): State<Arc<TraceHandler>>,
    headers: HeaderMap,
    Json(request): Json<JoinTraceRequest>,
) -> Response {
    let parent = match tracer::extract(&HeaderExtractor(&headers)) {
        Ok(parent) => parent,
        Err(e) => {
            tracing::warn!(error = %e, "Rejecting join_trace with bad trace context");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    match handler.join_trace(request, parent).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "join_trace failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
