//! Span context propagation over string carriers.
//!
//! # Responsibilities
//! - Encode a context into `uber-trace-id` plus `uberctx-*` entries
//! - Decode the same entries from an inbound carrier
//! - Adapt HTTP headers to the propagation carrier traits (RPC header maps
//!   use the `HashMap` carrier directly)
//!
//! # Design Decisions
//! - The trace header is handled by the Jaeger propagator
//! - Baggage values are URL-encoded on the way out and decoded on the way in
//! - An absent trace header is not an error: extraction yields `None`

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::baggage::BaggageExt;
use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::trace::TraceContextExt;
use opentelemetry::{Context, KeyValue};
use opentelemetry_jaeger_propagator::Propagator;
use thiserror::Error;
use url::form_urlencoded;

/// Carrier entry holding the encoded span identity.
pub const TRACE_CONTEXT_HEADER: &str = "uber-trace-id";

/// Prefix for carrier entries holding baggage items.
pub const BAGGAGE_HEADER_PREFIX: &str = "uberctx-";

/// Errors decoding an inbound span context.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PropagationError {
    #[error("malformed trace context '{0}'")]
    Malformed(String),
}

/// Write side of an HTTP header carrier.
pub struct HeaderInjector<'a>(pub &'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                self.0.insert(name, value);
            }
            _ => tracing::warn!(key = %key, "Skipping trace header that is not a valid HTTP header"),
        }
    }
}

/// Read side of an HTTP header carrier.
pub struct HeaderExtractor<'a>(pub &'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}

/// Write the span and baggage of `cx` into `carrier`.
pub fn inject(cx: &Context, carrier: &mut dyn Injector) {
    Propagator::new().inject_context(cx, carrier);
    for (key, (value, _)) in cx.baggage().iter() {
        carrier.set(
            &format!("{}{}", BAGGAGE_HEADER_PREFIX, key.as_str()),
            encode_baggage(&value.to_string()),
        );
    }
}

/// Read a remote parent from `carrier`, `Ok(None)` when none was propagated.
pub fn extract(carrier: &dyn Extractor) -> Result<Option<Context>, PropagationError> {
    let Some(header) = carrier.get(TRACE_CONTEXT_HEADER) else {
        return Ok(None);
    };

    let cx = Propagator::new().extract_with_context(&Context::new(), carrier);
    if !cx.span().span_context().is_valid() {
        return Err(PropagationError::Malformed(header.to_string()));
    }

    let baggage: Vec<KeyValue> = carrier
        .keys()
        .into_iter()
        .filter_map(|key| {
            let lower = key.to_ascii_lowercase();
            let item = lower.strip_prefix(BAGGAGE_HEADER_PREFIX)?;
            let value = carrier.get(key)?;
            Some(KeyValue::new(item.to_string(), decode_baggage(value)))
        })
        .collect();

    Ok(Some(cx.with_baggage(baggage)))
}

fn encode_baggage(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn decode_baggage(value: &str) -> String {
    // Raw separators never come out of `encode_baggage`; pass such values through.
    if value.contains(['&', '=']) {
        return value.to_string();
    }
    form_urlencoded::parse(value.as_bytes())
        .next()
        .map(|(decoded, _)| decoded.into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::tracer::{Sampler, Span, Tracer};

    fn sampled_span() -> Span {
        let mut span = Tracer::new("svc", Sampler::Const(true)).start_root("s1", false);
        span.set_baggage_item("crossdock-baggage-key", "f00d");
        span
    }

    #[test]
    fn test_inject_header_format() {
        let span = sampled_span();
        let mut headers = HeaderMap::new();
        inject(span.context(), &mut HeaderInjector(&mut headers));

        let trace_header = headers.get(TRACE_CONTEXT_HEADER).unwrap().to_str().unwrap();
        let parts: Vec<&str> = trace_header.split(':').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], span.trace_id_hex());
        assert_eq!(parts[1], span.span_id_hex());
        assert_eq!(parts[3], "1");
        assert_eq!(headers.get("uberctx-crossdock-baggage-key").unwrap(), "f00d");
    }

    #[test]
    fn test_extract_from_headers() {
        let span = sampled_span();
        let mut headers = HeaderMap::new();
        inject(span.context(), &mut HeaderInjector(&mut headers));

        let cx = extract(&HeaderExtractor(&headers)).unwrap().unwrap();
        let remote = cx.span().span_context().clone();
        assert!(remote.is_remote());
        assert!(remote.is_sampled());
        assert_eq!(remote.trace_id().to_string(), span.trace_id_hex());
        assert_eq!(
            cx.baggage().get("crossdock-baggage-key").map(ToString::to_string),
            Some("f00d".to_string())
        );
    }

    #[test]
    fn test_rpc_header_map_round_trip() {
        let span = sampled_span();
        let mut headers: HashMap<String, String> = HashMap::new();
        inject(span.context(), &mut headers);

        let cx = extract(&headers).unwrap().unwrap();
        assert_eq!(cx.span().span_context().trace_id().to_string(), span.trace_id_hex());
    }

    #[test]
    fn test_baggage_values_are_url_encoded() {
        let mut span = sampled_span();
        span.set_baggage_item("note", "a b\nc");
        let mut headers = HeaderMap::new();
        inject(span.context(), &mut HeaderInjector(&mut headers));
        assert_eq!(headers.get("uberctx-note").unwrap(), "a+b%0Ac");

        let cx = extract(&HeaderExtractor(&headers)).unwrap().unwrap();
        assert_eq!(
            cx.baggage().get("note").map(ToString::to_string),
            Some("a b\nc".to_string())
        );
    }

    #[test]
    fn test_missing_header_is_none() {
        assert!(extract(&HeaderExtractor(&HeaderMap::new())).unwrap().is_none());
    }

    #[test]
    fn test_malformed_headers() {
        for header in ["1:2:3", "xyz:2:3:1", "0:1:0:1", "1:2:3:100"] {
            let mut map = HashMap::new();
            map.insert(TRACE_CONTEXT_HEADER.to_string(), header.to_string());
            assert_eq!(
                extract(&map).err(),
                Some(PropagationError::Malformed(header.to_string())),
                "header {}",
                header
            );
        }
    }
}
