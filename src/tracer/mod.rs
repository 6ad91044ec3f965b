//! Tracer under test.
//!
//! # Data Flow
//! ```text
//! Root request (S1):
//!     sampler.rs decides (or the request forces) the sampled flag
//!     → SDK tracer starts a root span, baggage set on its context
//!
//! Outbound call:
//!     propagation.rs injects the context into headers / RPC header map
//!
//! Inbound call (S2, S3):
//!     propagation.rs extracts the remote parent context
//!     → SDK tracer starts a child span (parent-based sampling, baggage kept)
//! ```
//!
//! # Design Decisions
//! - Spans come from `opentelemetry_sdk`; the provider has no exporter,
//!   finished spans are logged
//! - Forced sampling uses the `sampling.priority` span attribute
//! - Header format follows the `uber-trace-id` / `uberctx-*` convention

pub mod propagation;
pub mod sampler;
pub mod span;

pub use propagation::{extract, inject, HeaderExtractor, HeaderInjector, PropagationError};
pub use sampler::Sampler;
pub use span::Span;

use opentelemetry::trace::{SpanBuilder, SpanKind, TraceContextExt, Tracer as _, TracerProvider as _};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use opentelemetry_sdk::Resource;

use crate::tracer::sampler::{PrioritySampler, SAMPLING_PRIORITY};

/// Creates spans for one service.
#[derive(Debug, Clone)]
pub struct Tracer {
    service_name: String,
    tracer: SdkTracer,
}

impl Tracer {
    pub fn new(service_name: impl Into<String>, sampler: Sampler) -> Self {
        let service_name = service_name.into();
        let provider = SdkTracerProvider::builder()
            .with_sampler(PrioritySampler::new(sampler))
            .with_resource(
                Resource::builder()
                    .with_service_name(service_name.clone())
                    .build(),
            )
            .build();
        let tracer = provider.tracer(service_name.clone());

        Self {
            service_name,
            tracer,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Start a new trace. `force_sampled` overrides a negative sampler decision.
    pub fn start_root(&self, operation: &str, force_sampled: bool) -> Span {
        let mut builder = self.builder(operation);
        if force_sampled {
            builder = builder.with_attributes(vec![KeyValue::new(SAMPLING_PRIORITY, 1_i64)]);
        }
        self.start(operation, builder, &Context::new())
    }

    /// Start a span that continues the trace carried by `parent`.
    pub fn start_child(&self, operation: &str, parent: &Context) -> Span {
        self.start(operation, self.builder(operation), parent)
    }

    /// Continue `parent` when present, otherwise start a new trace.
    pub fn start_server_span(&self, operation: &str, parent: Option<&Context>) -> Span {
        match parent {
            Some(parent) => self.start_child(operation, parent),
            None => self.start_root(operation, false),
        }
    }

    fn builder(&self, operation: &str) -> SpanBuilder {
        self.tracer
            .span_builder(operation.to_string())
            .with_kind(SpanKind::Server)
    }

    fn start(&self, operation: &str, builder: SpanBuilder, parent: &Context) -> Span {
        let span = builder.start_with_context(&self.tracer, parent);
        Span::new(self.service_name.clone(), operation, parent.with_span(span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forced_sampling_overrides_sampler() {
        let tracer = Tracer::new("svc", Sampler::Const(false));
        assert!(tracer.start_root("s1", true).is_sampled());
        assert!(!tracer.start_root("s1", false).is_sampled());
    }

    #[test]
    fn test_child_continues_trace() {
        let tracer = Tracer::new("svc", Sampler::Const(false));
        let mut root = tracer.start_root("s1", true);
        root.set_baggage_item("k", "v");

        let child = tracer.start_child("s2", root.context());
        assert_eq!(child.trace_id_hex(), root.trace_id_hex());
        assert_ne!(child.span_id_hex(), root.span_id_hex());
        assert!(child.is_sampled());
        assert_eq!(child.baggage_item("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_unsampled_parent_stays_unsampled() {
        let tracer = Tracer::new("svc", Sampler::Const(true));
        let other = Tracer::new("other", Sampler::Const(false));
        let root = other.start_root("s1", false);

        let child = tracer.start_child("s2", root.context());
        assert_eq!(child.trace_id_hex(), root.trace_id_hex());
        assert!(!child.is_sampled());
    }

    #[test]
    fn test_server_span_without_parent_starts_new_trace() {
        let tracer = Tracer::new("svc", Sampler::Const(false));
        let first = tracer.start_server_span("s2", None);
        let second = tracer.start_server_span("s2", None);
        assert_ne!(first.trace_id_hex(), second.trace_id_hex());
        assert!(!first.is_sampled());
    }
}
