//! Spans and their propagated context.

use std::time::Instant;

use opentelemetry::baggage::BaggageExt;
use opentelemetry::trace::TraceContextExt;
use opentelemetry::{Context, KeyValue};

/// An in-flight unit of work, held with the context it propagates.
#[derive(Debug)]
pub struct Span {
    service_name: String,
    operation: String,
    cx: Context,
    started: Instant,
}

impl Span {
    pub(crate) fn new(service_name: String, operation: &str, cx: Context) -> Self {
        Self {
            service_name,
            operation: operation.to_string(),
            cx,
            started: Instant::now(),
        }
    }

    /// Context carrying this span and its baggage, for children and injection.
    pub fn context(&self) -> &Context {
        &self.cx
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Trace id in the lowercase hex form reported to the orchestrator.
    pub fn trace_id_hex(&self) -> String {
        self.cx.span().span_context().trace_id().to_string()
    }

    pub fn span_id_hex(&self) -> String {
        self.cx.span().span_context().span_id().to_string()
    }

    pub fn is_sampled(&self) -> bool {
        self.cx.span().span_context().is_sampled()
    }

    pub fn set_baggage_item(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.cx = self
            .cx
            .with_baggage(vec![KeyValue::new(key.into(), value.into())]);
    }

    pub fn baggage_item(&self, key: &str) -> Option<String> {
        self.cx.baggage().get(key).map(ToString::to_string)
    }

    /// Finish the span. Sampled spans are logged.
    pub fn finish(self) {
        let span = self.cx.span();
        span.end();
        if span.span_context().is_sampled() {
            tracing::debug!(
                service = %self.service_name,
                operation = %self.operation,
                trace_id = %span.span_context().trace_id(),
                span_id = %span.span_context().span_id(),
                duration = ?self.started.elapsed(),
                "Span finished"
            );
        }
    }
}
