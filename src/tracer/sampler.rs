//! Sampling decisions for new traces.

use opentelemetry::trace::{
    Link, SamplingDecision, SamplingResult, SpanKind, TraceContextExt, TraceId,
};
use opentelemetry::{Context, KeyValue, Value};
use opentelemetry_sdk::trace::{Sampler as SdkSampler, ShouldSample};
use serde::{Deserialize, Serialize};

/// Span attribute that forces a sampling decision when positive.
pub const SAMPLING_PRIORITY: &str = "sampling.priority";

/// Decides whether a new trace is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "param", rename_all = "lowercase")]
pub enum Sampler {
    /// Same decision for every trace.
    Const(bool),
    /// Samples a fixed fraction of trace ids.
    Probabilistic(f64),
}

impl Default for Sampler {
    fn default() -> Self {
        Sampler::Const(false)
    }
}

impl From<Sampler> for SdkSampler {
    fn from(sampler: Sampler) -> Self {
        match sampler {
            Sampler::Const(true) => SdkSampler::AlwaysOn,
            Sampler::Const(false) => SdkSampler::AlwaysOff,
            Sampler::Probabilistic(rate) => SdkSampler::TraceIdRatioBased(rate),
        }
    }
}

/// Root decisions from the configured sampler, children follow their parent,
/// and a positive `sampling.priority` attribute always samples.
#[derive(Debug, Clone)]
pub(crate) struct PrioritySampler {
    inner: SdkSampler,
}

impl PrioritySampler {
    pub(crate) fn new(sampler: Sampler) -> Self {
        Self {
            inner: SdkSampler::ParentBased(Box::new(SdkSampler::from(sampler))),
        }
    }
}

impl ShouldSample for PrioritySampler {
    fn should_sample(
        &self,
        parent_context: Option<&Context>,
        trace_id: TraceId,
        name: &str,
        span_kind: &SpanKind,
        attributes: &[KeyValue],
        links: &[Link],
    ) -> SamplingResult {
        if has_priority(attributes) {
            return SamplingResult {
                decision: SamplingDecision::RecordAndSample,
                attributes: Vec::new(),
                trace_state: parent_context
                    .map(|cx| cx.span().span_context().trace_state().clone())
                    .unwrap_or_default(),
            };
        }
        self.inner
            .should_sample(parent_context, trace_id, name, span_kind, attributes, links)
    }
}

fn has_priority(attributes: &[KeyValue]) -> bool {
    attributes.iter().any(|kv| {
        kv.key.as_str() == SAMPLING_PRIORITY && matches!(kv.value, Value::I64(p) if p > 0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decide(sampler: Sampler, trace_id: u128, attributes: &[KeyValue]) -> SamplingDecision {
        PrioritySampler::new(sampler)
            .should_sample(
                None,
                TraceId::from_bytes(trace_id.to_be_bytes()),
                "op",
                &SpanKind::Server,
                attributes,
                &[],
            )
            .decision
    }

    #[test]
    fn test_const_sampler() {
        assert_eq!(decide(Sampler::Const(true), 1, &[]), SamplingDecision::RecordAndSample);
        assert_eq!(decide(Sampler::Const(false), u128::MAX, &[]), SamplingDecision::Drop);
    }

    #[test]
    fn test_probabilistic_bounds() {
        assert_eq!(decide(Sampler::Probabilistic(0.0), 1, &[]), SamplingDecision::Drop);
        assert_eq!(
            decide(Sampler::Probabilistic(1.0), u128::MAX, &[]),
            SamplingDecision::RecordAndSample
        );
    }

    #[test]
    fn test_priority_forces_sampling() {
        let forced = [KeyValue::new(SAMPLING_PRIORITY, 1_i64)];
        assert_eq!(decide(Sampler::Const(false), 7, &forced), SamplingDecision::RecordAndSample);

        let zero = [KeyValue::new(SAMPLING_PRIORITY, 0_i64)];
        assert_eq!(decide(Sampler::Const(false), 7, &zero), SamplingDecision::Drop);
    }

    #[test]
    fn test_sampler_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            sampler: Sampler,
        }
        let w: Wrapper = toml::from_str("sampler = { type = \"const\", param = true }").unwrap();
        assert_eq!(w.sampler, Sampler::Const(true));
    }
}
