//! The `trace` behavior.
//!
//! Starts a trace at S1 with random baggage, has it travel S1 → S2 → S3 over
//! the requested transports, and checks that every level observed the same
//! trace id, sampling decision and baggage.

use axum::http::HeaderMap;

use crate::client::Dispatcher;
use crate::crossdock::{Fatal, T};
use crate::protocol::{
    Downstream, StartTraceRequest, TraceResponse, Transport, ROLE_S1, ROLE_S2, ROLE_S3,
};
use crate::transport::http::post_json;

pub const BEHAVIOR_TRACE: &str = "trace";

pub const SAMPLED_PARAM: &str = "sampled";
pub const SERVER1_NAME_PARAM: &str = "s1name";
pub const SERVER2_NAME_PARAM: &str = "s2name";
pub const SERVER2_CLIENT_PARAM: &str = "s2client";
pub const SERVER2_TRANSPORT_PARAM: &str = "s2transport";
pub const SERVER3_NAME_PARAM: &str = "s3name";
pub const SERVER3_CLIENT_PARAM: &str = "s3client";
pub const SERVER3_TRANSPORT_PARAM: &str = "s3transport";

/// Port used for the placeholder transport; never dialled.
const DUMMY_PORT: &str = "9999";

/// What every level of the chain must have observed.
struct Expected {
    trace_id: String,
    sampled: bool,
    baggage: String,
}

impl Dispatcher {
    pub(crate) async fn trace(&self, t: &T) -> Result<(), Fatal> {
        let sampled = parse_bool(t.param(SAMPLED_PARAM))
            .map_err(|e| t.fatal(format!("Malformed param {}: {}", SAMPLED_PARAM, e)))?;

        let level3 = self.downstream(t, ROLE_S3, SERVER3_NAME_PARAM, SERVER3_TRANSPORT_PARAM, None)?;
        let level2 = self.downstream(
            t,
            ROLE_S2,
            SERVER2_NAME_PARAM,
            SERVER2_TRANSPORT_PARAM,
            Some(level3),
        )?;

        tracing::debug!(
            s2client = %t.param(SERVER2_CLIENT_PARAM),
            s3client = %t.param(SERVER3_CLIENT_PARAM),
            "Downstream client axes"
        );

        let s1name = t.param(SERVER1_NAME_PARAM);
        let baggage = random_baggage();
        let request = StartTraceRequest {
            server_role: ROLE_S1.to_string(),
            sampled,
            baggage: baggage.clone(),
            downstream: Some(level2.clone()),
        };
        let url = format!(
            "http://{}:{}/start_trace",
            self.map_service_to_host(s1name),
            self.config.server_port_http
        );

        tracing::info!(url = %url, sampled, baggage = %baggage, "Starting trace");

        let response: TraceResponse =
            match post_json(&self.http, &url, HeaderMap::new(), &request).await {
                Ok(response) => response,
                Err(e) => {
                    t.error(format!("Failed to start a trace: {}", e));
                    return Ok(());
                }
            };

        if let Some(reason) = response.find_not_implemented() {
            t.skip(reason);
            return Ok(());
        }

        let trace_id = response
            .span
            .as_ref()
            .map(|span| span.trace_id.as_str())
            .unwrap_or_default();
        if trace_id.is_empty() {
            t.error(format!("Trace ID is empty in S1({})", s1name));
            return Ok(());
        }

        let expected = Expected {
            trace_id: trace_id.to_string(),
            sampled,
            baggage,
        };
        if validate_trace(t, Some(&level2), &response, s1name, 1, &expected) {
            t.success("trace checks out");
        }
        Ok(())
    }

    fn downstream(
        &self,
        t: &T,
        role: &str,
        name_param: &str,
        transport_param: &str,
        next: Option<Downstream>,
    ) -> Result<Downstream, Fatal> {
        let transport: Transport = t
            .param(transport_param)
            .parse()
            .map_err(|e| t.fatal(format!("Malformed param {}: {}", transport_param, e)))?;
        let service_name = t.param(name_param);

        Ok(Downstream {
            service_name: service_name.to_string(),
            server_role: role.to_string(),
            host: self.map_service_to_host(service_name),
            port: self.transport_port(transport).to_string(),
            transport,
            downstream: next.map(Box::new),
        })
    }

    fn transport_port(&self, transport: Transport) -> &str {
        match transport {
            Transport::Http => &self.config.server_port_http,
            Transport::Tchannel => &self.config.server_port_rpc,
            Transport::Dummy => DUMMY_PORT,
        }
    }
}

/// Check one level of the response chain, then recurse into the next.
///
/// `target` is what this level was asked to call. Every mismatch is recorded;
/// the return value is true only if the whole remaining chain checks out.
fn validate_trace(
    t: &T,
    target: Option<&Downstream>,
    response: &TraceResponse,
    service: &str,
    level: usize,
    expected: &Expected,
) -> bool {
    let mut success = true;
    let observed = response.span.clone().unwrap_or_default();

    if observed.trace_id != expected.trace_id {
        t.error(format!(
            "Trace ID mismatch in S{}({}): expected {}, received {}",
            level, service, expected.trace_id, observed.trace_id
        ));
        success = false;
    }
    if observed.baggage != expected.baggage {
        t.error(format!(
            "Baggage mismatch in S{}({}): expected {}, received {}",
            level, service, expected.baggage, observed.baggage
        ));
        success = false;
    }
    if observed.sampled != expected.sampled {
        t.error(format!(
            "Sampled mismatch in S{}({}): expected {}, received {}",
            level, service, expected.sampled, observed.sampled
        ));
        success = false;
    }

    match (target, response.downstream.as_deref()) {
        (Some(target), Some(next)) => {
            success = validate_trace(
                t,
                target.downstream.as_deref(),
                next,
                &target.service_name,
                level + 1,
                expected,
            ) && success;
        }
        (Some(_), None) => {
            t.error(format!("Missing downstream in S{}({})", level, service));
            success = false;
        }
        (None, Some(_)) => {
            t.error(format!("Unexpected downstream in S{}({})", level, service));
            success = false;
        }
        (None, None) => {}
    }

    success
}

/// Boolean parsing that accepts the spellings orchestrators send.
fn parse_bool(value: &str) -> Result<bool, String> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        other => Err(format!("invalid boolean {:?}", other)),
    }
}

fn random_baggage() -> String {
    format!("{:x}", rand::random::<u64>())
}
