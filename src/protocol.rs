//! Wire types exchanged between the client and the downstream servers.
//!
//! All types serialize to camelCase JSON so that servers written against
//! other tracer implementations can take part in the same call chain.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Baggage key every server copies into its observed span.
pub const BAGGAGE_KEY: &str = "crossdock-baggage-key";

/// Server roles along the call chain.
pub const ROLE_S1: &str = "S1";
pub const ROLE_S2: &str = "S2";
pub const ROLE_S3: &str = "S3";

/// How a server reaches its downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Transport {
    Http,
    /// Framed TCP RPC (the orchestrator's `tchannel` axis value).
    Tchannel,
    /// Placeholder downstream that answers "not implemented".
    Dummy,
}

impl Transport {
    /// Name used in orchestrator axis values.
    pub fn as_param(&self) -> &'static str {
        match self {
            Transport::Http => "http",
            Transport::Tchannel => "tchannel",
            Transport::Dummy => "dummy",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

impl FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Transport::Http),
            "tchannel" => Ok(Transport::Tchannel),
            "dummy" => Ok(Transport::Dummy),
            other => Err(format!("unknown transport '{}'", other)),
        }
    }
}

/// Next hop in the call chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Downstream {
    pub service_name: String,
    pub server_role: String,
    pub host: String,
    pub port: String,
    pub transport: Transport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downstream: Option<Box<Downstream>>,
}

/// Sent by the client to S1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTraceRequest {
    pub server_role: String,
    pub sampled: bool,
    pub baggage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downstream: Option<Downstream>,
}

/// Sent by one server to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinTraceRequest {
    pub server_role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downstream: Option<Downstream>,
}

/// What a server saw of the trace it was part of.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedSpan {
    pub trace_id: String,
    pub sampled: bool,
    pub baggage: String,
}

/// Response at each level of the call chain.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<ObservedSpan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downstream: Option<Box<TraceResponse>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub not_implemented_error: String,
}

impl TraceResponse {
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self {
            not_implemented_error: message.into(),
            ..Self::default()
        }
    }

    /// First `notImplementedError` found walking down the chain.
    pub fn find_not_implemented(&self) -> Option<&str> {
        let mut current = Some(self);
        while let Some(level) = current {
            if !level.not_implemented_error.is_empty() {
                return Some(&level.not_implemented_error);
            }
            current = level.downstream.as_deref();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_trace_request_json_shape() {
        let req = StartTraceRequest {
            server_role: ROLE_S1.into(),
            sampled: true,
            baggage: "b".into(),
            downstream: Some(Downstream {
                service_name: "rust".into(),
                server_role: ROLE_S2.into(),
                host: "localhost".into(),
                port: "8082".into(),
                transport: Transport::Tchannel,
                downstream: None,
            }),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["serverRole"], "S1");
        assert_eq!(json["downstream"]["transport"], "TCHANNEL");
        assert_eq!(json["downstream"]["serviceName"], "rust");
        assert!(json["downstream"].get("downstream").is_none());
    }

    #[test]
    fn test_trace_response_from_foreign_server() {
        let json = r#"{
            "span": {"traceId": "abc", "sampled": true, "baggage": "x"},
            "downstream": {"notImplementedError": "nope"}
        }"#;
        let resp: TraceResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.span.as_ref().unwrap().trace_id, "abc");
        assert_eq!(resp.find_not_implemented(), Some("nope"));
    }

    #[test]
    fn test_transport_params() {
        assert_eq!("http".parse::<Transport>(), Ok(Transport::Http));
        assert_eq!("tchannel".parse::<Transport>(), Ok(Transport::Tchannel));
        assert_eq!("dummy".parse::<Transport>(), Ok(Transport::Dummy));
        assert!("grpc".parse::<Transport>().is_err());
        assert_eq!(Transport::Tchannel.to_string(), "tchannel");
    }
}
