//! Shared utilities for integration testing.

use std::time::Duration;

use trace_crossdock::config::{ClientConfig, ServerConfig, TimeoutConfig};
use trace_crossdock::crossdock::Entry;
use trace_crossdock::tracer::Sampler;
use trace_crossdock::{Client, Server};

/// Service name the bundled server reports; mapped to loopback by the client.
pub const SERVICE: &str = "rust";

/// Start a downstream server on OS-assigned loopback ports.
pub async fn start_server() -> Server {
    let server = Server::new(
        ServerConfig {
            host_port_http: "127.0.0.1:0".into(),
            host_port_rpc: "127.0.0.1:0".into(),
            service_name: SERVICE.into(),
            sampler: Sampler::Const(false),
            ..ServerConfig::default()
        },
        &TimeoutConfig::default(),
    );
    server.start().await.expect("server should start");
    server
}

/// Start a client pointed at `server`, with every service mapped to loopback.
pub async fn start_client(server: &Server) -> Client {
    let client = Client::new(ClientConfig {
        host_port: "127.0.0.1:0".into(),
        server_port_http: server.port_http().unwrap(),
        server_port_rpc: server.port_rpc().unwrap(),
    })
    .with_host_mapper(|_| "127.0.0.1".to_string());
    client.async_start().await.expect("client should start");
    client
}

/// Issue a behavior request and decode the entries.
pub async fn exec(client: &Client, params: &[(&str, &str)]) -> Vec<Entry> {
    let mut url = url::Url::parse(&client.url().unwrap()).unwrap();
    url.query_pairs_mut().extend_pairs(params);
    println!("Executing {}", url);

    let http = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();
    let res = http.get(url).send().await.expect("client unreachable");
    assert_eq!(res.status(), 200);
    let entries: Vec<Entry> = res.json().await.unwrap();
    println!("Output: {:?}", entries);
    entries
}

/// Params for a trace run with the given sampling flag and S2/S3 transports.
pub fn trace_params<'a>(
    sampled: &'a str,
    s2transport: &'a str,
    s3transport: &'a str,
) -> Vec<(&'a str, &'a str)> {
    vec![
        ("behavior", "trace"),
        ("sampled", sampled),
        ("s1name", SERVICE),
        ("s2name", SERVICE),
        ("s2client", "any"),
        ("s2transport", s2transport),
        ("s3name", SERVICE),
        ("s3client", "any"),
        ("s3transport", s3transport),
    ]
}
