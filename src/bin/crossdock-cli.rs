use std::process::ExitCode;

use clap::{Parser, Subcommand};
use trace_crossdock::crossdock::{Entry, Status};

#[derive(Parser)]
#[command(name = "crossdock-cli")]
#[command(about = "Drive a crossdock client the way the orchestrator does", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the client answers HEAD probes
    Ready,
    /// Run the trace behavior
    Trace {
        #[arg(long, default_value = "true")]
        sampled: String,
        #[arg(long, default_value = "rust")]
        s1name: String,
        #[arg(long, default_value = "rust")]
        s2name: String,
        #[arg(long, default_value = "rust")]
        s2client: String,
        #[arg(long, default_value = "http")]
        s2transport: String,
        #[arg(long, default_value = "rust")]
        s3name: String,
        #[arg(long, default_value = "rust")]
        s3client: String,
        #[arg(long, default_value = "tchannel")]
        s3transport: String,
    },
    /// Run any behavior with raw key=value params
    Run {
        behavior: String,
        #[arg(short, long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", s))
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder().no_proxy().build()?;

    let params: Vec<(String, String)> = match cli.command {
        Commands::Ready => {
            let res = client.head(&cli.url).send().await?;
            println!("{}", res.status());
            return Ok(if res.status().is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        }
        Commands::Trace {
            sampled,
            s1name,
            s2name,
            s2client,
            s2transport,
            s3name,
            s3client,
            s3transport,
        } => vec![
            ("behavior".into(), "trace".into()),
            ("sampled".into(), sampled),
            ("s1name".into(), s1name),
            ("s2name".into(), s2name),
            ("s2client".into(), s2client),
            ("s2transport".into(), s2transport),
            ("s3name".into(), s3name),
            ("s3client".into(), s3client),
            ("s3transport".into(), s3transport),
        ],
        Commands::Run { behavior, mut params } => {
            params.insert(0, ("behavior".into(), behavior));
            params
        }
    };

    let mut url = url::Url::parse(&cli.url)?;
    url.query_pairs_mut().extend_pairs(params);

    let res = client.get(url).send().await?;
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: client returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(ExitCode::FAILURE);
    }

    let entries: Vec<Entry> = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&entries)?);

    let all_passed = !entries.is_empty() && entries.iter().all(|e| e.status == Status::Passed);
    Ok(if all_passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
