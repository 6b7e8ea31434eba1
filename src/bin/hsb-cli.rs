use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "hsb-cli")]
#[command(about = "Submit FHIR bundles to a running Health Service Bus", long_about = None)]
struct Cli {
    /// Base URL of the service to talk to.
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Service {
    /// Bundle Proxy (POST /hsb/message)
    Proxy,
    /// Resource Relay (POST /hsb)
    Relay,
}

impl Service {
    fn path(self) -> &'static str {
        match self {
            Service::Proxy => "/hsb/message",
            Service::Relay => "/hsb",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Send a bundle file
    Send {
        #[arg(short, long, value_enum, default_value = "proxy")]
        service: Service,
        /// Path to a FHIR Bundle in JSON
        bundle: PathBuf,
    },
    /// Check service liveness
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Send { service, bundle } => {
            let body = std::fs::read(&bundle)?;
            // Fail before sending if the file is not JSON at all.
            serde_json::from_slice::<Value>(&body)?;

            let res = client
                .post(format!("{}{}", base, service.path()))
                .header(CONTENT_TYPE, HeaderValue::from_static("application/fhir+json"))
                .body(body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Health => {
            let res = client.get(format!("{}/health", base)).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let request_id = res
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: HSB returned status {} (request {})", status, request_id);
        eprintln!("Response: {}", text);
        return Ok(());
    }

    eprintln!("{} (request {})", status, request_id);
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
