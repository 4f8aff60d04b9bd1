use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "node-cli")]
#[command(about = "Control CLI for a running broker node", long_about = None)]
struct Cli {
    /// Monitor server base URL.
    #[arg(short, long, default_value = "http://localhost:8800")]
    url: String,

    /// The node's app-server API key.
    #[arg(short, long, env = "NODE_API_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show node identity, resource probes and broker status
    Health,
    /// Re-read the broker file on the node
    Reload,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("apikey {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Health => {
            client
                .get(format!("{}/health", base))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Reload => {
            client
                .post(format!("{}/reloadconfig", base))
                .headers(headers)
                .send()
                .await?
        }
    };
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: node returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
