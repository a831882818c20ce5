use anyhow::{Context, Result};
use chat_gateway::app::App;
use chat_gateway::gateway::ProviderCandidate;
use clap::Parser;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "chat-gateway")]
#[command(about = "Answer one chat turn through the configured AI providers")]
struct CliArgs {
    /// Read the request JSON from FILE instead of stdin.
    #[arg(short, long, value_name = "FILE")]
    request: Option<PathBuf>,

    /// Print the resolved provider attempt order and exit.
    #[arg(long)]
    show_candidates: bool,
}

fn read_request(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file {}", path.display())),
        None => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .context("Failed to read request from stdin")?;
            Ok(body)
        }
    }
}

fn describe_candidates(candidates: &[ProviderCandidate]) -> Vec<String> {
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {} ({})", i + 1, c.model, c.credential.fingerprint()))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_gateway=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    let app = match App::new() {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    if args.show_candidates {
        for line in describe_candidates(app.candidates()) {
            println!("{}", line);
        }
        return Ok(());
    }

    let body = match read_request(args.request.as_deref()) {
        Ok(body) => body,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };

    let response = app.handle_json(&body).await;
    println!("{}", serde_json::to_string(&response.body)?);

    if response.is_success() {
        info!("Chat turn completed");
        Ok(())
    } else {
        std::process::exit(1);
    }
}
