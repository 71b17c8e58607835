//! Transport chain CLI: send one request through the configured layers.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use http::header::{HeaderName, HeaderValue};
use http::Method;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;
use zentinel_transport::{build_chain, Config, HttpTransport, Request, Transport};

#[derive(Parser, Debug)]
#[command(name = "zentinel-transport")]
#[command(
    about = "Send HTTP requests through Zentinel's key-injecting, logging and flaky transport chain"
)]
#[command(version)]
struct Args {
    /// URL to request
    #[arg(required_unless_present_any = ["print_config", "validate"])]
    url: Option<String>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Request header as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Request body
    #[arg(short, long)]
    data: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: String,

    /// Print example configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,

    /// Enable flaky upstream simulation regardless of configuration
    #[arg(long)]
    flaky: bool,
}

fn print_example_config() {
    let example = r#"# Transport chain configuration

settings:
  timeout_ms: 30000                # Whole-request timeout on the real transport

# Authentication key appended to every request's query string
key:
  value: "your-api-key"
  param: "key"                     # -> ?key=your-api-key

# Request/response logging (bodies of application/octet-stream requests are never logged)
logging:
  enabled: true
  redact_params: ["sig"]           # In addition to key, token, password, ...
  redact_headers: ["x-session"]    # In addition to authorization, cookie, ...

# Flaky upstream simulation
flaky:
  enabled: false
  probability: 0.03                # Chance a call opens a flaky window
  max_window_ms: 90000             # Windows last up to 90 seconds
  status_codes: [401, 403, 404, 408, 500, 503]
  body: "flaky error body"
  # seed: 1700000000               # Reproduce a previous run
"#;
    println!("{}", example);
}

fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("Header must look like 'Name: value', got '{}'", raw))?;
    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .with_context(|| format!("Invalid header name in '{}'", raw))?;
    let value = HeaderValue::from_str(value.trim())
        .with_context(|| format!("Invalid header value in '{}'", raw))?;
    Ok((name, value))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --print-config
    if args.print_config {
        print_example_config();
        return Ok(());
    }

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            Config::from_file(path)?
        }
        None => Config::default(),
    };

    // Override flaky if specified on command line
    if args.flaky {
        config.flaky.enabled = true;
        info!("Flaky simulation enabled via command line");
    }

    // Handle --validate
    if args.validate {
        config.validate()?;
        info!("Configuration is valid");
        return Ok(());
    }

    let url = args
        .url
        .as_deref()
        .ok_or_else(|| anyhow!("A URL is required"))?;
    let method = Method::from_bytes(args.method.to_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method '{}'", args.method))?;

    let mut request = Request::new(method, Url::parse(url)?);
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        request = request.with_header(name, value);
    }
    if let Some(data) = args.data {
        request = request.with_body(data);
    }

    let transport = HttpTransport::new(&config.settings)?;
    let chain = build_chain(&config, Arc::new(transport));

    let response = chain.round_trip(request).await?;
    println!("{}", response.status_text);
    let body = response
        .body
        .collect()
        .await
        .map_err(|err| anyhow!("Failed to read response body: {}", err))?;
    println!("{}", String::from_utf8_lossy(&body));

    Ok(())
}
