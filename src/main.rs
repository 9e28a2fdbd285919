//! rest-connector command line tool.
//!
//! ```text
//! rest-connector -c connector.toml check
//! rest-connector -c connector.toml send tts /v1/synthesize -p voice=allison -d '{"text":"hi"}'
//! rest-connector -c connector.toml stream     # one request per stdin line, hot reload
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use rest_connector::config::watcher::{apply_updates, ConfigWatcher};
use rest_connector::config::{load_config, ConnectorConfig};
use rest_connector::http::{HttpMethod, Request, Response};
use rest_connector::observability::{logging, metrics};
use rest_connector::{ConnectorRegistry, Shutdown};

#[derive(Parser)]
#[command(name = "rest-connector")]
#[command(about = "Send queued REST requests through configured service connectors", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "connector.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and print a summary
    Check,
    /// Send a request and print each response
    Send {
        /// Service identifier
        service: String,
        /// Function suffix selecting the connector
        function: String,
        /// Extra path appended to the connector's base URL
        #[arg(long, default_value = "")]
        path: String,
        /// Query parameter as key=value (repeatable)
        #[arg(short = 'p', long = "param")]
        params: Vec<String>,
        /// Header as name:value (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
        /// Request body
        #[arg(short, long)]
        data: Option<String>,
        /// Override the method (GET without body, POST with body)
        #[arg(short, long, value_enum)]
        method: Option<MethodArg>,
        /// Send the request this many times back to back
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Read `SERVICE FUNCTION [PATH]` lines from stdin, reloading config on change
    Stream,
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl From<MethodArg> for HttpMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Get => HttpMethod::Get,
            MethodArg::Post => HttpMethod::Post,
            MethodArg::Put => HttpMethod::Put,
            MethodArg::Patch => HttpMethod::Patch,
            MethodArg::Delete => HttpMethod::Delete,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init_logging(&config.observability);
    metrics::set_enabled(config.observability.metrics_enabled);

    tracing::info!(
        path = %cli.config.display(),
        services = config.credentials.len(),
        gateway = config.gateway.enabled,
        request_timeout_secs = config.connection.request_secs,
        max_concurrent = config.connection.max_concurrent,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Check => print_summary(&config),
        Commands::Send {
            service,
            function,
            path,
            params,
            headers,
            data,
            method,
            count,
        } => {
            let registry = ConnectorRegistry::from_config(config)?;
            let connector = registry.get_connector(&service, &function)?;

            let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
            for _ in 0..count {
                let mut request = Request::new().with_function(path.clone());
                for param in &params {
                    let (key, value) = split_pair(param, '=')?;
                    request = request.with_parameter(key, value);
                }
                for header in &headers {
                    let (name, value) = split_pair(header, ':')?;
                    request = request.with_header(name, value.trim());
                }
                if let Some(body) = &data {
                    request = request.with_body(body.clone());
                }
                if let Some(method) = method {
                    request = request.with_method(method.into());
                }
                let tx = tx.clone();
                connector.send(request.on_response(move |_, response| {
                    let _ = tx.send(response);
                }))?;
            }
            drop(tx);

            let mut failed = false;
            while let Some(response) = rx.recv().await {
                failed |= !response.success;
                print_response(&response);
            }
            if failed {
                std::process::exit(1);
            }
        }
        Commands::Stream => stream(&cli.config, config).await?,
    }

    Ok(())
}

async fn stream(path: &std::path::Path, config: ConnectorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = Arc::new(ConnectorRegistry::from_config(config)?);
    let shutdown = Arc::new(Shutdown::new());

    let (watcher, updates) = ConfigWatcher::new(path);
    let _watcher = watcher.run()?;
    let reload_task = tokio::spawn(apply_updates(registry.clone(), updates, shutdown.subscribe()));

    let signal = shutdown.clone();
    tokio::spawn(async move { signal.trigger_on_ctrl_c().await });

    let mut stop = shutdown.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = stop.recv() => break,
        };
        let Some(line) = line else { break };
        let mut parts = line.split_whitespace();
        let (Some(service), Some(function)) = (parts.next(), parts.next()) else {
            if !line.trim().is_empty() {
                eprintln!("expected: SERVICE FUNCTION [PATH]");
            }
            continue;
        };
        let path = parts.next().unwrap_or_default().to_string();

        let connector = match registry.get_connector(service, function) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };
        let request = Request::new()
            .with_function(path)
            .on_response(|request, response| {
                println!("[{}]", request.id());
                print_response(&response);
            });
        if let Err(e) = connector.send(request) {
            eprintln!("{}", e);
        }
    }

    shutdown.trigger();
    registry.wait_idle().await;
    let _ = reload_task.await;
    Ok(())
}

fn split_pair(raw: &str, sep: char) -> Result<(String, String), String> {
    raw.split_once(sep)
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected '{}' in '{}'", sep, raw))
}

fn print_summary(config: &ConnectorConfig) {
    println!("configuration OK");
    println!(
        "  timeout {}s, connect {}s, max concurrent {}",
        config.connection.request_secs, config.connection.connect_secs, config.connection.max_concurrent
    );
    for creds in &config.credentials {
        println!("  service {} -> {}", creds.service_id, creds.url);
    }
    if config.gateway.enabled {
        println!("  gateway {}", config.gateway.url);
        for endpoint in &config.gateway.endpoints {
            println!(
                "    {}{} ({})",
                endpoint.service_id, endpoint.function, endpoint.service_type
            );
        }
    }
}

fn print_response(response: &Response) {
    if response.success {
        println!(
            "OK {} in {:.3}s",
            response.status.unwrap_or_default(),
            response.elapsed_secs
        );
        println!("{}", response.text());
    } else {
        eprintln!("FAILED in {:.3}s: {}", response.elapsed_secs, response.error);
    }
}
