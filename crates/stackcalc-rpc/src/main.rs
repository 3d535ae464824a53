//! Stackcalc server - publishes one shared calculator stack.
//!
//! Serves the length-prefixed JSON-RPC protocol over TCP for
//! `stackcalc-client` and other `RemoteCalculator` users, and optionally the
//! same methods as HTTP JSON-RPC on `POST /rpc`.

mod handler;
mod server;

use anyhow::Result;
use clap::Parser;
use stackcalc_core::{CalculatorService, EmptyOperationPolicy, IpcServer, ServiceConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "stackcalc-server")]
#[command(about = "Shared stack calculator server")]
struct Args {
    /// Port for the TCP transport (0 = auto-assign)
    #[arg(short, long, default_value_t = ServiceConfig::DEFAULT_PORT)]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = ServiceConfig::DEFAULT_HOST)]
    host: String,

    /// Also serve HTTP JSON-RPC on this port (0 = auto-assign)
    #[arg(long)]
    http_port: Option<u16>,

    /// Name the calculator is published under
    #[arg(long, default_value = ServiceConfig::SERVICE_NAME)]
    service_name: String,

    /// What push_operation does on an empty stack: no_op or reject
    #[arg(long, default_value = "no_op", value_parser = parse_policy)]
    empty_policy: EmptyOperationPolicy,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn parse_policy(s: &str) -> std::result::Result<EmptyOperationPolicy, String> {
    EmptyOperationPolicy::from_str(s)
        .ok_or_else(|| format!("unknown policy '{}', expected no_op or reject", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging; RUST_LOG overrides --debug
    let default_level = if args.debug { "debug" } else { "info" };
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    info!("Starting stackcalc server");

    let service = Arc::new(
        CalculatorService::builder()
            .service_name(args.service_name)
            .empty_operation_policy(args.empty_policy)
            .build()?,
    );

    let mut ipc = IpcServer::bind(&format!("{}:{}", args.host, args.port), service.clone()).await?;

    // Ports on stdout for launchers and tests to read
    println!("RPC_PORT={}", ipc.port);

    if let Some(http_port) = args.http_port {
        let addr = server::start_server(service.clone(), &args.host, http_port).await?;
        println!("HTTP_PORT={}", addr.port());
    }

    info!(
        "{} bound on {} (empty stack policy: {})",
        service.service_name(),
        ipc.addr(),
        service.empty_operation_policy()
    );

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");
    ipc.shutdown();

    Ok(())
}
