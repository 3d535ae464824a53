//! Stackcalc client - talks to a running `stackcalc-server`.
//!
//! Three modes: an interactive prompt, an automated self-test, and a
//! multi-client run that hammers the shared stack from several connections.

mod automated;
mod interactive;
mod multi;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stackcalc_core::{ClientConfig, RemoteCalculator, ServiceConfig};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "stackcalc-client")]
#[command(about = "Client for the shared stack calculator")]
struct Args {
    /// Server host
    #[arg(long, default_value = ServiceConfig::DEFAULT_HOST)]
    host: String,

    /// Server TCP port
    #[arg(short, long, default_value_t = ServiceConfig::DEFAULT_PORT)]
    port: u16,

    /// Service name to look up
    #[arg(long, default_value = ServiceConfig::SERVICE_NAME)]
    service_name: String,

    /// Label printed in front of this client's output
    #[arg(long)]
    client_id: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Read commands from stdin (default)
    Interactive,
    /// Run the automated checks and exit non-zero on the first failure
    Test,
    /// Run concurrent scenarios from several connections
    Multi {
        /// Number of concurrent clients
        #[arg(long, default_value_t = ClientConfig::MULTI_CLIENT_COUNT)]
        clients: usize,
    },
}

/// Where and under which name the service is published.
#[derive(Debug, Clone)]
pub struct Target {
    pub addr: String,
    pub service_name: String,
}

impl Target {
    pub async fn connect(&self) -> Result<RemoteCalculator> {
        RemoteCalculator::lookup(&self.addr, &self.service_name)
            .await
            .with_context(|| format!("lookup of {} at {} failed", self.service_name, self.addr))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "warn" };
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let target = Target {
        addr: format!("{}:{}", args.host, args.port),
        service_name: args.service_name,
    };
    let client_id = args
        .client_id
        .unwrap_or_else(|| format!("Client-{}", std::process::id()));

    match args.mode.unwrap_or(Mode::Interactive) {
        Mode::Interactive => {
            let calc = target.connect().await?;
            println!("[{}] Connected to {} at {}", client_id, calc.service_name(), calc.addr());
            interactive::run(&calc, &client_id).await
        }
        Mode::Test => {
            let calc = target.connect().await?;
            println!("[{}] Connected to {} at {}", client_id, calc.service_name(), calc.addr());
            automated::run(&calc, &client_id).await
        }
        Mode::Multi { clients } => multi::run(&target, clients).await,
    }
}
