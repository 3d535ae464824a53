//! Stackcalc Core - a shared integer stack calculator served over the network.
//!
//! One [`CalculatorService`] owns a single LIFO stack of `i32` values that every
//! connected client operates on. Clients push values, collapse the whole stack
//! with an aggregate operator (`min`, `max`, `gcd`, `lcm`), pop, test for
//! emptiness, or pop after a delay.
//!
//! The service can be used in-process, or published over TCP with
//! [`IpcServer`] and reached from other processes with [`RemoteCalculator`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stackcalc_core::{CalculatorService, IpcServer, RemoteCalculator};
//!
//! #[tokio::main]
//! async fn main() -> stackcalc_core::Result<()> {
//!     let service = Arc::new(CalculatorService::new());
//!     let server = IpcServer::start(service).await?;
//!
//!     let calc = RemoteCalculator::lookup(&server.addr().to_string(), "CalculatorService").await?;
//!     calc.push_value(12).await?;
//!     calc.push_value(18).await?;
//!     calc.push_operation("gcd").await?;
//!     assert_eq!(calc.pop().await?, 6);
//!
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod ipc;
pub mod operator;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use cancel::CancellationToken;
pub use config::{ClientConfig, EmptyOperationPolicy, ServiceConfig};
pub use error::{CalcError, Result};
pub use ipc::{IpcClient, IpcDispatch, IpcServer, IpcServerHandle, RemoteCalculator};
pub use operator::{evaluate, evaluate_token, Operator};
pub use service::{CalculatorService, CalculatorServiceBuilder};
pub use store::StackStore;
