//! TCP transport for the calculator service.
//!
//! Length-prefixed JSON-RPC 2.0 over TCP. The server publishes one
//! `CalculatorService` under its service name; clients check the name with a
//! `lookup` call before issuing operations.
//!
//! # Architecture
//!
//! - **Server**: accepts connections, dispatches method calls, cancels calls whose peer goes away
//! - **Client**: raw JSON-RPC calls over one connection
//! - **Remote**: typed proxy exposing the five stack operations
//! - **Protocol**: shared framing and JSON-RPC types used by both sides

pub mod client;
pub mod protocol;
pub mod remote;
pub mod server;

pub use client::IpcClient;
pub use protocol::{IpcRequest, IpcResponse};
pub use remote::RemoteCalculator;
pub use server::{IpcDispatch, IpcServer, IpcServerHandle};
