//! TCP IPC client for a published calculator service.
//!
//! Establishes a TCP connection to the server and provides a `call()` method
//! for JSON-RPC method invocation. Error responses are rebuilt into the
//! matching [`CalcError`] variant, so a remote `EmptyStack` is the same value a
//! local call would have produced.
//!
//! # Thread Safety
//!
//! The client uses a tokio `Mutex` to serialize access to the TCP stream,
//! allowing safe concurrent use from multiple async tasks. Calls sharing one
//! client are answered one at a time; use separate clients for overlap.
//! Cancelling a call by dropping its future closes the connection.

use super::protocol::{read_frame, write_frame, IpcRequest, IpcResponse};
use crate::config::ClientConfig;
use crate::{CalcError, Result};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// IPC client connected to a calculator server.
#[derive(Debug)]
pub struct IpcClient {
    // `None` once a call was abandoned mid-flight.
    stream: Mutex<Option<TcpStream>>,
    addr: SocketAddr,
    next_id: AtomicU64,
}

/// Exclusive use of the stream for one call.
///
/// Dropped without `completed` set, it closes the connection so the server
/// sees the caller go away.
struct InFlight<'a> {
    slot: MutexGuard<'a, Option<TcpStream>>,
    addr: SocketAddr,
    completed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.completed && self.slot.take().is_some() {
            debug!("Closed connection to {} after an unfinished call", self.addr);
        }
    }
}

impl IpcClient {
    /// Connect to a server at `addr` (`host:port`).
    ///
    /// Uses the connection timeout from `ClientConfig`.
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = tokio::time::timeout(ClientConfig::CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| CalcError::transport(format!("Timed out connecting to {}", addr)))?
            .map_err(|e| CalcError::transport(format!("Cannot connect to {}: {}", addr, e)))?;

        let peer = stream.peer_addr()?;
        debug!("IPC client connected to {}", peer);

        Ok(Self {
            stream: Mutex::new(Some(stream)),
            addr: peer,
            next_id: AtomicU64::new(1),
        })
    }

    /// Call a JSON-RPC method on the server.
    ///
    /// Returns the result value on success. Application errors come back as
    /// their own variants; a broken connection is `Transport`.
    ///
    /// If the returned future is dropped after the request is sent but before
    /// the response is read, the connection is closed. The server then
    /// cancels the call (a pending `delay_pop` pops nothing) and every later
    /// call on this client fails with `Transport`.
    pub async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = IpcRequest::new(method, params, id);
        let request_bytes = serde_json::to_vec(&request)?;

        let mut in_flight = InFlight {
            slot: self.stream.lock().await,
            addr: self.addr,
            completed: false,
        };
        let stream = in_flight.slot.as_mut().ok_or_else(|| {
            CalcError::transport(format!(
                "Connection to {} was closed by an abandoned call",
                self.addr
            ))
        })?;

        let outcome = self.exchange(stream, &request_bytes, id).await;
        // Transport failures leave the stream in an unknown state; close it too.
        in_flight.completed = outcome.is_ok();

        outcome?.into_result()
    }

    async fn exchange(
        &self,
        stream: &mut TcpStream,
        request_bytes: &[u8],
        id: u64,
    ) -> Result<IpcResponse> {
        let (mut reader, mut writer) = stream.split();

        write_frame(&mut writer, request_bytes)
            .await
            .map_err(|e| self.lost(e))?;

        let response_bytes = read_frame(&mut reader)
            .await
            .map_err(|e| self.lost(e))?
            .ok_or_else(|| CalcError::transport(format!("Connection to {} closed", self.addr)))?;

        let response: IpcResponse =
            serde_json::from_slice(&response_bytes).map_err(|e| CalcError::Json {
                message: format!("Failed to parse IPC response: {}", e),
                source: Some(e),
            })?;

        if response.id != Some(serde_json::Value::Number(id.into())) {
            return Err(CalcError::transport(format!(
                "Response id {:?} does not match request {}",
                response.id, id
            )));
        }
        Ok(response)
    }

    /// Get the address of the connected server.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn lost(&self, err: CalcError) -> CalcError {
        CalcError::transport(format!("Connection to {} lost: {}", self.addr, err))
    }
}
