//! TCP server that publishes a calculator service.
//!
//! Accepts connections, reads length-prefixed JSON-RPC requests and dispatches
//! them. Each connection runs in its own task and answers its requests in
//! order; separate connections are served concurrently.
//!
//! Every call gets its own [`CancellationToken`]. If the peer disconnects or
//! the server shuts down while a call is in flight, the token is cancelled and
//! the call is allowed to finish (a delayed pop returns `Cancelled` without
//! popping) before the connection is dropped.

use super::protocol::{read_frame, write_frame, IpcRequest, IpcResponse};
use crate::cancel::CancellationToken;
use crate::config::ServiceConfig;
use crate::{CalcError, Result};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::tcp::ReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

/// Handle to a running IPC server. Dropping shuts down the server.
pub struct IpcServerHandle {
    pub addr: SocketAddr,
    pub port: u16,
    shutdown_tx: Option<oneshot::Sender<()>>,
    conn_shutdown_tx: watch::Sender<bool>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl IpcServerHandle {
    /// Get the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shut down the server gracefully.
    ///
    /// Stops accepting new connections and signals all active connection
    /// handlers to close.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = self.conn_shutdown_tx.send(true);
    }
}

impl Drop for IpcServerHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

/// Trait for dispatching method calls to a published object.
///
/// Implemented by `CalculatorService`.
#[async_trait::async_trait]
pub trait IpcDispatch: Send + Sync + 'static {
    /// Dispatch a JSON-RPC method call and return the result.
    ///
    /// `cancel` fires if the caller goes away before the call completes.
    async fn dispatch(
        &self,
        method: &str,
        params: serde_json::Value,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value>;
}

/// IPC server that listens for client connections.
pub struct IpcServer;

impl IpcServer {
    /// Start the server on a random local port.
    pub async fn start<D: IpcDispatch>(dispatch: Arc<D>) -> Result<IpcServerHandle> {
        Self::bind("127.0.0.1:0", dispatch).await
    }

    /// Start the server on `addr` (`host:port`, port 0 = OS-assigned).
    ///
    /// Returns a handle that can be used to get the bound address and shut
    /// down the server. The server runs in background tokio tasks.
    pub async fn bind<D: IpcDispatch>(addr: &str, dispatch: Arc<D>) -> Result<IpcServerHandle> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let port = addr.port();

        info!("IPC server listening on {}", addr);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (conn_shutdown_tx, conn_shutdown_rx) = watch::channel(false);
        let active_connections = Arc::new(AtomicUsize::new(0));

        let task_handle = tokio::spawn(Self::accept_loop(
            listener,
            dispatch,
            shutdown_rx,
            conn_shutdown_rx,
            active_connections,
        ));

        Ok(IpcServerHandle {
            addr,
            port,
            shutdown_tx: Some(shutdown_tx),
            conn_shutdown_tx,
            task_handle: Some(task_handle),
        })
    }

    async fn accept_loop<D: IpcDispatch>(
        listener: TcpListener,
        dispatch: Arc<D>,
        mut shutdown_rx: oneshot::Receiver<()>,
        conn_shutdown_rx: watch::Receiver<bool>,
        active_connections: Arc<AtomicUsize>,
    ) {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("IPC server shutting down");
                    break;
                }
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            let current = active_connections.load(Ordering::Relaxed);
                            if current >= ServiceConfig::MAX_IPC_CONNECTIONS {
                                warn!(
                                    "Rejecting IPC connection from {}: at max capacity ({})",
                                    peer_addr,
                                    ServiceConfig::MAX_IPC_CONNECTIONS
                                );
                                continue;
                            }

                            active_connections.fetch_add(1, Ordering::Relaxed);
                            let dispatch = dispatch.clone();
                            let conns = active_connections.clone();
                            let mut conn_shutdown = conn_shutdown_rx.clone();

                            tokio::spawn(async move {
                                debug!("IPC connection from {}", peer_addr);
                                if let Err(e) = Self::handle_connection(stream, &*dispatch, &mut conn_shutdown).await {
                                    debug!("IPC connection {} ended: {}", peer_addr, e);
                                }
                                conns.fetch_sub(1, Ordering::Relaxed);
                            });
                        }
                        Err(e) => {
                            error!("IPC accept error: {}", e);
                        }
                    }
                }
            }
        }
    }

    async fn handle_connection<D: IpcDispatch>(
        mut stream: TcpStream,
        dispatch: &D,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        let (mut reader, mut writer) = stream.split();

        loop {
            let frame = tokio::select! {
                result = read_frame(&mut reader) => {
                    match result? {
                        Some(f) => f,
                        None => return Ok(()), // Clean disconnect
                    }
                }
                _ = shutdown_rx.changed() => {
                    return Ok(()); // Server shutting down
                }
            };

            let request_str = String::from_utf8(frame).map_err(|_| CalcError::Validation {
                field: "ipc_payload".to_string(),
                message: "Invalid UTF-8 in IPC frame".to_string(),
            })?;

            let cancel = CancellationToken::new();
            let call = Self::process_request(&request_str, dispatch, &cancel);
            tokio::pin!(call);

            let interrupted = tokio::select! {
                response = &mut call => {
                    let response_bytes = serde_json::to_vec(&response)?;
                    write_frame(&mut writer, &response_bytes).await?;
                    None
                }
                _ = peer_closed(&mut reader) => Some("peer disconnected"),
                _ = shutdown_rx.changed() => Some("server shutting down"),
            };

            if let Some(reason) = interrupted {
                cancel.cancel();
                let response = call.await;
                debug!(
                    "Call abandoned ({}), outcome discarded: {:?}",
                    reason,
                    response.error.map(|e| e.message)
                );
                return Ok(());
            }
        }
    }

    async fn process_request<D: IpcDispatch>(
        request_str: &str,
        dispatch: &D,
        cancel: &CancellationToken,
    ) -> IpcResponse {
        let request: IpcRequest = match serde_json::from_str(request_str) {
            Ok(req) => req,
            Err(e) => {
                return IpcResponse::error(
                    None,
                    CalcError::PARSE_ERROR,
                    format!("Parse error: {}", e),
                );
            }
        };

        if request.jsonrpc != "2.0" {
            return IpcResponse::error(
                request.id,
                CalcError::INVALID_REQUEST,
                "Invalid Request: expected jsonrpc 2.0".to_string(),
            );
        }

        let params = request.params.unwrap_or(serde_json::Value::Object(Default::default()));

        match dispatch.dispatch(&request.method, params, cancel).await {
            Ok(result) => IpcResponse::success(request.id, result),
            Err(e) => {
                debug!("IPC call {} failed: {}", request.method, e);
                IpcResponse::from_error(request.id, &e)
            }
        }
    }
}

/// Resolve when the peer has closed its end of the connection.
///
/// Clients wait for each response before sending the next request, so any
/// readable byte while a call is in flight is a pipelined request and is left
/// in the socket for the main loop.
async fn peer_closed(reader: &mut ReadHalf<'_>) {
    let mut probe = [0u8; 1];
    match reader.peek(&mut probe).await {
        Ok(0) | Err(_) => {}
        Ok(_) => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct EchoDispatch;

    #[async_trait::async_trait]
    impl IpcDispatch for EchoDispatch {
        async fn dispatch(
            &self,
            method: &str,
            params: serde_json::Value,
            cancel: &CancellationToken,
        ) -> Result<serde_json::Value> {
            match method {
                "echo" => Ok(params),
                "fail" => Err(CalcError::EmptyStack),
                "wait" => {
                    cancel.cancelled().await;
                    Err(CalcError::Cancelled)
                }
                _ => Err(CalcError::MethodNotFound {
                    method: method.to_string(),
                }),
            }
        }
    }

    async fn roundtrip(stream: &mut TcpStream, request: &IpcRequest) -> IpcResponse {
        let (mut reader, mut writer) = stream.split();
        let request_bytes = serde_json::to_vec(request).unwrap();
        write_frame(&mut writer, &request_bytes).await.unwrap();
        let response_bytes = read_frame(&mut reader).await.unwrap().unwrap();
        serde_json::from_slice(&response_bytes).unwrap()
    }

    #[tokio::test]
    async fn test_server_start_and_shutdown() {
        let dispatch = Arc::new(EchoDispatch);
        let mut handle = IpcServer::start(dispatch).await.unwrap();

        assert!(handle.port > 0);
        assert_eq!(handle.addr.ip(), std::net::Ipv4Addr::LOCALHOST);

        handle.shutdown();
    }

    #[tokio::test]
    async fn test_server_echo() {
        let mut handle = IpcServer::start(Arc::new(EchoDispatch)).await.unwrap();
        let mut stream = TcpStream::connect(handle.addr()).await.unwrap();

        let request = IpcRequest::new("echo", serde_json::json!({"hello": "world"}), 1);
        let response = roundtrip(&mut stream, &request).await;

        assert!(response.error.is_none());
        assert_eq!(response.result, Some(serde_json::json!({"hello": "world"})));
        assert_eq!(response.id, Some(serde_json::json!(1)));

        handle.shutdown();
    }

    #[tokio::test]
    async fn test_server_error_response_keeps_code() {
        let mut handle = IpcServer::start(Arc::new(EchoDispatch)).await.unwrap();
        let mut stream = TcpStream::connect(handle.addr()).await.unwrap();

        let response = roundtrip(&mut stream, &IpcRequest::new("fail", serde_json::json!({}), 2)).await;

        let err = response.error.unwrap();
        assert_eq!(err.code, CalcError::EMPTY_STACK);
        assert_eq!(err.message, "Stack is empty");

        let response = roundtrip(&mut stream, &IpcRequest::new("nope", serde_json::json!({}), 3)).await;
        assert_eq!(response.error.unwrap().code, CalcError::METHOD_NOT_FOUND);

        handle.shutdown();
    }

    #[tokio::test]
    async fn test_server_invalid_json_returns_parse_error() {
        let mut handle = IpcServer::start(Arc::new(EchoDispatch)).await.unwrap();
        let mut stream = TcpStream::connect(handle.addr()).await.unwrap();
        let (mut reader, mut writer) = stream.split();

        write_frame(&mut writer, b"not valid json").await.unwrap();

        let response_bytes = read_frame(&mut reader).await.unwrap().unwrap();
        let response: IpcResponse = serde_json::from_slice(&response_bytes).unwrap();

        assert_eq!(response.error.unwrap().code, CalcError::PARSE_ERROR);

        handle.shutdown();
    }

    #[tokio::test]
    async fn test_server_rejects_wrong_jsonrpc_version() {
        let mut handle = IpcServer::start(Arc::new(EchoDispatch)).await.unwrap();
        let mut stream = TcpStream::connect(handle.addr()).await.unwrap();

        let mut request = IpcRequest::new("echo", serde_json::json!({}), 4);
        request.jsonrpc = "1.0".to_string();
        let response = roundtrip(&mut stream, &request).await;

        assert_eq!(response.error.unwrap().code, CalcError::INVALID_REQUEST);

        handle.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_cancels_in_flight_call() {
        let mut handle = IpcServer::start(Arc::new(EchoDispatch)).await.unwrap();
        let mut stream = TcpStream::connect(handle.addr()).await.unwrap();
        let (mut reader, mut writer) = stream.split();

        let request = IpcRequest::new("wait", serde_json::json!({}), 5);
        write_frame(&mut writer, &serde_json::to_vec(&request).unwrap())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        handle.shutdown();

        // The connection closes without a response once the call is cancelled.
        let next = tokio::time::timeout(Duration::from_secs(2), read_frame(&mut reader))
            .await
            .expect("connection should close");
        assert!(matches!(next, Ok(None) | Err(_)));
    }
}
