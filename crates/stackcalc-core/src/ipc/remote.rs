//! Typed proxy for a remote `CalculatorService`.

use super::client::IpcClient;
use crate::{CalcError, Result};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::net::SocketAddr;
use tracing::debug;

/// Client-side handle to a calculator published under a service name.
///
/// Every method is one round trip; errors come back as the same `CalcError`
/// variants the service produced.
#[derive(Debug)]
pub struct RemoteCalculator {
    client: IpcClient,
    service_name: String,
}

impl RemoteCalculator {
    /// Connect to `addr` and check that `name` is the service published there.
    ///
    /// Fails with `Transport` if the server is unreachable and `NotBound` if a
    /// different name is published.
    pub async fn lookup(addr: &str, name: &str) -> Result<Self> {
        let client = IpcClient::connect(addr).await?;
        let bound = client.call("lookup", json!({ "name": name })).await?;

        let service_name = bound
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(name)
            .to_string();
        debug!("Bound to {} at {}", service_name, client.addr());

        Ok(Self {
            client,
            service_name,
        })
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn addr(&self) -> SocketAddr {
        self.client.addr()
    }

    pub async fn push_value(&self, value: i32) -> Result<()> {
        self.client.call("push_value", json!({ "value": value })).await?;
        Ok(())
    }

    pub async fn push_operation(&self, operator: &str) -> Result<()> {
        self.client
            .call("push_operation", json!({ "operator": operator }))
            .await?;
        Ok(())
    }

    pub async fn pop(&self) -> Result<i32> {
        self.typed("pop", json!({})).await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        self.typed("is_empty", json!({})).await
    }

    /// Ask the server to wait `millis` milliseconds and then pop.
    ///
    /// Dropping the returned future before it resolves (for example through
    /// `tokio::time::timeout`) closes the connection, so the server abandons
    /// the wait and pops nothing. The proxy is unusable afterwards; look the
    /// service up again.
    pub async fn delay_pop(&self, millis: i64) -> Result<i32> {
        self.typed("delay_pop", json!({ "millis": millis })).await
    }

    pub async fn ping(&self) -> Result<()> {
        self.client.call("ping", json!({})).await?;
        Ok(())
    }

    /// Server-reported status (`service`, `version`, `size`, policy).
    pub async fn status(&self) -> Result<Value> {
        self.client.call("status", json!({})).await
    }

    async fn typed<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let value = self.client.call(method, params).await?;
        serde_json::from_value(value).map_err(|e| CalcError::Json {
            message: format!("Unexpected result for {}: {}", method, e),
            source: Some(e),
        })
    }
}
