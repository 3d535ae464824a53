//! JSON-RPC dispatch for the calculator service.
//!
//! Routes method names from either transport to the facade. Method and
//! parameter names are accepted in snake_case and camelCase, and params may be
//! given by name or positionally.

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::cancel::CancellationToken;
use crate::error::{CalcError, Result};
use crate::ipc::server::IpcDispatch;
use crate::service::CalculatorService;

/// Look up a parameter by name, alias, or first position.
fn get_param<'a>(params: &'a Value, name: &str, alias: &str) -> Option<&'a Value> {
    params
        .get(name)
        .or_else(|| params.get(alias))
        .or_else(|| params.get(0))
}

fn require_i64_param(params: &Value, name: &str, alias: &str) -> Result<i64> {
    get_param(params, name, alias)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| CalcError::InvalidParams {
            message: format!("Missing required integer parameter: {}", name),
        })
}

fn require_i32_param(params: &Value, name: &str, alias: &str) -> Result<i32> {
    let value = require_i64_param(params, name, alias)?;
    i32::try_from(value).map_err(|_| CalcError::InvalidParams {
        message: format!("Parameter {} out of 32-bit range: {}", name, value),
    })
}

fn require_str_param<'a>(params: &'a Value, name: &str, alias: &str) -> Result<&'a str> {
    get_param(params, name, alias)
        .and_then(|v| v.as_str())
        .ok_or_else(|| CalcError::InvalidParams {
            message: format!("Missing required string parameter: {}", name),
        })
}

impl CalculatorService {
    /// Answer a lookup for `name`.
    pub fn lookup(&self, name: Option<&str>) -> Result<Value> {
        match name {
            Some(name) if name != self.service_name() => Err(CalcError::NotBound {
                name: name.to_string(),
            }),
            _ => Ok(json!({
                "name": self.service_name(),
                "version": env!("CARGO_PKG_VERSION"),
            })),
        }
    }

    /// Current service status.
    pub fn status(&self) -> Result<Value> {
        Ok(json!({
            "service": self.service_name(),
            "version": env!("CARGO_PKG_VERSION"),
            "size": self.store().len()?,
            "empty_operation_policy": self.empty_operation_policy(),
        }))
    }
}

#[async_trait::async_trait]
impl IpcDispatch for CalculatorService {
    async fn dispatch(
        &self,
        method: &str,
        params: Value,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        debug!("dispatch {}({})", method, params);

        match method {
            "push_value" | "pushValue" => {
                let value = require_i32_param(&params, "value", "val")?;
                self.push_value(value)?;
                Ok(Value::Null)
            }
            "push_operation" | "pushOperation" => {
                let operator = require_str_param(&params, "operator", "op")?;
                self.push_operation(operator)?;
                Ok(Value::Null)
            }
            "pop" => Ok(json!(self.pop()?)),
            "is_empty" | "isEmpty" => Ok(json!(self.is_empty()?)),
            "delay_pop" | "delayPop" => {
                let millis = require_i64_param(&params, "millis", "delay")?;
                Ok(json!(self.delay_pop(millis, cancel).await?))
            }

            // Built-ins
            "ping" => Ok(json!("pong")),
            "lookup" => self.lookup(get_param(&params, "name", "service").and_then(|v| v.as_str())),
            "status" => self.status(),

            _ => {
                warn!("Method not found: {}", method);
                Err(CalcError::MethodNotFound {
                    method: method.to_string(),
                })
            }
        }
    }
}
