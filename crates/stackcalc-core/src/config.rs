//! Centralized configuration for the stack calculator.
//!
//! Compile-time limits and defaults for the service and its transport, plus the
//! runtime policy knobs accepted by [`CalculatorServiceBuilder`](crate::CalculatorServiceBuilder).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Service-level configuration.
pub struct ServiceConfig;

impl ServiceConfig {
    pub const SERVICE_NAME: &'static str = "CalculatorService";
    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 1099;

    /// Upper bound on a single `delay_pop` wait.
    pub const MAX_DELAY: Duration = Duration::from_secs(600);

    // Transport limits
    pub const MAX_IPC_MESSAGE_SIZE: usize = 64 * 1024;
    pub const MAX_IPC_CONNECTIONS: usize = 256;
}

/// Client-side configuration.
pub struct ClientConfig;

impl ClientConfig {
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
    pub const MULTI_CLIENT_COUNT: usize = 5;
}

/// What `push_operation` does when the stack holds no values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyOperationPolicy {
    /// Succeed without pushing anything.
    #[default]
    NoOp,
    /// Fail with `EmptyStack`.
    Reject,
}

impl EmptyOperationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmptyOperationPolicy::NoOp => "no_op",
            EmptyOperationPolicy::Reject => "reject",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "no_op" | "noop" | "no-op" => Some(EmptyOperationPolicy::NoOp),
            "reject" => Some(EmptyOperationPolicy::Reject),
            _ => None,
        }
    }
}

impl std::fmt::Display for EmptyOperationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
