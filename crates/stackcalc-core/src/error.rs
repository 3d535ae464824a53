//! Error types for the stack calculator.
//!
//! Every failure a remote call can report is a variant of [`CalcError`]. The
//! core only produces `EmptyStack`, `InvalidOperator` and `Cancelled`; the
//! remaining variants come from the transport edge and parameter decoding.

use thiserror::Error;

/// Main error type for the stack calculator.
#[derive(Debug, Error)]
pub enum CalcError {
    // Stack errors
    #[error("Stack is empty")]
    EmptyStack,

    #[error("Invalid operator: {token}")]
    InvalidOperator { token: String },

    #[error("Delayed pop cancelled")]
    Cancelled,

    // Request errors
    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("Service not bound: {name}")]
    NotBound { name: String },

    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    // Transport errors
    #[error("Transport failure: {message}")]
    Transport { message: String },

    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Error reported by a peer with a code this build does not know.
    #[error("Remote error {code}: {message}")]
    Remote { code: i32, message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Result type alias for calculator operations.
pub type Result<T> = std::result::Result<T, CalcError>;

impl From<std::io::Error> for CalcError {
    fn from(err: std::io::Error) -> Self {
        CalcError::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for CalcError {
    fn from(err: serde_json::Error) -> Self {
        CalcError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl CalcError {
    /// JSON-RPC parse error.
    pub const PARSE_ERROR: i32 = -32700;
    /// JSON-RPC invalid request.
    pub const INVALID_REQUEST: i32 = -32600;
    /// JSON-RPC method not found.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// JSON-RPC invalid params.
    pub const INVALID_PARAMS: i32 = -32602;
    /// JSON-RPC internal error.
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Pop or reject-policy operation on an empty stack.
    pub const EMPTY_STACK: i32 = -32010;
    /// Unrecognized operator token.
    pub const INVALID_OPERATOR: i32 = -32011;
    /// Delayed pop interrupted before the wait elapsed.
    pub const CANCELLED: i32 = -32012;
    /// Lookup of a service name that is not published here.
    pub const NOT_BOUND: i32 = -32013;
    /// Transport-level failure relayed by a gateway.
    pub const TRANSPORT: i32 = -32000;

    /// Convert to a JSON-RPC error code.
    ///
    /// Standard JSON-RPC error codes:
    /// - -32601: Method not found
    /// - -32602: Invalid params
    /// - -32603: Internal error
    ///
    /// Custom error codes (application-defined, -32000 to -32099):
    /// - -32000: Transport failure
    /// - -32010: Empty stack
    /// - -32011: Invalid operator
    /// - -32012: Cancelled
    /// - -32013: Service not bound
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            CalcError::EmptyStack => Self::EMPTY_STACK,
            CalcError::InvalidOperator { .. } => Self::INVALID_OPERATOR,
            CalcError::Cancelled => Self::CANCELLED,
            CalcError::NotBound { .. } => Self::NOT_BOUND,
            CalcError::MethodNotFound { .. } => Self::METHOD_NOT_FOUND,
            CalcError::InvalidParams { .. } | CalcError::Validation { .. } => Self::INVALID_PARAMS,
            CalcError::Transport { .. } => Self::TRANSPORT,
            CalcError::Remote { code, .. } => *code,

            // All other errors are internal errors
            _ => Self::INTERNAL_ERROR,
        }
    }

    /// Structured data attached to the JSON-RPC error object, if any.
    pub fn to_rpc_error_data(&self) -> Option<serde_json::Value> {
        match self {
            CalcError::InvalidOperator { token } => Some(serde_json::json!({ "operator": token })),
            CalcError::NotBound { name } => Some(serde_json::json!({ "name": name })),
            CalcError::MethodNotFound { method } => Some(serde_json::json!({ "method": method })),
            _ => None,
        }
    }

    /// Rebuild a typed error from a JSON-RPC error object.
    ///
    /// Inverse of [`to_rpc_error_code`](Self::to_rpc_error_code) for the codes
    /// this crate produces; anything else becomes [`CalcError::Remote`].
    pub fn from_rpc(code: i32, message: String, data: Option<&serde_json::Value>) -> Self {
        let field = |key: &str| {
            data.and_then(|d| d.get(key))
                .and_then(|v| v.as_str())
                .map(String::from)
        };

        match code {
            Self::EMPTY_STACK => CalcError::EmptyStack,
            Self::INVALID_OPERATOR => CalcError::InvalidOperator {
                token: field("operator").unwrap_or_default(),
            },
            Self::CANCELLED => CalcError::Cancelled,
            Self::NOT_BOUND => CalcError::NotBound {
                name: field("name").unwrap_or_default(),
            },
            Self::METHOD_NOT_FOUND => CalcError::MethodNotFound {
                method: field("method").unwrap_or_default(),
            },
            Self::INVALID_PARAMS => CalcError::InvalidParams { message },
            Self::TRANSPORT => CalcError::Transport { message },
            _ => CalcError::Remote { code, message },
        }
    }

    /// Shorthand for a transport failure.
    pub fn transport(message: impl Into<String>) -> Self {
        CalcError::Transport {
            message: message.into(),
        }
    }

    /// Errors that are an expected outcome of racing other clients.
    pub fn is_stack_race(&self) -> bool {
        matches!(self, CalcError::EmptyStack)
    }
}
