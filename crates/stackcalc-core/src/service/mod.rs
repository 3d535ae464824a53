//! Calculator service facade.
//!
//! `CalculatorService` exposes the five remote operations over an injected
//! [`StackStore`]. The submodules extend it with a builder and the JSON-RPC
//! dispatch used by the transports.

mod builder;
mod dispatch;

pub use builder::CalculatorServiceBuilder;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::cancel::CancellationToken;
use crate::config::{EmptyOperationPolicy, ServiceConfig};
use crate::error::{CalcError, Result};
use crate::operator::Operator;
use crate::store::StackStore;

/// The published calculator object.
///
/// Cheap to share behind an `Arc`; all mutable state lives in the store.
#[derive(Debug)]
pub struct CalculatorService {
    store: Arc<StackStore>,
    service_name: String,
    empty_policy: EmptyOperationPolicy,
    max_delay: Duration,
}

impl Default for CalculatorService {
    fn default() -> Self {
        Self {
            store: Arc::new(StackStore::new()),
            service_name: ServiceConfig::SERVICE_NAME.to_string(),
            empty_policy: EmptyOperationPolicy::default(),
            max_delay: ServiceConfig::MAX_DELAY,
        }
    }
}

impl CalculatorService {
    /// Create a service with a fresh store and default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for `CalculatorService`.
    ///
    /// Use the builder to inject a shared store or change the empty-stack
    /// policy, service name and delay cap.
    pub fn builder() -> CalculatorServiceBuilder {
        CalculatorServiceBuilder::new()
    }

    /// The store backing this service.
    pub fn store(&self) -> &Arc<StackStore> {
        &self.store
    }

    /// Name this service is published under.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn empty_operation_policy(&self) -> EmptyOperationPolicy {
        self.empty_policy
    }

    /// Push `value` onto the shared stack.
    pub fn push_value(&self, value: i32) -> Result<()> {
        self.store.push_value(value)
    }

    /// Replace the whole stack with `operator` applied to its values.
    ///
    /// The token is parsed before the stack is touched, so an unknown operator
    /// leaves the stack exactly as it was.
    pub fn push_operation(&self, operator: &str) -> Result<()> {
        let op: Operator = operator.parse()?;

        match self.store.drain_and_replace(|values| op.apply(values))? {
            Some(result) => {
                debug!("{} -> {}", op, result);
                Ok(())
            }
            None => match self.empty_policy {
                EmptyOperationPolicy::NoOp => {
                    debug!("{} on empty stack ignored", op);
                    Ok(())
                }
                EmptyOperationPolicy::Reject => Err(CalcError::EmptyStack),
            },
        }
    }

    /// Pop the top value.
    pub fn pop(&self) -> Result<i32> {
        self.store.pop()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.store.is_empty()
    }

    /// Wait `millis` milliseconds, then pop.
    ///
    /// Negative delays are treated as zero and long ones are capped at the
    /// configured maximum. The store lock is not held while waiting, so the
    /// pop sees whatever other clients did in the meantime; `EmptyStack` is an
    /// expected outcome. If `cancel` fires before the wait elapses the call
    /// returns `Cancelled` and nothing is popped.
    pub async fn delay_pop(&self, millis: i64, cancel: &CancellationToken) -> Result<i32> {
        let wait = self.clamp_delay(millis);
        debug!("delay_pop waiting {:?}", wait);

        // An elapsed timer wins over a cancel that lands in the same poll.
        tokio::select! {
            biased;
            _ = tokio::time::sleep(wait) => {}
            _ = cancel.cancelled() => {
                info!("delay_pop cancelled after requesting {:?}", wait);
                return Err(CalcError::Cancelled);
            }
        }

        self.store.pop()
    }

    fn clamp_delay(&self, millis: i64) -> Duration {
        let millis = u64::try_from(millis).unwrap_or(0);
        Duration::from_millis(millis).min(self.max_delay)
    }
}
