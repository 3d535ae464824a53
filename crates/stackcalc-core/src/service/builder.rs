//! Builder for configuring `CalculatorService` construction.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{EmptyOperationPolicy, ServiceConfig};
use crate::error::{CalcError, Result};
use crate::service::CalculatorService;
use crate::store::StackStore;

/// Builder for configuring `CalculatorService` construction.
///
/// # Example
///
/// ```
/// use stackcalc_core::{CalculatorService, EmptyOperationPolicy};
///
/// let service = CalculatorService::builder()
///     .service_name("Calc")
///     .empty_operation_policy(EmptyOperationPolicy::Reject)
///     .build()
///     .unwrap();
/// assert_eq!(service.service_name(), "Calc");
/// ```
pub struct CalculatorServiceBuilder {
    store: Option<Arc<StackStore>>,
    service_name: String,
    empty_policy: EmptyOperationPolicy,
    max_delay: Duration,
}

impl Default for CalculatorServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CalculatorServiceBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            service_name: ServiceConfig::SERVICE_NAME.to_string(),
            empty_policy: EmptyOperationPolicy::default(),
            max_delay: ServiceConfig::MAX_DELAY,
        }
    }

    /// Use an existing store instead of creating a fresh one.
    ///
    /// Services built over the same store operate on the same stack.
    pub fn with_store(mut self, store: Arc<StackStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Name the service is published under.
    ///
    /// Default: `CalculatorService`
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Behaviour of `push_operation` on an empty stack.
    ///
    /// Default: [`EmptyOperationPolicy::NoOp`]
    pub fn empty_operation_policy(mut self, policy: EmptyOperationPolicy) -> Self {
        self.empty_policy = policy;
        self
    }

    /// Cap applied to `delay_pop` waits.
    ///
    /// Default: [`ServiceConfig::MAX_DELAY`]
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Build the service.
    pub fn build(self) -> Result<CalculatorService> {
        let name = self.service_name.trim();
        if name.is_empty() || name.contains(['/', ' ']) {
            return Err(CalcError::Validation {
                field: "service_name".to_string(),
                message: format!("Invalid service name: {:?}", self.service_name),
            });
        }

        Ok(CalculatorService {
            store: self.store.unwrap_or_default(),
            service_name: name.to_string(),
            empty_policy: self.empty_policy,
            max_delay: self.max_delay,
        })
    }
}
