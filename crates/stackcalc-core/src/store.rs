//! Shared stack store.
//!
//! Owns the single integer stack every client operates on. Each primitive,
//! including the drain-compute-push sequence behind `push_operation`, runs
//! inside one critical section on the same mutex, so the observable history is
//! linearizable.
//!
//! # Thread Safety
//!
//! The lock is a `std::sync::Mutex` and is never held across an `.await`;
//! async callers (the delayed pop) wait before calling into the store.

use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::error::{CalcError, Result};

/// The process-wide LIFO stack of `i32` values.
#[derive(Debug, Default)]
pub struct StackStore {
    // Bottom of the stack is index 0.
    values: Mutex<Vec<i32>>,
}

impl StackStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<i32>>> {
        self.values.lock().map_err(|e| CalcError::Internal {
            message: format!("Stack lock poisoned: {}", e),
        })
    }

    /// Push `value` on top of the stack.
    pub fn push_value(&self, value: i32) -> Result<()> {
        let mut values = self.lock()?;
        values.push(value);
        debug!("push {} (size {})", value, values.len());
        Ok(())
    }

    /// Remove and return the top value.
    ///
    /// Fails with `EmptyStack` and leaves the stack untouched when empty.
    pub fn pop(&self) -> Result<i32> {
        let mut values = self.lock()?;
        let value = values.pop().ok_or(CalcError::EmptyStack)?;
        debug!("pop {} (size {})", value, values.len());
        Ok(value)
    }

    /// True when the stack holds no values.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    /// Number of values currently on the stack.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    /// Copy of the stack contents, bottom first.
    pub fn snapshot(&self) -> Result<Vec<i32>> {
        Ok(self.lock()?.clone())
    }

    /// Atomically drain the whole stack and replace it with `compute(drained)`.
    ///
    /// The drained values are passed bottom first. Returns `Ok(None)` without
    /// calling `compute` when the stack is empty. If `compute` fails the drained
    /// values are restored in their original order and the error is returned.
    pub fn drain_and_replace<F>(&self, compute: F) -> Result<Option<i32>>
    where
        F: FnOnce(&[i32]) -> Result<i32>,
    {
        let mut values = self.lock()?;
        if values.is_empty() {
            return Ok(None);
        }

        let drained = std::mem::take(&mut *values);
        match compute(&drained) {
            Ok(result) => {
                values.push(result);
                debug!("replaced {} values with {}", drained.len(), result);
                Ok(Some(result))
            }
            Err(e) => {
                *values = drained;
                Err(e)
            }
        }
    }
}
