//! Aggregate operators applied to a drained stack snapshot.
//!
//! Snapshots arrive bottom first, but folds start at the top of the stack
//! (the last value pushed) and work down, the order values come off a stack.
//! gcd/lcm steps are computed in 64-bit and narrowed back to `i32` by keeping
//! the low 32 bits, so a result that does not fit wraps instead of panicking.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{CalcError, Result};

/// An aggregate function accepted by `push_operation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Min,
    Max,
    Gcd,
    Lcm,
}

impl Operator {
    pub const ALL: [Operator; 4] = [Operator::Min, Operator::Max, Operator::Gcd, Operator::Lcm];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Min => "min",
            Operator::Max => "max",
            Operator::Gcd => "gcd",
            Operator::Lcm => "lcm",
        }
    }

    /// Apply this operator to a non-empty list of values.
    pub fn apply(self, values: &[i32]) -> Result<i32> {
        let mut top_down = values.iter().rev().copied();
        let first = top_down.next().ok_or(CalcError::EmptyStack)?;

        let result = match self {
            Operator::Min => top_down.fold(first, i32::min),
            Operator::Max => top_down.fold(first, i32::max),
            Operator::Gcd => top_down.fold(abs(first), gcd),
            Operator::Lcm => top_down.fold(abs(first), lcm),
        };

        Ok(result)
    }
}

impl FromStr for Operator {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min" => Ok(Operator::Min),
            "max" => Ok(Operator::Max),
            "gcd" => Ok(Operator::Gcd),
            "lcm" => Ok(Operator::Lcm),
            _ => Err(CalcError::InvalidOperator {
                token: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Compute `op` over `values`.
pub fn evaluate(op: Operator, values: &[i32]) -> Result<i32> {
    op.apply(values)
}

/// Parse `token` and compute it over `values`.
///
/// Fails with `InvalidOperator` before looking at `values` when the token is
/// not recognized.
pub fn evaluate_token(token: &str, values: &[i32]) -> Result<i32> {
    token.parse::<Operator>()?.apply(values)
}

fn gcd_u64(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

// Keep the low 32 bits, two's complement.
fn narrow(v: u64) -> i32 {
    v as u32 as i32
}

fn abs(v: i32) -> i32 {
    narrow(u64::from(v.unsigned_abs()))
}

fn gcd(a: i32, b: i32) -> i32 {
    narrow(gcd_u64(u64::from(a.unsigned_abs()), u64::from(b.unsigned_abs())))
}

fn lcm(a: i32, b: i32) -> i32 {
    if a == 0 || b == 0 {
        return 0;
    }
    let a = u64::from(a.unsigned_abs());
    let b = u64::from(b.unsigned_abs());
    // a / g * b <= 2^62, no u64 overflow
    narrow(a / gcd_u64(a, b) * b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max() {
        assert_eq!(evaluate(Operator::Min, &[10, 20, 30]).unwrap(), 10);
        assert_eq!(evaluate(Operator::Max, &[10, 20, 30]).unwrap(), 30);
        assert_eq!(evaluate(Operator::Min, &[5, -7, 3]).unwrap(), -7);
        assert_eq!(evaluate(Operator::Max, &[i32::MIN, -1]).unwrap(), -1);
    }

    #[test]
    fn test_gcd() {
        assert_eq!(evaluate(Operator::Gcd, &[12, 18, 24, 36]).unwrap(), 6);
        assert_eq!(evaluate(Operator::Gcd, &[-12, 18]).unwrap(), 6);
        assert_eq!(evaluate(Operator::Gcd, &[0, 0]).unwrap(), 0);
        assert_eq!(evaluate(Operator::Gcd, &[0, 9]).unwrap(), 9);
        assert_eq!(evaluate(Operator::Gcd, &[7, 13]).unwrap(), 1);
    }

    #[test]
    fn test_lcm() {
        assert_eq!(evaluate(Operator::Lcm, &[4, 6]).unwrap(), 12);
        assert_eq!(evaluate(Operator::Lcm, &[2, 3, 4]).unwrap(), 12);
        assert_eq!(evaluate(Operator::Lcm, &[-4, 6]).unwrap(), 12);
    }

    #[test]
    fn test_lcm_folds_from_top_of_stack() {
        // 3 and 65537 combine first (196611), then wrap against 65536.
        // Starting from the bottom would wrap at 65536 * 65537 instead.
        assert_eq!(evaluate(Operator::Lcm, &[65536, 65537, 3]).unwrap(), 65536);
        assert_eq!(evaluate(Operator::Lcm, &[3, 65537, 65536]).unwrap(), 196608);
    }

    #[test]
    fn test_lcm_zero_propagates() {
        assert_eq!(evaluate(Operator::Lcm, &[4, 0, 6]).unwrap(), 0);
        assert_eq!(evaluate(Operator::Lcm, &[0, 5]).unwrap(), 0);
    }

    #[test]
    fn test_single_value() {
        assert_eq!(evaluate(Operator::Min, &[-3]).unwrap(), -3);
        assert_eq!(evaluate(Operator::Max, &[-3]).unwrap(), -3);
        assert_eq!(evaluate(Operator::Gcd, &[-3]).unwrap(), 3);
        assert_eq!(evaluate(Operator::Lcm, &[-3]).unwrap(), 3);
    }

    #[test]
    fn test_wide_results_wrap() {
        // |i32::MIN| does not fit back into i32
        assert_eq!(evaluate(Operator::Gcd, &[i32::MIN, 0]).unwrap(), i32::MIN);
        // 65536 * 65537 = 2^32 + 2^16, low 32 bits are 65536
        assert_eq!(evaluate(Operator::Lcm, &[65536, 65537]).unwrap(), 65536);
    }

    #[test]
    fn test_empty_values_rejected() {
        assert!(matches!(
            evaluate(Operator::Min, &[]),
            Err(CalcError::EmptyStack)
        ));
    }

    #[test]
    fn test_parse_tokens() {
        for op in Operator::ALL {
            assert_eq!(op.as_str().parse::<Operator>().unwrap(), op);
        }
        assert_eq!(" GCD ".parse::<Operator>().unwrap(), Operator::Gcd);
        match "bogus".parse::<Operator>() {
            Err(CalcError::InvalidOperator { token }) => assert_eq!(token, "bogus"),
            other => panic!("Expected InvalidOperator, got: {:?}", other),
        }
    }

    #[test]
    fn test_evaluate_token() {
        assert_eq!(evaluate_token("max", &[1, 9, 4]).unwrap(), 9);
        assert!(matches!(
            evaluate_token("avg", &[1, 2]),
            Err(CalcError::InvalidOperator { .. })
        ));
    }
}
