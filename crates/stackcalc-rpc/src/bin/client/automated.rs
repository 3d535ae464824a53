//! Automated checks against a live server.
//!
//! Assumes no other client is using the stack while it runs.

use anyhow::{bail, ensure, Result};
use stackcalc_core::{CalcError, RemoteCalculator};
use std::time::{Duration, Instant};
use tracing::info;

pub async fn run(calc: &RemoteCalculator, client_id: &str) -> Result<()> {
    println!("\n[{}] Running automated tests...", client_id);

    let leftover = drain(calc).await?;
    if leftover > 0 {
        println!("[{}] Discarded {} leftover values", client_id, leftover);
    }

    basic_operations(calc).await?;
    is_empty(calc).await?;
    operators(calc).await?;
    delay_pop(calc).await?;
    error_handling(calc).await?;

    println!("\n[{}] All automated tests passed", client_id);
    Ok(())
}

async fn drain(calc: &RemoteCalculator) -> Result<usize> {
    let mut count = 0;
    loop {
        match calc.pop().await {
            Ok(v) => {
                info!("discarding {}", v);
                count += 1;
            }
            Err(CalcError::EmptyStack) => return Ok(count),
            Err(e) => return Err(e.into()),
        }
    }
}

async fn basic_operations(calc: &RemoteCalculator) -> Result<()> {
    println!("\n--- Basic operations ---");
    for v in [10, 20, 30] {
        calc.push_value(v).await?;
    }

    let popped = [calc.pop().await?, calc.pop().await?, calc.pop().await?];
    println!("Popped values: {:?}", popped);
    ensure!(popped == [30, 20, 10], "expected LIFO order [30, 20, 10], got {:?}", popped);

    println!("ok");
    Ok(())
}

async fn is_empty(calc: &RemoteCalculator) -> Result<()> {
    println!("\n--- is_empty ---");
    let before = calc.is_empty().await?;
    calc.push_value(100).await?;
    let during = calc.is_empty().await?;
    calc.pop().await?;
    let after = calc.is_empty().await?;

    println!("empty before/after push/after pop: {} {} {}", before, during, after);
    ensure!(before && !during && after, "is_empty reported {} {} {}", before, during, after);

    println!("ok");
    Ok(())
}

async fn operators(calc: &RemoteCalculator) -> Result<()> {
    println!("\n--- Operators ---");
    let cases: [(&str, &[i32], i32); 4] = [
        ("min", &[10, 20, 30], 10),
        ("max", &[10, 20, 30], 30),
        ("gcd", &[12, 18, 24, 36], 6),
        ("lcm", &[4, 6], 12),
    ];

    for (op, values, expected) in cases {
        for &v in values {
            calc.push_value(v).await?;
        }
        calc.push_operation(op).await?;
        let result = calc.pop().await?;
        println!("{}{:?} = {}", op, values, result);
        ensure!(result == expected, "{} of {:?}: expected {}, got {}", op, values, expected, result);
        ensure!(calc.is_empty().await?, "{} left extra values on the stack", op);
    }

    println!("ok");
    Ok(())
}

async fn delay_pop(calc: &RemoteCalculator) -> Result<()> {
    println!("\n--- delay_pop ---");
    let delay = Duration::from_millis(200);
    calc.push_value(500).await?;

    let start = Instant::now();
    let value = calc.delay_pop(delay.as_millis() as i64).await?;
    let elapsed = start.elapsed();

    println!("delay_pop returned {} after {:?}", value, elapsed);
    ensure!(value == 500, "expected 500, got {}", value);
    ensure!(elapsed >= delay, "returned after {:?}, before the {:?} delay", elapsed, delay);

    println!("ok");
    Ok(())
}

async fn error_handling(calc: &RemoteCalculator) -> Result<()> {
    println!("\n--- Error handling ---");

    match calc.pop().await {
        Err(CalcError::EmptyStack) => println!("pop on empty stack: {}", CalcError::EmptyStack),
        other => bail!("pop on empty stack: expected EmptyStack, got {:?}", other),
    }

    calc.push_value(1).await?;
    match calc.push_operation("average").await {
        Err(e @ CalcError::InvalidOperator { .. }) => println!("unknown operator: {}", e),
        other => bail!("unknown operator: expected InvalidOperator, got {:?}", other),
    }
    ensure!(calc.pop().await? == 1, "unknown operator changed the stack");

    println!("ok");
    Ok(())
}
