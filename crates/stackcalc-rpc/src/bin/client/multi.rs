//! Concurrent scenarios from several connections sharing one stack.

use crate::Target;
use anyhow::Result;
use futures::future::join_all;
use stackcalc_core::RemoteCalculator;
use std::time::{Duration, Instant};
use tracing::warn;

pub async fn run(target: &Target, clients: usize) -> Result<()> {
    println!("Starting multiple client test with {} clients...", clients);

    let mut calcs = Vec::with_capacity(clients);
    for _ in 0..clients.max(1) {
        calcs.push(target.connect().await?);
    }

    concurrent_pushes(&calcs).await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    concurrent_operations(&calcs).await?;
    tokio::time::sleep(Duration::from_millis(500)).await;

    concurrent_pops(&calcs).await?;
    concurrent_delay_pops(&calcs).await?;

    println!("\nAll multiple client tests completed");
    Ok(())
}

async fn concurrent_pushes(calcs: &[RemoteCalculator]) {
    println!("\n=== Concurrent pushes ===");

    join_all(calcs.iter().enumerate().map(|(i, calc)| async move {
        let id = i + 1;
        for j in 1..=3 {
            let value = (id * 10 + j) as i32;
            match calc.push_value(value).await {
                Ok(()) => println!("Client {} pushed: {}", id, value),
                Err(e) => warn!("Client {} push failed: {}", id, e),
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }))
    .await;

    if let Some(calc) = calcs.first() {
        match calc.status().await {
            Ok(status) => println!("Stack size after pushes: {}", status["size"]),
            Err(e) => warn!("status failed: {}", e),
        }
    }
}

async fn concurrent_operations(calcs: &[RemoteCalculator]) -> Result<()> {
    println!("\n=== Concurrent operations ===");

    let setup = &calcs[0];
    if setup.is_empty().await? {
        for v in [12, 18, 24, 36] {
            setup.push_value(v).await?;
        }
    }

    let ops = ["gcd", "max"];
    join_all(calcs.iter().take(ops.len()).zip(ops).enumerate().map(
        |(i, (calc, op))| async move {
            let id = (i + 1) as i32;
            let result = async {
                calc.push_value(6 * id).await?;
                calc.push_value(9 * id).await?;
                println!("Client {} performing operation: {}", id, op);
                calc.push_operation(op).await
            }
            .await;
            if let Err(e) = result {
                warn!("Client {} {} failed: {}", id, op, e);
            }
        },
    ))
    .await;

    let top = setup.pop().await?;
    println!("Result left on the stack: {}", top);
    Ok(())
}

async fn concurrent_pops(calcs: &[RemoteCalculator]) -> Result<()> {
    println!("\n=== Concurrent pops ===");

    for i in 1..=10 {
        calcs[0].push_value(i * 5).await?;
    }

    join_all(calcs.iter().enumerate().map(|(i, calc)| async move {
        let id = i + 1;
        for _ in 0..2 {
            match calc.pop().await {
                Ok(v) => println!("Client {} popped: {}", id, v),
                Err(e) => {
                    println!("Client {} couldn't pop: {}", id, e);
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    }))
    .await;

    Ok(())
}

async fn concurrent_delay_pops(calcs: &[RemoteCalculator]) -> Result<()> {
    println!("\n--- Concurrent delay_pop ---");

    for v in [100, 200, 300] {
        calcs[0].push_value(v).await?;
    }

    join_all(calcs.iter().take(3).enumerate().map(|(i, calc)| async move {
        let id = i + 1;
        let delay = 500 + (i as i64) * 200;
        println!("Client {} starting delay_pop with {}ms delay", id, delay);

        let start = Instant::now();
        match calc.delay_pop(delay).await {
            Ok(v) => println!(
                "Client {} delay-popped: {} after {}ms",
                id,
                v,
                start.elapsed().as_millis()
            ),
            Err(e) => println!("Client {} delay_pop error: {}", id, e),
        }
    }))
    .await;

    Ok(())
}
