//! Concurrent use of one shared `CalculatorService`.
//!
//! These run on the multi-threaded runtime so calls really do overlap.

use futures::future::join_all;
use stackcalc_core::{CalcError, CalculatorService, CancellationToken};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const TASKS: i32 = 16;
const PER_TASK: i32 = 200;

fn shared() -> Arc<CalculatorService> {
    Arc::new(CalculatorService::new())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pushes_lose_nothing() {
    let service = shared();

    let tasks = (0..TASKS).map(|t| {
        let service = service.clone();
        tokio::spawn(async move {
            for i in 0..PER_TASK {
                service.push_value(t * PER_TASK + i).unwrap();
                tokio::task::yield_now().await;
            }
        })
    });
    for result in join_all(tasks).await {
        result.unwrap();
    }

    let mut values = service.store().snapshot().unwrap();
    assert_eq!(values.len(), (TASKS * PER_TASK) as usize);

    values.sort_unstable();
    let expected: Vec<i32> = (0..TASKS * PER_TASK).collect();
    assert_eq!(values, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pops_yield_distinct_values() {
    let service = shared();
    let total = TASKS * PER_TASK;
    for v in 0..total {
        service.push_value(v).unwrap();
    }

    let tasks = (0..TASKS).map(|_| {
        let service = service.clone();
        tokio::spawn(async move {
            let mut popped = Vec::new();
            loop {
                match service.pop() {
                    Ok(v) => popped.push(v),
                    Err(CalcError::EmptyStack) => break,
                    Err(e) => panic!("unexpected error: {}", e),
                }
                tokio::task::yield_now().await;
            }
            popped
        })
    });

    let mut seen = HashSet::new();
    for result in join_all(tasks).await {
        for v in result.unwrap() {
            assert!(seen.insert(v), "{} popped twice", v);
        }
    }

    assert_eq!(seen.len(), total as usize);
    assert!(service.is_empty().unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_operations_preserve_aggregate() {
    // max over any interleaving of pushes and collapses is the overall max
    let service = shared();

    let tasks = (0..TASKS).map(|t| {
        let service = service.clone();
        tokio::spawn(async move {
            for i in 0..PER_TASK {
                service.push_value(t * PER_TASK + i).unwrap();
                if i % 10 == 0 {
                    service.push_operation("max").unwrap();
                }
                tokio::task::yield_now().await;
            }
        })
    });
    for result in join_all(tasks).await {
        result.unwrap();
    }

    service.push_operation("max").unwrap();
    assert_eq!(service.store().snapshot().unwrap(), vec![TASKS * PER_TASK - 1]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_gcd_is_linearizable() {
    let service = shared();

    let tasks = (1..=TASKS).map(|t| {
        let service = service.clone();
        tokio::spawn(async move {
            service.push_value(6 * t).unwrap();
            service.push_operation("gcd").unwrap();
        })
    });
    for result in join_all(tasks).await {
        result.unwrap();
    }

    service.push_operation("gcd").unwrap();
    assert_eq!(service.store().snapshot().unwrap(), vec![6]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_delayed_pop_does_not_block_others() {
    let service = shared();
    service.push_value(1).unwrap();

    let waiter = {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .delay_pop(500, &CancellationToken::new())
                .await
        })
    };

    // While the delayed pop waits, other calls complete immediately
    tokio::time::sleep(Duration::from_millis(50)).await;
    let quick = tokio::time::timeout(Duration::from_millis(100), async {
        service.push_value(2).unwrap();
        service.is_empty().unwrap()
    })
    .await
    .expect("calls should not wait for the delayed pop");
    assert!(!quick);

    assert_eq!(waiter.await.unwrap().unwrap(), 2);
    assert_eq!(service.pop().unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_delayed_pops_share_values() {
    let service = shared();
    for v in [100, 200, 300] {
        service.push_value(v).unwrap();
    }

    let tasks = (0..4).map(|i| {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .delay_pop(20 + i * 20, &CancellationToken::new())
                .await
        })
    });

    let mut values = Vec::new();
    let mut empty = 0;
    for result in join_all(tasks).await {
        match result.unwrap() {
            Ok(v) => values.push(v),
            Err(CalcError::EmptyStack) => empty += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    values.sort_unstable();
    assert_eq!(values, vec![100, 200, 300]);
    assert_eq!(empty, 1);
}
