//! End-to-end tests over the TCP transport.

use stackcalc_core::ipc::protocol::{read_frame, write_frame, IpcRequest, IpcResponse};
use stackcalc_core::{
    CalcError, CalculatorService, EmptyOperationPolicy, IpcServer, IpcServerHandle,
    RemoteCalculator,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;

async fn start(service: CalculatorService) -> (Arc<CalculatorService>, IpcServerHandle) {
    let service = Arc::new(service);
    let handle = IpcServer::start(service.clone()).await.unwrap();
    (service, handle)
}

async fn connect(handle: &IpcServerHandle) -> RemoteCalculator {
    RemoteCalculator::lookup(&handle.addr().to_string(), "CalculatorService")
        .await
        .unwrap()
}

#[tokio::test]
async fn test_clients_share_one_stack() {
    let (_service, mut handle) = start(CalculatorService::new()).await;
    let a = connect(&handle).await;
    let b = connect(&handle).await;

    a.push_value(10).await.unwrap();
    b.push_value(20).await.unwrap();
    a.push_value(30).await.unwrap();

    b.push_operation("min").await.unwrap();

    assert_eq!(a.pop().await.unwrap(), 10);
    assert!(b.is_empty().await.unwrap());

    handle.shutdown();
}

#[tokio::test]
async fn test_errors_cross_transport_intact() {
    let (service, mut handle) = start(
        CalculatorService::builder()
            .empty_operation_policy(EmptyOperationPolicy::Reject)
            .build()
            .unwrap(),
    )
    .await;
    let calc = connect(&handle).await;

    assert!(matches!(calc.pop().await, Err(CalcError::EmptyStack)));
    assert!(matches!(
        calc.push_operation("lcm").await,
        Err(CalcError::EmptyStack)
    ));

    calc.push_value(4).await.unwrap();
    match calc.push_operation("median").await {
        Err(CalcError::InvalidOperator { token }) => assert_eq!(token, "median"),
        other => panic!("Expected InvalidOperator, got: {:?}", other),
    }
    assert_eq!(service.store().snapshot().unwrap(), vec![4]);

    handle.shutdown();
}

#[tokio::test]
async fn test_delay_pop_over_transport() {
    let (_service, mut handle) = start(CalculatorService::new()).await;
    let calc = connect(&handle).await;
    let other = connect(&handle).await;

    calc.push_value(1).await.unwrap();

    let start = Instant::now();
    let (value, pushed) = tokio::join!(calc.delay_pop(200), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        other.push_value(2).await
    });

    pushed.unwrap();
    assert_eq!(value.unwrap(), 2);
    assert!(start.elapsed() >= Duration::from_millis(200));
    assert_eq!(other.pop().await.unwrap(), 1);

    handle.shutdown();
}

#[tokio::test]
async fn test_disconnect_abandons_delayed_pop() {
    let (service, mut handle) = start(CalculatorService::new()).await;
    service.push_value(7).unwrap();

    {
        let mut stream = TcpStream::connect(handle.addr()).await.unwrap();
        let (_, mut writer) = stream.split();
        let request = IpcRequest::new("delay_pop", serde_json::json!({"millis": 300}), 1);
        write_frame(&mut writer, &serde_json::to_vec(&request).unwrap())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        // stream dropped here while the server is still waiting
    }

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(service.store().snapshot().unwrap(), vec![7]);

    handle.shutdown();
}

#[tokio::test]
async fn test_timed_out_delay_pop_leaves_stack_unchanged() {
    let (service, mut handle) = start(CalculatorService::new()).await;
    let calc = connect(&handle).await;
    calc.push_value(7).await.unwrap();

    let timed_out = tokio::time::timeout(Duration::from_millis(50), calc.delay_pop(300)).await;
    assert!(timed_out.is_err());

    // Well past the requested delay; the server must have given up the wait
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(service.store().snapshot().unwrap(), vec![7]);

    // The proxy's connection went with the dropped call
    assert!(matches!(calc.pop().await, Err(CalcError::Transport { .. })));
    let fresh = connect(&handle).await;
    assert_eq!(fresh.pop().await.unwrap(), 7);

    handle.shutdown();
}

#[tokio::test]
async fn test_camel_case_and_positional_params() {
    let (_service, mut handle) = start(CalculatorService::new()).await;
    let mut stream = TcpStream::connect(handle.addr()).await.unwrap();
    let (mut reader, mut writer) = stream.split();

    let calls = [
        IpcRequest::new("pushValue", serde_json::json!([4]), 1),
        IpcRequest::new("pushValue", serde_json::json!({"value": 6}), 2),
        IpcRequest::new("pushOperation", serde_json::json!(["LCM"]), 3),
        IpcRequest::new("delayPop", serde_json::json!({"millis": -5}), 4),
    ];

    let mut last = None;
    for request in calls {
        write_frame(&mut writer, &serde_json::to_vec(&request).unwrap())
            .await
            .unwrap();
        let bytes = read_frame(&mut reader).await.unwrap().unwrap();
        let response: IpcResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(response.id, request.id);
        last = Some(response.into_result().unwrap());
    }

    assert_eq!(last, Some(serde_json::json!(12)));

    handle.shutdown();
}

#[tokio::test]
async fn test_lookup_unreachable_server_is_transport_error() {
    let result = RemoteCalculator::lookup("127.0.0.1:1", "CalculatorService").await;
    assert!(matches!(result, Err(CalcError::Transport { .. })));
}
