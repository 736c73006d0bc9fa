use crate::peer::{run_publisher, run_subscriber};
use crate::tests::{TestServer, eventually};

#[tokio::test]
async fn integration_pubsub_end_to_end() {
    let server = TestServer::start().await;
    let addr = server.addr_string();

    let sub_addr = addr.clone();
    let subscriber = tokio::spawn(async move {
        let mut out = Vec::new();
        let received = run_subscriber(
            &sub_addr,
            "sub 001",
            "temperature",
            &mut out,
            std::future::pending::<()>(),
        )
        .await
        .unwrap();
        (received, String::from_utf8(out).unwrap())
    });
    eventually(&server.broker, |b| b.subscriptions().len() == 1).await;

    let input: &[u8] = b"21\n22\n";
    let published = run_publisher(&addr, "pub 001", "temperature", false, input)
        .await
        .unwrap();
    assert_eq!(published, 2);

    // the publisher's DISCONNECT is handled after both publishes were fanned out
    eventually(&server.broker, |b| b.connection_count() == 1).await;
    server.shutdown().await;

    let (received, out) = subscriber.await.unwrap();
    assert_eq!(received, 2);
    assert_eq!(out, "subscribed to temperature\n21\n22\n");
}

#[tokio::test]
async fn integration_retained_value_for_late_subscriber() {
    let server = TestServer::start().await;
    let addr = server.addr_string();

    let input: &[u8] = b"v1\nv2\n";
    run_publisher(&addr, "pub", "t", true, input).await.unwrap();
    eventually(&server.broker, |b| b.connection_count() == 0).await;

    let sub_addr = addr.clone();
    let subscriber = tokio::spawn(async move {
        let mut out = Vec::new();
        let received = run_subscriber(&sub_addr, "sub", "t", &mut out, std::future::pending::<()>())
            .await
            .unwrap();
        (received, String::from_utf8(out).unwrap())
    });
    eventually(&server.broker, |b| b.subscriptions().len() == 1).await;
    server.shutdown().await;

    let (received, out) = subscriber.await.unwrap();
    assert_eq!(received, 1);
    assert_eq!(out, "subscribed to t\nv2\n");
}

#[tokio::test]
async fn integration_subscriber_disconnects_on_shutdown_signal() {
    let server = TestServer::start().await;
    let addr = server.addr_string();
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();

    let subscriber = tokio::spawn(async move {
        let mut out = Vec::new();
        run_subscriber(&addr, "sub", "x", &mut out, async move {
            let _ = stopped.await;
        })
        .await
    });
    eventually(&server.broker, |b| b.subscriptions().len() == 1).await;

    stop.send(()).unwrap();
    assert_eq!(subscriber.await.unwrap().unwrap(), 0);
    eventually(&server.broker, |b| {
        b.connection_count() == 0 && b.subscriptions().is_empty()
    })
    .await;
    server.shutdown().await;
}
