use super::pubsub_client::Client;
use crate::utils::error::Error;
use bytes::Bytes;
use tokio::sync::mpsc;

#[test]
fn test_client_new() {
    let (tx, _) = mpsc::channel::<Bytes>(8);
    let client = Client::new("sensor-1", tx);
    assert!(client.id.starts_with("conn-"));
    assert_eq!(client.client_id, "sensor-1");
    assert!(client.peer.is_none());
}

#[test]
fn test_client_ids_are_unique() {
    let (tx, _) = mpsc::channel::<Bytes>(8);
    let a = Client::new("same", tx.clone());
    let b = Client::new("same", tx);
    assert_ne!(a.id, b.id);
}

#[test]
fn test_client_send_queues_bytes() {
    let (tx, mut rx) = mpsc::channel::<Bytes>(8);
    let client = Client::new("c", tx).with_peer("127.0.0.1:1883".parse().unwrap());
    client.send(Bytes::from_static(&[0xe0, 0x00])).unwrap();
    assert_eq!(rx.try_recv().unwrap(), Bytes::from_static(&[0xe0, 0x00]));
    assert_eq!(client.peer.unwrap().port(), 1883);
}

#[test]
fn test_client_send_after_close() {
    let (tx, rx) = mpsc::channel::<Bytes>(8);
    let client = Client::new("c", tx);
    drop(rx);
    assert!(matches!(
        client.send(Bytes::from_static(&[0xe0, 0x00])),
        Err(Error::ConnectionClosed)
    ));
}

#[test]
fn test_client_send_when_buffer_full() {
    let (tx, mut rx) = mpsc::channel::<Bytes>(2);
    let client = Client::new("c", tx);
    client.send(Bytes::from_static(b"1")).unwrap();
    client.send(Bytes::from_static(b"2")).unwrap();
    assert!(matches!(
        client.send(Bytes::from_static(b"3")),
        Err(Error::SlowConsumer { capacity: 2 })
    ));

    // room again once the writer drained one packet
    assert_eq!(rx.try_recv().unwrap(), Bytes::from_static(b"1"));
    client.send(Bytes::from_static(b"3")).unwrap();
}
