//! Helpers shared by the socket-level tests, and the end-to-end tests that
//! drive the publisher and subscriber loops against a live broker.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::broker::{Broker, SharedBroker};
use crate::transport::serve;
use crate::utils::error::Result;

mod integration_test;

pub(crate) struct TestServer {
    pub addr: SocketAddr,
    pub broker: SharedBroker,
    pub stop: oneshot::Sender<()>,
    pub handle: JoinHandle<Result<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(Broker::new()).await
    }

    pub async fn start_with(broker: Broker) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let broker = broker.into_shared();
        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve(listener, broker.clone(), async move {
            let _ = stopped.await;
        }));
        Self {
            addr,
            broker,
            stop,
            handle,
        }
    }

    pub fn addr_string(&self) -> String {
        self.addr.to_string()
    }

    /// Stops accepting, closes every connection and waits for the server.
    pub async fn shutdown(self) {
        self.stop.send(()).unwrap();
        self.handle.await.unwrap().unwrap();
    }
}

/// Polls the broker until `check` holds or a few seconds have passed.
pub(crate) async fn eventually<F: Fn(&Broker) -> bool>(broker: &SharedBroker, check: F) {
    for _ in 0..200 {
        let done = {
            let guard = broker.lock();
            check(&*guard)
        };
        if done {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("broker never reached the expected state");
}
