//! TCP transport
//!
//! This file implements the broker's network side. Responsibilities:
//! - Accept TCP connections until the shutdown future resolves
//! - Admit a connection only if its first packet is a CONNECT
//! - Read one packet at a time from each admitted connection and hand it to
//!   the `Broker`
//! - Drain each connection's outbound buffer onto its socket from a writer
//!   task, so a slow subscriber never stalls the other connections
//!
//! Every connection task owns its socket halves; they are closed when the
//! task ends, whichever way it ends. On shutdown a writer gets
//! `SHUTDOWN_GRACE` to flush what is queued; a peer that stopped reading
//! cannot hold the server open past that.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::broker::{Dispatch, SharedBroker};
use crate::client::{Client, ConnectionId};
use crate::config::{ServerSettings, Settings};
use crate::protocol::Packet;
use crate::transport::frame::read_frame;
use crate::utils::error::{Error, Result};

/// How long a writer keeps flushing its queue after the stop signal.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Binds the listening socket. Failing to bind is fatal for the server.
pub async fn bind(settings: &ServerSettings) -> Result<TcpListener> {
    let addr = settings.addr();
    TcpListener::bind(&addr)
        .await
        .map_err(|source| Error::ListenerFailure { addr, source })
}

/// Binds to the configured address and serves until `shutdown` resolves.
pub async fn start_tcp_server<F>(
    settings: &Settings,
    broker: SharedBroker,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    let listener = bind(&settings.server).await?;
    serve(listener, broker, shutdown).await
}

/// Runs the accept loop on an already bound listener.
///
/// When `shutdown` resolves the listener is closed, every connection task is
/// told to stop, and the function returns once they have all finished.
pub async fn serve<F>(listener: TcpListener, broker: SharedBroker, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let local = listener.local_addr()?;
    info!("broker listening on {local}");

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut connections = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("accepted connection from {peer}");
                    let task = handle_connection(stream, peer, broker.clone(), stop_rx.clone());
                    connections.spawn(task);
                }
                Err(e) => warn!("failed to accept connection: {e}"),
            },
            Some(finished) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = finished {
                    warn!("connection task failed: {e}");
                }
            }
        }
    }

    drop(listener);
    let _ = stop_tx.send(true);
    while let Some(finished) = connections.join_next().await {
        if let Err(e) = finished {
            warn!("connection task failed: {e}");
        }
    }

    info!("broker on {local} stopped");
    Ok(())
}

/// Removes the connection from the broker when dropped.
struct Registration {
    broker: SharedBroker,
    id: ConnectionId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.broker.lock().cleanup_client(&self.id);
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    broker: SharedBroker,
    mut stop: watch::Receiver<bool>,
) {
    let (mut reader, writer) = stream.into_split();

    let first = tokio::select! {
        frame = read_frame(&mut reader) => frame,
        _ = stop.changed() => return,
    };

    let client_id = match first {
        Ok(Some(frame)) => match Packet::decode(&frame) {
            Ok(Some(Packet::Connect(connect))) => connect.client_id,
            Ok(Some(other)) => {
                warn!(
                    "malformed first packet from {peer}: expected CONNECT, got {}",
                    other.kind()
                );
                return;
            }
            Ok(None) => return,
            Err(e) => {
                warn!("malformed first packet from {peer}: {e}");
                return;
            }
        },
        Ok(None) => {
            debug!("{peer} closed before sending CONNECT");
            return;
        }
        Err(e) => {
            warn!("malformed first packet from {peer}: {e}");
            return;
        }
    };

    // mpsc::channel panics on a zero capacity
    let capacity = broker.lock().settings().outbound_capacity.max(1);
    let (tx, rx) = mpsc::channel::<Bytes>(capacity);
    let writer_task = tokio::spawn(write_loop(writer, rx, stop.clone(), peer));

    let client = Client::new(client_id, tx).with_peer(peer);
    let id = client.id.clone();
    let admitted = broker.lock().admit(client);
    if let Err(e) = admitted {
        warn!("refusing {peer}: {e}");
        let _ = writer_task.await;
        return;
    }

    let registration = Registration {
        broker: broker.clone(),
        id,
    };

    loop {
        let frame = tokio::select! {
            frame = read_frame(&mut reader) => frame,
            _ = stop.changed() => break,
        };

        let frame = match frame {
            Ok(Some(frame)) => frame,
            // an empty frame tells the broker the peer closed the stream
            Ok(None) => Bytes::new(),
            Err(e) => {
                debug!("read from {} failed: {e}", registration.id);
                break;
            }
        };

        let dispatch = broker.lock().handle_frame(&registration.id, frame);
        if dispatch == Dispatch::Close {
            break;
        }
    }

    // Dropping the registration drops the client and its sender, which lets
    // the writer flush what is queued and close the socket. After the stop
    // signal the writer gives up once SHUTDOWN_GRACE has passed.
    drop(registration);
    let _ = writer_task.await;
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::Receiver<Bytes>,
    mut stop: watch::Receiver<bool>,
    peer: SocketAddr,
) {
    let flushed = {
        let flush = drain(&mut writer, &mut rx);
        tokio::pin!(flush);
        tokio::select! {
            flushed = &mut flush => flushed,
            _ = stop.changed() => match tokio::time::timeout(SHUTDOWN_GRACE, &mut flush).await {
                Ok(flushed) => flushed,
                Err(_) => {
                    debug!("{peer} stopped reading, dropping its queued packets");
                    Ok(())
                }
            },
        }
    };
    if let Err(e) = flushed {
        debug!("write to {peer} failed: {e}");
    }
    let _ = writer.shutdown().await;
}

/// Writes queued packets until every sender is gone.
async fn drain(writer: &mut OwnedWriteHalf, rx: &mut mpsc::Receiver<Bytes>) -> io::Result<()> {
    while let Some(bytes) = rx.recv().await {
        writer.write_all(&bytes).await?;
    }
    Ok(())
}
