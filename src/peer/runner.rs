use std::future::Future;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::peer::session::Peer;
use crate::protocol::Packet;
use crate::utils::error::Result;

/// Packet id used by `run_subscriber` for its single SUBSCRIBE.
pub const SUBSCRIBE_PACKET_ID: u16 = 1;

/// Publishes every line of `input` on `topic` until end of input, then
/// disconnects. Returns how many lines were published.
///
/// A line that cannot be encoded (non-ASCII, or too long for the packet) is
/// logged and skipped.
pub async fn run_publisher<R>(
    addr: &str,
    client_id: &str,
    topic: &str,
    retain: bool,
    input: R,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut peer = Peer::connect(addr, client_id).await?;
    let mut lines = input.lines();
    let mut published = 0;

    while let Some(line) = lines.next_line().await? {
        match peer.publish(topic, &line, retain).await {
            Ok(()) => published += 1,
            Err(e) if e.is_codec() => warn!("skipping value for {topic}: {e}"),
            Err(e) => return Err(e),
        }
    }

    peer.disconnect().await?;
    info!("{client_id} published {published} value(s) on {topic}");
    Ok(published)
}

/// Subscribes to `topic` and writes one line per received packet to
/// `output` until `shutdown` resolves or the broker closes the connection.
/// Returns how many values were received.
pub async fn run_subscriber<W, F>(
    addr: &str,
    client_id: &str,
    topic: &str,
    mut output: W,
    shutdown: F,
) -> Result<usize>
where
    W: AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    let mut peer = Peer::connect(addr, client_id).await?;
    peer.subscribe(topic, SUBSCRIBE_PACKET_ID).await?;
    tokio::pin!(shutdown);

    let mut received = 0;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                peer.disconnect().await?;
                break;
            }
            packet = peer.next_packet() => match packet? {
                Some(Packet::SubAck(_)) => {
                    output.write_all(format!("subscribed to {topic}\n").as_bytes()).await?;
                }
                Some(Packet::Publish(publish)) => {
                    output.write_all(format!("{}\n", publish.value).as_bytes()).await?;
                    received += 1;
                }
                Some(other) => debug!("ignoring {} from broker", other.kind()),
                None => {
                    info!("broker closed the connection");
                    break;
                }
            },
        }
        output.flush().await?;
    }

    output.flush().await?;
    Ok(received)
}
