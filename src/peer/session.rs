use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;

use crate::protocol::{Packet, PacketKind};
use crate::transport::read_frame;
use crate::utils::error::{Error, Result};

/// A client connection to a broker, past the CONNECT/CONNACK handshake.
#[derive(Debug)]
pub struct Peer {
    stream: TcpStream,
    client_id: String,
}

impl Peer {
    /// Opens a connection, sends CONNECT and waits for the CONNACK.
    pub async fn connect(addr: &str, client_id: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let mut peer = Self {
            stream,
            client_id: client_id.to_string(),
        };

        peer.send(&Packet::connect(client_id)).await?;
        match peer.next_packet().await? {
            Some(Packet::ConnAck) => {
                debug!("{client_id} connected to {addr}");
                Ok(peer)
            }
            Some(other) => Err(Error::UnexpectedPacket {
                expected: PacketKind::ConnAck.to_string(),
                got: other.kind().to_string(),
            }),
            None => Err(Error::ConnectionClosed),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub async fn publish(&mut self, topic: &str, value: &str, retain: bool) -> Result<()> {
        self.send(&Packet::publish(topic, value, retain)).await
    }

    pub async fn subscribe(&mut self, topic: &str, packet_id: u16) -> Result<()> {
        self.send(&Packet::subscribe(topic, packet_id)).await
    }

    /// Waits for the next packet; `Ok(None)` once the broker closed the stream.
    pub async fn next_packet(&mut self) -> Result<Option<Packet>> {
        match read_frame(&mut self.stream).await? {
            Some(frame) => Packet::decode(&frame),
            None => Ok(None),
        }
    }

    /// Sends DISCONNECT and closes the connection.
    pub async fn disconnect(mut self) -> Result<()> {
        self.send(&Packet::Disconnect).await?;
        self.stream.shutdown().await?;
        Ok(())
    }

    // Encoding happens before any byte is written, so a packet that does not
    // fit leaves the stream untouched.
    async fn send(&mut self, packet: &Packet) -> Result<()> {
        let bytes = packet.encode()?;
        self.stream.write_all(&bytes).await?;
        Ok(())
    }
}
