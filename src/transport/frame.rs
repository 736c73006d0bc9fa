//! Reads whole packets off a byte stream.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::protocol::decode_header;
use crate::utils::error::{Error, Result};

/// Reads exactly one packet: the two-byte fixed header followed by the
/// number of bytes it declares.
///
/// Returns `Ok(None)` when the peer closes the stream before sending a new
/// packet, and `TruncatedPacket` when it closes in the middle of one.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Bytes>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 2];
    let first = reader.read(&mut header[..1]).await?;
    if first == 0 {
        return Ok(None);
    }
    read_exact(reader, &mut header[1..], 2, 1).await?;

    let fixed = decode_header(&header)?;
    let mut buf = BytesMut::zeroed(fixed.packet_len());
    buf[..2].copy_from_slice(&header);
    read_exact(reader, &mut buf[2..], fixed.packet_len(), 2).await?;

    Ok(Some(buf.freeze()))
}

/// `read_exact` that reports an early EOF as a truncated packet.
async fn read_exact<R>(reader: &mut R, buf: &mut [u8], needed: usize, offset: usize) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Err(Error::TruncatedPacket {
                needed,
                available: offset + filled,
            });
        }
        filled += n;
    }
    Ok(())
}
