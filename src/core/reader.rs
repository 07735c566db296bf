//! Blocking-style frame reads over an async byte stream.
//!
//! `read_packet` waits for exactly one frame. A stream that closes before the
//! declared length is satisfied yields `ShortRead`; no partial frame is ever returned.

use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{instrument, trace};

use crate::core::packet::{payload_len, Packet, HEADER_LEN};
use crate::error::{constants, ProtocolError, Result};
use crate::utils::timeout::with_timeout;

/// Fill `buf` completely, counting bytes so a short stream can be reported precisely.
async fn fill<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Err(ProtocolError::ShortRead {
                expected: buf.len(),
                received: filled,
            });
        }
        filled += n;
    }
    Ok(())
}

/// Read one complete frame (header + body)
pub async fn read_packet<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Packet> {
    let mut header = [0u8; HEADER_LEN];
    fill(reader, &mut header).await?;

    let body_len = payload_len(&header);
    let mut frame = BytesMut::zeroed(HEADER_LEN + body_len);
    frame[..HEADER_LEN].copy_from_slice(&header);
    fill(reader, &mut frame[HEADER_LEN..]).await?;

    trace!(sequence_id = header[3], body_len, "read packet");
    Packet::from_bytes(frame.freeze())
}

/// `read_packet` bounded by a deadline; expiry is a `Connection` error of kind `TimedOut`
#[instrument(skip(reader), level = "trace")]
pub async fn read_packet_timeout<R: AsyncRead + Unpin>(
    reader: &mut R,
    deadline: Duration,
) -> Result<Packet> {
    with_timeout(deadline, constants::ERR_READ_TIMEOUT, read_packet(reader)).await
}

/// Write one frame and flush
pub async fn write_packet<W: AsyncWrite + Unpin>(writer: &mut W, packet: &Packet) -> Result<()> {
    writer.write_all(packet.as_bytes()).await?;
    writer.flush().await?;
    trace!(
        sequence_id = packet.sequence_id(),
        body_len = packet.payload_len(),
        "wrote packet"
    );
    Ok(())
}
