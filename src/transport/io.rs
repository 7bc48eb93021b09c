use std::pin::pin;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::client::Client;
use crate::protocol::{CodecError, Frame};
use crate::utils::BrokerError;

/// Upper bound on flushing a closing client's queue.
pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Reads the next complete packet from `reader`.
///
/// Bytes past the end of the packet stay in `buffer` for the next call.
/// Returns `Ok(None)` when the peer closes the stream between packets; a
/// close in the middle of a packet is a malformed packet. A packet declared
/// larger than `max_packet_size` fails before its body is read.
pub async fn read_frame<R>(
    reader: &mut R,
    buffer: &mut BytesMut,
    max_packet_size: usize,
) -> Result<Option<Frame>, BrokerError>
where
    R: AsyncRead + Unpin,
{
    loop {
        if let Some(frame) = Frame::parse_limited(buffer, max_packet_size)? {
            return Ok(Some(frame));
        }

        if reader.read_buf(buffer).await? == 0 {
            if buffer.is_empty() {
                return Ok(None);
            }
            return Err(CodecError::MalformedPacket(format!(
                "stream ended with {} byte(s) of an unfinished packet",
                buffer.len()
            ))
            .into());
        }
    }
}

/// Drains `packets` onto `writer` in order until the channel closes, a write
/// fails, or `client` is closed.
///
/// Every write races the client's shutdown token. When the client closes
/// without [`Client::request_flush`], the task stops at once and queued
/// packets are dropped. Otherwise the packet in progress and the rest of the
/// queue are written within [`FLUSH_TIMEOUT`] before the write half is shut
/// down.
pub async fn write_packets<W>(
    mut writer: W,
    mut packets: UnboundedReceiver<Bytes>,
    client: &Client,
) -> Result<(), BrokerError>
where
    W: AsyncWrite + Unpin,
{
    let shutdown = client.shutdown_token();

    loop {
        let packet = tokio::select! {
            _ = shutdown.cancelled() => break,
            packet = packets.recv() => match packet {
                Some(packet) => packet,
                None => break,
            },
        };

        let mut write = pin!(writer.write_all(&packet));
        tokio::select! {
            written = &mut write => written?,
            _ = shutdown.cancelled() => {
                if !client.flush_requested() {
                    return Ok(());
                }
                tokio::time::timeout(FLUSH_TIMEOUT, write)
                    .await
                    .map_err(|_| BrokerError::FlushTimeout(FLUSH_TIMEOUT.as_secs()))??;
                break;
            }
        }
    }

    if shutdown.is_cancelled() && !client.flush_requested() {
        return Ok(());
    }

    tokio::time::timeout(FLUSH_TIMEOUT, async {
        while let Ok(packet) = packets.try_recv() {
            writer.write_all(&packet).await?;
        }
        writer.shutdown().await
    })
    .await
    .map_err(|_| BrokerError::FlushTimeout(FLUSH_TIMEOUT.as_secs()))??;
    Ok(())
}
