use bytes::{Buf, BufMut, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::trace;

use crate::codec::MAX_FRAME_LEN;

const FRAME_HEADER_LEN: usize = 2 + 4;

/// A framed TCP connection carrying `[type:u16 LE][length:u32 LE][payload]`
/// frames. TCP's own retransmission and ordering guarantees are what the spec
/// calls a "reliable-datagram host" here; no encryption or compression layer
/// sits between this and the socket (out of scope, see DESIGN.md).
pub struct Connection {
    stream: Option<TcpStream>,
    read_buf: BytesMut,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream: Some(stream),
            read_buf: BytesMut::with_capacity(4096),
        }
    }

    /// Placeholder used only as a transient value after `into_split`.
    pub fn new_dummy() -> Self {
        Self {
            stream: None,
            read_buf: BytesMut::new(),
        }
    }

    /// Read a single frame, returning `(message_type, payload)`.
    pub async fn read_frame(&mut self) -> anyhow::Result<(u16, BytesMut)> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("connection has been split"))?;
        loop {
            if let Some(frame) = try_parse_frame(&mut self.read_buf)? {
                return Ok(frame);
            }
            let mut tmp = [0u8; 4096];
            let n = stream.read(&mut tmp).await?;
            if n == 0 {
                return Err(anyhow::anyhow!("connection closed"));
            }
            self.read_buf.extend_from_slice(&tmp[..n]);
        }
    }

    pub async fn write_frame(&mut self, message_type: u16, payload: &[u8]) -> anyhow::Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("connection has been split"))?;
        let frame = build_frame(message_type, payload)?;
        stream.write_all(&frame).await?;
        Ok(())
    }

    pub fn peer_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.stream
            .as_ref()
            .map(|s| s.peer_addr())
            .unwrap_or(Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "dummy connection",
            )))
    }

    /// Split into independent read/write halves for concurrent I/O: the
    /// network thread reads on one, the game thread's outbound sender writes
    /// on the other.
    pub fn into_split(mut self) -> (ConnectionReader, ConnectionWriter) {
        let stream = self.stream.take().expect("cannot split a dummy connection");
        let (read_half, write_half) = stream.into_split();
        (
            ConnectionReader {
                stream: read_half,
                read_buf: self.read_buf,
            },
            ConnectionWriter { stream: write_half },
        )
    }
}

pub struct ConnectionReader {
    stream: OwnedReadHalf,
    read_buf: BytesMut,
}

impl ConnectionReader {
    pub async fn read_frame(&mut self) -> anyhow::Result<(u16, BytesMut)> {
        loop {
            if let Some(frame) = try_parse_frame(&mut self.read_buf)? {
                return Ok(frame);
            }
            let mut tmp = [0u8; 4096];
            let n = self.stream.read(&mut tmp).await?;
            if n == 0 {
                return Err(anyhow::anyhow!("connection closed"));
            }
            self.read_buf.extend_from_slice(&tmp[..n]);
        }
    }
}

pub struct ConnectionWriter {
    stream: OwnedWriteHalf,
}

impl ConnectionWriter {
    pub async fn write_frame(&mut self, message_type: u16, payload: &[u8]) -> anyhow::Result<()> {
        let frame = build_frame(message_type, payload)?;
        self.stream.write_all(&frame).await?;
        Ok(())
    }
}

/// Parse one frame out of `read_buf` if enough bytes have arrived yet.
/// Oversized frames are a hard error — the caller kicks the peer.
fn try_parse_frame(read_buf: &mut BytesMut) -> anyhow::Result<Option<(u16, BytesMut)>> {
    if read_buf.len() < FRAME_HEADER_LEN {
        return Ok(None);
    }
    let message_type = u16::from_le_bytes([read_buf[0], read_buf[1]]);
    let length = u32::from_le_bytes([read_buf[2], read_buf[3], read_buf[4], read_buf[5]]);
    if length > MAX_FRAME_LEN {
        anyhow::bail!("frame length {length} exceeds ceiling {MAX_FRAME_LEN}");
    }
    let total = FRAME_HEADER_LEN + length as usize;
    if read_buf.len() < total {
        return Ok(None);
    }
    read_buf.advance(FRAME_HEADER_LEN);
    let payload = read_buf.split_to(length as usize);
    trace!(message_type, len = payload.len(), "read frame");
    Ok(Some((message_type, payload)))
}

fn build_frame(message_type: u16, payload: &[u8]) -> anyhow::Result<BytesMut> {
    if payload.len() as u32 > MAX_FRAME_LEN {
        anyhow::bail!(
            "payload length {} exceeds ceiling {MAX_FRAME_LEN}",
            payload.len()
        );
    }
    let mut frame = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.put_u16_le(message_type);
    frame.put_u32_le(payload.len() as u32);
    frame.extend_from_slice(payload);
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_complete_frame() {
        let frame = build_frame(0x0200, b"hello").unwrap();
        let mut buf = BytesMut::from(&frame[..]);
        let (message_type, payload) = try_parse_frame(&mut buf).unwrap().unwrap();
        assert_eq!(message_type, 0x0200);
        assert_eq!(&payload[..], b"hello");
        assert!(buf.is_empty());
    }

    #[test]
    fn waits_for_more_data_on_a_partial_frame() {
        let frame = build_frame(0x0100, b"world").unwrap();
        let mut buf = BytesMut::from(&frame[..frame.len() - 1]);
        assert!(try_parse_frame(&mut buf).unwrap().is_none());
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u16_le(0x0100);
        buf.put_u32_le(MAX_FRAME_LEN + 1);
        assert!(try_parse_frame(&mut buf).is_err());
    }

    #[test]
    fn two_frames_back_to_back_parse_independently() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&build_frame(0x0001, b"a").unwrap());
        buf.extend_from_slice(&build_frame(0x0002, b"bc").unwrap());
        let (t1, p1) = try_parse_frame(&mut buf).unwrap().unwrap();
        let (t2, p2) = try_parse_frame(&mut buf).unwrap().unwrap();
        assert_eq!((t1, &p1[..]), (0x0001, &b"a"[..]));
        assert_eq!((t2, &p2[..]), (0x0002, &b"bc"[..]));
    }
}
