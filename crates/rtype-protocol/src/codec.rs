use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

/// Hard ceiling on a single frame's payload, per spec: caps memory a malicious
/// or broken peer can force the server to allocate for one message.
pub const MAX_FRAME_LEN: u32 = 10 * 1024 * 1024;

/// Hard ceiling on any string embedded in a payload (player names, chat,
/// kick reasons, ...), independent of the frame ceiling above.
pub const MAX_STRING_LEN: u32 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("frame length {0} exceeds ceiling {1}")]
    FrameTooLarge(u32, u32),
    #[error("string length {0} exceeds ceiling {1}")]
    StringTooLarge(u32, u32),
    #[error("not enough data in buffer")]
    NotEnoughData,
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,
    #[error("unknown message type 0x{0:04X}")]
    UnknownMessageType(u16),
    #[error("malformed payload: {0}")]
    Malformed(&'static str),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Read a length-prefixed UTF-8 string (u32 LE length, then bytes), rejecting
/// anything past `MAX_STRING_LEN`.
pub fn read_string(buf: &mut BytesMut) -> CodecResult<String> {
    if buf.remaining() < 4 {
        return Err(CodecError::NotEnoughData);
    }
    let len = buf.get_u32_le();
    if len > MAX_STRING_LEN {
        return Err(CodecError::StringTooLarge(len, MAX_STRING_LEN));
    }
    let len = len as usize;
    if buf.remaining() < len {
        return Err(CodecError::NotEnoughData);
    }
    let bytes = buf.split_to(len);
    String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
}

/// Write a length-prefixed UTF-8 string (u32 LE length, then bytes).
pub fn write_string(buf: &mut BytesMut, s: &str) {
    buf.put_u32_le(s.len() as u32);
    buf.put_slice(s.as_bytes());
}

/// Read a length-prefixed byte array (u32 LE length, then bytes).
pub fn read_bytes(buf: &mut BytesMut) -> CodecResult<Vec<u8>> {
    if buf.remaining() < 4 {
        return Err(CodecError::NotEnoughData);
    }
    let len = buf.get_u32_le();
    if len > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge(len, MAX_FRAME_LEN));
    }
    let len = len as usize;
    if buf.remaining() < len {
        return Err(CodecError::NotEnoughData);
    }
    Ok(buf.split_to(len).to_vec())
}

/// Write a length-prefixed byte array (u32 LE length, then bytes).
pub fn write_bytes(buf: &mut BytesMut, data: &[u8]) {
    buf.put_u32_le(data.len() as u32);
    buf.put_slice(data);
}

pub fn read_u16(buf: &mut BytesMut) -> CodecResult<u16> {
    if buf.remaining() < 2 {
        return Err(CodecError::NotEnoughData);
    }
    Ok(buf.get_u16_le())
}

pub fn read_u32(buf: &mut BytesMut) -> CodecResult<u32> {
    if buf.remaining() < 4 {
        return Err(CodecError::NotEnoughData);
    }
    Ok(buf.get_u32_le())
}

pub fn read_i64(buf: &mut BytesMut) -> CodecResult<i64> {
    if buf.remaining() < 8 {
        return Err(CodecError::NotEnoughData);
    }
    Ok(buf.get_i64_le())
}

pub fn read_f32(buf: &mut BytesMut) -> CodecResult<f32> {
    if buf.remaining() < 4 {
        return Err(CodecError::NotEnoughData);
    }
    Ok(buf.get_f32_le())
}

pub fn read_u8(buf: &mut BytesMut) -> CodecResult<u8> {
    if buf.remaining() < 1 {
        return Err(CodecError::NotEnoughData);
    }
    Ok(buf.get_u8())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_roundtrip() {
        let mut buf = BytesMut::new();
        write_string(&mut buf, "zapper42");
        assert_eq!(read_string(&mut buf).unwrap(), "zapper42");
    }

    #[test]
    fn oversized_string_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(MAX_STRING_LEN + 1);
        match read_string(&mut buf) {
            Err(CodecError::StringTooLarge(len, ceiling)) => {
                assert_eq!(len, MAX_STRING_LEN + 1);
                assert_eq!(ceiling, MAX_STRING_LEN);
            }
            other => panic!("expected StringTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn truncated_buffer_reports_not_enough_data() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(10);
        buf.put_slice(b"abc");
        assert!(matches!(read_string(&mut buf), Err(CodecError::NotEnoughData)));
    }

    #[test]
    fn bytes_roundtrip() {
        let mut buf = BytesMut::new();
        write_bytes(&mut buf, &[1, 2, 3, 4]);
        assert_eq!(read_bytes(&mut buf).unwrap(), vec![1, 2, 3, 4]);
    }
}
