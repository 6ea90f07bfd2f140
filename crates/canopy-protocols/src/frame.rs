//! Length-prefixed messages and routed frames.

use crate::error::{Error, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use canopy_path::PathValue;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest message body accepted from a peer.
pub const MAX_MESSAGE_LEN: usize = 64 * 1024 * 1024;

/// Write one length-prefixed message.
pub async fn write_message<W>(writer: &mut W, body: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if body.len() > MAX_MESSAGE_LEN {
        return Err(Error::MessageTooLarge(body.len()));
    }
    let mut buf = BytesMut::with_capacity(4 + body.len());
    buf.put_u32_le(body.len() as u32);
    buf.put_slice(body);
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed message body.
///
/// A stream that ends mid-message yields an `UnexpectedEof` IO error.
pub async fn read_message<R>(reader: &mut R) -> Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32_le().await? as usize;
    if len > MAX_MESSAGE_LEN {
        return Err(Error::MessageTooLarge(len));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Bytes::from(body))
}

/// A routed message: path integer plus serialized event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub path: PathValue,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(path: PathValue, payload: impl Into<Bytes>) -> Self {
        Self {
            path,
            payload: payload.into(),
        }
    }

    /// Encode as a message body (without the outer length prefix).
    pub fn encode_body(&self) -> Bytes {
        let path = self.path.to_bytes_be();
        let mut buf = BytesMut::with_capacity(4 + path.len() + self.payload.len());
        buf.put_u32_le(path.len() as u32);
        buf.put_slice(&path);
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Decode a message body.
    ///
    /// A zero path would address every node and is refused.
    pub fn decode_body(mut body: Bytes) -> Result<Self> {
        if body.len() < 4 {
            return Err(Error::MalformedFrame(format!(
                "body of {} bytes has no path length",
                body.len()
            )));
        }
        let path_len = body.get_u32_le() as usize;
        if path_len == 0 || path_len > body.len() {
            return Err(Error::MalformedFrame(format!(
                "path length {} with {} bytes remaining",
                path_len,
                body.len()
            )));
        }
        let path = PathValue::from_bytes_be(&body.split_to(path_len));
        if path.is_zero() {
            return Err(Error::MalformedFrame("zero path".to_string()));
        }
        Ok(Self {
            path,
            payload: body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_layout() {
        let frame = Frame::new(PathValue::from(147), &b"hello"[..]);
        let body = frame.encode_body();
        assert_eq!(&body[..4], &1u32.to_le_bytes());
        assert_eq!(body[4], 147);
        assert_eq!(&body[5..], b"hello");
    }

    #[tokio::test]
    async fn full_message_layout() {
        let frame = Frame::new(PathValue::from(0x0102), &b"xyz"[..]);
        let mut wire = Vec::new();
        write_message(&mut wire, &frame.encode_body()).await.unwrap();

        // N = 4 + L + payload
        assert_eq!(&wire[..4], &(4u32 + 2 + 3).to_le_bytes());
        assert_eq!(&wire[4..8], &2u32.to_le_bytes());
        assert_eq!(&wire[8..10], &[0x01, 0x02]);
        assert_eq!(&wire[10..], b"xyz");
    }

    #[tokio::test]
    async fn round_trip_large_path() {
        let mut path = PathValue::one();
        for p in [1_000_000_007u64, 998_244_353, 7, 7] {
            path.mul_value(p);
        }
        let frame = Frame::new(path.clone(), vec![0u8, 1, 2, 255]);

        let mut wire = Vec::new();
        write_message(&mut wire, &frame.encode_body()).await.unwrap();
        let decoded = Frame::decode_body(read_message(&mut wire.as_slice()).await.unwrap()).unwrap();

        assert_eq!(decoded.path, path);
        assert_eq!(&decoded.payload[..], &[0u8, 1, 2, 255]);
    }

    #[tokio::test]
    async fn split_reads_are_reassembled() {
        let frame = Frame::new(PathValue::from(49), &b"payload"[..]);
        let mut wire = Vec::new();
        write_message(&mut wire, &frame.encode_body()).await.unwrap();

        let mut mock = tokio_test::io::Builder::new()
            .read(&wire[..3])
            .read(&wire[3..9])
            .read(&wire[9..])
            .build();
        let decoded = Frame::decode_body(read_message(&mut mock).await.unwrap()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[tokio::test]
    async fn short_read_is_an_error() {
        let frame = Frame::new(PathValue::from(49), &b"payload"[..]);
        let mut wire = Vec::new();
        write_message(&mut wire, &frame.encode_body()).await.unwrap();
        wire.truncate(wire.len() - 2);

        let err = read_message(&mut wire.as_slice()).await.unwrap_err();
        assert!(matches!(err, Error::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof));
    }

    #[tokio::test]
    async fn oversized_prefix_is_refused() {
        let wire = ((MAX_MESSAGE_LEN + 1) as u32).to_le_bytes();
        let err = read_message(&mut &wire[..]).await.unwrap_err();
        assert!(matches!(err, Error::MessageTooLarge(_)));
    }

    #[test]
    fn malformed_bodies() {
        assert!(matches!(
            Frame::decode_body(Bytes::from_static(&[1, 0])),
            Err(Error::MalformedFrame(_))
        ));
        // path length larger than the body
        assert!(matches!(
            Frame::decode_body(Bytes::from_static(&[9, 0, 0, 0, 1])),
            Err(Error::MalformedFrame(_))
        ));
        // empty path
        assert!(matches!(
            Frame::decode_body(Bytes::from_static(&[0, 0, 0, 0, 1])),
            Err(Error::MalformedFrame(_))
        ));
        // zero path
        assert!(matches!(
            Frame::decode_body(Bytes::from_static(&[1, 0, 0, 0, 0, b'x'])),
            Err(Error::MalformedFrame(_))
        ));
    }

    #[test]
    fn empty_payload_is_allowed() {
        let frame = Frame::decode_body(Bytes::from_static(&[1, 0, 0, 0, 3])).unwrap();
        assert_eq!(frame.path, PathValue::from(3));
        assert!(frame.payload.is_empty());
    }
}
