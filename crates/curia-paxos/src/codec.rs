//! Stream framing for council messages.
//!
//! Messages travel as a u32 big-endian length prefix followed by the bincode
//! payload, one message per connection. A decode failure abandons only the
//! connection it arrived on.

use crate::message::{CodecError, Message};
use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum framed message size.
///
/// Council messages are tiny (a tag, two integers, and a short name); anything
/// approaching this bound is a corrupt or hostile frame.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Write one framed message to the stream.
pub async fn write_message<W>(writer: &mut W, msg: &Message) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
{
    let payload = msg.encode()?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge(payload.len()));
    }

    let mut frame = BytesMut::with_capacity(4 + payload.len());
    frame.put_u32(payload.len() as u32);
    frame.put_slice(&payload);

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one framed message from the stream.
pub async fn read_message<R>(reader: &mut R) -> Result<Message, CodecError>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32().await? as usize;
    if len > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Message::decode(&payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MemberId, ProposalNumber};

    #[tokio::test]
    async fn test_framed_roundtrip() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        let msg = Message::AcceptRequest {
            number: ProposalNumber(12),
            value: "Member 3".to_string(),
            from: MemberId(3),
        };

        write_message(&mut client, &msg).await.unwrap();
        let received = read_message(&mut server).await.unwrap();
        assert_eq!(received, msg);
    }

    #[tokio::test]
    async fn test_sequential_frames() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        let first = Message::Prepare {
            number: ProposalNumber(1),
            from: MemberId(1),
        };
        let second = Message::Nack {
            number: ProposalNumber(2),
            from: MemberId(2),
        };

        write_message(&mut client, &first).await.unwrap();
        write_message(&mut client, &second).await.unwrap();

        assert_eq!(read_message(&mut server).await.unwrap(), first);
        assert_eq!(read_message(&mut server).await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);

        // Hand-write a length prefix that claims an absurd payload.
        let mut frame = BytesMut::new();
        frame.put_u32((MAX_FRAME_SIZE + 1) as u32);
        tokio::io::AsyncWriteExt::write_all(&mut client, &frame)
            .await
            .unwrap();

        let err = read_message(&mut server).await.unwrap_err();
        assert!(matches!(err, CodecError::FrameTooLarge(_)));
    }

    #[tokio::test]
    async fn test_truncated_frame_errors() {
        let (mut client, mut server) = tokio::io::duplex(64);

        let mut frame = BytesMut::new();
        frame.put_u32(100);
        frame.put_slice(&[1, 2, 3]);
        tokio::io::AsyncWriteExt::write_all(&mut client, &frame)
            .await
            .unwrap();
        drop(client);

        assert!(matches!(
            read_message(&mut server).await.unwrap_err(),
            CodecError::Io(_)
        ));
    }

    #[tokio::test]
    async fn test_corrupt_payload_errors() {
        let (mut client, mut server) = tokio::io::duplex(64);

        let mut frame = BytesMut::new();
        frame.put_u32(4);
        frame.put_slice(&[0xde, 0xad, 0xbe, 0xef]);
        tokio::io::AsyncWriteExt::write_all(&mut client, &frame)
            .await
            .unwrap();

        assert!(matches!(
            read_message(&mut server).await.unwrap_err(),
            CodecError::Decode(_)
        ));
    }
}
