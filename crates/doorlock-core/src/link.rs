//! Byte link between the two nodes.

use std::io;

use async_trait::async_trait;
use doorlock_proto::{Credential, Message};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Reliable, ordered byte channel to the peer node.
#[async_trait]
pub trait Link: Send {
    /// Write `bytes` and flush.
    async fn send(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Wait for the next byte. Unbounded.
    async fn recv_byte(&mut self) -> io::Result<u8>;

    /// Send one control message.
    async fn send_message(&mut self, message: Message) -> io::Result<()> {
        self.send(&[message.to_byte()]).await
    }

    /// Send a framed credential.
    async fn send_credential(&mut self, credential: &Credential) -> io::Result<()> {
        self.send(&credential.to_frame()).await
    }
}

/// [`Link`] over any split async stream: a serial port, a TCP socket or a
/// simulated connection.
#[derive(Debug)]
pub struct StreamLink<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> StreamLink<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Join a read half and a write half.
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

#[async_trait]
impl<R, W> Link for StreamLink<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await
    }

    async fn recv_byte(&mut self) -> io::Result<u8> {
        self.reader.read_u8().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplex_carries_messages_and_frames() {
        let (left, right) = tokio::io::duplex(64);
        let (left_read, left_write) = tokio::io::split(left);
        let (right_read, right_write) = tokio::io::split(right);
        let mut hmi = StreamLink::new(left_read, left_write);
        let mut control = StreamLink::new(right_read, right_write);

        hmi.send_credential(&Credential::new(b"0000").unwrap()).await.unwrap();
        hmi.send_message(Message::OpenDoor).await.unwrap();

        let mut received = Vec::new();
        for _ in 0..6 {
            received.push(control.recv_byte().await.unwrap());
        }
        assert_eq!(received, b"0000#+");
    }

    #[tokio::test]
    async fn closed_peer_is_eof() {
        let (left, right) = tokio::io::duplex(8);
        drop(right);
        let (read, write) = tokio::io::split(left);
        let mut link = StreamLink::new(read, write);
        let err = link.recv_byte().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
