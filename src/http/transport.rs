//! Byte transport abstraction.
//!
//! The message codec never touches sockets; code that drives it reads and
//! writes through a [`Transport`]. [`StreamTransport`] adapts any Tokio
//! stream (a `TcpStream`, one half of `tokio::io::duplex`, ...).

use std::io;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const READ_CHUNK: usize = 8192;

#[allow(async_fn_in_trait)]
pub trait Transport {
    /// The next segment of incoming bytes, or `None` once the peer closed.
    async fn read(&mut self) -> io::Result<Option<Bytes>>;

    /// Writes all of `data`.
    async fn write(&mut self, data: &[u8]) -> io::Result<()>;
}

pub struct StreamTransport<S> {
    stream: S,
    buffer: BytesMut,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn read(&mut self) -> io::Result<Option<Bytes>> {
        self.buffer.reserve(READ_CHUNK);
        let n = self.stream.read_buf(&mut self.buffer).await?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(self.buffer.split().freeze()))
    }

    async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await
    }
}
