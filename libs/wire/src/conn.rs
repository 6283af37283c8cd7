use std::io;
use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::error::WireError;
use crate::messages::Frame;

/// Default cap for a single frame body, in bytes.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024;

/// A stream wrapped in 4-byte big-endian length-prefixed framing.
///
/// One `write_*` call sends exactly one frame and one `read_*` call returns
/// exactly one frame, regardless of how the transport splits the bytes.
pub struct FrameConn<S = TcpStream> {
    framed: Framed<S, LengthDelimitedCodec>,
    max_frame_len: usize,
}

impl<S> std::fmt::Debug for FrameConn<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameConn")
            .field("max_frame_len", &self.max_frame_len)
            .finish()
    }
}

impl FrameConn<TcpStream> {
    /// Dial `addr` and wrap the resulting TCP stream.
    pub async fn connect(addr: &str, max_frame_len: usize) -> Result<Self, WireError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream, max_frame_len))
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.framed.get_ref().peer_addr()
    }
}

impl<S> FrameConn<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, max_frame_len: usize) -> Self {
        let codec = LengthDelimitedCodec::builder()
            .big_endian()
            .length_field_length(4)
            .max_frame_length(max_frame_len)
            .new_codec();
        Self {
            framed: Framed::new(stream, codec),
            max_frame_len,
        }
    }

    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    /// Send one frame as-is.
    pub async fn write_raw(&mut self, frame: Bytes) -> Result<(), WireError> {
        if frame.len() > self.max_frame_len {
            return Err(WireError::FrameTooLarge {
                len: frame.len(),
                limit: self.max_frame_len,
            });
        }
        self.framed.send(frame).await?;
        Ok(())
    }

    /// Receive one frame. End of stream is reported as [`WireError::Closed`].
    pub async fn read_raw(&mut self) -> Result<BytesMut, WireError> {
        match self.framed.next().await {
            Some(Ok(frame)) => Ok(frame),
            Some(Err(e)) => Err(WireError::Io(e)),
            None => Err(WireError::Closed),
        }
    }

    pub async fn write_proto<M: Frame>(&mut self, message: &M) -> Result<(), WireError> {
        self.write_raw(Bytes::from(message.encode_to_vec())).await
    }

    pub async fn read_proto<M: Frame>(&mut self) -> Result<M, WireError> {
        let frame = self.read_raw().await?;
        decode_frame(&frame)
    }
}

/// Decode a frame body received earlier with [`FrameConn::read_raw`].
pub fn decode_frame<M: Frame>(frame: &[u8]) -> Result<M, WireError> {
    M::decode(frame).map_err(|source| WireError::Decode {
        message: M::NAME,
        source,
    })
}
