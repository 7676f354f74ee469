// ABOUTME: Frame-level I/O over a TCP stream for SMPP sessions and carrier links
// ABOUTME: Buffers partial reads until a whole PDU is available; splits into halves for full-duplex use

use crate::codec::{self, CodecError, Frame};
use bytes::{Buf, BytesMut};
use std::io::{self, Cursor};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// Failure while reading a frame.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The bytes do not form a valid PDU. Framing can no longer be trusted,
    /// so the connection must be closed after answering with generic_nack.
    #[error("malformed PDU: {source}")]
    Malformed {
        /// Sequence number from the offending header, when one was readable.
        sequence_number: Option<u32>,
        #[source]
        source: CodecError,
    },

    #[error("connection reset by peer")]
    ConnectionReset,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Read half: accumulates bytes and cuts frames out of them.
#[derive(Debug)]
pub struct FrameReader<R> {
    stream: R,
    // The buffer for reading frames.
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Read a single `Frame` value from the underlying stream.
    ///
    /// Waits until a whole frame is buffered. Bytes past that frame stay in
    /// the buffer for the next call. Returns `None` when the peer closes the
    /// stream on a frame boundary.
    ///
    /// Cancel safe: bytes read before cancellation are kept.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, ReadError> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            // `0` indicates "end of stream".
            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                // A clean shutdown leaves nothing half-read behind.
                return if self.buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(ReadError::ConnectionReset)
                };
            }
        }
    }

    fn parse_frame(&mut self) -> Result<Option<Frame>, ReadError> {
        let mut buf = Cursor::new(&self.buffer[..]);

        // Cheap length check first so nothing is allocated for a partial frame.
        let len = match Frame::check(&mut buf) {
            Ok(len) => len,
            Err(CodecError::Incomplete) => return Ok(None),
            Err(source) => {
                return Err(ReadError::Malformed {
                    sequence_number: codec::peek_sequence_number(&self.buffer),
                    source,
                });
            }
        };

        let frame = codec::decode(&self.buffer[..len]).map_err(|source| ReadError::Malformed {
            sequence_number: codec::peek_sequence_number(&self.buffer),
            source,
        })?;

        self.buffer.advance(len);
        Ok(Some(frame))
    }
}

/// Write half: encodes frames into a buffered writer and flushes each one.
#[derive(Debug)]
pub struct FrameWriter<W> {
    stream: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(stream: W) -> Self {
        Self {
            stream: BufWriter::new(stream),
        }
    }

    /// Write a single `Frame` value to the underlying stream.
    ///
    /// Encoding happens before any byte is written, so an unencodable frame
    /// leaves the stream untouched.
    pub async fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        let bytes = frame
            .to_bytes()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.write_encoded(&bytes).await
    }

    /// Writes a frame the caller already encoded.
    pub async fn write_encoded(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await
    }

    /// Flushes and closes the write side of the stream.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}

/// Single-owner connection used by inbound sessions.
#[derive(Debug)]
pub struct Connection<R = OwnedReadHalf, W = OwnedWriteHalf> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
}

impl Connection {
    /// Create a new `Connection`, backed by `socket`.
    pub fn new(socket: TcpStream) -> Connection {
        let (read, write) = socket.into_split();
        Connection::from_parts(read, write)
    }
}

impl<R: AsyncRead + Unpin, W: AsyncWrite + Unpin> Connection<R, W> {
    pub fn from_parts(read: R, write: W) -> Self {
        Self {
            reader: FrameReader::new(read),
            writer: FrameWriter::new(write),
        }
    }

    pub async fn read_frame(&mut self) -> Result<Option<Frame>, ReadError> {
        self.reader.read_frame().await
    }

    pub async fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.writer.write_frame(frame).await
    }

    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }

    /// Splits into halves that can be driven from different tasks.
    pub fn into_split(self) -> (FrameReader<R>, FrameWriter<W>) {
        (self.reader, self.writer)
    }
}
