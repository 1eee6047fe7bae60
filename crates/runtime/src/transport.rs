//! Transport layer: framed JSON messages over a byte pipe.
//!
//! Each message is encoded as a 4-byte little-endian length followed by the
//! JSON bytes. The sending half writes frames; the receiving half reads
//! frames until EOF and forwards each decoded message to an unbounded
//! channel consumed by the [`Connection`](crate::Connection).

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// Frames larger than this are rejected as corrupt.
pub const MAX_FRAME_SIZE: usize = 32 * 1024 * 1024;

/// Sending half of a transport.
pub trait Transport: Send {
	/// Writes one message to the other side.
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Receiving half of a transport.
pub trait TransportReceiver: Send {
	/// Reads messages until the pipe closes, forwarding each one.
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// Everything a [`Connection`](crate::Connection) needs from a transport.
pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub receiver: Box<dyn TransportReceiver>,
	pub message_rx: mpsc::UnboundedReceiver<Value>,
}

/// Length-prefixed JSON transport over an async byte pipe.
pub struct PipeTransport<W, R> {
	writer: W,
	reader: R,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl<W, R> PipeTransport<W, R>
where
	W: AsyncWrite + Unpin + Send + 'static,
	R: AsyncRead + Unpin + Send + 'static,
{
	/// Creates a transport and the receiver its incoming messages are forwarded to.
	pub fn new(writer: W, reader: R) -> (Self, mpsc::UnboundedReceiver<Value>) {
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		(
			Self {
				writer,
				reader,
				message_tx,
			},
			message_rx,
		)
	}

	/// Writes one framed message.
	pub async fn send(&mut self, message: Value) -> Result<()> {
		write_frame(&mut self.writer, &message).await
	}

	/// Reads frames until EOF.
	pub async fn run(&mut self) -> Result<()> {
		read_loop(&mut self.reader, &self.message_tx).await
	}

	/// Splits into independently owned halves.
	pub fn into_parts(self) -> (PipeTransportSender<W>, PipeTransportReceiver<R>) {
		(
			PipeTransportSender {
				writer: self.writer,
			},
			PipeTransportReceiver {
				reader: self.reader,
				message_tx: self.message_tx,
			},
		)
	}

	/// Boxes both halves together with the message receiver.
	pub fn into_transport_parts(self, message_rx: mpsc::UnboundedReceiver<Value>) -> TransportParts {
		let (sender, receiver) = self.into_parts();
		TransportParts {
			sender: Box::new(sender),
			receiver: Box::new(receiver),
			message_rx,
		}
	}
}

/// Writing half of a [`PipeTransport`].
pub struct PipeTransportSender<W> {
	writer: W,
}

impl<W: AsyncWrite + Unpin + Send> Transport for PipeTransportSender<W> {
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move { write_frame(&mut self.writer, &message).await })
	}
}

/// Reading half of a [`PipeTransport`].
pub struct PipeTransportReceiver<R> {
	reader: R,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl<R: AsyncRead + Unpin + Send + 'static> TransportReceiver for PipeTransportReceiver<R> {
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move {
			let mut this = *self;
			read_loop(&mut this.reader, &this.message_tx).await
		})
	}
}

/// Creates two transports joined back to back in memory.
///
/// Whatever one side sends, the other side receives. Used to run a host and
/// an embedded [`Connection`](crate::Connection) inside one process.
pub fn in_process_pair(buffer_size: usize) -> (TransportParts, TransportParts) {
	let (host_write, embedded_read) = tokio::io::duplex(buffer_size);
	let (embedded_write, host_read) = tokio::io::duplex(buffer_size);

	let host = pipe_parts(host_write, host_read);
	let embedded = pipe_parts(embedded_write, embedded_read);
	(host, embedded)
}

fn pipe_parts(writer: DuplexStream, reader: DuplexStream) -> TransportParts {
	let (transport, message_rx) = PipeTransport::new(writer, reader);
	transport.into_transport_parts(message_rx)
}

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, message: &Value) -> Result<()> {
	let bytes = serde_json::to_vec(message)?;
	let length = u32::try_from(bytes.len())
		.map_err(|_| Error::ProtocolError(format!("message too large: {} bytes", bytes.len())))?;

	writer.write_all(&length.to_le_bytes()).await?;
	writer.write_all(&bytes).await?;
	writer.flush().await?;
	Ok(())
}

/// Reads one frame; `None` on a clean EOF between frames.
async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Value>> {
	let mut len_buf = [0u8; 4];
	let mut filled = 0;
	while filled < len_buf.len() {
		let n = reader.read(&mut len_buf[filled..]).await?;
		if n == 0 {
			if filled == 0 {
				return Ok(None);
			}
			return Err(Error::ProtocolError(format!(
				"truncated length prefix ({filled} of 4 bytes)"
			)));
		}
		filled += n;
	}

	let length = u32::from_le_bytes(len_buf) as usize;
	if length > MAX_FRAME_SIZE {
		return Err(Error::ProtocolError(format!(
			"frame of {length} bytes exceeds limit of {MAX_FRAME_SIZE}"
		)));
	}

	let mut buf = vec![0u8; length];
	reader.read_exact(&mut buf).await?;
	Ok(Some(serde_json::from_slice(&buf)?))
}

async fn read_loop<R: AsyncRead + Unpin>(
	reader: &mut R,
	message_tx: &mpsc::UnboundedSender<Value>,
) -> Result<()> {
	while let Some(message) = read_frame(reader).await? {
		if message_tx.send(message).is_err() {
			tracing::debug!("Message receiver dropped, stopping transport reader");
			break;
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests;
