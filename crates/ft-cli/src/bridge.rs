//! Reading browser bridge messages from a byte stream.
//!
//! Two framings are supported: newline-delimited JSON, and the browser
//! native messaging protocol (a 4-byte little-endian length prefix followed
//! by that many bytes of JSON). Lines are handled as raw bytes, so a line
//! that is not UTF-8 is just another malformed message.

use std::io;

use ft_core::HostMessage;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

/// Browsers cap native messages sent to the host at 1 MiB. Lines get the
/// same limit.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// How messages are delimited on the input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// One JSON object per line.
    #[default]
    Lines,
    /// Native messaging length-prefixed frames.
    Native,
}

/// Reads framed messages from an async byte stream.
pub struct MessageReader<R> {
    reader: BufReader<R>,
    framing: Framing,
    line: Vec<u8>,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(reader: R, framing: Framing) -> Self {
        Self {
            reader: BufReader::new(reader),
            framing,
            line: Vec::new(),
        }
    }

    /// Returns the next raw frame, or `None` at end of stream.
    pub async fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        match self.framing {
            Framing::Lines => self.next_line().await,
            Framing::Native => self.next_native().await,
        }
    }

    /// Returns the next message that parses, skipping (and logging) bad ones.
    pub async fn next_message(&mut self) -> io::Result<Option<HostMessage>> {
        while let Some(frame) = self.next_frame().await? {
            match serde_json::from_slice::<HostMessage>(&frame) {
                Ok(message) => return Ok(Some(message)),
                Err(err) => tracing::warn!(
                    error = %err,
                    frame = %String::from_utf8_lossy(&frame),
                    "skipping malformed bridge message"
                ),
            }
        }
        Ok(None)
    }

    async fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        // One byte past the cap tells an oversized line from one that fits.
        let limit = MAX_MESSAGE_SIZE as u64 + 1;
        loop {
            self.line.clear();
            let read = (&mut self.reader)
                .take(limit)
                .read_until(b'\n', &mut self.line)
                .await?;
            if read == 0 {
                return Ok(None);
            }
            if self.line.last() != Some(&b'\n') && self.line.len() > MAX_MESSAGE_SIZE {
                tracing::warn!(max = MAX_MESSAGE_SIZE, "skipping oversized bridge line");
                self.skip_rest_of_line().await?;
                continue;
            }
            let trimmed = self.line.trim_ascii();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_vec()));
            }
        }
    }

    /// Discards input up to and including the next newline.
    async fn skip_rest_of_line(&mut self) -> io::Result<()> {
        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Ok(());
            }
            if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                self.reader.consume(pos + 1);
                return Ok(());
            }
            let len = buf.len();
            self.reader.consume(len);
        }
    }

    async fn next_native(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut len_bytes = [0u8; 4];
        match self.reader.read_exact(&mut len_bytes).await {
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(err) => return Err(err),
        }
        let len = u32::from_le_bytes(len_bytes) as usize;
        if len > MAX_MESSAGE_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Message too large: {len} bytes (max: {MAX_MESSAGE_SIZE} bytes)"),
            ));
        }

        let mut buffer = vec![0u8; len];
        self.reader.read_exact(&mut buffer).await?;
        Ok(Some(buffer))
    }
}
