//! LSP transport abstraction (line and byte oriented stream access).
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Minimal async trait for an LSP byte channel.
/// - `read_line` returns one line including its terminator, or `None` once the peer is gone.
/// - `read_exact` returns exactly `len` bytes, waiting for more data as needed.
/// - `write` puts raw bytes on the wire; it adds no framing of its own.
#[async_trait]
pub trait LspTransport: Send {
    async fn read_line(&mut self) -> anyhow::Result<Option<String>>;
    async fn read_exact(&mut self, len: usize) -> anyhow::Result<Vec<u8>>;
    async fn write(&mut self, bytes: &[u8]) -> anyhow::Result<()>;
    async fn flush(&mut self) -> anyhow::Result<()>;
    async fn close(&mut self) -> anyhow::Result<()>;

    /// Whether the channel is closed or has reached end of input.
    fn is_done(&self) -> bool;

    /// `address:port` of the remote side, when there is one.
    fn peer_label(&self) -> Option<String> {
        None
    }
}

/// Buffered reader/writer pair shared by the concrete transports.
pub struct BufferedIo<R, W> {
    reader: BufReader<R>,
    writer: W,
    eof: bool,
    closed: bool,
}

impl<R, W> BufferedIo<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        BufferedIo {
            reader: BufReader::new(reader),
            writer,
            eof: false,
            closed: false,
        }
    }
}

#[async_trait]
impl<R, W> LspTransport for BufferedIo<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn read_line(&mut self) -> anyhow::Result<Option<String>> {
        let mut line = Vec::new();
        let count = self.reader.read_until(b'\n', &mut line).await?;
        if count == 0 {
            self.eof = true;
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }

    async fn read_exact(&mut self, len: usize) -> anyhow::Result<Vec<u8>> {
        let mut payload = vec![0u8; len];
        if let Err(e) = self.reader.read_exact(&mut payload).await {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                self.eof = true;
            }
            return Err(e.into());
        }
        Ok(payload)
    }

    async fn write(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.writer.write_all(bytes).await?;
        Ok(())
    }

    async fn flush(&mut self) -> anyhow::Result<()> {
        self.writer.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        if !self.closed {
            self.closed = true;
            self.writer.shutdown().await?;
        }
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.eof || self.closed
    }
}
