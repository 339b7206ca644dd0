// stdio transport: reads the process's stdin, writes the process's stdout
use crate::lsp::transport::{BufferedIo, LspTransport};
use async_trait::async_trait;
use tokio::io::{Stdin, Stdout};

/// Transport over the process's own standard streams.
///
/// There is no peer identity, and closing only flushes stdout: the streams
/// live as long as the process does.
pub struct StdioTransport {
    io: BufferedIo<Stdin, Stdout>,
}

impl StdioTransport {
    pub fn new() -> Self {
        StdioTransport {
            io: BufferedIo::new(tokio::io::stdin(), tokio::io::stdout()),
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LspTransport for StdioTransport {
    async fn read_line(&mut self) -> anyhow::Result<Option<String>> {
        self.io.read_line().await
    }

    async fn read_exact(&mut self, len: usize) -> anyhow::Result<Vec<u8>> {
        self.io.read_exact(len).await
    }

    async fn write(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.io.write(bytes).await
    }

    async fn flush(&mut self) -> anyhow::Result<()> {
        self.io.flush().await
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.io.flush().await
    }

    fn is_done(&self) -> bool {
        self.io.is_done()
    }
}
