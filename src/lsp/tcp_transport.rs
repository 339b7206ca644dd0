// socket transport: one accepted (or connected) TCP stream per connection
use crate::lsp::transport::{BufferedIo, LspTransport};
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

pub struct TcpTransport {
    io: BufferedIo<OwnedReadHalf, OwnedWriteHalf>,
    peer: Option<SocketAddr>,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        let peer = stream.peer_addr().ok();
        let (reader, writer) = stream.into_split();
        TcpTransport {
            io: BufferedIo::new(reader, writer),
            peer,
        }
    }

    pub async fn connect(addr: impl ToSocketAddrs) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::new(stream))
    }
}

#[async_trait]
impl LspTransport for TcpTransport {
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
        self.io.close().await?;
        debug_assert!(self.io.is_done());
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.io.is_done()
    }

    fn peer_label(&self) -> Option<String> {
        self.peer
            .map(|addr| format!("{}:{}", addr.ip(), addr.port()))
    }
}

#[cfg(test)]
mod tests {
    use super::TcpTransport;
    use crate::lsp::transport::LspTransport;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_peer_label_and_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let peer = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"Content-Length: 2\r\n").await.unwrap();
            let mut rest = Vec::new();
            socket.read_to_end(&mut rest).await.unwrap();
            rest
        });

        let mut transport = TcpTransport::connect(addr).await.unwrap();
        assert_eq!(
            transport.peer_label(),
            Some(format!("127.0.0.1:{}", addr.port()))
        );
        assert_eq!(
            transport.read_line().await.unwrap().as_deref(),
            Some("Content-Length: 2\r\n")
        );

        transport.write(b"bye").await.unwrap();
        transport.close().await.unwrap();
        assert!(transport.is_done());

        assert_eq!(peer.await.unwrap(), b"bye".to_vec());
    }
}
