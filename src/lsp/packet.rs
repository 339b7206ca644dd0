//! Incremental header/body reader driving the Content-Length framing.
use crate::lsp::header::{
    is_blank, parse_content_length, parse_header_line, Header, HeaderField,
};
use crate::lsp::transport::LspTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketState {
    AwaitingHeader,
    AwaitingBody,
}

pub struct PacketReader {
    state: PacketState,
    header: Header,
    max_content_length: usize,
    expected_content_type: String,
}

impl PacketReader {
    pub fn new(max_content_length: usize, expected_content_type: impl Into<String>) -> Self {
        PacketReader {
            state: PacketState::AwaitingHeader,
            header: Header::default(),
            max_content_length,
            expected_content_type: expected_content_type.into(),
        }
    }

    pub fn state(&self) -> PacketState {
        self.state
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Advance the machine by one step.
    ///
    /// Returns the payload when a body has been read in full. A header step
    /// and a rejected body step both return `Ok(None)`.
    pub async fn step<T>(&mut self, transport: &mut T) -> anyhow::Result<Option<Vec<u8>>>
    where
        T: LspTransport + ?Sized,
    {
        match self.state {
            PacketState::AwaitingHeader => {
                self.read_header(transport).await?;
                Ok(None)
            }
            PacketState::AwaitingBody => self.read_body(transport).await,
        }
    }

    async fn read_header<T>(&mut self, transport: &mut T) -> anyhow::Result<()>
    where
        T: LspTransport + ?Sized,
    {
        while let Some(line) = transport.read_line().await? {
            if is_blank(&line) {
                tracing::debug!(content_length = ?self.header.content_length, "header complete");
                self.state = PacketState::AwaitingBody;
                return Ok(());
            }
            self.apply_header_line(&line);
        }
        Ok(())
    }

    fn apply_header_line(&mut self, line: &str) {
        let (name, value) = match parse_header_line(line) {
            Ok(field) => field,
            Err(err) => {
                tracing::warn!(%err, "malformed header line");
                return;
            }
        };

        match HeaderField::from_name(name) {
            HeaderField::ContentLength => {
                match parse_content_length(value, self.max_content_length) {
                    Ok(length) => self.header.content_length = Some(length),
                    Err(err) => tracing::warn!(%err, "ignoring Content-Length"),
                }
            }
            HeaderField::ContentType => {
                let value = value.trim();
                if value != self.expected_content_type {
                    tracing::warn!(content_type = value, "unexpected content type");
                }
                self.header.content_type = value.to_string();
            }
            HeaderField::Unknown => {
                tracing::warn!(field = name, "unknown header field");
            }
        }
    }

    async fn read_body<T>(&mut self, transport: &mut T) -> anyhow::Result<Option<Vec<u8>>>
    where
        T: LspTransport + ?Sized,
    {
        let Some(content_length) = self.header.content_length else {
            tracing::warn!("no Content-Length given, skipping body");
            self.reset();
            return Ok(None);
        };

        let payload = transport.read_exact(content_length).await?;
        tracing::trace!(
            len = payload.len(),
            content_type = %self.header.content_type,
            body = %String::from_utf8_lossy(&payload),
            "RECEIVED"
        );

        self.reset();
        Ok(Some(payload))
    }

    fn reset(&mut self) {
        self.state = PacketState::AwaitingHeader;
        self.header = Header::default();
    }
}

#[cfg(test)]
mod tests {
    use super::{PacketReader, PacketState};
    use crate::lsp::header::{build_header_block, DEFAULT_CONTENT_TYPE};
    use crate::lsp::transport::BufferedIo;
    use tokio::io::{duplex, split, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};

    type TestIo = BufferedIo<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

    fn reader() -> PacketReader {
        PacketReader::new(1024 * 1024, DEFAULT_CONTENT_TYPE)
    }

    fn transport_with(input: &'static [u8]) -> (TestIo, tokio::task::JoinHandle<()>) {
        let (a, mut b) = duplex(64 * 1024);
        let (r, w) = split(a);
        let writer = tokio::spawn(async move {
            b.write_all(input).await.unwrap();
        });
        (BufferedIo::new(r, w), writer)
    }

    /// Drive the reader until it yields a payload.
    async fn next_payload(packets: &mut PacketReader, io: &mut TestIo) -> Vec<u8> {
        loop {
            if let Some(payload) = packets.step(io).await.unwrap() {
                return payload;
            }
        }
    }

    #[tokio::test]
    async fn test_delivers_exact_body_and_returns_to_header() {
        let body = br#"{"id":1,"a":2}"#;
        assert_eq!(body.len(), 14);
        let (mut io, writer) =
            transport_with(b"Content-Length: 14\r\n\r\n{\"id\":1,\"a\":2}");
        let mut packets = reader();

        assert_eq!(packets.step(&mut io).await.unwrap(), None);
        assert_eq!(packets.state(), PacketState::AwaitingBody);
        assert_eq!(packets.header().content_length, Some(14));

        assert_eq!(packets.step(&mut io).await.unwrap(), Some(body.to_vec()));
        assert_eq!(packets.state(), PacketState::AwaitingHeader);
        assert_eq!(packets.header().content_length, None);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_thirteen_byte_body() {
        let (mut io, writer) = transport_with(b"Content-Length: 13\r\n\r\n{\"id\":1,\"x\":0");
        let mut packets = reader();

        let payload = next_payload(&mut packets, &mut io).await;
        assert_eq!(payload, b"{\"id\":1,\"x\":0".to_vec());
        assert_eq!(payload.len(), 13);
        assert_eq!(packets.state(), PacketState::AwaitingHeader);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_back_to_back_messages_do_not_mix() {
        let (mut io, writer) = transport_with(
            b"Content-Length: 3\r\nContent-Type: application/vscode-jsonrpc; charset=utf-8\r\n\r\nabcContent-Length: 2\r\n\r\nde",
        );
        let mut packets = reader();

        assert_eq!(next_payload(&mut packets, &mut io).await, b"abc".to_vec());
        assert_eq!(next_payload(&mut packets, &mut io).await, b"de".to_vec());
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_lines_are_skipped() {
        let (mut io, writer) = transport_with(
            b"X-Trace: on\r\ngarbage\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nok",
        );
        let mut packets = reader();

        assert_eq!(packets.step(&mut io).await.unwrap(), None);
        assert_eq!(packets.header().content_type, "text/plain");
        assert_eq!(next_payload(&mut packets, &mut io).await, b"ok".to_vec());
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_content_length_resets_without_reading() {
        let (mut io, writer) = transport_with(b"X-Other: 1\r\n\r\nContent-Length: 1\r\n\r\nz");
        let mut packets = reader();

        assert_eq!(packets.step(&mut io).await.unwrap(), None);
        assert_eq!(packets.state(), PacketState::AwaitingBody);
        assert_eq!(packets.step(&mut io).await.unwrap(), None);
        assert_eq!(packets.state(), PacketState::AwaitingHeader);

        assert_eq!(next_payload(&mut packets, &mut io).await, b"z".to_vec());
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_zero_length_body_yields_empty_payload() {
        let (mut io, writer) = transport_with(b"Content-Length: 0\r\n\r\n");
        let mut packets = reader();

        assert_eq!(next_payload(&mut packets, &mut io).await, Vec::<u8>::new());
        assert_eq!(packets.state(), PacketState::AwaitingHeader);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_length_is_ignored() {
        let (mut io, writer) = transport_with(b"Content-Length: 99\r\n\r\n");
        let mut packets = PacketReader::new(10, DEFAULT_CONTENT_TYPE);

        packets.step(&mut io).await.unwrap();
        assert_eq!(packets.header().content_length, None);
        assert_eq!(packets.step(&mut io).await.unwrap(), None);
        assert_eq!(packets.state(), PacketState::AwaitingHeader);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_header_resumes_after_end_of_input() {
        let (mut io, writer) = transport_with(b"Content-Length: 4\r\n");
        let mut packets = reader();

        assert_eq!(packets.step(&mut io).await.unwrap(), None);
        writer.await.unwrap();
        assert_eq!(packets.state(), PacketState::AwaitingHeader);
        assert_eq!(packets.header().content_length, Some(4));
    }

    #[tokio::test]
    async fn test_built_header_round_trips_binary_body() {
        for len in [0usize, 1, 7, 300] {
            let body: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let (a, mut b) = duplex(64 * 1024);
            let (r, w) = split(a);
            let mut io = BufferedIo::new(r, w);

            let mut framed = build_header_block(len);
            framed.extend_from_slice(&body);
            b.write_all(&framed).await.unwrap();

            let mut packets = reader();
            assert_eq!(next_payload(&mut packets, &mut io).await, body);
        }
    }
}
