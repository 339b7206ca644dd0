pub mod config;
pub mod connection;
pub mod error;
pub mod header;
pub mod packet;
pub mod pending;
pub mod protocol;
pub mod stdio_transport;
pub mod tcp_transport;
pub mod transport;
pub mod types;

pub use config::ConnectionConfig;
pub use connection::{response_callback, Connection, MessageHandler, ResponseCallback};
pub use error::ConnectionError;
pub use stdio_transport::StdioTransport;
pub use tcp_transport::TcpTransport;
pub use transport::{BufferedIo, LspTransport};
pub use types::{Message, RequestId, RequestMessage, ResponseError, ResponseMessage};
