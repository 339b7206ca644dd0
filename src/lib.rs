//! Content-Length framed LSP connections over TCP sockets or standard streams.
//!
//! A [`Connection`](lsp::Connection) turns the byte stream of an
//! [`LspTransport`](lsp::LspTransport) into message payloads, frames outgoing
//! messages, and matches replies to the requests that asked for them.
pub mod lsp;
