//! Errors surfaced by connection send paths.

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Zero-length bodies are never framed on send.
    #[error("refusing to send an empty payload")]
    EmptyPayload,

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("request id {id} is already pending")]
    DuplicateId { id: i64 },

    #[error("transport closed")]
    TransportClosed,
}
