//! Per-connection settings.

use crate::lsp::header::DEFAULT_CONTENT_TYPE;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Largest Content-Length accepted from the peer.
    pub max_content_length: usize,

    /// Content-Type the peer is expected to announce. Mismatches only warn.
    pub expected_content_type: String,

    /// Age after which a request without a reply is forgotten by `Connection::run`.
    pub max_pending_age: Duration,

    /// How often `Connection::run` sweeps stale requests.
    pub sweep_interval: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_content_length: 64 * 1024 * 1024,
            expected_content_type: DEFAULT_CONTENT_TYPE.to_string(),
            max_pending_age: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(10),
        }
    }
}
