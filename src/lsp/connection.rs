//! One LSP connection: inbound packet reading, outbound framing and reply correlation.
use crate::lsp::config::ConnectionConfig;
use crate::lsp::error::ConnectionError;
use crate::lsp::header::build_header_block;
use crate::lsp::packet::{PacketReader, PacketState};
use crate::lsp::pending::PendingTable;
use crate::lsp::transport::LspTransport;
use crate::lsp::types::{RequestId, RequestMessage, ResponseError, ResponseMessage};
use async_trait::async_trait;
use futures::future::BoxFuture;
use lsp_types::{MessageType, ShowMessageParams};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Called with the reply to a request, the connection it arrived on and the project.
pub type ResponseCallback<T, P> = Box<
    dyn for<'a> FnOnce(ResponseMessage, &'a mut Connection<T, P>, Arc<P>) -> BoxFuture<'a, ()>
        + Send,
>;

/// Box a closure as a `ResponseCallback`.
///
/// ```ignore
/// let callback = response_callback(|response, connection, _project| {
///     Box::pin(async move {
///         let _ = connection.log(MessageType::INFO, "got it").await;
///     })
/// });
/// ```
pub fn response_callback<T, P, F>(f: F) -> ResponseCallback<T, P>
where
    F: for<'a> FnOnce(ResponseMessage, &'a mut Connection<T, P>, Arc<P>) -> BoxFuture<'a, ()>
        + Send
        + 'static,
{
    Box::new(f)
}

/// Consumer of fully framed inbound payloads.
///
/// Implementations decide whether the payload is a request, a notification or
/// a response, and hand responses back to [`Connection::resolve`].
#[async_trait]
pub trait MessageHandler<T, P>: Send
where
    T: LspTransport + 'static,
    P: Send + Sync + 'static,
{
    async fn handle_message(
        &mut self,
        payload: Vec<u8>,
        connection: &mut Connection<T, P>,
    ) -> anyhow::Result<()>;
}

pub struct Connection<T, P> {
    transport: T,
    packets: PacketReader,
    pending: PendingTable<ResponseCallback<T, P>>,
    next_request_id: i64,
    project: Arc<P>,
    config: ConnectionConfig,
    closed: bool,
}

impl<T, P> Connection<T, P>
where
    T: LspTransport + 'static,
    P: Send + Sync + 'static,
{
    pub fn new(transport: T, project: Arc<P>) -> Self {
        Self::with_config(transport, project, ConnectionConfig::default())
    }

    pub fn with_config(transport: T, project: Arc<P>, config: ConnectionConfig) -> Self {
        let packets = PacketReader::new(
            config.max_content_length,
            config.expected_content_type.clone(),
        );
        Connection {
            transport,
            packets,
            pending: PendingTable::new(),
            next_request_id: 1,
            project,
            config,
            closed: false,
        }
    }

    pub fn project(&self) -> &Arc<P> {
        &self.project
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn packet_state(&self) -> PacketState {
        self.packets.state()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_done(&self) -> bool {
        self.closed || self.transport.is_done()
    }

    pub fn peer_label(&self) -> Option<String> {
        self.transport.peer_label()
    }

    pub async fn close(&mut self) -> anyhow::Result<()> {
        self.closed = true;
        self.transport.close().await
    }

    /// Run one step of the packet reader, dispatching a completed body to `handler`.
    ///
    /// Handler failures are logged and do not end the connection; transport
    /// failures are returned.
    pub async fn on_readable<H>(&mut self, handler: &mut H) -> anyhow::Result<()>
    where
        H: MessageHandler<T, P> + ?Sized,
    {
        if let Some(payload) = self.packets.step(&mut self.transport).await? {
            if let Err(err) = handler.handle_message(payload, self).await {
                tracing::warn!(error = %err, "message handler failed");
            }
        }
        Ok(())
    }

    /// Process messages until the transport is done, sweeping stale requests
    /// every `sweep_interval`.
    ///
    /// The sweep runs between inbound steps, so a peer that stays silent keeps
    /// its stale requests until it sends something or `evict_older_than` is
    /// called directly.
    pub async fn run<H>(&mut self, handler: &mut H) -> anyhow::Result<()>
    where
        H: MessageHandler<T, P> + ?Sized,
    {
        let mut last_sweep = Instant::now();
        while !self.is_done() {
            self.on_readable(handler).await?;
            let sweep_due = last_sweep.elapsed() >= self.config.sweep_interval;
            if sweep_due && !self.pending.is_empty() {
                self.evict_older_than(self.config.max_pending_age);
                last_sweep = Instant::now();
            }
        }
        tracing::debug!(peer = ?self.peer_label(), "connection finished");
        Ok(())
    }

    /// Forget requests that have been waiting longer than `max_age`.
    pub fn evict_older_than(&mut self, max_age: Duration) -> usize {
        self.pending.evict_older_than(max_age)
    }

    /// Hand a response to the callback of the request it answers.
    ///
    /// Returns true when a callback ran.
    pub async fn resolve(&mut self, response: ResponseMessage) -> bool {
        let Some(id) = response.id.as_int() else {
            tracing::warn!(id = %response.id, "received response without a handle-able id");
            return false;
        };
        let Some(callback) = self.pending.take(id) else {
            tracing::debug!(id, "no pending request for response, dropping");
            return false;
        };
        let project = Arc::clone(&self.project);
        callback(response, self, project).await;
        true
    }

    /// Frame `payload` and write it to the transport.
    pub async fn send_bytes(&mut self, payload: &[u8]) -> anyhow::Result<()> {
        if payload.is_empty() {
            return Err(ConnectionError::EmptyPayload.into());
        }
        if self.closed {
            return Err(ConnectionError::TransportClosed.into());
        }

        self.transport
            .write(&build_header_block(payload.len()))
            .await?;
        self.transport.write(payload).await?;
        self.transport.flush().await?;
        tracing::trace!(
            len = payload.len(),
            body = %String::from_utf8_lossy(payload),
            "SENDING"
        );
        Ok(())
    }

    pub async fn send_response(
        &mut self,
        mut message: ResponseMessage,
        fallback_id: RequestId,
    ) -> anyhow::Result<()> {
        if !message.id.is_set() {
            message.id = fallback_id;
        }
        let payload = serde_json::to_vec(&message).map_err(ConnectionError::from)?;
        self.send_bytes(&payload).await
    }

    pub async fn send_result(
        &mut self,
        result: serde_json::Value,
        id: RequestId,
    ) -> anyhow::Result<()> {
        self.send_response(ResponseMessage::from_result(result), id)
            .await
    }

    pub async fn send_error(&mut self, error: ResponseError, id: RequestId) -> anyhow::Result<()> {
        self.send_response(ResponseMessage::from_error(error), id)
            .await
    }

    /// Send a request, remembering `callback` when its id can be correlated.
    ///
    /// Returns the id the request went out with.
    pub async fn send_request(
        &mut self,
        mut message: RequestMessage,
        method: &str,
        fallback_id: RequestId,
        callback: ResponseCallback<T, P>,
    ) -> anyhow::Result<RequestId> {
        if !message.id.is_set() {
            message.id = fallback_id;
        }
        if message.id == RequestId::AutoIncrement {
            message.id = RequestId::Int(self.allocate_request_id());
        } else if let Some(id) = message.id.as_int() {
            if self.pending.contains(id) {
                return Err(ConnectionError::DuplicateId { id }.into());
            }
        }
        if message.method.is_empty() {
            message.method = method.to_string();
        }

        let registered = message.id.is_set() && self.pending.register(&message.id, callback);
        if message.id.is_set() && !registered {
            tracing::debug!(id = %message.id, "request id cannot be correlated with a reply");
        }

        let sent = match serde_json::to_vec(&message) {
            Ok(payload) => self.send_bytes(&payload).await,
            Err(err) => Err(ConnectionError::from(err).into()),
        };
        if let Err(err) = sent {
            if let Some(id) = message.id.as_int().filter(|_| registered) {
                self.pending.take(id);
            }
            return Err(err);
        }
        Ok(message.id)
    }

    /// Next counter value not held by an outstanding request.
    fn allocate_request_id(&mut self) -> i64 {
        while self.pending.contains(self.next_request_id) {
            self.next_request_id += 1;
        }
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    /// Log responses nobody asked to handle.
    pub fn default_reporting_handler() -> ResponseCallback<T, P> {
        response_callback(|response, _connection, _project| {
            Box::pin(async move {
                tracing::info!(id = %response.id, "unhandled response");
            })
        })
    }

    /// Ignore successful replies; log failed ones.
    pub fn no_response_expected() -> ResponseCallback<T, P> {
        response_callback(|response, _connection, _project| {
            Box::pin(async move {
                if let Some(error) = &response.error {
                    tracing::warn!(
                        id = %response.id,
                        code = error.code,
                        message = %error.message,
                        "request failed"
                    );
                }
            })
        })
    }

    /// Show `text` to the user of the remote side and echo it locally.
    pub async fn log(&mut self, typ: MessageType, text: &str) -> anyhow::Result<()> {
        tracing::info!(message_type = ?typ, "LOG {}", text);

        let params = ShowMessageParams {
            typ,
            message: text.to_string(),
        };
        let params = serde_json::to_value(params).map_err(ConnectionError::from)?;
        self.send_request(
            RequestMessage::with_params(params),
            "window/showMessage",
            RequestId::Unset,
            Self::no_response_expected(),
        )
        .await?;
        Ok(())
    }
}
