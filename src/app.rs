use async_trait::async_trait;
use lsp_connection::lsp::protocol::parse_message;
use lsp_connection::lsp::{
    response_callback, Connection, ConnectionConfig, LspTransport, Message, MessageHandler,
    RequestId, RequestMessage, ResponseError, StdioTransport, TcpTransport,
};
use lsp_types::{
    ConfigurationItem, ConfigurationParams, InitializeResult, MessageType, ServerCapabilities,
    ServerInfo,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use crate::cli::Config;

/// Project state shared by every connection of this server.
pub struct Workspace {
    pub root: PathBuf,
    settings: Mutex<Option<serde_json::Value>>,
}

impl Workspace {
    pub fn new(root: PathBuf) -> Self {
        Workspace {
            root,
            settings: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> Option<serde_json::Value> {
        self.settings.lock().ok().and_then(|s| s.clone())
    }

    fn store_settings(&self, value: serde_json::Value) {
        if let Ok(mut settings) = self.settings.lock() {
            *settings = Some(value);
        }
    }
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let workspace = Arc::new(Workspace::new(config.workspace));
    match config.listen {
        Some(addr) => serve_tcp(&addr, workspace, config.connection).await,
        None => {
            let connection =
                Connection::with_config(StdioTransport::new(), workspace, config.connection);
            serve_connection(connection).await;
            Ok(())
        }
    }
}

async fn serve_tcp(
    addr: &str,
    workspace: Arc<Workspace>,
    connection_config: ConnectionConfig,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    loop {
        let (stream, _) = listener.accept().await?;
        let connection = Connection::with_config(
            TcpTransport::new(stream),
            Arc::clone(&workspace),
            connection_config.clone(),
        );
        tokio::spawn(serve_connection(connection));
    }
}

async fn serve_connection<T>(mut connection: Connection<T, Workspace>)
where
    T: LspTransport + 'static,
{
    let peer = connection
        .peer_label()
        .unwrap_or_else(|| String::from("stdio"));
    tracing::info!(%peer, "client connected");

    let mut handler = ServerHandler::default();
    if let Err(e) = connection.run(&mut handler).await {
        tracing::warn!(%peer, error = %e, "connection failed");
    }
    tracing::info!(%peer, "client disconnected");
}

#[derive(Default)]
pub struct ServerHandler {
    shutdown_requested: bool,
}

#[async_trait]
impl<T> MessageHandler<T, Workspace> for ServerHandler
where
    T: LspTransport + 'static,
{
    async fn handle_message(
        &mut self,
        payload: Vec<u8>,
        connection: &mut Connection<T, Workspace>,
    ) -> anyhow::Result<()> {
        match parse_message(&payload)? {
            Message::Response(response) => {
                connection.resolve(response).await;
            }
            Message::Request(request) => self.handle_request(request, connection).await?,
            Message::Notification(notification) => {
                self.handle_notification(notification, connection).await?
            }
        }
        Ok(())
    }
}

impl ServerHandler {
    async fn handle_request<T>(
        &mut self,
        request: RequestMessage,
        connection: &mut Connection<T, Workspace>,
    ) -> anyhow::Result<()>
    where
        T: LspTransport + 'static,
    {
        match request.method.as_str() {
            "initialize" => {
                let result = InitializeResult {
                    capabilities: ServerCapabilities::default(),
                    server_info: Some(ServerInfo {
                        name: String::from("lsp_connection"),
                        version: Some(env!("CARGO_PKG_VERSION").to_string()),
                    }),
                };
                connection
                    .send_result(serde_json::to_value(result)?, request.id)
                    .await
            }
            "shutdown" => {
                self.shutdown_requested = true;
                connection
                    .send_result(serde_json::Value::Null, request.id)
                    .await
            }
            method => {
                let error = ResponseError::new(
                    ResponseError::METHOD_NOT_FOUND,
                    format!("unknown method {}", method),
                );
                connection.send_error(error, request.id).await
            }
        }
    }

    async fn handle_notification<T>(
        &mut self,
        notification: RequestMessage,
        connection: &mut Connection<T, Workspace>,
    ) -> anyhow::Result<()>
    where
        T: LspTransport + 'static,
    {
        match notification.method.as_str() {
            "initialized" => {
                let root = connection.project().root.display().to_string();
                connection
                    .log(MessageType::INFO, &format!("serving workspace {}", root))
                    .await?;
                request_settings(connection).await
            }
            "exit" => {
                if !self.shutdown_requested {
                    tracing::warn!("exit without prior shutdown request");
                }
                connection.close().await
            }
            method => {
                tracing::debug!(method, "ignoring notification");
                Ok(())
            }
        }
    }
}

async fn request_settings<T>(connection: &mut Connection<T, Workspace>) -> anyhow::Result<()>
where
    T: LspTransport + 'static,
{
    let params = ConfigurationParams {
        items: vec![ConfigurationItem {
            scope_uri: None,
            section: Some(String::from("lsp_connection")),
        }],
    };
    connection
        .send_request(
            RequestMessage::with_params(serde_json::to_value(params)?),
            "workspace/configuration",
            RequestId::AutoIncrement,
            response_callback(|response, _connection, workspace: Arc<Workspace>| {
                Box::pin(async move {
                    match (response.result, response.error) {
                        (_, Some(error)) => {
                            tracing::warn!(code = error.code, message = %error.message, "configuration request failed")
                        }
                        (Some(result), None) => {
                            workspace.store_settings(result);
                            tracing::debug!(settings = ?workspace.settings(), "workspace settings updated");
                        }
                        (None, None) => {}
                    }
                })
            }),
        )
        .await?;
    Ok(())
}
