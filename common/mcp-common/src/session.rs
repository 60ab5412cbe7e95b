//! Protocol session over a line-delimited byte stream
//!
//! One [`Session`] serves one peer from process start until the stream closes.
//! It owns the `initialize` handshake and request/response correlation; every
//! other method is delegated to a [`RequestHandler`].
//!
//! Messages are handled strictly one at a time, so responses leave in the same
//! order their requests arrived. A request never ends the session: malformed
//! input and handler failures become error responses. Only an I/O error on the
//! stream itself stops the loop early.

use std::future::Future;
use std::io;

use rmcp::model::ServerInfo;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};

use crate::error::{invalid_params, invalid_request, parse_error, McpResult, ResultExt};
use crate::protocol::{JsonRpcRequest, JsonRpcResponse, RequestId, JSONRPC_VERSION};
use crate::result::to_result_value;

/// Protocol revisions this session can speak, oldest first
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];

/// Revision offered when the client asks for one we do not know
pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";

/// Longest accepted message line, excluding the newline
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

/// Server side of the protocol, called once the handshake is done
///
/// Handlers are synchronous: the session waits for each call to return before
/// reading the next message.
pub trait RequestHandler {
    /// Identity, capabilities and instructions returned from `initialize`
    fn server_info(&self) -> ServerInfo;

    /// Handle one request. The returned value becomes the JSON-RPC `result`.
    fn handle(&self, method: &str, params: Option<Value>) -> McpResult<Value>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Only `initialize` and `ping` are accepted
    AwaitingInitialize,
    Ready,
}

/// Counters reported when the session ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Responses written, including error responses
    pub responses: u64,
    pub notifications: u64,
    pub errors: u64,
}

/// `initialize` params; everything is optional so odd clients still get in
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ClientHello {
    protocol_version: Option<String>,
    client_info: Option<ClientInfo>,
}

#[derive(Debug, Deserialize)]
struct ClientInfo {
    name: String,
    #[serde(default)]
    version: Option<String>,
}

/// Pick the protocol revision to answer with
pub fn negotiate_protocol_version(requested: Option<&str>) -> &'static str {
    requested
        .and_then(|version| {
            SUPPORTED_PROTOCOL_VERSIONS
                .iter()
                .find(|supported| **supported == version)
                .copied()
        })
        .unwrap_or(LATEST_PROTOCOL_VERSION)
}

/// A single peer session
pub struct Session<H> {
    handler: H,
    state: SessionState,
    stats: SessionStats,
    max_message_bytes: usize,
}

impl<H: RequestHandler> Session<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            state: SessionState::AwaitingInitialize,
            stats: SessionStats::default(),
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }

    /// Answer longer lines with an invalid request error instead of buffering them
    pub fn with_max_message_bytes(mut self, max: usize) -> Self {
        self.max_message_bytes = max;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Handle one raw line from the peer
    ///
    /// Returns the response to write, or `None` for blank lines and
    /// notifications.
    pub fn handle_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Received unparseable message");
                return Some(self.respond(None, Err(parse_error(format!("Parse error: {}", e)))));
            }
        };

        // Recover the id first so even a malformed request gets a correlated answer.
        // A present but null or non-scalar id is malformed, not a notification.
        let id = match value.get("id") {
            None => None,
            Some(raw) => match serde_json::from_value::<RequestId>(raw.clone()) {
                Ok(id) => Some(id),
                Err(_) => {
                    tracing::warn!(id = %raw, "Received request with invalid id");
                    return Some(self.respond(
                        None,
                        Err(invalid_request(format!(
                            "Invalid request id {}: expected a string or an integer",
                            raw
                        ))),
                    ));
                }
            },
        };

        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Received invalid request envelope");
                return Some(self.respond(id, Err(invalid_request(format!("Invalid request: {}", e)))));
            }
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(self.respond(
                request.id,
                Err(invalid_request(format!(
                    "Unsupported jsonrpc version '{}', expected '{}'",
                    request.jsonrpc, JSONRPC_VERSION
                ))),
            ));
        }

        self.handle_request(request)
    }

    /// Handle one parsed message
    pub fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id.clone() else {
            self.on_notification(&request);
            return None;
        };

        tracing::debug!(%id, method = %request.method, "Handling request");

        let outcome = match request.method.as_str() {
            "initialize" => self.initialize(request.params),
            "ping" => Ok(json!({})),
            method if self.state == SessionState::AwaitingInitialize => Err(invalid_request(
                format!("Server not initialized: '{}' received before initialize", method),
            )),
            method => self.handler.handle(method, request.params),
        };

        Some(self.respond(Some(id), outcome))
    }

    fn respond(&mut self, id: Option<RequestId>, outcome: McpResult<Value>) -> JsonRpcResponse {
        self.stats.responses += 1;
        match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => {
                self.stats.errors += 1;
                tracing::debug!(code = error.code.0, message = %error.message, "Request failed");
                JsonRpcResponse::failure(id, error)
            }
        }
    }

    fn initialize(&mut self, params: Option<Value>) -> McpResult<Value> {
        if self.state == SessionState::Ready {
            return Err(invalid_request("Session already initialized"));
        }

        let hello: ClientHello = match params {
            Some(params) => serde_json::from_value(params)
                .map_err(|e| invalid_params(format!("Invalid initialize params: {}", e)))?,
            None => ClientHello::default(),
        };

        let version = negotiate_protocol_version(hello.protocol_version.as_deref());
        let mut result = to_result_value(&self.handler.server_info()).to_mcp_err()?;
        if let Some(fields) = result.as_object_mut() {
            fields.insert("protocolVersion".to_string(), Value::String(version.to_string()));
        }

        let (client, client_version) = match &hello.client_info {
            Some(info) => (info.name.as_str(), info.version.as_deref().unwrap_or("unknown")),
            None => ("unknown", "unknown"),
        };
        tracing::info!(
            client,
            client_version,
            requested = hello.protocol_version.as_deref().unwrap_or("none"),
            protocol_version = version,
            "Session initialized"
        );

        self.state = SessionState::Ready;
        Ok(result)
    }

    fn on_notification(&mut self, request: &JsonRpcRequest) {
        self.stats.notifications += 1;
        match request.method.as_str() {
            "notifications/initialized" => tracing::debug!("Client finished initialization"),
            "notifications/cancelled" => {
                // Requests run to completion before the next line is read, so
                // there is never anything in flight to cancel.
                tracing::debug!("Ignoring cancellation notification")
            }
            other => tracing::debug!(method = other, "Ignoring notification"),
        }
    }

    /// Serve until the peer closes the stream
    pub async fn run<R, W>(self, reader: R, writer: W) -> io::Result<SessionStats>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.run_until(reader, writer, std::future::pending()).await
    }

    /// Serve until the peer closes the stream or `shutdown` resolves
    pub async fn run_until<R, W, S>(
        mut self,
        mut reader: R,
        mut writer: W,
        shutdown: S,
    ) -> io::Result<SessionStats>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            // One byte past the limit tells an oversized line from one that fits exactly.
            let mut limited = (&mut reader).take(self.max_message_bytes as u64 + 1);
            let read = tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, closing session");
                    break;
                }
                read = limited.read_until(b'\n', &mut buf) => read?,
            };

            if read == 0 {
                tracing::info!("Peer closed the stream");
                break;
            }

            let oversized = buf.len() > self.max_message_bytes && buf.last() != Some(&b'\n');
            let response = if oversized {
                discard_line(&mut reader).await?;
                tracing::warn!(max = self.max_message_bytes, "Received oversized message");
                Some(self.respond(
                    None,
                    Err(invalid_request(format!(
                        "Message exceeds {} bytes",
                        self.max_message_bytes
                    ))),
                ))
            } else {
                match std::str::from_utf8(&buf) {
                    Ok(line) => self.handle_line(line),
                    Err(e) => Some(self.respond(
                        None,
                        Err(parse_error(format!("Message is not valid UTF-8: {}", e))),
                    )),
                }
            };

            if let Some(response) = response {
                write_response(&mut writer, &response).await?;
            }
        }

        writer.flush().await?;
        tracing::info!(
            responses = self.stats.responses,
            errors = self.stats.errors,
            notifications = self.stats.notifications,
            "Session ended"
        );
        Ok(self.stats)
    }
}

/// Skip the rest of the current line
async fn discard_line<R>(reader: &mut R) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|byte| *byte == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(());
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

async fn write_response<W>(writer: &mut W, response: &JsonRpcResponse) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut bytes = serde_json::to_vec(response).map_err(io::Error::other)?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await?;
    writer.flush().await
}

/// Serve `handler` over the process's stdin/stdout
pub async fn serve_stdio<H, S>(handler: H, shutdown: S) -> io::Result<SessionStats>
where
    H: RequestHandler,
    S: Future<Output = ()>,
{
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    Session::new(handler).run_until(stdin, stdout, shutdown).await
}

/// Resolves on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
