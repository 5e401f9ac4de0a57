use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use eventsource_stream::{Event, Eventsource};
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::host::ToolHost;
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall, ToolResult};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const MCP_URL: &str = "http://mcp_server:9000/sse";

const SESSION_HEADER: &str = "Mcp-Session-Id";

/// How requests and replies travel between us and the MCP server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McpTransport {
    /// Every request is a POST to one endpoint; the reply comes back in the response body
    StreamableHttp,
    /// A GET opens an event stream that announces where to POST requests; replies arrive on the stream
    Sse,
}

impl McpTransport {
    /// Servers speaking the event stream transport publish it under `/sse`
    pub fn detect(url: &Url) -> Self {
        if url.path().trim_end_matches('/').ends_with("/sse") {
            McpTransport::Sse
        } else {
            McpTransport::StreamableHttp
        }
    }
}

#[derive(Debug, Clone)]
pub struct McpToolHostConfig {
    pub url: String,
    pub timeout_secs: u64,
    /// Detected from the URL when unset
    pub transport: Option<McpTransport>,
}

impl Default for McpToolHostConfig {
    fn default() -> Self {
        Self {
            url: MCP_URL.to_string(),
            timeout_secs: 60,
            transport: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

impl<'a> JsonRpcRequest<'a> {
    fn call(id: u64, method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id: Some(id),
            method,
            params: Some(params),
        }
    }

    fn notification(method: &'a str) -> Self {
        Self {
            jsonrpc: "2.0",
            id: None,
            method,
            params: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListToolsResult {
    tools: Vec<McpTool>,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct McpTool {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default = "empty_schema")]
    input_schema: Value,
}

fn empty_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallToolResult {
    #[serde(default)]
    content: Vec<Value>,
    #[serde(default)]
    is_error: bool,
}

type EventStream = BoxStream<'static, Result<Event, String>>;

fn event_stream(response: Response) -> EventStream {
    response
        .bytes_stream()
        .eventsource()
        .map(|event| event.map_err(|e| e.to_string()))
        .boxed()
}

/// State of one short-lived MCP session
struct Session {
    /// Where JSON-RPC messages are POSTed
    endpoint: Url,
    /// Issued by streamable HTTP servers, echoed on every later request
    id: Option<String>,
    /// The open stream replies arrive on, for the event stream transport
    events: Option<EventStream>,
    next_request: u64,
}

impl Session {
    fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            id: None,
            events: None,
            next_request: 0,
        }
    }
}

/// Talks to an MCP server with JSON-RPC, over streamable HTTP or an event stream.
///
/// Every operation runs in a fresh session (`initialize`, `notifications/initialized`,
/// then the request) that is closed once the operation is over, so no connection
/// state outlives a single call.
pub struct McpToolHost {
    client: Client,
    url: Url,
    transport: McpTransport,
}

impl McpToolHost {
    pub fn new(config: McpToolHostConfig) -> Result<Self> {
        let url = Url::parse(&config.url)
            .with_context(|| format!("Invalid tool host URL: {}", config.url))?;
        let transport = config
            .transport
            .unwrap_or_else(|| McpTransport::detect(&url));
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url,
            transport,
        })
    }

    async fn connect(&self) -> Result<Session> {
        let mut session = match self.transport {
            McpTransport::StreamableHttp => Session::new(self.url.clone()),
            McpTransport::Sse => self.open_event_stream().await?,
        };

        if let Err(error) = self.initialize(&mut session).await {
            self.disconnect(session).await;
            return Err(error);
        }
        Ok(session)
    }

    /// Open the event stream and wait for the server to announce its message endpoint
    async fn open_event_stream(&self) -> Result<Session> {
        let response = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!("event stream failed: {}", response.status()));
        }

        let mut events = event_stream(response);
        while let Some(event) = events.next().await {
            let event = event.map_err(|e| anyhow!("Event stream error: {}", e))?;
            if event.event == "endpoint" {
                let endpoint = self
                    .url
                    .join(event.data.trim())
                    .with_context(|| format!("Invalid message endpoint: {}", event.data))?;
                debug!(%endpoint, "tool host announced message endpoint");
                return Ok(Session {
                    events: Some(events),
                    ..Session::new(endpoint)
                });
            }
        }
        Err(anyhow!("Event stream ended before announcing a message endpoint"))
    }

    async fn initialize(&self, session: &mut Session) -> Result<()> {
        let result = self
            .request(
                session,
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "heron",
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            )
            .await?;
        debug!(server = %result["serverInfo"]["name"], session = ?session.id, "connected to tool host");

        self.post(session, &JsonRpcRequest::notification("notifications/initialized"))
            .await?;
        Ok(())
    }

    /// End a session. Streamable HTTP sessions are deleted on the server; an event stream
    /// session ends when its stream is dropped.
    async fn disconnect(&self, session: Session) {
        let Some(id) = session.id else {
            return;
        };

        match self
            .client
            .delete(session.endpoint)
            .header(SESSION_HEADER, &id)
            .send()
            .await
        {
            // 405 means the server does not let clients end sessions
            Ok(response)
                if response.status().is_success()
                    || response.status() == StatusCode::METHOD_NOT_ALLOWED =>
            {
                debug!(session = %id, "closed tool host session");
            }
            Ok(response) => {
                warn!(session = %id, status = %response.status(), "failed to close tool host session");
            }
            Err(error) => {
                warn!(session = %id, %error, "failed to close tool host session");
            }
        }
    }

    async fn post(&self, session: &mut Session, body: &JsonRpcRequest<'_>) -> Result<Response> {
        let mut request = self
            .client
            .post(session.endpoint.clone())
            .header(ACCEPT, "application/json, text/event-stream")
            .json(body);
        if let Some(id) = &session.id {
            request = request.header(SESSION_HEADER, id);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("{} failed: {}", body.method, response.status()));
        }
        Ok(response)
    }

    async fn request(&self, session: &mut Session, method: &str, params: Value) -> Result<Value> {
        let id = session.next_request;
        session.next_request += 1;

        let response = self
            .post(session, &JsonRpcRequest::call(id, method, params))
            .await?;

        let reply = match session.events.as_mut() {
            // The POST is only acknowledged, the reply comes over the open stream
            Some(events) => next_reply(events, id).await?,
            None => {
                if session.id.is_none() {
                    session.id = response
                        .headers()
                        .get(SESSION_HEADER)
                        .and_then(|value| value.to_str().ok())
                        .map(String::from);
                }
                read_reply(response, id).await?
            }
        };

        if let Some(error) = reply.error {
            return Err(anyhow!(
                "{} failed: {} (code {})",
                method,
                error.message,
                error.code
            ));
        }
        reply
            .result
            .ok_or_else(|| anyhow!("{} returned neither a result nor an error", method))
    }

    async fn list_pages(&self, session: &mut Session) -> Result<Vec<Tool>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = match &cursor {
                Some(cursor) => json!({ "cursor": cursor }),
                None => json!({}),
            };
            let result = self.request(session, "tools/list", params).await?;
            let page: ListToolsResult =
                serde_json::from_value(result).context("Malformed tool listing")?;

            tools.extend(page.tools.into_iter().map(|tool| {
                Tool::new(
                    tool.name,
                    tool.description.unwrap_or_default(),
                    tool.input_schema,
                )
            }));

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(tools)
    }

    async fn call(&self, session: &mut Session, call: &ToolCall) -> Result<ToolResult> {
        let result = self
            .request(
                session,
                "tools/call",
                json!({ "name": call.name, "arguments": call.arguments }),
            )
            .await?;
        let result: CallToolResult =
            serde_json::from_value(result).context("Malformed tool result")?;

        let content = result
            .content
            .iter()
            .map(decode_content)
            .collect::<Result<Vec<_>>>()?;

        Ok(ToolResult {
            content,
            is_error: result.is_error,
        })
    }
}

/// Read the reply to request `id`, either a plain JSON body or the matching
/// message of an event stream
async fn read_reply(response: Response, id: u64) -> Result<JsonRpcResponse> {
    let is_event_stream = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/event-stream"));
    if !is_event_stream {
        return response
            .json()
            .await
            .context("Malformed JSON-RPC response");
    }

    next_reply(&mut event_stream(response), id).await
}

async fn next_reply(events: &mut EventStream, id: u64) -> Result<JsonRpcResponse> {
    while let Some(event) = events.next().await {
        let event = event.map_err(|e| anyhow!("Event stream error: {}", e))?;
        if !event.event.is_empty() && event.event != "message" {
            continue;
        }
        // Servers may interleave notifications with the reply
        let Ok(reply) = serde_json::from_str::<JsonRpcResponse>(&event.data) else {
            continue;
        };
        if reply.id.as_ref().and_then(Value::as_u64) == Some(id) {
            return Ok(reply);
        }
    }
    Err(anyhow!("Event stream ended without a reply to request {}", id))
}

/// Decode one MCP content item. Unknown kinds are kept so the caller can reject them.
fn decode_content(item: &Value) -> Result<Content> {
    let kind = item
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("Content item without a type: {}", item))?;

    match kind {
        "text" => {
            let text = item
                .get("text")
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow!("Text content without text"))?;
            Ok(Content::text(text))
        }
        "image" => {
            let data = item
                .get("data")
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow!("Image content without data"))?;
            let mime_type = item
                .get("mimeType")
                .and_then(Value::as_str)
                .unwrap_or("image/png");
            Ok(Content::image(data, mime_type))
        }
        other => Ok(Content::unsupported(other)),
    }
}

#[async_trait]
impl ToolHost for McpToolHost {
    async fn list_tools(&self) -> Result<Vec<Tool>> {
        let mut session = self.connect().await?;
        let result = self.list_pages(&mut session).await;
        self.disconnect(session).await;
        result
    }

    async fn call_tool(&self, call: &ToolCall) -> Result<ToolResult> {
        let mut session = self.connect().await?;
        let result = self.call(&mut session, call).await;
        self.disconnect(session).await;
        result
    }
}
