use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use heron::{
    agent::Agent,
    errors::AgentError,
    models::{message::Message, role::Role},
    providers::openai::OpenAiProvider,
    tools::mcp::McpToolHost,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

// Types matching the incoming JSON structure
#[derive(Debug, Deserialize, Serialize)]
struct ChatRequest {
    messages: Vec<IncomingMessage>,
}

#[derive(Debug, Deserialize, Serialize)]
struct IncomingMessage {
    role: Role,
    content: String,
}

impl From<IncomingMessage> for Message {
    fn from(incoming: IncomingMessage) -> Self {
        Message::new(incoming.role).with_text(incoming.content)
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct ChatResponse {
    role: Role,
    content: String,
    #[serde(rename = "imageUrl")]
    image_url: Option<String>,
}

/// An error reported to the caller as `{"error": <kind>, "details": <message>}`
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    kind: &'static str,
    details: String,
}

impl ApiError {
    fn invalid_request(details: impl ToString) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            kind: "invalid_request",
            details: details.to_string(),
        }
    }

    fn setup(details: impl ToString) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "setup_error",
            details: details.to_string(),
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(error: AgentError) -> Self {
        let status = if error.is_budget_exhausted() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::BAD_GATEWAY
        };
        Self {
            status,
            kind: error.kind(),
            details: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "error": self.kind,
                "details": self.details,
            })),
        )
            .into_response()
    }
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    // Tool messages need the id of the call they answer, which callers cannot supply
    if let Some(index) = request
        .messages
        .iter()
        .position(|message| message.role == Role::Tool)
    {
        return Err(ApiError::invalid_request(format!(
            "message {} has role tool; tool results are produced by the server",
            index
        )));
    }

    let settings = &state.settings;

    // Every request gets its own agent; nothing but configuration outlives it
    let provider = OpenAiProvider::new(settings.provider.to_config()).map_err(ApiError::setup)?;
    let tool_host = McpToolHost::new(settings.tools.to_config()).map_err(ApiError::setup)?;
    let agent = Agent::new(Box::new(provider), Box::new(tool_host))
        .with_max_iterations(settings.agent.max_iterations);

    let messages: Vec<Message> = request.messages.into_iter().map(Message::from).collect();

    let outcome = agent.reply(&messages).await.map_err(|error| {
        tracing::error!("Error processing chat request: {}", error);
        ApiError::from(error)
    })?;

    Ok(Json(ChatResponse {
        role: Role::Assistant,
        content: outcome.text,
        image_url: outcome.image.map(|image| image.data_url()),
    }))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .with_state(state)
}
