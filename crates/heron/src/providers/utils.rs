use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};

use crate::errors::AgentError;
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};

lazy_static! {
    static ref INVALID_NAME_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9_-]").unwrap();
    static ref VALID_NAME: Regex = Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Convert internal Message format to OpenAI's API message specification
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        let mut converted = json!({
            "role": message.role
        });

        let text = message.text();
        if !text.is_empty() {
            converted["content"] = json!(text);
        }

        let mut output = Vec::new();

        for content in &message.content {
            match content {
                MessageContent::Text(_) => {}
                MessageContent::ToolRequest(request) => {
                    // A request whose arguments failed to parse ends the run before it could
                    // ever be sent back, so only well formed calls are encoded
                    if let Ok(tool_call) = &request.tool_call {
                        let tool_calls = converted
                            .as_object_mut()
                            .map(|object| object.entry("tool_calls").or_insert(json!([])));
                        if let Some(Value::Array(tool_calls)) = tool_calls {
                            tool_calls.push(json!({
                                "id": request.id,
                                "type": "function",
                                "function": {
                                    "name": sanitize_function_name(&tool_call.name),
                                    "arguments": tool_call.arguments.to_string(),
                                }
                            }));
                        }
                    }
                }
                MessageContent::ToolResponse(response) => {
                    output.push(json!({
                        "role": Role::Tool,
                        "tool_call_id": response.id,
                        "name": response.name,
                        "content": response.text,
                    }));
                }
            }
        }

        // A message made only of tool responses is fully carried by the entries above
        let only_responses = !output.is_empty() && text.is_empty();
        if converted.get("tool_calls").is_some() {
            if text.is_empty() {
                converted["content"] = Value::Null;
            }
            output.insert(0, converted);
        } else if !only_responses {
            if text.is_empty() {
                converted["content"] = json!("");
            }
            output.insert(0, converted);
        }
        messages_spec.extend(output);
    }

    messages_spec
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
            }
        }));
    }

    Ok(result)
}

/// Convert OpenAI's API response to internal Message format
pub fn openai_response_to_message(response: Value) -> Result<Message> {
    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .cloned()
        .ok_or_else(|| anyhow!("No message in completion response"))?;

    let mut message = Message::assistant();

    if let Some(text) = original.get("content").and_then(|text| text.as_str()) {
        message = message.with_text(text);
    }

    if let Some(tool_calls) = original.get("tool_calls").and_then(|calls| calls.as_array()) {
        for tool_call in tool_calls {
            let id = tool_call["id"].as_str().unwrap_or_default().to_string();
            let function_name = tool_call["function"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            let arguments = tool_call["function"]["arguments"]
                .as_str()
                .unwrap_or_default();

            if !is_valid_function_name(&function_name) {
                let error = AgentError::InvalidParameters(format!(
                    "The provided function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
                    function_name
                ));
                message = message.with_tool_request(id, Err(error));
                continue;
            }

            // Some models send an empty string for tools that take no arguments
            let arguments = if arguments.trim().is_empty() { "{}" } else { arguments };
            match serde_json::from_str::<Value>(arguments) {
                Ok(params) => {
                    message =
                        message.with_tool_request(id, Ok(ToolCall::new(&function_name, params)));
                }
                Err(e) => {
                    let error = AgentError::InvalidParameters(format!(
                        "Could not interpret tool use parameters for id {}: {}",
                        id, e
                    ));
                    message = message.with_tool_request(id, Err(error));
                }
            }
        }
    }

    Ok(message)
}

fn sanitize_function_name(name: &str) -> String {
    INVALID_NAME_CHARS.replace_all(name, "_").to_string()
}

fn is_valid_function_name(name: &str) -> bool {
    VALID_NAME.is_match(name)
}

#[derive(Debug, thiserror::Error)]
#[error("Context length exceeded. Message: {0}")]
pub struct ContextLengthExceededError(String);

pub fn check_openai_context_length_error(error: &Value) -> Option<ContextLengthExceededError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ContextLengthExceededError(message))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const OPENAI_TOOL_USE_RESPONSE: &str = r#"{
        "choices": [{
            "role": "assistant",
            "message": {
                "tool_calls": [{
                    "id": "1",
                    "function": {
                        "name": "example_fn",
                        "arguments": "{\"param\": \"value\"}"
                    }
                }]
            }
        }],
        "usage": {
            "input_tokens": 10,
            "output_tokens": 25,
            "total_tokens": 35
        }
    }"#;

    #[test]
    fn test_messages_to_openai_spec() -> Result<()> {
        let message = Message::user().with_text("Hello");
        let spec = messages_to_openai_spec(&[message]);

        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0]["role"], "user");
        assert_eq!(spec[0]["content"], "Hello");
        Ok(())
    }

    #[test]
    fn test_messages_to_openai_spec_tool_round() -> Result<()> {
        let messages = vec![
            Message::system().with_text("You are a data analyst."),
            Message::user().with_text("Show me August sales"),
            Message::assistant().with_tool_request(
                "call_1",
                Ok(ToolCall::new("get_data", json!({"data_source": "sales"}))),
            ),
            Message::tool().with_tool_response("call_1", "get_data", "[{\"amount\": 3}]"),
        ];

        let spec = messages_to_openai_spec(&messages);

        assert_eq!(spec.len(), 4);
        assert_eq!(spec[0]["role"], "system");
        assert_eq!(spec[1]["role"], "user");
        assert_eq!(spec[2]["role"], "assistant");
        assert!(spec[2]["content"].is_null());
        assert_eq!(spec[2]["tool_calls"][0]["id"], "call_1");
        assert_eq!(spec[2]["tool_calls"][0]["type"], "function");
        assert_eq!(spec[2]["tool_calls"][0]["function"]["name"], "get_data");
        assert_eq!(
            spec[2]["tool_calls"][0]["function"]["arguments"],
            "{\"data_source\":\"sales\"}"
        );
        assert_eq!(
            spec[3],
            json!({
                "role": "tool",
                "tool_call_id": "call_1",
                "name": "get_data",
                "content": "[{\"amount\": 3}]"
            })
        );
        Ok(())
    }

    #[test]
    fn test_messages_to_openai_spec_skips_invalid_requests() {
        let message = Message::assistant().with_tool_request(
            "bad",
            Err(AgentError::InvalidParameters("nope".to_string())),
        );
        let spec = messages_to_openai_spec(&[message]);
        assert_eq!(spec, vec![json!({"role": "assistant", "content": ""})]);
    }

    #[test]
    fn test_messages_to_openai_spec_keeps_empty_replies() {
        let messages = vec![
            Message::user().with_text("show me sales"),
            Message::assistant().with_text(""),
            Message::assistant(),
            Message::user().with_text("again please"),
        ];

        let spec = messages_to_openai_spec(&messages);

        assert_eq!(
            spec,
            vec![
                json!({"role": "user", "content": "show me sales"}),
                json!({"role": "assistant", "content": ""}),
                json!({"role": "assistant", "content": ""}),
                json!({"role": "user", "content": "again please"}),
            ]
        );
    }

    #[test]
    fn test_tools_to_openai_spec() -> Result<()> {
        let tool = Tool::new(
            "test_tool",
            "A test tool",
            json!({
                "type": "object",
                "properties": {
                    "input": {
                        "type": "string",
                        "description": "Test parameter"
                    }
                },
                "required": ["input"]
            }),
        );

        let spec = tools_to_openai_spec(&[tool])?;

        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0]["type"], "function");
        assert_eq!(spec[0]["function"]["name"], "test_tool");
        assert_eq!(spec[0]["function"]["description"], "A test tool");
        assert_eq!(spec[0]["function"]["parameters"]["required"][0], "input");
        Ok(())
    }

    #[test]
    fn test_tools_to_openai_spec_duplicate() {
        let tool = Tool::new("test_tool", "Test tool", json!({"type": "object"}));
        let result = tools_to_openai_spec(&[tool.clone(), tool]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Duplicate tool name"));
    }

    #[test]
    fn test_sanitize_function_name() {
        assert_eq!(sanitize_function_name("hello-world"), "hello-world");
        assert_eq!(sanitize_function_name("hello world"), "hello_world");
        assert_eq!(sanitize_function_name("hello@world"), "hello_world");
    }

    #[test]
    fn test_is_valid_function_name() {
        assert!(is_valid_function_name("hello-world"));
        assert!(is_valid_function_name("hello_world"));
        assert!(!is_valid_function_name("hello world"));
        assert!(!is_valid_function_name("hello@world"));
    }

    #[test]
    fn test_openai_response_to_message_text() -> Result<()> {
        let response = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "August sales were strong."
                }
            }]
        });

        let message = openai_response_to_message(response)?;
        assert_eq!(message.content.len(), 1);
        assert_eq!(message.text(), "August sales were strong.");
        assert_eq!(message.role, Role::Assistant);
        assert!(!message.has_tool_requests());
        Ok(())
    }

    #[test]
    fn test_openai_response_to_message_valid_toolrequest() -> Result<()> {
        let response: Value = serde_json::from_str(OPENAI_TOOL_USE_RESPONSE)?;
        let message = openai_response_to_message(response)?;

        assert_eq!(message.content.len(), 1);
        let request = message.content[0].as_tool_request().unwrap();
        let tool_call = request.tool_call.as_ref().unwrap();
        assert_eq!(request.id, "1");
        assert_eq!(tool_call.name, "example_fn");
        assert_eq!(tool_call.arguments, json!({"param": "value"}));
        Ok(())
    }

    #[test]
    fn test_openai_response_to_message_empty_arguments() -> Result<()> {
        let mut response: Value = serde_json::from_str(OPENAI_TOOL_USE_RESPONSE)?;
        response["choices"][0]["message"]["tool_calls"][0]["function"]["arguments"] = json!("");

        let message = openai_response_to_message(response)?;
        let request = message.content[0].as_tool_request().unwrap();
        assert_eq!(request.tool_call.as_ref().unwrap().arguments, json!({}));
        Ok(())
    }

    #[test]
    fn test_openai_response_to_message_invalid_func_name() -> Result<()> {
        let mut response: Value = serde_json::from_str(OPENAI_TOOL_USE_RESPONSE)?;
        response["choices"][0]["message"]["tool_calls"][0]["function"]["name"] =
            json!("invalid fn");

        let message = openai_response_to_message(response)?;
        let request = message.content[0].as_tool_request().unwrap();
        match &request.tool_call {
            Err(AgentError::InvalidParameters(msg)) => {
                assert!(msg.starts_with("The provided function name"));
            }
            _ => panic!("Expected InvalidParameters error"),
        }
        Ok(())
    }

    #[test]
    fn test_openai_response_to_message_json_decode_error() -> Result<()> {
        let mut response: Value = serde_json::from_str(OPENAI_TOOL_USE_RESPONSE)?;
        response["choices"][0]["message"]["tool_calls"][0]["function"]["arguments"] =
            json!("invalid json {");

        let message = openai_response_to_message(response)?;
        let request = message.content[0].as_tool_request().unwrap();
        match &request.tool_call {
            Err(AgentError::InvalidParameters(msg)) => {
                assert!(msg.starts_with("Could not interpret tool use parameters"));
            }
            _ => panic!("Expected InvalidParameters error"),
        }
        Ok(())
    }

    #[test]
    fn test_openai_response_without_choices() {
        let result = openai_response_to_message(json!({"choices": []}));
        assert!(result.is_err());
    }

    #[test]
    fn test_check_openai_context_length_error() {
        let error = json!({
            "code": "context_length_exceeded",
            "message": "This message is too long"
        });

        let result = check_openai_context_length_error(&error);
        assert_eq!(
            result.unwrap().to_string(),
            "Context length exceeded. Message: This message is too long"
        );

        let error = json!({
            "code": "other_error",
            "message": "Some other error"
        });
        assert!(check_openai_context_length_error(&error).is_none());
    }
}
