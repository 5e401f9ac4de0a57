use anyhow::Result;
use async_trait::async_trait;

use crate::models::tool::{Tool, ToolCall, ToolResult};

/// A service hosting the tools the model may call.
///
/// Implementations only move data; protocol-level checks on what comes back
/// (empty results, unknown content kinds) are made by the caller.
#[async_trait]
pub trait ToolHost: Send + Sync {
    /// List the tools currently offered, in the order the service reports them
    async fn list_tools(&self) -> Result<Vec<Tool>>;

    /// Execute one tool call, returning its content items in order
    async fn call_tool(&self, call: &ToolCall) -> Result<ToolResult>;
}
