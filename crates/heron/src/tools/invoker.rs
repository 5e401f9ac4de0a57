use tracing::{debug, info, warn};

use super::host::ToolHost;
use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::tool::{ToolCall, ToolResult};

/// Forward one tool call to the tool host as-is. Argument validation is the host's job.
///
/// A transport failure or an empty result is an infrastructure fault rather than
/// something the model could recover from, and so is any content kind we cannot read.
pub async fn invoke(host: &dyn ToolHost, call: &ToolCall) -> AgentResult<ToolResult> {
    info!(tool = %call.name, arguments = %call.arguments, "calling tool");

    let result = host
        .call_tool(call)
        .await
        .map_err(|e| AgentError::ToolExecutionError(format!("{}: {}", call.name, e)))?;

    if result.content.is_empty() {
        return Err(AgentError::ToolExecutionError(format!(
            "{} returned no results",
            call.name
        )));
    }

    if let Some(Content::Unsupported { kind }) = result
        .content
        .iter()
        .find(|content| matches!(content, Content::Unsupported { .. }))
    {
        return Err(AgentError::UnsupportedResultType(format!(
            "{} returned a {} content item",
            call.name, kind
        )));
    }

    if result.is_error {
        warn!(tool = %call.name, "tool reported an error result");
    }
    debug!(
        tool = %call.name,
        kinds = ?result.content.iter().map(Content::kind).collect::<Vec<_>>(),
        "tool returned"
    );

    Ok(result)
}
