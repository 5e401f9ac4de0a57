use std::collections::HashSet;
use tracing::debug;

use super::host::ToolHost;
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::Tool;

/// Fetch the current tool catalog as declarations for the completion request.
///
/// The catalog is never cached, tools may come and go between turns. An unreachable
/// service and a listing we could not send on to the model both count as unavailable.
pub async fn fetch_catalog(host: &dyn ToolHost) -> AgentResult<Vec<Tool>> {
    let tools = host
        .list_tools()
        .await
        .map_err(|e| AgentError::CatalogUnavailable(e.to_string()))?;

    let mut names = HashSet::new();
    for tool in &tools {
        if tool.name.is_empty() {
            return Err(AgentError::CatalogUnavailable(
                "listing contains a tool without a name".to_string(),
            ));
        }
        if !names.insert(tool.name.as_str()) {
            return Err(AgentError::CatalogUnavailable(format!(
                "listing contains duplicate tool {}",
                tool.name
            )));
        }
        if !tool.input_schema.is_object() {
            return Err(AgentError::CatalogUnavailable(format!(
                "tool {} has a non-object argument schema",
                tool.name
            )));
        }
    }

    debug!(tools = ?names, "fetched tool catalog");
    Ok(tools)
}
