use crate::errors::{AgentError, AgentResult};
use crate::models::content::{Content, ImageContent};
use crate::models::tool::ToolResult;

/// Appended to the tool message for every image a tool produces. It steers the model
/// away from requesting the same chart again within the run.
pub const CHART_PRODUCED_NOTE: &str =
    "A chart image was produced; no further chart generation is needed for this turn.";

/// A tool result flattened into what goes back into the conversation, plus the image
/// (if any) that is delivered to the caller instead of the model
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResult {
    pub text: String,
    pub image: Option<ImageContent>,
}

/// Concatenate the text items of a result in order. Images never reach the model:
/// each is replaced by [`CHART_PRODUCED_NOTE`] and the last one is kept for the caller.
pub fn normalize(result: &ToolResult) -> AgentResult<NormalizedResult> {
    let mut text = String::new();
    let mut image = None;

    for content in &result.content {
        match content {
            Content::Text(item) => text.push_str(&item.text),
            Content::Image(item) => {
                image = Some(item.clone());
                text.push_str(CHART_PRODUCED_NOTE);
            }
            Content::Unsupported { kind } => {
                return Err(AgentError::UnsupportedResultType(kind.clone()));
            }
        }
    }

    Ok(NormalizedResult { text, image })
}
