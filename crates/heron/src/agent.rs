use tracing::{debug, info, warn};

use crate::errors::{AgentError, AgentResult};
use crate::models::content::ImageContent;
use crate::models::message::Message;
use crate::providers::base::{Provider, Usage};
use crate::tools::catalog::fetch_catalog;
use crate::tools::host::ToolHost;
use crate::tools::invoker::invoke;
use crate::tools::normalizer::normalize;

/// Completion requests allowed per run before the model is considered stuck
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// The answer of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Text of the model's final, tool-free message
    pub text: String,
    /// Last image produced by the most recent round of tool calls
    pub image: Option<ImageContent>,
    /// Token usage summed over every completion request of the run
    pub usage: Usage,
    /// Number of completion requests made
    pub completions: usize,
}

/// Where a run currently is. `Done` and `Failed` are terminal.
#[derive(Debug)]
enum RunState {
    AwaitingCompletion,
    ExecutingTools(Message),
    Done(Outcome),
    Failed(AgentError),
}

impl RunState {
    fn name(&self) -> &'static str {
        match self {
            RunState::AwaitingCompletion => "awaiting_completion",
            RunState::ExecutingTools(_) => "executing_tools",
            RunState::Done(_) => "done",
            RunState::Failed(_) => "failed",
        }
    }
}

/// The state owned by a single orchestration run. Nothing here is shared between runs.
struct Run<'a> {
    agent: &'a Agent,
    history: Vec<Message>,
    remaining: usize,
    pending_image: Option<ImageContent>,
    usage: Usage,
    completions: usize,
}

impl<'a> Run<'a> {
    fn new(agent: &'a Agent, messages: &[Message]) -> Self {
        Self {
            agent,
            history: messages.to_vec(),
            remaining: agent.max_iterations,
            pending_image: None,
            usage: Usage::default(),
            completions: 0,
        }
    }

    async fn step(&mut self, state: RunState) -> RunState {
        match state {
            RunState::AwaitingCompletion => {
                if self.remaining == 0 {
                    return RunState::Failed(AgentError::IterationBudgetExceeded(
                        self.agent.max_iterations,
                    ));
                }
                self.remaining -= 1;

                match self.request_completion().await {
                    Ok(response) if response.has_tool_requests() => {
                        RunState::ExecutingTools(response)
                    }
                    Ok(response) => RunState::Done(Outcome {
                        text: response.text(),
                        image: self.pending_image.take(),
                        usage: self.usage.clone(),
                        completions: self.completions,
                    }),
                    Err(error) => RunState::Failed(error),
                }
            }
            RunState::ExecutingTools(response) => match self.execute_tools(response).await {
                Ok(()) => RunState::AwaitingCompletion,
                Err(error) => RunState::Failed(error),
            },
            terminal => terminal,
        }
    }

    async fn request_completion(&mut self) -> AgentResult<Message> {
        let tools = fetch_catalog(self.agent.tool_host.as_ref()).await?;

        self.completions += 1;
        let (response, usage) = self
            .agent
            .provider
            .complete(&self.history, &tools)
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;
        self.usage.accumulate(&usage);

        debug!(
            completion = self.completions,
            remaining = self.remaining,
            tool_calls = response.tool_requests().len(),
            input_tokens = ?usage.input_tokens,
            output_tokens = ?usage.output_tokens,
            "received completion"
        );
        Ok(response)
    }

    /// Resolve every tool request of `response` in emission order, appending one tool
    /// message per request
    async fn execute_tools(&mut self, response: Message) -> AgentResult<()> {
        // Only the latest round's image may reach the caller
        self.pending_image = None;

        let requests: Vec<_> = response.tool_requests().into_iter().cloned().collect();
        self.history.push(response);

        for request in requests {
            let call = request.tool_call?;
            let result = invoke(self.agent.tool_host.as_ref(), &call).await?;
            let normalized = normalize(&result)?;

            if let Some(image) = normalized.image {
                self.pending_image = Some(image);
            }
            self.history
                .push(Message::tool().with_tool_response(request.id, call.name, normalized.text));
        }
        Ok(())
    }
}

/// Agent drives a conversation between a completion endpoint and a tool host
pub struct Agent {
    provider: Box<dyn Provider>,
    tool_host: Box<dyn ToolHost>,
    max_iterations: usize,
}

impl Agent {
    /// Create a new Agent with the default iteration bound
    pub fn new(provider: Box<dyn Provider>, tool_host: Box<dyn ToolHost>) -> Self {
        Self {
            provider,
            tool_host,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Set the maximum number of completion requests per run
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Run the conversation until the model answers without calling tools.
    ///
    /// The first fatal condition ends the run; the history built up until then is dropped.
    pub async fn reply(&self, messages: &[Message]) -> AgentResult<Outcome> {
        info!(
            messages = messages.len(),
            max_iterations = self.max_iterations,
            "starting orchestration run"
        );

        let mut run = Run::new(self, messages);
        let mut state = RunState::AwaitingCompletion;
        loop {
            state = match run.step(state).await {
                RunState::Done(outcome) => {
                    info!(
                        completions = outcome.completions,
                        image = outcome.image.is_some(),
                        "orchestration run finished"
                    );
                    return Ok(outcome);
                }
                RunState::Failed(error) => {
                    warn!(kind = error.kind(), %error, "orchestration run failed");
                    return Err(error);
                }
                next => {
                    debug!(state = next.name(), remaining = run.remaining, "run state changed");
                    next
                }
            };
        }
    }
}
