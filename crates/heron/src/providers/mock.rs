use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;

use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::{Provider, Usage};

/// A mock provider that returns pre-configured responses for testing, and records
/// the conversation and tools it was shown on every request
pub struct MockProvider {
    responses: Arc<Mutex<Vec<Message>>>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
    tools: Arc<Mutex<Vec<Vec<Tool>>>>,
    repeat_last: bool,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<Message>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requests: Arc::new(Mutex::new(Vec::new())),
            tools: Arc::new(Mutex::new(Vec::new())),
            repeat_last: false,
        }
    }

    /// A provider that answers every request with the same message
    pub fn always(response: Message) -> Self {
        Self {
            repeat_last: true,
            ..Self::new(vec![response])
        }
    }

    /// Shared handle on the histories seen by each completion request
    pub fn requests(&self) -> Arc<Mutex<Vec<Vec<Message>>>> {
        Arc::clone(&self.requests)
    }

    /// Shared handle on the tool declarations sent with each completion request
    pub fn tools(&self) -> Arc<Mutex<Vec<Vec<Tool>>>> {
        Arc::clone(&self.tools)
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, messages: &[Message], tools: &[Tool]) -> Result<(Message, Usage)> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.tools.lock().unwrap().push(tools.to_vec());
        let mut responses = self.responses.lock().unwrap();
        let usage = Usage::new(Some(10), Some(5), Some(15));
        if self.repeat_last && responses.len() == 1 {
            Ok((responses[0].clone(), usage))
        } else if responses.is_empty() {
            // Return empty response if no more pre-configured responses
            Ok((Message::assistant().with_text(""), usage))
        } else {
            Ok((responses.remove(0), usage))
        }
    }
}
