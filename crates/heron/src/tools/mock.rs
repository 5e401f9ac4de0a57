use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::host::ToolHost;
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall, ToolResult};

/// An in-memory tool host with a fixed result per tool, recording every call it receives
#[derive(Default)]
pub struct MockToolHost {
    tools: Vec<(Tool, Vec<Content>)>,
    late_tools: Vec<(Tool, Vec<Content>)>,
    catalog_unavailable: bool,
    calls: Arc<Mutex<Vec<ToolCall>>>,
    catalog_fetches: Arc<AtomicUsize>,
}

impl MockToolHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a tool that always answers with `result`
    pub fn with_tool(mut self, tool: Tool, result: Vec<Content>) -> Self {
        self.tools.push((tool, result));
        self
    }

    /// Offer a tool that only shows up from the second catalog request on
    pub fn with_late_tool(mut self, tool: Tool, result: Vec<Content>) -> Self {
        self.late_tools.push((tool, result));
        self
    }

    /// Make every catalog request fail as if the service were unreachable
    pub fn with_unavailable_catalog(mut self) -> Self {
        self.catalog_unavailable = true;
        self
    }

    /// Shared handle on the calls received so far, in order
    pub fn calls(&self) -> Arc<Mutex<Vec<ToolCall>>> {
        Arc::clone(&self.calls)
    }

    /// Shared counter of catalog requests
    pub fn catalog_fetches(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.catalog_fetches)
    }
}

#[async_trait]
impl ToolHost for MockToolHost {
    async fn list_tools(&self) -> Result<Vec<Tool>> {
        let earlier_fetches = self.catalog_fetches.fetch_add(1, Ordering::SeqCst);
        if self.catalog_unavailable {
            return Err(anyhow!("connection refused"));
        }
        let late_tools = if earlier_fetches > 0 {
            self.late_tools.as_slice()
        } else {
            &[]
        };
        Ok(self
            .tools
            .iter()
            .chain(late_tools)
            .map(|(tool, _)| tool.clone())
            .collect())
    }

    async fn call_tool(&self, call: &ToolCall) -> Result<ToolResult> {
        self.calls.lock().unwrap().push(call.clone());
        self.tools
            .iter()
            .chain(&self.late_tools)
            .find(|(tool, _)| tool.name == call.name)
            .map(|(_, result)| ToolResult::new(result.clone()))
            .ok_or_else(|| anyhow!("Unknown tool: {}", call.name))
    }
}
