//! Everything on the tool side of the conversation: the tool-hosting service client,
//! and the three steps the orchestrator runs against it (catalog, invoke, normalize).
pub mod catalog;
pub mod host;
pub mod invoker;
pub mod mcp;
pub mod normalizer;

#[cfg(test)]
pub mod mock;
