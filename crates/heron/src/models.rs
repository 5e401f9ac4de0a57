//! These models represent the objects passed around by the orchestrator
//!
//! There are three formats we need to interact with:
//! - caller messages, sent from the chat front end to the server
//! - openai messages/tools, sent from the orchestrator to the LLM
//! - MCP requests and results, exchanged with the tool-hosting service
//!
//! We always immediately convert those data models into the internal structs
//! using to/from helpers, so the internal models are not an exact match to any
//! of these formats.
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
