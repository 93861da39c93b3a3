//! # patchloop core
//!
//! Domain types, traits, and error definitions for the patchloop coding agent.
//! This crate has **no framework dependencies**: it defines the domain model
//! that the patch engine, checkpoint store, tools, providers and agent loop
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the agent loop is a trait here. Implementations live
//! in their respective crates, so tests can swap any of them for a stub:
//! - `Provider`: the tool-augmented chat completion backend
//! - `Tool`: one capability in the registry
//! - `HostTools`: tools hosted outside the local registry
//! - `WorkspaceFiles`: short-name file lookup for `@name` references

pub mod cancel;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;
pub mod workspace;

// Re-export key types at crate root for ergonomics
pub use cancel::CancellationToken;
pub use error::{Error, ProviderError, Result, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{Conversation, Message, MessageToolCall, Role};
pub use provider::{FinishReason, Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
pub use workspace::{HostTools, NoHostTools, WorkspaceFiles};
