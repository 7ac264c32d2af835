//! # gitpilot core
//!
//! Everything between the model and the repository.
//!
//! ## Core Concepts
//! - **Workspace**: one bound git working tree and the side effects allowed in it
//! - **Actions**: typed `write_file` / `read_file` / `commit_changes` calls with a
//!   uniform [`ActionResult`]
//! - **Registry**: the fixed action set, its descriptions, and dispatch
//! - **ReAct parser**: explicit grammar for text-style model output
//! - **Provider**: trait-based LLM communication (Ollama)

pub mod action;
pub mod error;
pub mod git;
pub mod provider;
pub mod react;
pub mod registry;
pub mod workspace;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use action::{
    Action, ActionKind, ActionResult, ActionStatus, CommitArgs, ReadFileArgs, WriteFileArgs,
};
pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use git::Git;
pub use provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider,
    OllamaProvider, ProviderConfig, ProviderError, Role, ToolCall, ToolDefinition, Usage,
    UsageTracker,
};
pub use react::{ParseError, ReactStep};
pub use registry::{ActionDescriptor, ActionRegistry, ParamSpec};
pub use workspace::Workspace;
