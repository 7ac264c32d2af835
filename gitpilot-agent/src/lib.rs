//! # gitpilot agent
//!
//! The agent drives the model <-> repository loop for one user request:
//! 1. The request and the available actions go to the model
//! 2. The model answers with either an action call or a final answer
//! 3. Action calls are dispatched through the registry
//! 4. The result is fed back as an observation and the model is asked again
//! 5. Repeat until a final answer or the step limit
//!
//! [`Session`] wraps the agent in the interactive read/answer loop.

mod agent;
pub mod prompt;
pub mod scratchpad;
pub mod session;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use agent::{Agent, AgentConfig, AgentResult, AgentStyle};
pub use scratchpad::{Observation, Scratchpad};
pub use session::{Session, SessionState, EXIT_KEYWORD};
