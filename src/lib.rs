//! Conclave - LLM-Scored Decision and Dispatch Engine
//!
//! Conclave turns free-text model responses into validated, ordered
//! execution plans. A controller asks a scoring model to rate a set of
//! registered specialist chains against the latest user message, parses
//! the line-oriented reply, self-corrects malformed responses within a
//! bounded retry budget, and emits an execution plan whose units carry
//! their own slice of a hierarchical resource budget.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Messages, budgets, execution logs, plans,
//!   errors, and the ports (`Chain`, `ModelClient`) the engine depends on
//! - **Service Layer** (`services`): The scoring grammar, the decision
//!   controller, and the plan dispatcher
//! - **Infrastructure Layer** (`infrastructure`): OpenAI-compatible model
//!   adapter, configuration loading, logging
//!
//! # Example
//!
//! ```ignore
//! use conclave::{ChainDispatcher, ChatHistory, LlmController};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Build a controller over registered chains, plan, then dispatch.
//!     Ok(())
//! }
//! ```

pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Budget, BudgetError, ChatHistory, ChatMessage, ChatMessageKind, Config, Consumption,
    ControllerSection, ExecutionLog, ExecutionLogEntry, ExecutionPlan, ExecutionUnit,
    LoggingConfig, ModelSection, ScoredChatMessage,
};
pub use domain::ports::{
    Chain, ModelCallOptions, ModelClient, ModelError, ModelMessage, ModelResponse, ModelRole,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::openai::{OpenAiClient, OpenAiClientConfig};
pub use services::{ChainDispatcher, ControllerConfig, LlmController, SpecialistScore};
