//! Core domain models: messages, history, budgets, logs, and plans.

pub mod budget;
pub mod config;
pub mod execution_log;
pub mod history;
pub mod message;
pub mod plan;

pub use budget::{Budget, BudgetError, Consumption};
pub use config::{Config, ControllerSection, LoggingConfig, ModelSection};
pub use execution_log::{ExecutionLog, ExecutionLogEntry};
pub use history::ChatHistory;
pub use message::{ChatMessage, ChatMessageKind, ScoredChatMessage};
pub use plan::{ExecutionPlan, ExecutionUnit, DEFAULT_UNIT_RANK};
