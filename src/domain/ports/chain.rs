//! Port trait for dispatchable specialist chains.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Budget, ChatHistory, ChatMessage};

/// A named, independently invokable processing unit the controller may
/// choose to dispatch.
///
/// The chain's `name` is the unique, case-sensitive source of truth; the
/// controller matches model output against it case-insensitively. How a
/// chain computes its answer is entirely its own concern.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so plans can be dispatched on
/// concurrent tokio tasks.
#[async_trait]
pub trait Chain: Send + Sync {
    /// Unique chain name, e.g. `"web-search"`.
    fn name(&self) -> &str;

    /// Human description shown to the scoring model.
    fn description(&self) -> &str;

    /// Whether this chain accepts a seeded instruction message.
    ///
    /// Default implementation returns `false`.
    fn supports_instructions(&self) -> bool {
        false
    }

    /// Run the chain for one turn.
    ///
    /// # Arguments
    /// * `history` - shared, read-only conversation history
    /// * `seed` - optional instruction message planned by the controller
    /// * `budget` - this dispatch's budget slice; the chain must account
    ///   its consumption here and stop when expired
    ///
    /// # Returns
    /// Zero or more messages to append to the conversation.
    async fn execute(
        &self,
        history: &ChatHistory,
        seed: Option<&ChatMessage>,
        budget: &Budget,
    ) -> DomainResult<Vec<ChatMessage>>;
}
