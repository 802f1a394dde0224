//! Plan dispatcher: runs every unit of an execution plan.
//!
//! Units run sequentially in plan order, or concurrently on independent
//! tokio tasks when the plan carries the parallelism preference. Either
//! way, results come back in plan order and a failing unit never aborts
//! its siblings — the failure is converted into an error-flagged message
//! attributed to the failing chain.

use futures::future::join_all;
use tracing::{debug, warn};

use crate::domain::models::{ChatHistory, ChatMessage, ExecutionPlan, ExecutionUnit};

/// Dispatcher for controller-produced execution plans.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainDispatcher;

impl ChainDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Run the whole plan and return the produced messages in plan order.
    /// The caller owns appending them to its history.
    pub async fn dispatch(&self, plan: &ExecutionPlan, history: &ChatHistory) -> Vec<ChatMessage> {
        if plan.is_empty() {
            return Vec::new();
        }
        debug!(
            plan_id = %plan.id(),
            units = plan.len(),
            parallel = plan.is_parallel(),
            "dispatching plan"
        );

        let per_unit: Vec<Vec<ChatMessage>> = if plan.is_parallel() {
            join_all(
                plan.units()
                    .iter()
                    .map(|unit| Self::run_unit(unit, history)),
            )
            .await
        } else {
            let mut results = Vec::with_capacity(plan.len());
            for unit in plan.units() {
                results.push(Self::run_unit(unit, history).await);
            }
            results
        };

        per_unit.into_iter().flatten().collect()
    }

    /// Run one unit, enforcing its budget slice.
    async fn run_unit(unit: &ExecutionUnit, history: &ChatHistory) -> Vec<ChatMessage> {
        let chain = unit.chain();
        if unit.budget().is_expired() {
            warn!(unit = unit.name(), "budget expired before dispatch");
            return vec![
                ChatMessage::chain("budget expired before dispatch")
                    .with_source(chain.name())
                    .as_error(),
            ];
        }

        match chain.execute(history, unit.seed(), unit.budget()).await {
            Ok(messages) => messages,
            Err(error) => {
                warn!(unit = unit.name(), %error, "chain failed");
                vec![
                    ChatMessage::chain(error.to_string())
                        .with_source(chain.name())
                        .as_error(),
                ]
            }
        }
    }
}
