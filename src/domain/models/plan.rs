//! Execution units and plans — the contract between controller and
//! dispatcher.

use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use super::budget::Budget;
use super::message::ChatMessage;
use crate::domain::ports::Chain;

/// Rank shared by all units of a plain controller plan: every unit is a
/// peer unless an extension assigns finer-grained ranks.
pub const DEFAULT_UNIT_RANK: u32 = 0;

/// One planned dispatch of a chain.
///
/// Pure data carrier: the dispatcher treats it as opaque except for the
/// target, budget slice, seed message, and rank.
#[derive(Clone)]
pub struct ExecutionUnit {
    chain: Arc<dyn Chain>,
    budget: Budget,
    seed: Option<ChatMessage>,
    name: String,
    rank: u32,
}

impl ExecutionUnit {
    pub fn new(
        chain: Arc<dyn Chain>,
        budget: Budget,
        seed: Option<ChatMessage>,
        name: impl Into<String>,
        rank: u32,
    ) -> Self {
        Self {
            chain,
            budget,
            seed,
            name: name.into(),
            rank,
        }
    }

    /// Target chain to invoke.
    pub fn chain(&self) -> &Arc<dyn Chain> {
        &self.chain
    }

    /// This dispatch's slice of the caller's budget.
    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    /// Optional instruction message to seed the chain with.
    pub fn seed(&self) -> Option<&ChatMessage> {
        self.seed.as_ref()
    }

    /// Display name, e.g. `"web-search;8"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tie-break order among equally scored units.
    pub fn rank(&self) -> u32 {
        self.rank
    }
}

impl fmt::Debug for ExecutionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionUnit")
            .field("chain", &self.chain.name())
            .field("name", &self.name)
            .field("rank", &self.rank)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

/// Ordered list of execution units produced by one controller invocation.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    id: Uuid,
    units: Vec<ExecutionUnit>,
    parallelism: bool,
}

impl ExecutionPlan {
    pub fn new(units: Vec<ExecutionUnit>, parallelism: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            units,
            parallelism,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), false)
    }

    /// Plan identifier, for tracing.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn units(&self) -> &[ExecutionUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Advisory flag for the dispatcher; the controller never acts on it.
    pub fn is_parallel(&self) -> bool {
        self.parallelism
    }
}
