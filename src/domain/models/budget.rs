//! Hierarchical resource budgets and consumption accounting.
//!
//! A [`Budget`] bounds how much resource (wall time, tokens, calls) one
//! logical unit of work and everything it triggers may consume, and records
//! what was actually consumed. Budgets nest: [`Budget::child`] captures an
//! explicit parent handle, and every consumption recorded on a child is
//! also accumulated on each ancestor, so the root ledger always reflects
//! the whole call subtree.
//!
//! Accounting is safe under concurrent dispatch workers: ledger updates are
//! atomic check-and-add operations, and expiry is sticky — once a budget
//! has been observed expired it never reports unexpired again.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors raised by the accounting API.
#[derive(Debug, Error)]
pub enum BudgetError {
    #[error("negative consumption rejected: {quantity} {unit} ({kind})")]
    NegativeQuantity {
        quantity: f64,
        unit: String,
        kind: String,
    },

    #[error("budget exceeded for {unit} ({kind}): requested {requested}, remaining {remaining}")]
    Exceeded {
        unit: String,
        kind: String,
        requested: f64,
        remaining: f64,
    },
}

/// One accounted use of a named, dimensioned resource.
///
/// `unit` names what is counted ("token", "call", "second"); `kind` is the
/// dimension label, e.g. `"gpt-4o:prompt_tokens"`.
#[derive(Debug, Clone, PartialEq)]
pub struct Consumption {
    quantity: f64,
    unit: String,
    kind: String,
}

impl Consumption {
    pub fn new(quantity: f64, unit: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            quantity,
            unit: unit.into(),
            kind: kind.into(),
        }
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }
}

impl fmt::Display for Consumption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.quantity, self.unit, self.kind)
    }
}

type LedgerKey = (String, String);

#[derive(Debug)]
struct BudgetNode {
    deadline: Option<Instant>,
    /// Strict ceilings per (unit, kind). Empty means unlimited.
    ceilings: BTreeMap<LedgerKey, f64>,
    ledger: Mutex<BTreeMap<LedgerKey, f64>>,
    expired: AtomicBool,
    infinite: bool,
    /// Explicit handle to the parent, captured at child-creation time.
    parent: Option<Budget>,
}

/// Resource ceiling and consumption ledger for one logical unit of work.
///
/// Cheap to clone; clones share the same ledger.
#[derive(Debug, Clone)]
pub struct Budget {
    node: Arc<BudgetNode>,
}

impl Budget {
    /// A budget that expires once `duration` has elapsed.
    pub fn new(duration: Duration) -> Self {
        Self::build(Some(Instant::now() + duration), BTreeMap::new(), false, None)
    }

    /// A duration-bounded budget with strict per-dimension ceilings.
    pub fn with_limits(duration: Duration, limits: Vec<Consumption>) -> Self {
        let ceilings = limits
            .into_iter()
            .map(|c| ((c.unit, c.kind), c.quantity))
            .collect();
        Self::build(Some(Instant::now() + duration), ceilings, false, None)
    }

    /// A budget that never expires and never rejects a consumption on
    /// ceiling grounds. Intended for contexts with no external resource
    /// ceiling, such as unit tests.
    pub fn infinite() -> Self {
        Self::build(None, BTreeMap::new(), true, None)
    }

    fn build(
        deadline: Option<Instant>,
        ceilings: BTreeMap<LedgerKey, f64>,
        infinite: bool,
        parent: Option<Budget>,
    ) -> Self {
        Self {
            node: Arc::new(BudgetNode {
                deadline,
                ceilings,
                ledger: Mutex::new(BTreeMap::new()),
                expired: AtomicBool::new(false),
                infinite,
                parent,
            }),
        }
    }

    /// Create a nested budget whose remaining allowance cannot exceed this
    /// budget's remaining allowance. Consumption recorded on the child is
    /// also reflected here and in every further ancestor.
    pub fn child(&self) -> Self {
        if self.node.infinite {
            return Self::build(None, BTreeMap::new(), true, Some(self.clone()));
        }
        Self::build(
            self.node.deadline,
            self.remaining_ceilings(),
            false,
            Some(self.clone()),
        )
    }

    /// Like [`child`](Self::child), but additionally bounded by `duration`.
    /// The child's deadline is the earlier of the parent's deadline and
    /// `now + duration`.
    pub fn child_with_duration(&self, duration: Duration) -> Self {
        let own = Instant::now() + duration;
        let deadline = match self.node.deadline {
            Some(parent_deadline) => Some(parent_deadline.min(own)),
            None => Some(own),
        };
        let ceilings = if self.node.infinite {
            BTreeMap::new()
        } else {
            self.remaining_ceilings()
        };
        Self::build(deadline, ceilings, false, Some(self.clone()))
    }

    /// True once the deadline has passed or, for non-infinite budgets, once
    /// a ceiling is exhausted. Conservative: never reports unexpired after
    /// having reported expired.
    pub fn is_expired(&self) -> bool {
        if self.node.infinite {
            return false;
        }
        if self.node.expired.load(Ordering::Relaxed) {
            return true;
        }
        let deadline_passed = self
            .node
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline);
        let ceiling_exhausted = {
            let ledger = self.lock_ledger();
            self.node
                .ceilings
                .iter()
                .any(|(key, ceiling)| ledger.get(key).copied().unwrap_or(0.0) >= *ceiling)
        };
        if deadline_passed || ceiling_exhausted {
            self.node.expired.store(true, Ordering::Relaxed);
            return true;
        }
        false
    }

    /// Time left before the deadline, or `None` for deadline-free budgets.
    pub fn remaining_duration(&self) -> Option<Duration> {
        self.node
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// True if `quantity` more of `(unit, kind)` would fit under the ceiling.
    pub fn can_consume(&self, quantity: f64, unit: &str, kind: &str) -> bool {
        if self.node.infinite {
            return true;
        }
        let key = (unit.to_string(), kind.to_string());
        match self.node.ceilings.get(&key) {
            Some(&ceiling) => {
                let current = self.lock_ledger().get(&key).copied().unwrap_or(0.0);
                current + quantity <= ceiling
            }
            None => true,
        }
    }

    /// Record a consumption against this budget and every ancestor.
    ///
    /// Fails with [`BudgetError::NegativeQuantity`] for negative quantities
    /// and [`BudgetError::Exceeded`] when a strict ceiling would be crossed;
    /// an exceeding attempt records nothing anywhere.
    pub fn add_consumption(
        &self,
        quantity: f64,
        unit: &str,
        kind: &str,
    ) -> Result<(), BudgetError> {
        if quantity < 0.0 {
            return Err(BudgetError::NegativeQuantity {
                quantity,
                unit: unit.to_string(),
                kind: kind.to_string(),
            });
        }
        let key = (unit.to_string(), kind.to_string());
        {
            let mut ledger = self.lock_ledger();
            if !self.node.infinite {
                if let Some(&ceiling) = self.node.ceilings.get(&key) {
                    let current = ledger.get(&key).copied().unwrap_or(0.0);
                    if current + quantity > ceiling {
                        return Err(BudgetError::Exceeded {
                            unit: unit.to_string(),
                            kind: kind.to_string(),
                            requested: quantity,
                            remaining: (ceiling - current).max(0.0),
                        });
                    }
                }
            }
            *ledger.entry(key.clone()).or_insert(0.0) += quantity;
        }

        // Aggregate upward. Ancestors accumulate without re-checking their
        // ceilings: the child's allowance was clamped at creation time.
        let mut ancestor = self.node.parent.clone();
        while let Some(budget) = ancestor {
            {
                let mut ledger = budget.lock_ledger();
                *ledger.entry(key.clone()).or_insert(0.0) += quantity;
            }
            ancestor = budget.node.parent.clone();
        }
        Ok(())
    }

    /// Record a prepared [`Consumption`].
    pub fn add(&self, consumption: &Consumption) -> Result<(), BudgetError> {
        self.add_consumption(consumption.quantity, &consumption.unit, &consumption.kind)
    }

    /// Aggregate consumption for one (unit, kind) pair, including everything
    /// recorded by descendants.
    pub fn consumption_value(&self, unit: &str, kind: &str) -> f64 {
        let key = (unit.to_string(), kind.to_string());
        self.lock_ledger().get(&key).copied().unwrap_or(0.0)
    }

    /// Snapshot of the full ledger, ordered by (unit, kind).
    pub fn consumptions(&self) -> Vec<Consumption> {
        self.lock_ledger()
            .iter()
            .map(|((unit, kind), quantity)| Consumption::new(*quantity, unit.clone(), kind.clone()))
            .collect()
    }

    fn remaining_ceilings(&self) -> BTreeMap<LedgerKey, f64> {
        let ledger = self.lock_ledger();
        self.node
            .ceilings
            .iter()
            .map(|(key, ceiling)| {
                let consumed = ledger.get(key).copied().unwrap_or(0.0);
                (key.clone(), (ceiling - consumed).max(0.0))
            })
            .collect()
    }

    fn lock_ledger(&self) -> MutexGuard<'_, BTreeMap<LedgerKey, f64>> {
        self.node
            .ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
