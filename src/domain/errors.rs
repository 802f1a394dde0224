//! Domain errors for the Conclave dispatch engine.

use thiserror::Error;

use crate::domain::models::BudgetError;
use crate::domain::ports::ModelError;

/// Domain-level errors surfaced to the controller's caller.
///
/// Recoverable scoring failures never appear here: they are converted into
/// corrective follow-up prompts inside the controller's retry loop. What
/// escapes is fatal by construction, and each condition is distinct so
/// upstream orchestration can decide whether to abort the turn or
/// substitute a default plan.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The model referenced a specialist that does not exist. Never
    /// retried, regardless of remaining retry budget.
    #[error("the specialist `{0}` does not exist")]
    UnknownSpecialist(String),

    /// Multiple specialists were scored when exactly one was required.
    #[error("{0} specialists scored when exactly one was required")]
    AmbiguousSinglePick(usize),

    /// The retry budget reached zero without a successful parse. Carries
    /// the last model response for diagnostics.
    #[error("scoring failed after {attempts} attempts")]
    ExhaustedRetries { attempts: u32, last_response: String },

    /// An external cancellation signal fired mid-call.
    #[error("scoring cancelled by caller")]
    Cancelled,

    /// A non-recoverable model call failure.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A consumption attempt crossed a strict budget ceiling. Propagated
    /// unchanged from the accounting layer.
    #[error(transparent)]
    Budget(#[from] BudgetError),

    /// A dispatched chain failed.
    #[error("chain `{chain}` failed: {reason}")]
    ChainFailed { chain: String, reason: String },

    /// Controller construction rejected its inputs.
    #[error("invalid controller configuration: {0}")]
    InvalidConfiguration(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
