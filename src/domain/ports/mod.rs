//! Port traits consumed by the decision engine.

pub mod chain;
pub mod model_client;

pub use chain::Chain;
pub use model_client::{
    ModelCallOptions, ModelClient, ModelError, ModelMessage, ModelResponse, ModelRole,
};
