//! Service layer: the decision engine, its scoring grammar, and the plan
//! dispatcher.

pub mod controller;
pub mod dispatcher;
pub mod scoring;

pub use controller::{ControllerConfig, LlmController};
pub use dispatcher::ChainDispatcher;
pub use scoring::SpecialistScore;
