//! Infrastructure layer: adapters binding the domain ports to the outside
//! world (HTTP model backends, configuration files, logging).

pub mod config;
pub mod logging;
pub mod openai;
