//! Conversational LLM relay with token-budgeted memory
//!
//! Each request carries the caller's whole conversation state. The relay
//! picks which turns fit the model's context window, forwards the turn to
//! the backend, and tells the caller when to compress its history into a
//! rolling summary.

pub mod api;
pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod relay;

pub use config::Config;
pub use error::{RelayError, Result};
pub use relay::RelayService;
