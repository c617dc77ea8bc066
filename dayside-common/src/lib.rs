//! # Dayside Common Library
//!
//! Shared code for the Dayside data layer:
//! - Error types and `Result` alias
//! - `Notifier` publish/subscribe primitive
//! - Configuration loading

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{EventFilter, Notifier, SubscriptionId};
