//! Error types for rotation-search.
//!
//! Simulation errors come from provider lookups and hooks; search errors wrap
//! them together with failures of the worker pool itself.

use thiserror::Error;

use crate::sim::NodeId;

/// Errors raised while simulating a node.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("Action not found: {name}")]
    ActionNotFound { name: String },

    #[error("Status effect not found: {name}")]
    EffectNotFound { name: String },

    #[error("Node {id} is no longer attached to the tree")]
    NodeDetached { id: NodeId },

    #[error("Rules provider failed: {message}")]
    Provider { message: String },
}

impl SimError {
    /// Shorthand for a free-form provider failure.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }
}

/// Invalid search configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Configuration field '{field}' must be greater than zero")]
    ZeroCapacity { field: &'static str },
}

/// Errors from the rules registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Rules '{name}' are already registered")]
    Duplicate { name: String },

    #[error("No rules registered under '{name}'")]
    Unknown { name: String },
}

/// Top-level error returned by [`crate::search::Explorer::run`].
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to spawn search worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    #[error("Search unit panicked: {message}")]
    WorkerPanicked { message: String },
}

/// Result alias for simulation operations.
pub type SimResult<T> = Result<T, SimError>;

/// Result alias for search operations.
pub type SearchResult<T> = Result<T, SearchError>;
