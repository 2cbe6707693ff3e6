// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene error types.

use crate::collision::ItemId;
use crate::config::ConfigError;
use thiserror::Error;
use vpe_graph::GraphError;

/// Errors raised by the scene, its renderer and commands
#[derive(Debug, Error)]
pub enum SceneError {
    /// Rendering into a surface with no pixels
    #[error("Cannot render into a zero-size surface ({width}x{height})")]
    ZeroSizeSurface {
        /// Surface width
        width: u32,
        /// Surface height
        height: u32,
    },

    /// The host handed over something that cannot be drawn into
    #[error("Object is not a drawable surface")]
    InvalidSurface,

    /// A bounding rect was registered twice
    #[error("Bounding rect already registered for {0:?}")]
    DuplicateBoundingRect(ItemId),

    /// Named context command does not exist
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Context command does not apply to what was last clicked
    #[error("Command '{0}' does not apply here")]
    NotApplicable(String),

    /// Context command needs an argument that was not given
    #[error("Command '{0}' needs an argument")]
    MissingArgument(String),

    /// Graph error
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for scene operations
pub type Result<T> = std::result::Result<T, SceneError>;
