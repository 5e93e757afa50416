//! Error types for integration misuse.
//!
//! Data validity problems (self-intersection, area bounds, malformed
//! geometry) are never reported through [`DrawError`]; they are returned as
//! [`Validation`](crate::validation::Validation) values instead.

use crate::feature::{FeatureId, GeometryType};
use crate::modes::ModeState;
use thiserror::Error;

/// Programmer and state errors. These are fatal to the call that raised them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DrawError {
    #[error("GeoDraw is not enabled, call start() first")]
    NotEnabled,
    #[error("No mode registered with name '{0}'")]
    UnknownMode(String),
    #[error("Mode name '{0}' is registered more than once")]
    DuplicateModeName(String),
    #[error("Only one select mode can be registered, found {0}")]
    MultipleSelectModes(usize),
    #[error("No select mode is registered")]
    NoSelectMode,
    #[error("Feature {0} already exists in the store")]
    DuplicateFeatureId(FeatureId),
    #[error("Feature {0} does not exist in the store")]
    FeatureNotFound(FeatureId),
    #[error("Feature id {0} is not valid for the configured id strategy")]
    InvalidFeatureId(FeatureId),
    #[error("Feature {id} is a {expected}, cannot replace its geometry with a {actual}")]
    GeometryTypeMismatch {
        id: FeatureId,
        expected: GeometryType,
        actual: GeometryType,
    },
    #[error("Mode '{mode}' cannot move from {from} to {to}")]
    InvalidModeState {
        mode: String,
        from: ModeState,
        to: ModeState,
    },
    #[error("Invalid options for mode '{mode}': {reason}")]
    InvalidOptions { mode: String, reason: String },
}

/// Result type for engine operations.
pub type DrawResult<T> = Result<T, DrawError>;
