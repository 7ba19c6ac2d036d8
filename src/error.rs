//! Viewer error taxonomy
//!
//! Asset failures are reported and survivable: the scene keeps rendering
//! without the model. Precondition violations indicate mis-sequenced
//! initialization and fail fast in development builds.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    /// An asset could not be loaded or decoded (missing file, OBJ parse
    /// error, image decode error). Non-fatal; the scene continues without
    /// the model.
    #[error("failed to load asset {path:?}: {reason}")]
    LoadFailure { path: PathBuf, reason: String },

    /// A lifecycle step ran before initialization completed.
    #[error("precondition violated: {0}")]
    PreconditionViolation(&'static str),
}

impl ViewerError {
    pub fn load_failure(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::LoadFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
