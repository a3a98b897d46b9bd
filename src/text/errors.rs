use crate::edit::EditError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TextError {
    #[error("invalid substitution pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("{role} marker not found: `{marker}`")]
    MarkerNotFound { role: MarkerRole, marker: String },

    #[error(transparent)]
    Edit(#[from] EditError),
}

/// Which end of a delimited region a marker belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerRole {
    Start,
    End,
}

impl std::fmt::Display for MarkerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarkerRole::Start => write!(f, "start"),
            MarkerRole::End => write!(f, "end"),
        }
    }
}
