use log::{error, warn};
use serde::Serialize;
use std::{fmt, io, path::PathBuf};
use thiserror::Error;

/// Everything that can go wrong while staging or processing an item.
#[derive(Debug, Error)]
pub enum ExifError {
    /// The working directory could not be created. Never item scoped.
    #[error(
        "failed to locate storage path {path:?}; create this directory manually or check permissions: {source}"
    )]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Validation(String),

    #[error("exiftool failed: {0}")]
    ToolExecutionFailed(String),

    #[error("{0}")]
    UnsupportedOperation(String),

    #[error("filesystem error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExifError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn tool(message: impl Into<String>) -> Self {
        Self::ToolExecutionFailed(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ExifError::StorageUnavailable { .. } => "StorageUnavailable",
            ExifError::Validation(_) => "ValidationError",
            ExifError::ToolExecutionFailed(_) => "ToolExecutionFailed",
            ExifError::UnsupportedOperation(_) => "UnsupportedOperation",
            ExifError::Io { .. } => "IoError",
        }
    }

    /// Whether the batch may record this error and move on to the next item.
    pub fn is_item_scoped(&self) -> bool {
        !matches!(self, ExifError::StorageUnavailable { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_index: Option<usize>,
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.item_index {
            Some(index) => write!(f, " [item {}]", index),
            None => Ok(()),
        }
    }
}

/// An [`ExifError`] plus the context it was raised in.
///
/// Re-raising merges new context into the existing field instead of wrapping
/// the error again, so an item index is recorded exactly once.
#[derive(Debug, Error)]
#[error("{}{}", .error, .context)]
pub struct NodeError {
    pub error: ExifError,
    pub context: ErrorContext,
}

impl NodeError {
    pub fn with_item_index(mut self, item_index: usize) -> Self {
        self.context.item_index = Some(item_index);
        self
    }

    pub fn item_index(&self) -> Option<usize> {
        self.context.item_index
    }

    pub fn kind(&self) -> &'static str {
        self.error.kind()
    }

    pub fn to_record(&self) -> ErrorRecord {
        ErrorRecord {
            kind: self.kind().to_string(),
            message: self.error.to_string(),
            context: self.context.clone(),
        }
    }
}

impl From<ExifError> for NodeError {
    fn from(error: ExifError) -> Self {
        Self {
            error,
            context: ErrorContext::default(),
        }
    }
}

/// Serialized form of a failure, attached to failed-item records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub kind: String,
    pub message: String,
    #[serde(flatten)]
    pub context: ErrorContext,
}

pub fn handle_error(error: anyhow::Error) -> anyhow::Error {
    error!("{:?}", error);
    error
}

/// Log a secondary failure that must not replace the error being handled.
pub fn log_secondary_error(what: &str, error: &dyn fmt::Display) {
    warn!("{}: {}", what, error);
}
