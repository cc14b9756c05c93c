use crate::value::CallError;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use thiserror::Error;

/// Why a candidate module could not be loaded
///
/// A shim treats every variant as a recoverable miss. `NotFound` is also
/// the signal a `ModuleSystem` uses to move on to its next loader.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("module not found: {path}")]
    NotFound { path: String },

    #[error("failed to read {file}: {reason}")]
    Io { file: PathBuf, reason: String },

    #[error("malformed module {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error("module {path} failed to initialise: {reason}")]
    InitFailed { path: String, reason: String },
}

impl LoadError {
    pub fn not_found(path: impl ToString) -> Self {
        LoadError::NotFound {
            path: path.to_string(),
        }
    }

    pub fn init_failed(path: impl ToString, reason: impl Into<String>) -> Self {
        LoadError::InitFailed {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LoadError::NotFound { .. })
    }
}

/// Run an initialiser, turning a panic into `LoadError::InitFailed`
pub(crate) fn guard_init<T>(
    path: impl ToString,
    init: impl FnOnce() -> Result<T, LoadError>,
) -> Result<T, LoadError> {
    match panic::catch_unwind(AssertUnwindSafe(init)) {
        Ok(result) => result,
        Err(payload) => {
            let path = path.to_string();
            let message = panic_message(payload.as_ref());
            log::error!("initialiser for {} panicked: {}", path, message);
            Err(LoadError::init_failed(path, format!("panicked: {}", message)))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Errors raised while declaring shims, before any resolution happens
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShimError {
    #[error("invalid module path `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("candidate list must not be empty")]
    EmptyCandidates,

    #[error("private marker must not be empty")]
    EmptyPrivateMarker,
}

/// Errors raised when using names from a resolved surface
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("name `{name}` is not defined{}", format_suggestions(.suggestions))]
    Unbound {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("`{name}` is not callable (found {kind})")]
    NotCallable { name: String, kind: &'static str },

    /// Raised by the bound backend itself; passed through untouched
    #[error(transparent)]
    Backend(#[from] CallError),
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!("; did you mean `{}`?", suggestions.join("`, `"))
    }
}
