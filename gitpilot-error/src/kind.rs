//! Error kinds for gitpilot operations

use std::fmt;

/// The kind of error that occurred.
///
/// Callers match on the kind to decide what to do: the session loop looks for
/// backend kinds to print a remediation tip, the action layer folds every kind
/// into an error result for the model to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// Invalid configuration or parameters
    ConfigInvalid,

    // =========================================================================
    // Working tree errors
    // =========================================================================
    /// The directory is not inside a git working tree
    NotAWorkingTree,

    /// A path resolves outside the bound working tree
    PathEscapesTree,

    // =========================================================================
    // Version control errors
    // =========================================================================
    /// A git command failed
    VcsFailed,

    /// Stage-all left nothing to commit
    NothingToCommit,

    /// HEAD does not point at a branch
    DetachedHead,

    // =========================================================================
    // Dispatch errors
    // =========================================================================
    /// The model named an action that is not registered
    UnknownAction,

    /// Action arguments were malformed or incomplete
    InvalidArgument,

    /// Model output did not follow the expected grammar
    ParseFailed,

    /// The reasoning loop hit its step bound before answering
    StepLimitExceeded,

    // =========================================================================
    // Inference errors
    // =========================================================================
    /// The model call failed or returned nothing usable
    InferenceFailed,

    /// The inference backend could not be reached
    ProviderUnavailable,

    /// Rate limit exceeded
    RateLimited,

    /// Model is not available on the backend
    ModelNotFound,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigInvalid => "ConfigInvalid",

            ErrorKind::NotAWorkingTree => "NotAWorkingTree",
            ErrorKind::PathEscapesTree => "PathEscapesTree",

            ErrorKind::VcsFailed => "VcsFailed",
            ErrorKind::NothingToCommit => "NothingToCommit",
            ErrorKind::DetachedHead => "DetachedHead",

            ErrorKind::UnknownAction => "UnknownAction",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::ParseFailed => "ParseFailed",
            ErrorKind::StepLimitExceeded => "StepLimitExceeded",

            ErrorKind::InferenceFailed => "InferenceFailed",
            ErrorKind::ProviderUnavailable => "ProviderUnavailable",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::ModelNotFound => "ModelNotFound",

            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::InferenceFailed
                | ErrorKind::RateLimited
                | ErrorKind::ProviderUnavailable
                | ErrorKind::ParseFailed
        )
    }

    /// True for failures of the inference backend itself, as opposed to
    /// failures inside a turn.
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            ErrorKind::ProviderUnavailable | ErrorKind::ModelNotFound | ErrorKind::RateLimited
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
