//! Error types for the filter engine.

use thiserror::Error;

/// A specialized Result type for filter engine operations.
pub type FilterResult<T> = Result<T, FilterError>;

/// Errors that can occur while configuring or binding the filter engine.
///
/// Row evaluation itself never fails: malformed input simply makes a row
/// non-matching. These errors only surface from setup calls.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    /// An operator token was not recognized.
    #[error("unknown filter operator: {operator}")]
    UnknownOperator {
        /// The unrecognized operator token.
        operator: String,
    },

    /// `bind` was called before `init`.
    #[error("filter coordinator is not initialized, call init() with a grid first")]
    NotInitialized,

    /// `bind` was called twice on the same coordinator.
    #[error("filter coordinator is already bound to a data view")]
    AlreadyBound,

    /// Remote filtering was configured but no tokio runtime is available.
    #[error("remote filtering requires a running tokio runtime")]
    NoRuntime,
}

impl FilterError {
    /// Creates an unknown operator error.
    pub fn unknown_operator(operator: impl Into<String>) -> Self {
        FilterError::UnknownOperator {
            operator: operator.into(),
        }
    }
}
