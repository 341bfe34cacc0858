//! Error types.
//!
//! Three layers, three types:
//!
//! - [`Fault`] is raised while a join point runs: by the target itself or by
//!   one of its advice handlers. It travels through the error slot of the
//!   invocation context and out to the caller, so it is `Clone`.
//! - [`ConfigurationError`] is raised while the interceptor registry is being
//!   assembled at startup. It never occurs on the request path.
//! - [`Error`] surfaces infrastructure failures: binding to a port, loading
//!   settings, or a registry that refused to build.

use crate::middleware::AdviceKind;

/// A failure raised during an advised invocation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    /// An index was supplied against a collection that does not have it.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    /// An advice handler failed. Remaining advice of the call is skipped.
    #[error("advice `{advice}` failed: {message}")]
    Advice { advice: String, message: String },

    /// Any other failure raised by application code.
    #[error("{0}")]
    Application(String),
}

impl Fault {
    pub fn advice(advice: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Advice { advice: advice.into(), message: message.into() }
    }
}

/// Malformed advice registration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("invalid pointcut `{expression}`: {reason}")]
    InvalidPointcut { expression: String, reason: String },

    #[error("pointcut `{0}()` is not defined")]
    UnknownPointcut(String),

    #[error("pointcut `{0}` is already defined")]
    DuplicatePointcut(String),

    #[error("advice binding `{0}` is already registered")]
    DuplicateBinding(String),

    #[error("advice binding `{binding}` is declared {declared} but its handler takes {handler}")]
    HandlerMismatch {
        binding: String,
        declared: AdviceKind,
        handler: &'static str,
    },
}

/// The error type returned by weft's fallible startup and serving operations.
///
/// Application-level failures are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{0}`")]
    Address(String),

    #[error("configuration: {0}")]
    Config(#[from] ConfigurationError),

    #[error("settings: {0}")]
    Settings(#[from] ::config::ConfigError),
}
