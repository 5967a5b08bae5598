//! Top-level error type for the service binding layer.

use adapter::{AdaptError, ConfigurationError};
use thiserror::Error;

/// Errors raised while building or invoking a [`Service`](crate::Service).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// A method could not be bound to a callback adapter.
    ///
    /// Produced by `ServiceClient::create`; the service is never built.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Two methods of one service share a name.
    #[error("service `{service}` declares method `{method}` more than once")]
    DuplicateMethod {
        /// The declaring service.
        service: String,
        /// The repeated method name.
        method: String,
    },

    /// An invocation named a method the service does not declare.
    #[error("service `{service}` has no method `{method}`")]
    UnknownMethod {
        /// The service that was invoked.
        service: String,
        /// The requested method name.
        method: String,
    },

    /// The consumer passed to an invocation does not fit the bound strategy.
    #[error(transparent)]
    Adapt(#[from] AdaptError),
}

impl ServiceError {
    /// Returns `true` for errors caused by the service declaration itself.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::DuplicateMethod { .. })
    }
}
