//! Error types for declaration-time resolution and invocation-time bridging.
//!
//! Two classes of failure exist and they never mix:
//!
//! - **Configuration errors** ([`TypeError`], [`FactoryError`],
//!   [`ConfigurationError`]) are raised while a service is being bound. The
//!   declaration has to be fixed; nothing retries them.
//! - **Call outcomes** ([`CallError`]) are produced by the transport and are
//!   forwarded to the consumer's failure hook untouched.
//!
//! [`AdaptError`] sits between the two: it reports a consumer value whose
//! runtime shape does not match the strategy that was resolved for it, which
//! only happens when the binding layer itself is miswired.

use std::fmt::Write as _;

use thiserror::Error;

use crate::types::DeclaredType;

// ---------------------------------------------------------------------------
// Type model errors
// ---------------------------------------------------------------------------

/// Failure of a pure operation over the [`DeclaredType`] model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// A bound was requested from a type that has no type arguments.
    #[error("`{declared}` is not parameterized")]
    NotParameterized {
        /// The offending type.
        declared: DeclaredType,
    },

    /// A bound was requested for an argument position that does not exist.
    #[error("index {index} not in range [0,{len}) for `{declared}`")]
    IndexOutOfRange {
        /// Requested argument position.
        index: usize,
        /// Number of type arguments `declared` actually has.
        len: usize,
        /// The offending type.
        declared: DeclaredType,
    },

    /// A lower bound was requested for `?` or `? extends X`.
    #[error("type argument {index} of `{declared}` has no lower bound")]
    NoLowerBound {
        /// Requested argument position.
        index: usize,
        /// The offending type.
        declared: DeclaredType,
    },

    /// Declared-type text could not be parsed.
    #[error("invalid type `{input}` at byte {position}: {message}")]
    Parse {
        /// The full input text.
        input: String,
        /// Byte offset at which parsing stopped.
        position: usize,
        /// What the parser expected.
        message: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Factory errors
// ---------------------------------------------------------------------------

/// Raised by a factory that recognised a declaration as its own but found it
/// malformed.
///
/// Returning this stops resolution: later factories are never consulted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactoryError {
    /// The declaration has the right shape but is unusable as written.
    #[error("{message}")]
    Malformed {
        /// The offending consumer type.
        declared: DeclaredType,
        /// What the factory requires instead.
        message: String,
    },

    /// A bound helper failed on the declared type.
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl FactoryError {
    /// Convenience constructor for [`FactoryError::Malformed`].
    pub fn malformed(declared: &DeclaredType, message: impl Into<String>) -> Self {
        Self::Malformed {
            declared: declared.clone(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// A method declaration could not be bound to a callback adapter.
///
/// Always produced while the service is being built, never during a call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A factory claimed the declaration and then rejected it.
    #[error("{method}: callback adapter factory `{factory}` rejected `{callback_type}`: {source}")]
    Rejected {
        /// The method being bound (`Service.method`).
        method: String,
        /// Name of the factory that raised the error.
        factory: String,
        /// The declared consumer type.
        callback_type: DeclaredType,
        /// The factory's reason.
        #[source]
        source: FactoryError,
    },

    /// Every registered factory declined the declaration.
    #[error("{}", no_adapter_message(.method, .callback_type, .return_type, .skipped, .tried))]
    NoAdapter {
        /// The method being bound (`Service.method`).
        method: String,
        /// The declared consumer type.
        callback_type: DeclaredType,
        /// The declared return type.
        return_type: DeclaredType,
        /// Factories deliberately skipped by a delegating lookup, in order.
        skipped: Vec<String>,
        /// Factories consulted, in order.
        tried: Vec<String>,
    },
}

fn no_adapter_message(
    method: &str,
    callback_type: &DeclaredType,
    return_type: &DeclaredType,
    skipped: &[String],
    tried: &[String],
) -> String {
    let mut message = format!(
        "{method}: could not locate callback adapter for `{callback_type}` returning `{return_type}`."
    );
    if !skipped.is_empty() {
        message.push_str("\n  Skipped:");
        for name in skipped {
            let _ = write!(message, "\n   * {name}");
        }
    }
    message.push_str("\n  Tried:");
    if tried.is_empty() {
        message.push_str("\n   (no factories registered)");
    }
    for name in tried {
        let _ = write!(message, "\n   * {name}");
    }
    message
}

// ---------------------------------------------------------------------------
// Invocation errors
// ---------------------------------------------------------------------------

/// The consumer handed to a resolved adapter has the wrong runtime shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdaptError {
    /// The consumer could not be downcast to what the adapter drives.
    #[error("consumer passed to `{adapter}` is not a `{expected}`")]
    ConsumerMismatch {
        /// The adapter that received the consumer.
        adapter: &'static str,
        /// The runtime shape the adapter expected.
        expected: &'static str,
    },
}

/// Outcome of a failed call, as reported by the transport.
///
/// This layer never inspects or classifies these; they reach the consumer
/// exactly as the call produced them.
#[derive(Debug, Error)]
pub enum CallError {
    /// The transport failed to produce a response.
    #[error("call failed: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The call was canceled before it completed.
    #[error("call was canceled")]
    Canceled,

    /// The transport delivered a payload that is not the declared response type.
    #[error("response payload is not a `{expected}`")]
    PayloadMismatch {
        /// Name of the type the consumer expected.
        expected: &'static str,
    },
}

impl CallError {
    /// Wraps any transport error.
    pub fn transport(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Transport(error.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_adapter_lists_every_factory_in_order() {
        let err = ConfigurationError::NoAdapter {
            method: "GitHub.listRepos".into(),
            callback_type: "Callback<Repo>".parse().unwrap(),
            return_type: "Repo".parse().unwrap(),
            skipped: vec!["Logging".into()],
            tried: vec!["Oneshot".into(), "Default".into()],
        };
        assert_eq!(
            err.to_string(),
            "GitHub.listRepos: could not locate callback adapter for `Callback<Repo>` \
             returning `Repo`.\n  Skipped:\n   * Logging\n  Tried:\n   * Oneshot\n   * Default"
        );
    }

    #[test]
    fn no_adapter_with_empty_chain_says_so() {
        let err = ConfigurationError::NoAdapter {
            method: "GitHub.listRepos".into(),
            callback_type: "Callback<Repo>".parse().unwrap(),
            return_type: "()".parse().unwrap(),
            skipped: Vec::new(),
            tried: Vec::new(),
        };
        assert!(err.to_string().ends_with("Tried:\n   (no factories registered)"));
    }

    #[test]
    fn rejected_names_method_factory_and_type() {
        let callback_type: DeclaredType = "Callback".parse().unwrap();
        let err = ConfigurationError::Rejected {
            method: "GitHub.listRepos".into(),
            factory: "Default".into(),
            callback_type: callback_type.clone(),
            source: FactoryError::malformed(&callback_type, "must be parameterized"),
        };
        assert_eq!(
            err.to_string(),
            "GitHub.listRepos: callback adapter factory `Default` rejected `Callback`: must be parameterized"
        );
    }
}
