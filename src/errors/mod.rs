use std::fmt;

use thiserror::Error;

/// Typed error hierarchy for dabo.
///
/// Use at module boundaries (gateway calls, cart mutation, order issuance).
/// Internal/leaf functions can continue using `anyhow::Result` — the `Internal`
/// variant allows seamless conversion via the `?` operator.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gateway error: {message}")]
    Gateway { message: String, retryable: bool },

    #[error("Selection is not an orderable item")]
    InvalidSelection,

    #[error("Order precondition not met: {0}")]
    PreconditionNotMet(Precondition),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl BotError {
    /// Whether this error is transient and the operation may be retried
    /// (by the user re-issuing the action; there is no automatic retry).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Gateway { retryable, .. } => *retryable,
            Self::Internal(_) => true,
            Self::Config(_) | Self::InvalidSelection | Self::PreconditionNotMet(_) => false,
        }
    }
}

/// The specific checkout precondition that failed, so the caller can
/// re-prompt for exactly the missing piece instead of failing opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    EmptyCart,
    MissingPhone,
    MissingLocation,
    OutsideServiceArea,
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EmptyCart => "cart is empty",
            Self::MissingPhone => "no phone number on file",
            Self::MissingLocation => "no delivery location",
            Self::OutsideServiceArea => "location outside the service area",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_errors_carry_retryability() {
        let err = BotError::Gateway {
            message: "timeout".into(),
            retryable: true,
        };
        assert!(err.is_retryable());

        let err = BotError::Gateway {
            message: "bad credentials".into(),
            retryable: false,
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn validation_errors_are_not_retryable() {
        assert!(!BotError::InvalidSelection.is_retryable());
        assert!(!BotError::PreconditionNotMet(Precondition::EmptyCart).is_retryable());
    }

    #[test]
    fn precondition_names_the_missing_piece() {
        let err = BotError::PreconditionNotMet(Precondition::MissingPhone);
        assert!(err.to_string().contains("no phone number"));
    }
}
