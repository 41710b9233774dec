//! Error taxonomy shared by every marketplace operation.
//!
//! Each variant is a distinct kind that callers can match on. Storage
//! backends convert their driver errors into [`MarketError::Internal`];
//! everything else is produced by the domain rules themselves.

use thiserror::Error;

/// Result alias used across the marketplace crates.
pub type Result<T> = std::result::Result<T, MarketError>;

/// Errors returned by marketplace operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    /// Missing or mismatched `(restaurant_id, api_key)` pair.
    #[error("Unauthorized: invalid restaurant credentials")]
    Unauthorized,

    /// Entity absent, or not visible to the caller's scope.
    ///
    /// Cross-tenant lookups also end up here so that callers cannot
    /// probe for the existence of other merchants' resources.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up (e.g. "offer").
        resource: &'static str,
        /// Identifier that was requested.
        id: String,
    },

    /// Operation is not valid for the entity's current lifecycle state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Malformed or missing required input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A reservation asked for more than the offer has left.
    #[error("Insufficient quantity: requested {requested}, available {available}")]
    InsufficientQuantity {
        /// Quantity the caller asked for.
        requested: u32,
        /// Quantity remaining at the time of the check.
        available: u32,
    },

    /// Unexpected failure, e.g. storage unavailable or corrupt rows.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MarketError {
    /// Build a [`MarketError::NotFound`] for the given resource kind.
    #[must_use]
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Build a [`MarketError::InvalidInput`].
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Build a [`MarketError::Internal`].
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable machine-readable name of the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound { .. } => "not_found",
            Self::InvalidState(_) => "invalid_state",
            Self::InvalidInput(_) => "invalid_input",
            Self::InsufficientQuantity { .. } => "insufficient_quantity",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = MarketError::not_found("offer", "OFF_123");
        assert_eq!(err.to_string(), "offer not found: OFF_123");
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn insufficient_quantity_display() {
        let err = MarketError::InsufficientQuantity {
            requested: 6,
            available: 5,
        };
        let display = err.to_string();
        assert!(display.contains("requested 6"));
        assert!(display.contains("available 5"));
    }
}
