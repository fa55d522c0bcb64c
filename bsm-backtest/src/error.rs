//! Error types shared by the pricing, risk and simulation components.

use thiserror::Error;

/// Result type alias for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;

/// Failures raised by the core engines.
///
/// All of them are deterministic: the same inputs always fail the same way,
/// so nothing here is retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// A parameter is outside its numeric domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A ratio cannot be computed (zero variance, zero base).
    #[error("Undefined metric: {0}")]
    UndefinedMetric(String),

    /// A required series has no elements.
    #[error("Empty input: {0}")]
    EmptyInput(String),
}

impl SimError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn undefined(message: impl Into<String>) -> Self {
        Self::UndefinedMetric(message.into())
    }

    pub fn empty(message: impl Into<String>) -> Self {
        Self::EmptyInput(message.into())
    }
}

/// Check that a value is finite and strictly positive.
pub(crate) fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid(format!("{name} must be positive, got {value}")))
    }
}

/// Check that a value is finite.
pub(crate) fn ensure_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SimError::invalid(format!("{name} must be finite, got {value}")))
    }
}
