/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building inputs or loading data.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The initial capital is not positive.
    #[error("Initial capital must be positive (got: {0})")]
    NegZeroCapital(f64),

    /// The position size is not a percentage of equity.
    #[error("Position size must be within 0..=100 percent (got: {0})")]
    PositionSize(f64),

    /// The commission rate is negative.
    #[error("Commission must not be negative (got: {0})")]
    NegCommission(f64),

    /// The leverage multiplier is below 1.
    #[error("Leverage must be at least 1 (got: {0})")]
    Leverage(f64),

    /// The stop-loss percent is not positive.
    #[error("Stop-loss must be positive (got: {0})")]
    NegZeroStopLoss(f64),

    /// The take-profit percent is not positive.
    #[error("Take-profit must be positive (got: {0})")]
    NegZeroTakeProfit(f64),

    /// The strategy name does not map to a known variant.
    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    /// A bar price is not finite or not positive.
    #[error("Bar price must be positive and finite (got: {0})")]
    BarPrice(f64),

    /// The bar high is below its low.
    #[error("Bar high ({0}) is below bar low ({1})")]
    BarRange(f64, f64),

    /// A required builder field was not set.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error occurred.
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
