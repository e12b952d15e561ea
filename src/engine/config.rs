use std::{fmt, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// The signal rule a backtest replays.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StrategyVariant {
    /// SMA(20) crossing SMA(50).
    #[default]
    MaCrossover,
    /// RSI(14) entering the 30 / 70 zones.
    Rsi,
    /// Close breaking out of the Bollinger Bands (20, 2).
    Bollinger,
    /// MACD (12, 26, 9) histogram changing sign.
    Macd,
}

impl StrategyVariant {
    /// Every variant, in declaration order.
    pub const ALL: [StrategyVariant; 4] = [Self::MaCrossover, Self::Rsi, Self::Bollinger, Self::Macd];

    /// Returns the tag used by the dashboard forms.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaCrossover => "ma-crossover",
            Self::Rsi => "rsi",
            Self::Bollinger => "bollinger",
            Self::Macd => "macd",
        }
    }
}

impl fmt::Display for StrategyVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for StrategyVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "ma-crossover" => Ok(Self::MaCrossover),
            "rsi" => Ok(Self::Rsi),
            "bollinger" => Ok(Self::Bollinger),
            "macd" => Ok(Self::Macd),
            _ => Err(Error::UnknownStrategy(s.to_string())),
        }
    }
}

/// Capital and risk settings of one backtest run.
///
/// Percentages are expressed in percent (e.g. `0.1` for 0.1 %). The value is
/// immutable once built; build it with [`BacktestConfigBuilder`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    strategy: StrategyVariant,
    initial_capital: f64,
    position_size: f64,
    commission: f64,
    leverage: f64,
    stop_loss: Option<f64>,
    take_profit: Option<f64>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyVariant::default(),
            initial_capital: 10_000.0,
            position_size: 10.0,
            commission: 0.1,
            leverage: 1.0,
            stop_loss: None,
            take_profit: None,
        }
    }
}

impl BacktestConfig {
    /// Returns the strategy variant.
    pub fn strategy(&self) -> StrategyVariant {
        self.strategy
    }

    /// Returns the initial capital.
    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    /// Returns the position size, in percent of current equity.
    pub fn position_size(&self) -> f64 {
        self.position_size
    }

    /// Returns the commission rate, in percent per fill.
    pub fn commission(&self) -> f64 {
        self.commission
    }

    /// Returns the leverage multiplier.
    pub fn leverage(&self) -> f64 {
        self.leverage
    }

    /// Returns the stop-loss percent, if enabled. Zero or negative values mean disabled.
    pub fn stop_loss(&self) -> Option<f64> {
        self.stop_loss.filter(|v| *v > 0.0)
    }

    /// Returns the take-profit percent, if enabled. Zero or negative values mean disabled.
    pub fn take_profit(&self) -> Option<f64> {
        self.take_profit.filter(|v| *v > 0.0)
    }

    /// Returns a copy running another strategy with the same capital and risk settings.
    pub fn with_strategy(&self, strategy: StrategyVariant) -> Self {
        Self {
            strategy,
            ..self.clone()
        }
    }

    /// Checks every field against its domain.
    ///
    /// The simulator itself only requires a positive initial capital; call this
    /// before a run to reject economically odd settings as well.
    pub fn validate(&self) -> Result<()> {
        if self.initial_capital <= 0.0 || !self.initial_capital.is_finite() {
            return Err(Error::NegZeroCapital(self.initial_capital));
        }
        if !(0.0..=100.0).contains(&self.position_size) {
            return Err(Error::PositionSize(self.position_size));
        }
        if self.commission < 0.0 || !self.commission.is_finite() {
            return Err(Error::NegCommission(self.commission));
        }
        if self.leverage < 1.0 || !self.leverage.is_finite() {
            return Err(Error::Leverage(self.leverage));
        }
        if let Some(stop_loss) = self.stop_loss
            && (stop_loss <= 0.0 || !stop_loss.is_finite())
        {
            return Err(Error::NegZeroStopLoss(stop_loss));
        }
        if let Some(take_profit) = self.take_profit
            && (take_profit <= 0.0 || !take_profit.is_finite())
        {
            return Err(Error::NegZeroTakeProfit(take_profit));
        }
        Ok(())
    }
}

/// Builder for [`BacktestConfig`]. Unset fields keep their defaults.
///
/// ```rust
/// use strategy_backtest::prelude::*;
///
/// let config = BacktestConfigBuilder::builder()
///     .strategy(StrategyVariant::Rsi)
///     .initial_capital(5_000.0)
///     .position_size(20.0)
///     .leverage(3.0)
///     .stop_loss(2.0)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.stop_loss(), Some(2.0));
/// assert!(BacktestConfigBuilder::builder().initial_capital(0.0).build().is_err());
/// ```
#[derive(Debug, Default)]
pub struct BacktestConfigBuilder {
    config: BacktestConfig,
}

impl BacktestConfigBuilder {
    /// Starts from the default settings.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Sets the strategy variant.
    pub fn strategy(mut self, strategy: StrategyVariant) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Sets the initial capital.
    pub fn initial_capital(mut self, initial_capital: f64) -> Self {
        self.config.initial_capital = initial_capital;
        self
    }

    /// Sets the position size, in percent of current equity.
    pub fn position_size(mut self, position_size: f64) -> Self {
        self.config.position_size = position_size;
        self
    }

    /// Sets the commission, in percent per fill.
    pub fn commission(mut self, commission: f64) -> Self {
        self.config.commission = commission;
        self
    }

    /// Sets the leverage multiplier.
    pub fn leverage(mut self, leverage: f64) -> Self {
        self.config.leverage = leverage;
        self
    }

    /// Enables the stop-loss, in leveraged percent of the entry price.
    pub fn stop_loss(mut self, stop_loss: f64) -> Self {
        self.config.stop_loss = Some(stop_loss);
        self
    }

    /// Enables the take-profit, in leveraged percent of the entry price.
    pub fn take_profit(mut self, take_profit: f64) -> Self {
        self.config.take_profit = Some(take_profit);
        self
    }

    /// Validates and returns the config.
    pub fn build(self) -> Result<BacktestConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the config without validating it.
    ///
    /// The simulator still rejects a non-positive initial capital.
    pub fn build_unchecked(self) -> BacktestConfig {
        self.config
    }
}
