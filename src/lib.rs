//! # Strategy Backtest: signal strategies replayed over crypto candles
//!
//! **Strategy Backtest** replays a fixed set of technical-analysis strategies over historical
//! OHLCV bars and reports how a leveraged, single-position account would have performed.
//! Every run is deterministic: the same bars and settings always give the same results.
//!
//! ## Core Components
//! | Component            | Description                                                                  |
//! |----------------------|------------------------------------------------------------------------------|
//! | **`indicators`**     | SMA, EMA, RSI, Bollinger Bands and MACD over a close series.                 |
//! | **`signals`**        | Per-bar `Buy` / `Sell` / `Hold` decisions, fired only on crossings.          |
//! | **`Backtest`**       | The bar-by-bar simulator: sizing, leverage, commission, stop-loss, take-profit. |
//! | **`BacktestResults`** | P&L, win rate, profit factor, drawdown, Sharpe ratio and monthly breakdown. |
//! | **`Optimizer`**      | Runs many settings over the same bars in parallel.                           |
//!
//! ## Strategies
//! | Strategy           | Buy                                  | Sell                                 |
//! |--------------------|--------------------------------------|--------------------------------------|
//! | **`ma-crossover`** | SMA(20) crosses above SMA(50)        | SMA(20) crosses below SMA(50)        |
//! | **`rsi`**          | RSI(14) drops to 30 or below         | RSI(14) rises to 70 or above         |
//! | **`bollinger`**    | Close breaks below the lower band    | Close breaks above the upper band    |
//! | **`macd`**         | MACD(12, 26, 9) histogram turns positive | Histogram turns negative         |
//!
//! ## Getting Started
//! ```rust
//! use strategy_backtest::prelude::*;
//!
//! let mut closes = vec![100.0; 20];
//! closes.extend((105..=130).map(f64::from));
//! let bars = closes
//!     .iter()
//!     .enumerate()
//!     .map(|(i, &c)| Bar::from((1_704_067_200_000 + i as i64 * 3_600_000, c, c, c, c, 1.0)))
//!     .collect::<Vec<_>>();
//!
//! let config = BacktestConfigBuilder::builder()
//!     .strategy(StrategyVariant::MaCrossover)
//!     .position_size(50.0)
//!     .leverage(2.0)
//!     .build()
//!     .unwrap();
//!
//! let results = run_backtest(&bars, &config).unwrap();
//! assert_eq!(results.total_trades, 1);
//! assert!(results.total_pnl > 0.0);
//! println!("{results}");
//! ```
//!
//! ## Features
//! | Feature         | Description                                                                  |
//! |-----------------|------------------------------------------------------------------------------|
//! | **`serde`**     | Serialize inputs and results, load klines from JSON files.                   |
//! | **`optimizer`** | Parallel parameter sweeps with [`rayon`](https://crates.io/crates/rayon).    |
//! | **`wasm`**      | Lets `rayon` spin-lock on targets without blocking primitives.               |
//!
//! ## Logging
//! Runs emit [`tracing`](https://crates.io/crates/tracing) events: an `info` event when a run starts
//! and another when it completes, plus a `debug` event per opened and closed position. Install any
//! subscriber to see them.
//!
//! ## License
//! MIT
#![warn(missing_docs)]

/// Core trading engine components: bars, settings, positions, wallet, and backtest logic.
pub mod engine;

/// Error types for the library.
pub mod errors;

/// Technical indicators over close series.
pub mod indicators;

/// Signal generation for the supported strategies.
pub mod signals;

/// Performance metrics: drawdown, Sharpe ratio, win rate, etc.
pub mod metrics;

/// JSON data loading and serialization helpers.
#[cfg(feature = "serde")]
pub mod utils;

/// Strategy parameter optimization.
#[cfg(feature = "optimizer")]
pub mod optimizer;

/// Re-exports of commonly used types and traits for convenience.
pub mod prelude {
    pub use super::*;
    pub use crate::engine::*;
    pub use crate::errors::*;
    pub use crate::metrics::{BacktestResults, MonthlyStat};
    pub use crate::signals::{Signal, generate_signals};

    #[cfg(feature = "serde")]
    pub use crate::utils::{BacktestRequest, get_bars_from_file, get_bars_from_str};

    #[cfg(feature = "optimizer")]
    pub use crate::optimizer::*;
}

/// Percentage helpers used for position sizing, fees and P&L.
pub trait PercentCalculus {
    /// Returns `percent` % of the value, e.g. `200.0.how_many(10.0) == 20.0`.
    fn how_many(self, percent: Self) -> Self;

    /// Returns the move from the value to `new`, in percent of the value.
    fn change(self, new: Self) -> Self;
}

impl PercentCalculus for f64 {
    fn how_many(self, percent: Self) -> Self {
        percent * (self / 100.0)
    }

    fn change(self, new: Self) -> Self {
        (new - self) / self * 100.0
    }
}

#[cfg(test)]
mod percent {
    use super::*;

    #[test]
    fn how_many() {
        assert_eq!(10.0, 100.0.how_many(10.0));
        assert_eq!(0.0, 2_500.0.how_many(0.0));
    }

    #[test]
    fn change() {
        assert_eq!(10.0, 100.0.change(110.0));
        assert_eq!(-50.0, 200.0.change(100.0));
    }
}
