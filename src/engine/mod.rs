//! Core backtesting engine.
//!
//! This module provides the fundamental types for a run:
//! - `Bar`: OHLCV data replayed by the engine.
//! - `BacktestConfig`: Strategy choice plus capital and risk settings.
//! - `Position`: The single open trade.
//! - `ClosedTrade`: A completed round trip in the trade log.
//! - `Wallet`: Realized equity and fees.
//! - `Backtest`: The bar-by-bar simulator.

mod bar;
mod config;
mod position;
mod trade;
mod wallet;

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    PercentCalculus,
    errors::Result,
    metrics::BacktestResults,
    signals::{Signal, generate_signals},
};

pub use bar::*;
pub use config::*;
pub use position::*;
pub use trade::*;
pub use wallet::*;

/// Bar-by-bar trade simulator.
///
/// The simulator is either flat or holds exactly one position. For each bar,
/// in time order:
/// 1. An open position is closed on a stop-loss, then take-profit, then an
///    opposing signal, checked in that order at the bar's close.
/// 2. When flat and no position was closed on this bar, a `Buy` opens a long
///    and a `Sell` opens a short sized at `equity × position_size%`.
/// 3. One equity point is recorded.
///
/// A position still open after the last bar is closed at its close with
/// [`CloseReason::EndOfPeriod`].
#[derive(Debug, Clone)]
pub struct Backtest {
    wallet: Wallet,
    data: Arc<[Bar]>,
    config: BacktestConfig,
    position: Option<Position>,
    trades: Vec<ClosedTrade>,
    equity_curve: Vec<EquityPoint>,
}

impl std::ops::Deref for Backtest {
    type Target = Wallet;

    fn deref(&self) -> &Self::Target {
        &self.wallet
    }
}

impl Backtest {
    /// Creates a new backtest instance.
    ///
    /// ### Arguments
    /// * `data` - Bars ordered by time. May be empty.
    /// * `config` - Strategy and risk settings.
    ///
    /// ### Returns
    /// The new backtest instance, or an error if the initial capital is not positive.
    /// Other settings are taken as given; see [`BacktestConfig::validate`].
    ///
    /// ### Example
    /// ```rust
    /// use std::sync::Arc;
    ///
    /// use strategy_backtest::prelude::*;
    ///
    /// let mut closes = vec![100.0; 20];
    /// closes.extend((105..=130).map(f64::from));
    /// let bars = closes
    ///     .iter()
    ///     .enumerate()
    ///     .map(|(i, &c)| Bar::from((i as i64 * 60_000, c, c, c, c, 1.0)))
    ///     .collect::<Vec<_>>();
    ///
    /// let config = BacktestConfigBuilder::builder()
    ///     .strategy(StrategyVariant::MaCrossover)
    ///     .commission(0.0)
    ///     .build()
    ///     .unwrap();
    ///
    /// let mut bts = Backtest::new(Arc::from_iter(bars), config).unwrap();
    /// let results = bts.run();
    ///
    /// assert_eq!(results.total_trades, 1);
    /// assert_eq!(results.trades[0].reason, CloseReason::EndOfPeriod);
    /// assert_eq!(results.equity_curve.len(), 46);
    /// ```
    pub fn new(data: Arc<[Bar]>, config: BacktestConfig) -> Result<Self> {
        Ok(Self {
            wallet: Wallet::new(config.initial_capital())?,
            equity_curve: Vec::with_capacity(data.len()),
            data,
            config,
            position: None,
            trades: Vec::new(),
        })
    }

    /// Returns the settings of the run.
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Returns an iterator over the bars.
    pub fn bars(&self) -> std::slice::Iter<'_, Bar> {
        self.data.iter()
    }

    /// Returns the open position, if any.
    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Returns an iterator over the closed trades.
    pub fn trades(&self) -> std::slice::Iter<'_, ClosedTrade> {
        self.trades.iter()
    }

    /// Returns an iterator over the recorded equity points.
    pub fn equity_curve(&self) -> std::slice::Iter<'_, EquityPoint> {
        self.equity_curve.iter()
    }

    /// Runs the configured strategy over the data.
    ///
    /// Signals are derived from the bars with [`generate_signals`]. The
    /// backtest is reset first, so running twice yields identical results.
    pub fn run(&mut self) -> BacktestResults {
        let signals = generate_signals(&self.data, self.config.strategy());
        self.run_with_signals(&signals)
    }

    /// Replays the data against precomputed signals.
    ///
    /// ### Arguments
    /// * `signals` - One signal per bar. Missing trailing entries count as [`Signal::Hold`].
    ///
    /// ### Returns
    /// The trade log, equity curve and summary statistics.
    pub fn run_with_signals(&mut self, signals: &[Signal]) -> BacktestResults {
        self.reset();

        info!(
            strategy = %self.config.strategy(),
            bars = self.data.len(),
            capital = self.config.initial_capital(),
            leverage = self.config.leverage(),
            "Starting backtest"
        );

        let bars = Arc::clone(&self.data);
        for (i, bar) in bars.iter().enumerate() {
            let signal = signals.get(i).copied().unwrap_or_default();

            let closed = match self.position {
                Some(position) => match self.exit_reason(&position, signal, bar.close()) {
                    Some(reason) => {
                        self.close_position(bar, reason);
                        true
                    }
                    None => false,
                },
                None => false,
            };

            if !closed
                && self.position.is_none()
                && let Some(side) = PositionSide::from_signal(signal)
            {
                self.open_position(bar, side);
            }

            self.equity_curve.push(self.wallet.point(bar.time()));
        }

        if let Some(last) = bars.last()
            && self.position.is_some()
        {
            self.close_position(last, CloseReason::EndOfPeriod);
            if let Some(point) = self.equity_curve.last_mut() {
                *point = self.wallet.point(last.time());
            }
        }

        let results = BacktestResults::new(
            self.trades.clone(),
            self.equity_curve.clone(),
            self.wallet.initial_balance(),
            self.wallet.fees_paid(),
        );

        info!(
            trades = results.total_trades,
            total_pnl = results.total_pnl,
            max_drawdown_percent = results.max_drawdown_percent,
            "Backtest complete"
        );

        results
    }

    /// Decides whether the open position closes at `price`.
    fn exit_reason(&self, position: &Position, signal: Signal, price: f64) -> Option<CloseReason> {
        let pnl_percent = position.pnl_percent(price, self.config.leverage());

        if let Some(stop_loss) = self.config.stop_loss()
            && pnl_percent <= -stop_loss
        {
            return Some(CloseReason::StopLoss);
        }
        if let Some(take_profit) = self.config.take_profit()
            && pnl_percent >= take_profit
        {
            return Some(CloseReason::TakeProfit);
        }
        if position.side().is_opposed_by(signal) {
            return Some(CloseReason::Signal);
        }
        None
    }

    /// Opens a position at the bar's close.
    fn open_position(&mut self, bar: &Bar, side: PositionSide) {
        let price = bar.close();
        let size = self.wallet.equity().how_many(self.config.position_size()) / price;
        let position = Position::from((side, price, bar.time(), size));

        debug!(?side, price, size, time = bar.time(), "Opened position");
        self.position = Some(position);
    }

    /// Closes the open position at the bar's close and records the trade.
    fn close_position(&mut self, bar: &Bar, reason: CloseReason) {
        let Some(position) = self.position.take() else {
            return;
        };

        let exit_price = bar.close();
        let gross_pnl = position.estimate_pnl(exit_price, self.config.leverage());
        let fees = position.round_trip_fees(exit_price, self.config.commission());
        let equity = self.wallet.equity();
        let pnl = self.wallet.settle(gross_pnl, fees);

        let trade = ClosedTrade {
            entry_time: position.entry_time(),
            exit_time: bar.time(),
            entry_price: position.entry_price(),
            exit_price,
            side: position.side(),
            size: position.size(),
            pnl,
            pnl_percent: pnl / equity * 100.0,
            fees,
            reason,
        };

        debug!(
            entry = trade.entry_price,
            exit = trade.exit_price,
            pnl = trade.pnl,
            %reason,
            "Closed position"
        );
        self.trades.push(trade);
    }

    /// Resets the backtest to its initial state.
    pub fn reset(&mut self) {
        self.wallet.reset();
        self.position = None;
        self.trades = Vec::new();
        self.equity_curve = Vec::with_capacity(self.data.len());
    }
}

/// Runs `config` over `bars` in one call.
///
/// ### Returns
/// The results, or an error if the initial capital is not positive.
pub fn run_backtest(bars: &[Bar], config: &BacktestConfig) -> Result<BacktestResults> {
    let mut backtest = Backtest::new(Arc::from(bars), config.clone())?;
    Ok(backtest.run())
}
