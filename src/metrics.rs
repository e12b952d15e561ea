//! Performance metrics for backtesting.
//!
//! This module turns the trade log and equity curve of a run into:
//! - Total P&L and return
//! - Win rate and profit factor
//! - Average win and average loss
//! - Max drawdown
//! - Sharpe ratio
//! - Monthly breakdown
//!
//! Edge cases resolve to defined values instead of errors: no trades gives a
//! win rate of 0, no losing trade gives an infinite profit factor, and a flat
//! equity curve gives a Sharpe ratio of 0.

use std::collections::BTreeMap;
use std::fmt;

use chrono::DateTime;
use tracing::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::{ClosedTrade, EquityPoint};

/// Annualization factor of the Sharpe ratio, assuming daily returns.
pub const TRADING_DAYS: f64 = 252.0;

/// Trades of one calendar month, bucketed by entry time.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyStat {
    /// `YYYY-MM` in UTC.
    pub month: String,
    /// Sum of winning P&L.
    pub profit: f64,
    /// Magnitude of the summed losing P&L.
    pub loss: f64,
    /// Share of winning trades in the month, in percent.
    pub win_rate: f64,
    /// Number of trades entered in the month.
    pub trades: usize,
}

/// The complete outcome of one backtest run.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResults {
    /// Closed trades in the order they closed.
    pub trades: Vec<ClosedTrade>,
    /// One point per input bar.
    pub equity_curve: Vec<EquityPoint>,
    /// Starting equity.
    pub initial_capital: f64,
    /// Equity after the last close.
    pub final_equity: f64,
    /// `final_equity - initial_capital`
    #[cfg_attr(feature = "serde", serde(rename = "totalPnL"))]
    pub total_pnl: f64,
    /// `total_pnl` in percent of the initial capital.
    #[cfg_attr(feature = "serde", serde(rename = "totalPnLPercent"))]
    pub total_pnl_percent: f64,
    /// Number of closed trades.
    pub total_trades: usize,
    /// Trades with a positive P&L.
    pub winning_trades: usize,
    /// Trades with a negative P&L.
    pub losing_trades: usize,
    /// Share of winning trades, in percent.
    pub win_rate: f64,
    /// Gross profit over gross loss. Infinite when there are wins but no losses.
    #[cfg_attr(feature = "serde", serde(with = "crate::utils::non_finite"))]
    pub profit_factor: f64,
    /// Mean P&L of the winning trades.
    pub avg_win: f64,
    /// Mean magnitude of the losing trades' P&L.
    pub avg_loss: f64,
    /// `max_drawdown_percent` applied to the initial capital.
    pub max_drawdown: f64,
    /// Largest decline from a running equity peak, in percent.
    pub max_drawdown_percent: f64,
    /// Annualized mean over standard deviation of returns on the initial capital.
    pub sharpe_ratio: f64,
    /// Commission paid over the run.
    pub fees_paid: f64,
    /// Breakdown by entry month, oldest first.
    pub monthly_stats: Vec<MonthlyStat>,
}

impl BacktestResults {
    /// Aggregates a finished run.
    ///
    /// ### Arguments
    /// * `trades` - The trade log.
    /// * `equity_curve` - One point per bar.
    /// * `initial_capital` - Starting equity.
    /// * `fees_paid` - Commission paid over the run.
    pub fn new(trades: Vec<ClosedTrade>, equity_curve: Vec<EquityPoint>, initial_capital: f64, fees_paid: f64) -> Self {
        let final_equity = equity_curve.last().map_or(initial_capital, |p| p.equity);
        let total_pnl = final_equity - initial_capital;

        let winning_trades = trades.iter().filter(|t| t.is_win()).count();
        let losing_trades = trades.iter().filter(|t| t.is_loss()).count();
        let gross_profit = gross_profit(&trades);
        let gross_loss = gross_loss(&trades);

        let max_drawdown_percent = max_drawdown_percent(&equity_curve, initial_capital);

        Self {
            total_pnl,
            total_pnl_percent: total_pnl / initial_capital * 100.0,
            total_trades: trades.len(),
            winning_trades,
            losing_trades,
            win_rate: win_rate(&trades),
            profit_factor: profit_factor(&trades),
            avg_win: mean(gross_profit, winning_trades),
            avg_loss: mean(gross_loss, losing_trades),
            max_drawdown: max_drawdown_percent / 100.0 * initial_capital,
            max_drawdown_percent,
            sharpe_ratio: sharpe_ratio(&equity_curve, initial_capital),
            monthly_stats: monthly_stats(&trades),
            initial_capital,
            final_equity,
            fees_paid,
            trades,
            equity_curve,
        }
    }
}

fn mean(total: f64, count: usize) -> f64 {
    if count == 0 { 0.0 } else { total / count as f64 }
}

/// Sum of the winning trades' P&L.
pub fn gross_profit(trades: &[ClosedTrade]) -> f64 {
    trades.iter().filter(|t| t.is_win()).map(|t| t.pnl).sum()
}

/// Magnitude of the summed losing trades' P&L.
pub fn gross_loss(trades: &[ClosedTrade]) -> f64 {
    trades.iter().filter(|t| t.is_loss()).map(|t| t.pnl).sum::<f64>().abs()
}

/// Share of winning trades, in percent. 0 without trades.
pub fn win_rate(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let wins = trades.iter().filter(|t| t.is_win()).count();
    wins as f64 / trades.len() as f64 * 100.0
}

/// Gross profit over gross loss.
///
/// Returns `f64::INFINITY` when there are wins and no losses, and 0 when there
/// are neither.
pub fn profit_factor(trades: &[ClosedTrade]) -> f64 {
    let gross_profit = gross_profit(trades);
    let gross_loss = gross_loss(trades);

    if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Largest decline from a running equity peak, in percent of that peak.
///
/// The peak starts at `initial_capital`.
pub fn max_drawdown_percent(equity_curve: &[EquityPoint], initial_capital: f64) -> f64 {
    let mut peak = initial_capital;
    let mut max_drawdown = 0.0;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        }
        let drawdown = (peak - point.equity) / peak * 100.0;
        if drawdown > max_drawdown {
            max_drawdown = drawdown;
        }
    }

    max_drawdown
}

/// Sharpe ratio of the returns on the initial capital, annualized with √252.
///
/// Each equity point contributes `(equity - initial_capital) / initial_capital`.
/// The ratio is `mean / σ × √252` with the population σ, and 0 when σ is 0.
pub fn sharpe_ratio(equity_curve: &[EquityPoint], initial_capital: f64) -> f64 {
    if equity_curve.is_empty() {
        return 0.0;
    }

    let returns = equity_curve
        .iter()
        .map(|p| (p.equity - initial_capital) / initial_capital)
        .collect::<Vec<_>>();
    let n = returns.len() as f64;
    let mean_return = returns.iter().sum::<f64>() / n;
    let std_dev = (returns.iter().map(|r| (r - mean_return).powi(2)).sum::<f64>() / n).sqrt();

    if std_dev == 0.0 {
        return 0.0;
    }

    mean_return / std_dev * TRADING_DAYS.sqrt()
}

/// Groups trades by the UTC calendar month of their entry time.
pub fn monthly_stats(trades: &[ClosedTrade]) -> Vec<MonthlyStat> {
    let mut months: BTreeMap<String, Vec<&ClosedTrade>> = BTreeMap::new();

    for trade in trades {
        match DateTime::from_timestamp_millis(trade.entry_time) {
            Some(datetime) => months
                .entry(datetime.format("%Y-%m").to_string())
                .or_default()
                .push(trade),
            None => warn!(entry_time = trade.entry_time, "Trade entry time out of range, skipped"),
        }
    }

    months
        .into_iter()
        .map(|(month, trades)| {
            let wins = trades.iter().filter(|t| t.is_win()).count();
            MonthlyStat {
                month,
                profit: trades.iter().filter(|t| t.is_win()).fold(0.0, |acc, t| acc + t.pnl),
                loss: trades.iter().filter(|t| t.is_loss()).map(|t| t.pnl).sum::<f64>().abs(),
                win_rate: wins as f64 / trades.len() as f64 * 100.0,
                trades: trades.len(),
            }
        })
        .collect()
}

impl fmt::Display for BacktestResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Backtest Results ===")?;
        writeln!(f, "Initial Capital: {:.2}", self.initial_capital)?;
        writeln!(f, "Final Equity: {:.2}", self.final_equity)?;
        writeln!(f, "Profit & Loss (P&L): {:.2} ({:.2}%)", self.total_pnl, self.total_pnl_percent)?;
        writeln!(f, "Fees paid: {:.2}", self.fees_paid)?;
        writeln!(f)?;
        writeln!(
            f,
            "Trades: {} (won {}, lost {})",
            self.total_trades, self.winning_trades, self.losing_trades
        )?;
        writeln!(f, "Win Rate: {:.2}%", self.win_rate)?;
        writeln!(f, "Profit Factor: {:.2}", self.profit_factor)?;
        writeln!(f, "Avg Win / Avg Loss: {:.2} / {:.2}", self.avg_win, self.avg_loss)?;
        writeln!(f, "Max Drawdown: {:.2} ({:.2}%)", self.max_drawdown, self.max_drawdown_percent)?;
        write!(f, "Sharpe Ratio: {:.2}", self.sharpe_ratio)?;
        for month in &self.monthly_stats {
            write!(
                f,
                "\n{}: +{:.2} / -{:.2}, {} trades, {:.2}% won",
                month.month, month.profit, month.loss, month.trades, month.win_rate
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::engine::{CloseReason, PositionSide};

    // 2024-01-15 and 2024-02-15, UTC
    const JAN: i64 = 1_705_276_800_000;
    const FEB: i64 = 1_707_955_200_000;

    fn trade(entry_time: i64, pnl: f64) -> ClosedTrade {
        ClosedTrade {
            entry_time,
            exit_time: entry_time + 3_600_000,
            entry_price: 100.0,
            exit_price: 100.0 + pnl,
            side: PositionSide::Long,
            size: 1.0,
            pnl,
            pnl_percent: pnl / 100.0,
            fees: 0.0,
            reason: CloseReason::Signal,
        }
    }

    fn curve(equity: &[f64], initial: f64) -> Vec<EquityPoint> {
        equity
            .iter()
            .enumerate()
            .map(|(i, &e)| EquityPoint {
                time: i as i64,
                equity: e,
                pnl: e - initial,
            })
            .collect()
    }

    #[test]
    fn max_drawdown() {
        let points = curve(&[10_000.0, 12_000.0, 9_000.0, 11_000.0], 10_000.0);
        // (12000 - 9000) / 12000 = 25%
        assert_eq!(max_drawdown_percent(&points, 10_000.0), 25.0);
    }

    #[test]
    fn max_drawdown_from_initial_capital() {
        let points = curve(&[9_000.0, 9_500.0], 10_000.0);
        assert_eq!(max_drawdown_percent(&points, 10_000.0), 10.0);
    }

    #[test]
    fn max_drawdown_no_points() {
        assert_eq!(max_drawdown_percent(&[], 10_000.0), 0.0);
    }

    #[test]
    fn profit_factor_mixed() {
        let trades = [trade(JAN, 20.0), trade(JAN, -10.0)];
        assert_eq!(profit_factor(&trades), 2.0); // 20 / 10 = 2.0
    }

    #[test]
    fn profit_factor_no_losses() {
        let trades = [trade(JAN, 20.0), trade(FEB, 5.0)];
        assert_eq!(profit_factor(&trades), f64::INFINITY);
    }

    #[test]
    fn profit_factor_no_trades() {
        assert_eq!(profit_factor(&[]), 0.0);
        assert_eq!(profit_factor(&[trade(JAN, 0.0)]), 0.0);
    }

    #[test]
    fn sharpe_ratio_positive() {
        let points = curve(&[10_000.0, 10_500.0, 10_300.0, 10_700.0], 10_000.0);
        // returns 0, .05, .03, .07 → mean .0375, σ ≈ .02586
        let expected = 0.0375 / 0.000_668_75_f64.sqrt() * 252.0_f64.sqrt();
        assert!((sharpe_ratio(&points, 10_000.0) - expected).abs() < 1e-9);
    }

    #[test]
    fn sharpe_ratio_flat_curve() {
        let points = curve(&[10_000.0; 5], 10_000.0);
        assert_eq!(sharpe_ratio(&points, 10_000.0), 0.0);
        assert_eq!(sharpe_ratio(&[], 10_000.0), 0.0);
    }

    #[test]
    fn sharpe_ratio_tiny_deviation() {
        // σ = ε/2, far below ε but not zero
        let points = curve(&[1.0, 1.0 + f64::EPSILON], 1.0);
        assert!((sharpe_ratio(&points, 1.0) - 252.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn win_rate_counts() {
        assert_eq!(win_rate(&[]), 0.0);
        assert_eq!(win_rate(&[trade(JAN, 20.0), trade(JAN, -10.0)]), 50.0);
        // break-even trades count toward neither side but toward the total
        assert_eq!(win_rate(&[trade(JAN, 20.0), trade(JAN, 0.0)]), 50.0);
    }

    #[test]
    fn monthly_buckets() {
        let trades = [trade(FEB, -4.0), trade(JAN, 10.0), trade(JAN, -2.0), trade(FEB, 6.0), trade(FEB, 1.0)];
        let stats = monthly_stats(&trades);

        assert_eq!(stats.len(), 2);
        assert_eq!(
            stats[0],
            MonthlyStat {
                month: "2024-01".to_string(),
                profit: 10.0,
                loss: 2.0,
                win_rate: 50.0,
                trades: 2,
            }
        );
        assert_eq!(stats[1].month, "2024-02");
        assert_eq!(stats[1].profit, 7.0);
        assert_eq!(stats[1].loss, 4.0);
        assert_eq!(stats[1].trades, 3);
    }

    #[test]
    fn results_summary() {
        let trades = vec![trade(JAN, 300.0), trade(FEB, -100.0), trade(FEB, 0.0)];
        let points = curve(&[10_000.0, 10_300.0, 10_200.0, 10_200.0], 10_000.0);
        let results = BacktestResults::new(trades, points, 10_000.0, 1.5);

        assert_eq!(results.final_equity, 10_200.0);
        assert_eq!(results.total_pnl, 200.0);
        assert_eq!(results.total_pnl_percent, 2.0);
        assert_eq!(results.total_trades, 3);
        assert_eq!(results.winning_trades, 1);
        assert_eq!(results.losing_trades, 1);
        assert_eq!(results.profit_factor, 3.0);
        assert_eq!(results.avg_win, 300.0);
        assert_eq!(results.avg_loss, 100.0);
        assert_eq!(results.fees_paid, 1.5);
        assert!((results.max_drawdown_percent - 100.0 / 103.0).abs() < 1e-9);
        assert!((results.max_drawdown - 10_000.0 / 103.0).abs() < 1e-9);
        assert_eq!(results.monthly_stats.len(), 2);
    }

    #[test]
    fn results_without_trades() {
        let results = BacktestResults::new(vec![], vec![], 10_000.0, 0.0);
        assert_eq!(results.final_equity, 10_000.0);
        assert_eq!(results.total_pnl, 0.0);
        assert_eq!(results.win_rate, 0.0);
        assert_eq!(results.profit_factor, 0.0);
        assert_eq!(results.avg_win, 0.0);
        assert_eq!(results.avg_loss, 0.0);
        assert_eq!(results.sharpe_ratio, 0.0);
        assert!(results.monthly_stats.is_empty());
    }

    #[test]
    fn display_report() {
        let trades = vec![trade(JAN, 50.0)];
        let points = curve(&[10_000.0, 10_050.0], 10_000.0);
        let report = BacktestResults::new(trades, points, 10_000.0, 0.0).to_string();

        assert!(report.starts_with("=== Backtest Results ==="));
        assert!(report.contains("Final Equity: 10050.00"));
        assert!(report.contains("Profit Factor: inf"));
        assert!(report.contains("2024-01: +50.00 / -0.00, 1 trades, 100.00% won"));
    }
}
