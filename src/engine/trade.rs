use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::PositionSide;

/// Why a position was closed.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// An opposing signal fired.
    Signal,
    /// The leveraged loss reached the stop-loss percent.
    StopLoss,
    /// The leveraged gain reached the take-profit percent.
    TakeProfit,
    /// The data ran out while the position was open.
    EndOfPeriod,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Signal => "Signal",
            Self::StopLoss => "Stop-Loss",
            Self::TakeProfit => "Take-Profit",
            Self::EndOfPeriod => "End of backtest",
        };
        f.write_str(reason)
    }
}

/// A completed round trip, appended to the trade log when its position closes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosedTrade {
    /// Timestamp of the entry bar.
    pub entry_time: i64,
    /// Timestamp of the exit bar.
    pub exit_time: i64,
    /// Fill price of the entry.
    pub entry_price: f64,
    /// Fill price of the exit.
    pub exit_price: f64,
    /// Direction of the position.
    pub side: PositionSide,
    /// Quantity of base asset.
    pub size: f64,
    /// Realized profit or loss, net of commission.
    pub pnl: f64,
    /// `pnl` relative to the equity held when the trade closed, in percent.
    pub pnl_percent: f64,
    /// Commission charged on both legs.
    pub fees: f64,
    /// Why the trade closed.
    pub reason: CloseReason,
}

impl ClosedTrade {
    /// Returns true for a strictly positive net result.
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    /// Returns true for a strictly negative net result.
    pub fn is_loss(&self) -> bool {
        self.pnl < 0.0
    }
}
