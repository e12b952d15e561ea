#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{PercentCalculus, signals::Signal};

/// Direction of a position.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSide {
    /// Profits when the price rises.
    Long,
    /// Profits when the price falls.
    Short,
}

impl PositionSide {
    /// Maps an entry signal to a side. `Hold` opens nothing.
    pub fn from_signal(signal: Signal) -> Option<Self> {
        match signal {
            Signal::Buy => Some(Self::Long),
            Signal::Sell => Some(Self::Short),
            Signal::Hold => None,
        }
    }

    /// Returns true if `signal` points the other way.
    pub fn is_opposed_by(&self, signal: Signal) -> bool {
        matches!((self, signal), (Self::Long, Signal::Sell) | (Self::Short, Signal::Buy))
    }
}

/// The single open position of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    side: PositionSide,
    entry_price: f64,
    entry_time: i64,
    size: f64,
}

impl From<(PositionSide, f64, i64, f64)> for Position {
    fn from((side, entry_price, entry_time, size): (PositionSide, f64, i64, f64)) -> Self {
        Self {
            side,
            entry_price,
            entry_time,
            size,
        }
    }
}

impl Position {
    /// Returns the side.
    pub fn side(&self) -> PositionSide {
        self.side
    }

    /// Returns the entry price.
    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    /// Returns the entry timestamp.
    pub fn entry_time(&self) -> i64 {
        self.entry_time
    }

    /// Returns the quantity of base asset held.
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Leverage-scaled price move since entry, in percent of the entry price.
    pub fn pnl_percent(&self, price: f64, leverage: f64) -> f64 {
        let change = self.entry_price.change(price);
        match self.side {
            PositionSide::Long => change * leverage,
            PositionSide::Short => -change * leverage,
        }
    }

    /// Gross profit or loss if closed at `exit_price`, before commission.
    pub fn estimate_pnl(&self, exit_price: f64, leverage: f64) -> f64 {
        let delta = match self.side {
            PositionSide::Long => exit_price - self.entry_price,
            PositionSide::Short => self.entry_price - exit_price,
        };
        delta * self.size * leverage
    }

    /// Commission charged on both legs: `(entry + exit) × size × commission%`.
    pub fn round_trip_fees(&self, exit_price: f64, commission: f64) -> f64 {
        let entry_value = self.entry_price * self.size;
        let exit_value = exit_price * self.size;
        entry_value.how_many(commission) + exit_value.how_many(commission)
    }
}
