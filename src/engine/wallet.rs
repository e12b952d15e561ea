#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Tracks the realized equity of a run.
///
/// Equity only moves when a position closes; the wallet never refuses a
/// settlement, so a run with extreme leverage can end below zero.
#[derive(Debug, Clone)]
pub struct Wallet {
    // Initial balance used for reset
    initial_balance: f64,
    // Realized equity
    equity: f64,
    // Cumulative fees paid
    fees: f64,
}

impl Wallet {
    /// Creates a new wallet with the given initial balance.
    /// Zero and negative balances are rejected.
    pub fn new(balance: f64) -> Result<Self> {
        if balance <= 0.0 || !balance.is_finite() {
            return Err(Error::NegZeroCapital(balance));
        }

        Ok(Self {
            fees: 0.0,
            equity: balance,
            initial_balance: balance,
        })
    }

    /// Returns the initial balance.
    pub fn initial_balance(&self) -> f64 {
        self.initial_balance
    }

    /// Returns the realized equity.
    pub fn equity(&self) -> f64 {
        self.equity
    }

    /// Returns the equity gained or lost since the start.
    pub fn pnl(&self) -> f64 {
        self.equity - self.initial_balance
    }

    /// Returns the fees paid to the market.
    pub fn fees_paid(&self) -> f64 {
        self.fees
    }

    /// Realizes a closed position and returns its net result.
    ///
    /// ### Arguments
    /// * `gross_pnl` - Directional profit or loss, leverage included.
    /// * `fees` - Commission charged on both legs.
    pub(crate) fn settle(&mut self, gross_pnl: f64, fees: f64) -> f64 {
        let net_pnl = gross_pnl - fees;
        self.equity += net_pnl;
        self.fees += fees;
        net_pnl
    }

    /// Snapshot of the wallet at `time`.
    pub(crate) fn point(&self, time: i64) -> EquityPoint {
        EquityPoint {
            time,
            equity: self.equity,
            pnl: self.pnl(),
        }
    }

    /// Resets the wallet to its initial balance.
    pub(crate) fn reset(&mut self) {
        self.fees = 0.0;
        self.equity = self.initial_balance;
    }
}

/// Equity after one bar.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    /// Timestamp of the bar.
    pub time: i64,
    /// Realized equity.
    pub equity: f64,
    /// Equity gained or lost since the start.
    pub pnl: f64,
}

#[cfg(test)]
#[test]
fn new_wallet_valid_balance() {
    let wallet = Wallet::new(100.0).unwrap();
    assert_eq!(wallet.equity(), 100.0);
    assert_eq!(wallet.pnl(), 0.0);
    assert_eq!(wallet.fees_paid(), 0.0);
}

#[cfg(test)]
#[test]
fn new_wallet_invalid_balance() {
    let result = Wallet::new(0.0);
    assert!(matches!(result, Err(Error::NegZeroCapital(_))));

    let result = Wallet::new(-10.0);
    assert!(matches!(result, Err(Error::NegZeroCapital(_))));

    let result = Wallet::new(f64::NAN);
    assert!(matches!(result, Err(Error::NegZeroCapital(_))));
}

#[cfg(test)]
#[test]
fn settle_profit() {
    let mut wallet = Wallet::new(100.0).unwrap();
    let net = wallet.settle(10.0, 0.5);
    assert_eq!(net, 9.5);
    assert_eq!(wallet.equity(), 109.5);
    assert_eq!(wallet.pnl(), 9.5);
    assert_eq!(wallet.fees_paid(), 0.5);
}

#[cfg(test)]
#[test]
fn settle_loss_below_zero() {
    let mut wallet = Wallet::new(100.0).unwrap();
    let net = wallet.settle(-150.0, 0.0);
    assert_eq!(net, -150.0);
    assert_eq!(wallet.equity(), -50.0);
}

#[cfg(test)]
#[test]
fn equity_point() {
    let mut wallet = Wallet::new(100.0).unwrap();
    wallet.settle(-20.0, 0.0);
    let point = wallet.point(42);
    assert_eq!(
        point,
        EquityPoint {
            time: 42,
            equity: 80.0,
            pnl: -20.0
        }
    );
}

#[cfg(test)]
#[test]
fn reset_wallet() {
    let mut wallet = Wallet::new(100.0).unwrap();
    wallet.settle(10.0, 0.2);

    wallet.reset();
    assert_eq!(wallet.fees_paid(), 0.0);
    assert_eq!(wallet.equity(), 100.0);
}
