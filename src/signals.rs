//! Per-bar trading signals.
//!
//! A signal fires only on the bar where a line or threshold is crossed; the
//! bars before and after report [`Signal::Hold`]. Bar 0 always holds since
//! there is no previous bar to compare with.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::{Bar, StrategyVariant, closes};
use crate::indicators::{self, BOLLINGER_PERIOD, BOLLINGER_STD_DEV, MACD_FAST, MACD_SIGNAL, MACD_SLOW, RSI_PERIOD};

/// Fast SMA period of the crossover strategy.
pub const MA_FAST: usize = 20;
/// Slow SMA period of the crossover strategy.
pub const MA_SLOW: usize = 50;
/// RSI level below which the market is oversold.
pub const RSI_OVERSOLD: f64 = 30.0;
/// RSI level above which the market is overbought.
pub const RSI_OVERBOUGHT: f64 = 70.0;

/// A discrete trading decision for one bar.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Signal {
    /// Go long.
    Buy,
    /// Go short.
    Sell,
    /// Do nothing.
    #[default]
    Hold,
}

/// Computes the signal of every bar for `strategy`.
///
/// ```rust
/// use strategy_backtest::prelude::*;
///
/// let bars = (0..60)
///     .map(|i| Bar::from((i, 100.0, 100.0, 100.0, 100.0, 1.0)))
///     .collect::<Vec<_>>();
///
/// let signals = generate_signals(&bars, StrategyVariant::Macd);
/// assert_eq!(signals.len(), bars.len());
/// assert!(signals.iter().all(|s| *s == Signal::Hold));
/// ```
pub fn generate_signals(bars: &[Bar], strategy: StrategyVariant) -> Vec<Signal> {
    let closes = closes(bars);
    let generator = match strategy {
        StrategyVariant::MaCrossover => ma_crossover,
        StrategyVariant::Rsi => rsi_zones,
        StrategyVariant::Bollinger => bollinger_breakout,
        StrategyVariant::Macd => macd_histogram,
    };
    generator(&closes)
}

/// Buy when SMA(20) crosses above SMA(50), sell on the opposite cross.
pub fn ma_crossover(closes: &[f64]) -> Vec<Signal> {
    let fast = indicators::sma(closes, MA_FAST);
    let slow = indicators::sma(closes, MA_SLOW);

    transitions(closes.len(), |prev, i| {
        if fast[prev] <= slow[prev] && fast[i] > slow[i] {
            Signal::Buy
        } else if fast[prev] >= slow[prev] && fast[i] < slow[i] {
            Signal::Sell
        } else {
            Signal::Hold
        }
    })
}

/// Buy when RSI(14) drops into the oversold zone, sell when it rises into the overbought zone.
pub fn rsi_zones(closes: &[f64]) -> Vec<Signal> {
    let rsi = indicators::rsi(closes, RSI_PERIOD);

    transitions(closes.len(), |prev, i| {
        if rsi[prev] > RSI_OVERSOLD && rsi[i] <= RSI_OVERSOLD {
            Signal::Buy
        } else if rsi[prev] < RSI_OVERBOUGHT && rsi[i] >= RSI_OVERBOUGHT {
            Signal::Sell
        } else {
            Signal::Hold
        }
    })
}

/// Buy when the close breaks below the lower band, sell when it breaks above the upper band.
pub fn bollinger_breakout(closes: &[f64]) -> Vec<Signal> {
    let bands = indicators::bollinger_bands(closes, BOLLINGER_PERIOD, BOLLINGER_STD_DEV);

    transitions(closes.len(), |prev, i| {
        if closes[prev] >= bands.lower[prev] && closes[i] < bands.lower[i] {
            Signal::Buy
        } else if closes[prev] <= bands.upper[prev] && closes[i] > bands.upper[i] {
            Signal::Sell
        } else {
            Signal::Hold
        }
    })
}

/// Buy when the MACD histogram turns positive, sell when it turns negative.
pub fn macd_histogram(closes: &[f64]) -> Vec<Signal> {
    let histogram = indicators::macd(closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL).histogram;

    transitions(closes.len(), |prev, i| {
        if histogram[prev] <= 0.0 && histogram[i] > 0.0 {
            Signal::Buy
        } else if histogram[prev] >= 0.0 && histogram[i] < 0.0 {
            Signal::Sell
        } else {
            Signal::Hold
        }
    })
}

/// Evaluates `rule(previous, current)` for every bar after the first.
fn transitions<F>(len: usize, rule: F) -> Vec<Signal>
where
    F: Fn(usize, usize) -> Signal,
{
    let mut signals = vec![Signal::Hold; len];
    for i in 1..len {
        signals[i] = rule(i - 1, i);
    }
    signals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(signals: &[Signal], signal: Signal) -> usize {
        signals.iter().filter(|s| **s == signal).count()
    }

    fn golden_closes() -> Vec<f64> {
        let mut closes = vec![100.0; 20];
        closes.extend((105..=130).map(f64::from));
        closes
    }

    #[test]
    fn empty_series() {
        assert!(ma_crossover(&[]).is_empty());
        assert!(rsi_zones(&[]).is_empty());
        assert!(bollinger_breakout(&[]).is_empty());
        assert!(macd_histogram(&[]).is_empty());
        assert!(generate_signals(&[], StrategyVariant::Rsi).is_empty());
    }

    #[test]
    fn first_bar_holds() {
        let closes = golden_closes();
        for generator in [ma_crossover, rsi_zones, bollinger_breakout, macd_histogram] {
            assert_eq!(generator(&closes)[0], Signal::Hold);
        }
    }

    #[test]
    fn ma_crossover_golden_cross() {
        let signals = ma_crossover(&golden_closes());
        assert_eq!(count(&signals, Signal::Buy), 1);
        assert_eq!(count(&signals, Signal::Sell), 0);
        assert_eq!(signals[20], Signal::Buy);
    }

    #[test]
    fn ma_crossover_death_cross() {
        let mut closes = vec![100.0; 20];
        closes.extend((70..=95).rev().map(f64::from));
        let signals = ma_crossover(&closes);
        assert_eq!(count(&signals, Signal::Sell), 1);
        assert_eq!(count(&signals, Signal::Buy), 0);
        assert_eq!(signals[20], Signal::Sell);
    }

    #[test]
    fn rsi_zone_entries() {
        // 15 rising bars push RSI to 100, then a slide drags it under 30
        let mut closes = (0..15).map(|i| 100.0 + i as f64).collect::<Vec<_>>();
        closes.extend((1..=20).map(|i| 114.0 - 2.0 * i as f64));
        let signals = rsi_zones(&closes);

        assert_eq!(signals[14], Signal::Sell);
        assert_eq!(count(&signals, Signal::Sell), 1);
        assert_eq!(count(&signals, Signal::Buy), 1);
        let buy = signals.iter().position(|s| *s == Signal::Buy).unwrap();
        assert!(buy > 14);
    }

    #[test]
    fn bollinger_breakouts() {
        let mut closes = (0..30).map(|i| 100.0 + if i % 2 == 0 { 1.0 } else { -1.0 }).collect::<Vec<_>>();
        closes.push(80.0);
        closes.push(99.0);
        closes.push(130.0);
        let signals = bollinger_breakout(&closes);

        assert_eq!(signals[30], Signal::Buy);
        assert_eq!(signals[32], Signal::Sell);
        assert_eq!(count(&signals, Signal::Buy), 1);
        assert_eq!(count(&signals, Signal::Sell), 1);
    }

    #[test]
    fn macd_sign_changes() {
        let mut closes = vec![100.0; 5];
        closes.extend((1..=30).map(|i| 100.0 + i as f64));
        closes.extend((1..=30).map(|i| 130.0 - 2.0 * i as f64));
        let signals = macd_histogram(&closes);

        assert_eq!(signals[5], Signal::Buy);
        assert_eq!(count(&signals, Signal::Buy), 1);
        assert!(count(&signals, Signal::Sell) >= 1);
        let sell = signals.iter().position(|s| *s == Signal::Sell).unwrap();
        assert!(sell > 35);
    }

    #[test]
    fn constant_prices_never_cross() {
        let closes = vec![100.0; 80];
        for generator in [ma_crossover, bollinger_breakout, macd_histogram] {
            assert!(generator(&closes).iter().all(|s| *s == Signal::Hold));
        }
    }
}
