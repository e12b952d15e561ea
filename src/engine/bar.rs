#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// One OHLCV sample.
///
/// `time` is an opaque, sortable token; the engine only reads it to bucket
/// trades by month, interpreting it as epoch milliseconds. When deserialized,
/// the time and prices may also be quoted (`"1700000000000"`).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::utils::number_or_string::deserialize"))]
    time: i64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::utils::number_or_string::deserialize"))]
    open: f64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::utils::number_or_string::deserialize"))]
    high: f64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::utils::number_or_string::deserialize"))]
    low: f64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::utils::number_or_string::deserialize"))]
    close: f64,
    #[cfg_attr(
        feature = "serde",
        serde(default, deserialize_with = "crate::utils::number_or_string::deserialize")
    )]
    volume: f64,
}

impl From<(i64, f64, f64, f64, f64, f64)> for Bar {
    fn from((time, open, high, low, close, volume): (i64, f64, f64, f64, f64, f64)) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl Bar {
    /// Returns the bar timestamp (epoch milliseconds).
    pub fn time(&self) -> i64 {
        self.time
    }

    /// Returns the open price.
    pub fn open(&self) -> f64 {
        self.open
    }

    /// Returns the high price.
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Returns the low price.
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Returns the close price.
    pub fn close(&self) -> f64 {
        self.close
    }

    /// Returns the traded volume.
    pub fn volume(&self) -> f64 {
        self.volume
    }
}

/// Builder for [`Bar`] that checks prices before handing the bar out.
///
/// ```rust
/// use strategy_backtest::prelude::*;
///
/// let bar = BarBuilder::builder()
///     .time(1_700_000_000_000)
///     .open(100.0)
///     .high(110.0)
///     .low(95.0)
///     .close(105.0)
///     .volume(12.5)
///     .build()
///     .unwrap();
///
/// assert_eq!(bar.close(), 105.0);
/// ```
#[derive(Debug, Default)]
pub struct BarBuilder {
    time: Option<i64>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

impl BarBuilder {
    /// Starts an empty builder.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Sets the timestamp (epoch milliseconds).
    pub fn time(mut self, time: i64) -> Self {
        self.time = Some(time);
        self
    }

    /// Sets the open price.
    pub fn open(mut self, open: f64) -> Self {
        self.open = Some(open);
        self
    }

    /// Sets the high price.
    pub fn high(mut self, high: f64) -> Self {
        self.high = Some(high);
        self
    }

    /// Sets the low price.
    pub fn low(mut self, low: f64) -> Self {
        self.low = Some(low);
        self
    }

    /// Sets the close price.
    pub fn close(mut self, close: f64) -> Self {
        self.close = Some(close);
        self
    }

    /// Sets the volume. Defaults to 0 when omitted.
    pub fn volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Builds the bar.
    ///
    /// ### Returns
    /// The bar, or an error if a price is missing, not finite, not positive,
    /// or if `high < low`.
    pub fn build(self) -> Result<Bar> {
        let time = self.time.ok_or(Error::MissingField("time"))?;
        let open = self.open.ok_or(Error::MissingField("open"))?;
        let high = self.high.ok_or(Error::MissingField("high"))?;
        let low = self.low.ok_or(Error::MissingField("low"))?;
        let close = self.close.ok_or(Error::MissingField("close"))?;
        let volume = self.volume.unwrap_or_default();

        for price in [open, high, low, close] {
            if price <= 0.0 || !price.is_finite() {
                return Err(Error::BarPrice(price));
            }
        }
        if high < low {
            return Err(Error::BarRange(high, low));
        }

        Ok(Bar {
            time,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

/// Extracts the close price of every bar.
pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(Bar::close).collect()
}
