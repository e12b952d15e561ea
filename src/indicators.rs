//! Technical indicators over a price series.
//!
//! Every function returns a series with the same length as its input so that
//! index `i` of the output lines up with bar `i`. Warm-up values are derived
//! from the available prefix instead of being left undefined:
//! - `sma` averages the bars seen so far until the window is full.
//! - `ema` is seeded with the first price.
//! - `rsi` reports a neutral 50 until `period` price changes are available.
//! - `bollinger_bands` uses `price × 1.02` / `price × 0.98` until the window is full.
//!
//! An empty input always yields empty output.

/// Default RSI look-back.
pub const RSI_PERIOD: usize = 14;
/// Default Bollinger Bands window.
pub const BOLLINGER_PERIOD: usize = 20;
/// Default Bollinger Bands width in standard deviations.
pub const BOLLINGER_STD_DEV: f64 = 2.0;
/// Default MACD fast EMA period.
pub const MACD_FAST: usize = 12;
/// Default MACD slow EMA period.
pub const MACD_SLOW: usize = 26;
/// Default MACD signal EMA period.
pub const MACD_SIGNAL: usize = 9;

/// RSI value reported before enough history is available.
const RSI_NEUTRAL: f64 = 50.0;
/// Upper band multiplier used before the Bollinger window is full.
const WARMUP_UPPER: f64 = 1.02;
/// Lower band multiplier used before the Bollinger window is full.
const WARMUP_LOWER: f64 = 0.98;

/// Simple moving average.
///
/// ### Arguments
/// * `data` - The price series.
/// * `period` - The window length. A period of 0 is treated as 1.
///
/// ### Returns
/// For each index `i`, the mean of the trailing `min(i + 1, period)` values.
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    let period = period.max(1);
    (0..data.len())
        .map(|i| {
            let window = &data[(i + 1).saturating_sub(period)..=i];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}

/// Exponential moving average seeded with the first price.
///
/// `ema[i] = (price[i] - ema[i - 1]) × 2 / (period + 1) + ema[i - 1]`
///
/// The recurrence is a single forward fold; each value depends on the previous one.
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut result = Vec::with_capacity(data.len());
    let mut previous = None;

    for &price in data {
        let current = match previous {
            None => price,
            Some(prev) => (price - prev) * multiplier + prev,
        };
        result.push(current);
        previous = Some(current);
    }

    result
}

/// Relative strength index over a trailing window of price changes.
///
/// The first `period` entries are 50. Afterwards the average gain and average
/// loss are taken over the last `period` changes; when the average loss is 0
/// the RSI is 100.
pub fn rsi(data: &[f64], period: usize) -> Vec<f64> {
    let period = period.max(1);
    let n = data.len();
    let mut result = vec![RSI_NEUTRAL; n];
    if n <= period {
        return result;
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = data
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    // change `j` is the move into bar `j + 1`
    for j in (period - 1)..gains.len() {
        let window = (j + 1 - period)..=j;
        let avg_gain = gains[window.clone()].iter().sum::<f64>() / period as f64;
        let avg_loss = losses[window].iter().sum::<f64>() / period as f64;

        result[j + 1] = if avg_loss == 0.0 {
            100.0
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - (100.0 / (1.0 + rs))
        };
    }

    result
}

/// Upper, middle and lower Bollinger Bands.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BollingerBands {
    /// `middle + k × σ`
    pub upper: Vec<f64>,
    /// Simple moving average of the window.
    pub middle: Vec<f64>,
    /// `middle - k × σ`
    pub lower: Vec<f64>,
}

/// Bollinger Bands using the population standard deviation of the trailing window.
///
/// ### Arguments
/// * `data` - The price series.
/// * `period` - The window length.
/// * `std_dev` - Band width in standard deviations.
///
/// ### Returns
/// The three bands. Until the window is full, upper and lower are
/// `price × 1.02` and `price × 0.98`.
pub fn bollinger_bands(data: &[f64], period: usize, std_dev: f64) -> BollingerBands {
    let period = period.max(1);
    let middle = sma(data, period);
    let mut upper = Vec::with_capacity(data.len());
    let mut lower = Vec::with_capacity(data.len());

    for (i, &price) in data.iter().enumerate() {
        if i + 1 < period {
            upper.push(price * WARMUP_UPPER);
            lower.push(price * WARMUP_LOWER);
            continue;
        }

        let mean = middle[i];
        let window = &data[i + 1 - period..=i];
        let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
        let sigma = variance.sqrt();

        upper.push(mean + std_dev * sigma);
        lower.push(mean - std_dev * sigma);
    }

    BollingerBands { upper, middle, lower }
}

/// MACD line, signal line and histogram.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Macd {
    /// `EMA(fast) - EMA(slow)`
    pub macd: Vec<f64>,
    /// `EMA(macd, signal)`
    pub signal: Vec<f64>,
    /// `macd - signal`
    pub histogram: Vec<f64>,
}

/// Moving average convergence divergence.
pub fn macd(data: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let ema_fast = ema(data, fast);
    let ema_slow = ema(data, slow);

    let macd = ema_fast.iter().zip(&ema_slow).map(|(f, s)| f - s).collect::<Vec<_>>();
    let signal = ema(&macd, signal);
    let histogram = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();

    Macd { macd, signal, histogram }
}
