use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::engine::{Backtest, BacktestConfig, Bar, BarBuilder};
use crate::errors::Result;
use crate::metrics::BacktestResults;

// "open_time": 1759813200000,
// "open_price": 124499.99,
// "high_price": 124640.76,
// "low_price": 124240.37,
// "close_price": 124414.17,
// "volume": 424.20697,
// "close_time": 1759816799999,
// ...

/// One kline as exported by exchanges, timestamps in epoch milliseconds.
///
/// Every field may come as a JSON number or as a numeric string.
#[derive(Debug, Clone, Deserialize)]
struct KlineRecord {
    #[serde(alias = "time", alias = "openTime", deserialize_with = "number_or_string::deserialize")]
    open_time: i64,
    #[serde(alias = "open_price", deserialize_with = "number_or_string::deserialize")]
    open: f64,
    #[serde(alias = "high_price", deserialize_with = "number_or_string::deserialize")]
    high: f64,
    #[serde(alias = "low_price", deserialize_with = "number_or_string::deserialize")]
    low: f64,
    #[serde(alias = "close_price", deserialize_with = "number_or_string::deserialize")]
    close: f64,
    #[serde(default, deserialize_with = "number_or_string::deserialize")]
    volume: f64,
}

impl TryFrom<KlineRecord> for Bar {
    type Error = crate::errors::Error;

    fn try_from(record: KlineRecord) -> Result<Self> {
        BarBuilder::builder()
            .time(record.open_time)
            .open(record.open)
            .high(record.high)
            .low(record.low)
            .close(record.close)
            .volume(record.volume)
            .build()
    }
}

/// Parses a JSON array of klines into bars.
pub fn get_bars_from_str(json: &str) -> Result<Vec<Bar>> {
    let records: Vec<KlineRecord> = serde_json::from_str(json)?;
    records.into_iter().map(Bar::try_from).collect()
}

/// Reads a JSON array of klines from `filepath` and returns the bars.
///
/// Every record goes through [`BarBuilder`], so non-positive prices and
/// inverted ranges are rejected.
pub fn get_bars_from_file(filepath: PathBuf) -> Result<Vec<Bar>> {
    use std::{fs::File, io::BufReader};

    let file = File::open(filepath)?;
    let reader = BufReader::new(file);
    let records: Vec<KlineRecord> = serde_json::from_reader(reader)?;
    records.into_iter().map(Bar::try_from).collect()
}

/// A backtest job as posted by a client: the bars plus the settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestRequest {
    /// Bars ordered by time.
    pub bars: Vec<Bar>,
    /// Strategy and risk settings.
    #[serde(default)]
    pub config: BacktestConfig,
}

impl BacktestRequest {
    /// Runs the requested backtest.
    ///
    /// ```rust
    /// use strategy_backtest::prelude::*;
    ///
    /// let json = r#"{
    ///     "bars": [{"time": 0, "open": 1.0, "high": 1.0, "low": 1.0, "close": 1.0, "volume": 0.0}],
    ///     "config": {"strategy": "rsi", "initialCapital": 500.0}
    /// }"#;
    ///
    /// let request: BacktestRequest = serde_json::from_str(json).unwrap();
    /// let results = request.run().unwrap();
    /// assert_eq!(results.final_equity, 500.0);
    /// ```
    pub fn run(self) -> Result<BacktestResults> {
        Backtest::new(self.bars.into(), self.config)
            .map(|mut backtest| backtest.run())
    }
}

/// Reads a number that may be quoted, as exchange APIs and browsers send
/// timestamps and prices.
pub mod number_or_string {
    use std::{fmt::Display, str::FromStr};

    use serde::{Deserialize, Deserializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr<T> {
        Number(T),
        Text(String),
    }

    /// Accepts `1700000000000` as well as `"1700000000000"`.
    pub fn deserialize<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + FromStr,
        T::Err: Display,
    {
        match Repr::<T>::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => text.trim().parse().map_err(de::Error::custom),
        }
    }
}

/// Serializes non-finite floats as the JSON strings `"Infinity"`,
/// `"-Infinity"` and `"NaN"`, which plain JSON numbers cannot carry.
pub mod non_finite {
    use serde::{Deserialize, Deserializer, Serializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    /// Writes finite values as numbers and the others as strings.
    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_sign_positive() {
            serializer.serialize_str("Infinity")
        } else {
            serializer.serialize_str("-Infinity")
        }
    }

    /// Reads a number or one of the non-finite strings.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                "NaN" => Ok(f64::NAN),
                other => Err(de::Error::custom(format!("invalid float `{other}`"))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::engine::StrategyVariant;
    use crate::errors::Error;

    #[test]
    fn parse_exchange_klines() {
        let json = r#"[
            {"open_time": 1759813200000, "open_price": 124499.99, "high_price": 124640.76,
             "low_price": 124240.37, "close_price": 124414.17, "volume": 424.20697,
             "close_time": 1759816799999, "number_of_trades": 102055},
            {"time": 1759816800000, "open": 124414.17, "high": 124500.0,
             "low": 124300.0, "close": 124450.0}
        ]"#;
        let bars = get_bars_from_str(json).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].time(), 1_759_813_200_000);
        assert_eq!(bars[0].close(), 124_414.17);
        assert_eq!(bars[1].volume(), 0.0);
    }

    #[test]
    fn reject_invalid_kline() {
        let json = r#"[{"time": 0, "open": 10.0, "high": 9.0, "low": 11.0, "close": 10.0}]"#;
        assert!(matches!(get_bars_from_str(json), Err(Error::BarRange(_, _))));

        let json = r#"[{"time": 0, "open": 10.0}]"#;
        assert!(matches!(get_bars_from_str(json), Err(Error::JsonError(_))));
    }

    #[test]
    fn parse_quoted_klines() {
        let json = r#"[
            {"time": "1700000000000", "open": "37000.5", "high": "37100", "low": "36900.25",
             "close": "37050", "volume": "12.5"},
            {"time": 1700003600000, "open": "37050", "high": 37200.0, "low": "37000",
             "close": 37150.0}
        ]"#;
        let bars = get_bars_from_str(json).unwrap();

        assert_eq!(bars[0].time(), 1_700_000_000_000);
        assert_eq!(bars[0].low(), 36_900.25);
        assert_eq!(bars[0].volume(), 12.5);
        assert_eq!(bars[1].time(), 1_700_003_600_000);
        assert_eq!(bars[1].open(), 37_050.0);

        let json = r#"[{"time": "yesterday", "open": 1.0, "high": 1.0, "low": 1.0, "close": 1.0}]"#;
        assert!(matches!(get_bars_from_str(json), Err(Error::JsonError(_))));
    }

    #[test]
    fn request_with_string_times() {
        let json = r#"{
            "bars": [
                {"time": "1700000000000", "open": 100.0, "high": 101.0, "low": 99.0, "close": 100.5, "volume": 3.0},
                {"time": 1700003600000, "open": "100.5", "high": "102", "low": "100", "close": "101.5", "volume": "4"}
            ],
            "config": {"strategy": "macd"}
        }"#;
        let request: BacktestRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.bars[0].time(), 1_700_000_000_000);
        assert_eq!(request.bars[1].close(), 101.5);
        let results = request.run().unwrap();
        assert_eq!(results.equity_curve.len(), 2);
        assert_eq!(results.equity_curve[1].time, 1_700_003_600_000);
    }

    #[test]
    fn missing_file() {
        let result = get_bars_from_file(PathBuf::from("does/not/exist.json"));
        assert!(matches!(result, Err(Error::IoError(_))));
    }

    #[test]
    fn request_defaults_missing_config() {
        let json = r#"{"bars": [], "config": {"strategy": "bollinger", "stopLoss": 3.0}}"#;
        let request: BacktestRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.config.strategy(), StrategyVariant::Bollinger);
        assert_eq!(request.config.initial_capital(), 10_000.0);
        assert_eq!(request.config.stop_loss(), Some(3.0));
        assert_eq!(request.run().unwrap().total_trades, 0);
    }

    #[test]
    fn results_json_fields() {
        let closes = (0..20).map(f64::from).map(|i| 100.0 + i).collect::<Vec<_>>();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::from((i as i64, c, c, c, c, 1.0)))
            .collect();
        let results = BacktestRequest {
            bars,
            config: BacktestConfig::default(),
        }
        .run()
        .unwrap();

        let value = serde_json::to_value(&results).unwrap();
        for key in [
            "trades",
            "equityCurve",
            "totalPnL",
            "totalPnLPercent",
            "winRate",
            "profitFactor",
            "maxDrawdown",
            "maxDrawdownPercent",
            "sharpeRatio",
            "monthlyStats",
        ] {
            assert!(value.get(key).is_some(), "missing `{key}`");
        }
    }

    #[test]
    fn all_winning_run_serializes_infinity() {
        let mut closes = vec![100.0; 20];
        closes.extend((105..=130).map(f64::from));
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::from((1_704_067_200_000 + i as i64 * 3_600_000, c, c, c, c, 1.0)))
            .collect();
        let results = BacktestRequest {
            bars,
            config: BacktestConfig::default(),
        }
        .run()
        .unwrap();
        assert_eq!(results.total_trades, 1);
        assert_eq!(results.losing_trades, 0);
        assert_eq!(results.profit_factor, f64::INFINITY);

        let json = serde_json::to_string(&results).unwrap();
        assert!(json.contains(r#""profitFactor":"Infinity""#));

        let back: BacktestResults = serde_json::from_str(&json).unwrap();
        assert_eq!(back.profit_factor, f64::INFINITY);
        assert_eq!(back.total_trades, 1);
        assert_eq!(back.trades[0].reason, results.trades[0].reason);
    }

    #[test]
    fn infinite_profit_factor_round_trips() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper(#[serde(with = "non_finite")] f64);

        assert_eq!(serde_json::to_string(&Wrapper(f64::INFINITY)).unwrap(), r#""Infinity""#);
        assert_eq!(serde_json::to_string(&Wrapper(1.5)).unwrap(), "1.5");

        let back: Wrapper = serde_json::from_str(r#""Infinity""#).unwrap();
        assert_eq!(back.0, f64::INFINITY);
        let back: Wrapper = serde_json::from_str("2.0").unwrap();
        assert_eq!(back.0, 2.0);
        assert!(serde_json::from_str::<Wrapper>(r#""lots""#).is_err());
    }
}
