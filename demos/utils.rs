use chrono::{DateTime, Duration};
use strategy_backtest::engine::{Bar, BarBuilder};
use tracing_subscriber::EnvFilter;

/// Generates deterministic hourly bars.
pub fn generate_sample_bars(max: i32, seed: i32, base_price: f64) -> Vec<Bar> {
    // 2024-01-01T00:00:00Z
    let mut open_time = DateTime::from_timestamp(1_704_067_200, 0).unwrap_or_default();
    let mut open = base_price;

    (0..=max)
        .map(|i| {
            // Slow cycle so the crossovers have room to develop
            let trend = 20.0 * (i as f64 * 0.01 + seed as f64).sin();
            // Faster wiggle on top
            let variation = 4.0 * (i as f64 * 0.3 + seed as f64).sin();

            let close = base_price + trend + variation;
            let high = open.max(close) + 0.3 * variation.abs();
            let low = open.min(close) - 0.3 * variation.abs();
            // Volume with seasonal pattern
            let volume = 1000.0 + 500.0 * ((i as f64 * 0.2).sin()).abs();

            let bar = BarBuilder::builder()
                .time(open_time.timestamp_millis())
                .open(open)
                .high(high)
                .low(low)
                .close(close)
                .volume(volume)
                .build()
                .unwrap();

            open_time += Duration::hours(1);
            open = close;
            bar
        })
        .collect()
}

pub fn example_bars() -> Vec<Bar> {
    generate_sample_bars(3000, 42, 100.0)
}

/// Logs to stderr, filtered by `RUST_LOG` (e.g. `RUST_LOG=strategy_backtest=debug`).
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

#[allow(dead_code)]
fn main() {}
