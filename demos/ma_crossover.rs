mod utils;

use strategy_backtest::prelude::*;
use utils::{example_bars, init_logging};

fn main() -> anyhow::Result<()> {
    init_logging();

    // Load real klines with `get_bars_from_file("data/btc.json".into())` under the `serde` feature.
    let bars = example_bars();

    let config = BacktestConfigBuilder::builder()
        .strategy(StrategyVariant::MaCrossover)
        .initial_capital(1_000.0)
        .position_size(50.0)
        .commission(0.1)
        .leverage(3.0)
        .stop_loss(4.0)
        .take_profit(9.0)
        .build()?;

    let results = run_backtest(&bars, &config)?;
    println!("{results}");

    for trade in results.trades.iter().take(5) {
        println!(
            "{:?} {:.2} -> {:.2}: {:+.2} ({})",
            trade.side, trade.entry_price, trade.exit_price, trade.pnl, trade.reason
        );
    }

    Ok(())
}
