mod utils;

use strategy_backtest::prelude::*;
use utils::{example_bars, init_logging};

struct RiskGrid;

impl ParameterCombination for RiskGrid {
    type Output = (StrategyVariant, f64, f64);

    fn generate() -> Vec<Self::Output> {
        StrategyVariant::ALL
            .into_iter()
            .flat_map(|strategy| {
                (1..=5).flat_map(move |sl| (1..=5).map(move |tp| (strategy, sl as f64, tp as f64 * 2.0)))
            })
            .collect()
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let bars = example_bars();
    let config = BacktestConfigBuilder::builder()
        .position_size(25.0)
        .leverage(5.0)
        .build()?;

    println!("=== Strategies ===");
    for (strategy, results) in compare_strategies(&bars, &config)? {
        println!(
            "{strategy:<14} pnl {:>10.2}  win rate {:>6.2}%  max dd {:>6.2}%  sharpe {:>6.2}",
            results.total_pnl, results.win_rate, results.max_drawdown_percent, results.sharpe_ratio
        );
    }

    let mut sweep = Optimizer::<RiskGrid>::new(bars, config).with(|&(strategy, stop_loss, take_profit), base| {
        BacktestConfigBuilder::builder()
            .strategy(strategy)
            .initial_capital(base.initial_capital())
            .position_size(base.position_size())
            .commission(base.commission())
            .leverage(base.leverage())
            .stop_loss(stop_loss)
            .take_profit(take_profit)
            .build()
    })?;
    sweep.sort_by(|(_, a), (_, b)| b.total_pnl.total_cmp(&a.total_pnl));

    println!("\n=== Best stop-loss / take-profit ===");
    for ((strategy, stop_loss, take_profit), results) in sweep.iter().take(5) {
        println!(
            "{strategy:<14} SL {stop_loss:>4.1}% TP {take_profit:>4.1}%  pnl {:>10.2}",
            results.total_pnl
        );
    }

    Ok(())
}
