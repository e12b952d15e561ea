//! Strategy parameter optimization.
//!
//! This module runs many backtests over the same bars in parallel. The
//! `Optimizer` struct handles the execution for each combination, while the
//! `ParameterCombination` trait defines how to generate parameter sets.

use std::marker::PhantomData;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::info;

use crate::engine::{Backtest, BacktestConfig, Bar, StrategyVariant};
use crate::errors::Result;
use crate::metrics::BacktestResults;

/// Trait defining how to generate parameter combinations for optimization.
///
/// Implement this trait for your parameter types to define how combinations should be generated.
pub trait ParameterCombination: Sync {
    /// Type representing a single parameter combination (e.g., `(f64, f64)`).
    type Output: Clone + Send + Sync;

    /// Generates all possible parameter combinations to test.
    fn generate() -> Vec<Self::Output>;
}

/// Every strategy variant with the base settings.
pub struct Strategies;

impl ParameterCombination for Strategies {
    type Output = StrategyVariant;

    fn generate() -> Vec<Self::Output> {
        StrategyVariant::ALL.to_vec()
    }
}

/// Runs backtests for every parameter combination over shared bars.
#[derive(Debug, Clone)]
pub struct Optimizer<PC: ParameterCombination> {
    data: Arc<[Bar]>,
    config: BacktestConfig,
    _marker: PhantomData<PC>,
}

impl<PC: ParameterCombination> From<&Backtest> for Optimizer<PC> {
    fn from(value: &Backtest) -> Self {
        Self {
            data: value.bars().copied().collect(),
            config: value.config().clone(),
            _marker: PhantomData,
        }
    }
}

impl<PC: ParameterCombination> Optimizer<PC> {
    /// Creates a new `Optimizer`.
    ///
    /// # Arguments
    /// * `data` - Historical bars shared by every run.
    /// * `config` - Base settings handed to the combinator.
    pub fn new(data: impl Into<Arc<[Bar]>>, config: BacktestConfig) -> Self {
        Self {
            data: data.into(),
            config,
            _marker: PhantomData,
        }
    }

    /// Runs one backtest per parameter combination.
    ///
    /// # Arguments
    /// * `combinator` - Derives the settings of a run from a combination and the base settings.
    ///
    /// # Returns
    /// Each combination with its results, in the order `PC::generate` produced them.
    ///
    /// # Errors
    /// Returns the first error raised by the combinator or by a backtest setup.
    pub fn with<C>(&self, combinator: C) -> Result<Vec<(PC::Output, BacktestResults)>>
    where
        C: Fn(&PC::Output, &BacktestConfig) -> Result<BacktestConfig> + Sync,
    {
        let num_cpus = num_cpus::get();
        let combinations = PC::generate();
        let chunk_size = combinations.len().div_ceil(num_cpus).max(1);

        info!(combinations = combinations.len(), chunk_size, "Optimizing");

        combinations
            .par_chunks(chunk_size)
            .map::<_, Result<_>>(|par_combinations| {
                let mut local_results = Vec::with_capacity(par_combinations.len());

                for param_set in par_combinations {
                    let config = combinator(param_set, &self.config)?;
                    let mut backtest = Backtest::new(Arc::clone(&self.data), config)?;
                    local_results.push((param_set.clone(), backtest.run()));
                }

                Ok(local_results)
            })
            .collect::<Result<Vec<_>>>()
            .map(|chunks| chunks.into_iter().flatten().collect())
    }
}

/// Runs every strategy variant over `bars` with the capital and risk settings of `config`.
///
/// Results come back in [`StrategyVariant::ALL`] order.
pub fn compare_strategies(bars: &[Bar], config: &BacktestConfig) -> Result<Vec<(StrategyVariant, BacktestResults)>> {
    Optimizer::<Strategies>::new(bars, config.clone()).with(|variant, base| Ok(base.with_strategy(*variant)))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::engine::{BacktestConfigBuilder, run_backtest};
    use crate::errors::Error;

    use rand::{Rng, SeedableRng, rngs::StdRng};

    struct RiskGrid;

    impl ParameterCombination for RiskGrid {
        type Output = (f64, f64);

        fn generate() -> Vec<Self::Output> {
            [1.0, 2.0, 5.0]
                .into_iter()
                .flat_map(|stop_loss| [2.0, 4.0, 8.0].into_iter().map(move |take_profit| (stop_loss, take_profit)))
                .collect()
        }
    }

    fn random_walk(seed: u64, len: usize) -> Vec<Bar> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut close: f64 = 100.0;
        (0..len)
            .map(|i| {
                let open = close;
                close = (close * (1.0 + rng.random_range(-0.02..0.02))).max(1.0);
                let high = open.max(close) * 1.005;
                let low = open.min(close) * 0.995;
                Bar::from((i as i64 * 3_600_000, open, high, low, close, 1.0))
            })
            .collect()
    }

    #[test]
    fn optimizer_risk_grid() {
        let bars = random_walk(7, 400);
        let base = BacktestConfigBuilder::builder()
            .strategy(StrategyVariant::Rsi)
            .leverage(3.0)
            .build()
            .unwrap();

        let results = Optimizer::<RiskGrid>::new(bars.clone(), base.clone())
            .with(|&(stop_loss, take_profit), base| {
                BacktestConfigBuilder::builder()
                    .strategy(base.strategy())
                    .leverage(base.leverage())
                    .stop_loss(stop_loss)
                    .take_profit(take_profit)
                    .build()
            })
            .unwrap();

        assert_eq!(results.len(), 9);
        assert_eq!(
            results.iter().map(|(params, _)| *params).collect::<Vec<_>>(),
            RiskGrid::generate()
        );

        // same outcome as a standalone run
        let (params, parallel) = &results[4];
        let config = BacktestConfigBuilder::builder()
            .strategy(StrategyVariant::Rsi)
            .leverage(3.0)
            .stop_loss(params.0)
            .take_profit(params.1)
            .build()
            .unwrap();
        assert_eq!(*parallel, run_backtest(&bars, &config).unwrap());
    }

    #[test]
    fn optimizer_propagates_combinator_error() {
        let bars = random_walk(1, 50);
        let result = Optimizer::<RiskGrid>::new(bars, BacktestConfig::default())
            .with(|&(stop_loss, _), _| BacktestConfigBuilder::builder().stop_loss(stop_loss - 5.0).build());
        assert!(matches!(result, Err(Error::NegZeroStopLoss(_))));
    }

    #[test]
    fn compare_all_strategies() {
        let bars = random_walk(42, 300);
        let config = BacktestConfigBuilder::builder().position_size(25.0).build().unwrap();
        let results = compare_strategies(&bars, &config).unwrap();

        assert_eq!(
            results.iter().map(|(variant, _)| *variant).collect::<Vec<_>>(),
            StrategyVariant::ALL.to_vec()
        );
        for (variant, result) in &results {
            let expected = run_backtest(&bars, &config.with_strategy(*variant)).unwrap();
            assert_eq!(*result, expected);
            assert_eq!(result.equity_curve.len(), bars.len());
        }
    }

    #[test]
    fn optimizer_from_backtest() {
        let bars = random_walk(3, 80);
        let backtest = Backtest::new(bars.clone().into(), BacktestConfig::default()).unwrap();
        let results = Optimizer::<Strategies>::from(&backtest)
            .with(|variant, base| Ok(base.with_strategy(*variant)))
            .unwrap();
        assert_eq!(results.len(), StrategyVariant::ALL.len());
    }
}
