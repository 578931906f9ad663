//! Loot simulation engine

use crate::error::{LootError, Result};
use crate::stage::{Dataset, DropPool, PoolEntry, PoolKind, Stage, StageId};
use crate::stats::{Loot, SimulationOutcome, TrialStats};
use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use rand::{Rng, RngCore};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

/// Fast seedable RNG usable wherever `rand::Rng` is expected
#[derive(Clone)]
pub struct FastRng {
    inner: fastrand::Rng,
}

impl FastRng {
    #[inline(always)]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: fastrand::Rng::with_seed(seed),
        }
    }
}

impl RngCore for FastRng {
    #[inline(always)]
    fn next_u32(&mut self) -> u32 {
        self.inner.u32(..)
    }

    #[inline(always)]
    fn next_u64(&mut self) -> u64 {
        self.inner.u64(..)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Simulate `runs` clears of a stage looked up by id.
///
/// An unknown id fails before anything is drawn.
pub fn simulate<R: Rng + ?Sized>(
    dataset: &Dataset,
    id: &StageId,
    runs: u64,
    rng: &mut R,
) -> Result<SimulationOutcome> {
    let stage = dataset.get(id)?;
    simulate_stage(stage, runs, rng)
}

/// Simulate `runs` clears of `stage`.
///
/// Stamina is charged up front. An unexpected sampling failure aborts the
/// whole call and the partial loot is dropped.
pub fn simulate_stage<R: Rng + ?Sized>(
    stage: &Stage,
    runs: u64,
    rng: &mut R,
) -> Result<SimulationOutcome> {
    let stamina_spent = stamina_for_runs(stage, runs)?;
    let mut loot = Loot::new();
    if runs == 0 {
        return Ok(SimulationOutcome {
            stage: stage.id.clone(),
            runs,
            stamina_spent,
            loot,
        });
    }

    // Weighted pools keep the same distribution for every run
    let samplers = stage
        .pools
        .iter()
        .map(|pool| pool_sampler(stage, pool))
        .collect::<Result<Vec<_>>>()?;

    for _ in 0..runs {
        for (pool, sampler) in stage.pools.iter().zip(&samplers) {
            roll_pool(pool, sampler.as_ref(), &mut loot, rng);
        }
    }

    Ok(SimulationOutcome {
        stage: stage.id.clone(),
        runs,
        stamina_spent,
        loot,
    })
}

/// Stamina charged for `runs` clears, or an error if it overflows `u64`
pub fn stamina_for_runs(stage: &Stage, runs: u64) -> Result<u64> {
    (stage.stamina as u64)
        .checked_mul(runs)
        .ok_or_else(|| LootError::RunCountTooLarge {
            stage: stage.id.to_string(),
            runs,
        })
}

/// `None` for bundles and for weighted pools that can never drop
fn pool_sampler(stage: &Stage, pool: &DropPool) -> Result<Option<WeightedIndex<f64>>> {
    let entries = match &pool.kind {
        PoolKind::Bundle(_) => return Ok(None),
        PoolKind::Weighted(entries) => entries,
    };

    match WeightedIndex::new(entries.iter().map(|e| e.probability)) {
        Ok(index) => Ok(Some(index)),
        Err(WeightedError::AllWeightsZero) => {
            log::debug!("{} pool '{}': all weights zero, skipping", stage.id, pool.category);
            Ok(None)
        }
        Err(e) => Err(LootError::SimulationAborted {
            stage: stage.id.to_string(),
            category: pool.category.clone(),
            reason: e.to_string(),
        }),
    }
}

#[inline]
fn roll_pool<R: Rng + ?Sized>(
    pool: &DropPool,
    sampler: Option<&WeightedIndex<f64>>,
    loot: &mut Loot,
    rng: &mut R,
) {
    match (&pool.kind, sampler) {
        (PoolKind::Bundle(entries), _) => {
            for _ in 0..pool.rolls {
                for entry in entries {
                    grant(loot, entry);
                }
            }
        }
        (PoolKind::Weighted(entries), Some(index)) => {
            for _ in 0..pool.rolls {
                grant(loot, &entries[index.sample(rng)]);
            }
        }
        (PoolKind::Weighted(_), None) => {}
    }
}

#[inline(always)]
fn grant(loot: &mut Loot, entry: &PoolEntry) {
    loot.add(&entry.item, entry.quantity as u64);
}

/// Whole clears a stamina budget pays for
pub fn runs_for_stamina(stage: &Stage, budget: u64) -> Result<u64> {
    let runs = budget / stage.stamina as u64;
    if runs == 0 {
        return Err(LootError::InsufficientStamina {
            stage: stage.id.to_string(),
            required: stage.stamina,
            available: budget,
        });
    }
    Ok(runs)
}

/// Options for repeated simulation of one stage
#[derive(Debug, Clone)]
pub struct TrialOptions {
    pub trials: usize,
    pub parallel: bool,
    /// Worker threads for parallel trials; `None` uses 70% of the cores
    pub threads: Option<usize>,
    pub seed: u64,
}

impl Default for TrialOptions {
    fn default() -> Self {
        Self {
            trials: 100,
            parallel: false,
            threads: None,
            seed: 0,
        }
    }
}

pub fn default_threads() -> usize {
    let num_cores = num_cpus::get();
    ((num_cores as f64 * 0.70).round() as usize)
        .max(2)
        .min(num_cores.saturating_sub(1).max(1))
}

/// Run trials in parallel, each with its own RNG seeded `seed + index`
pub fn run_trials_parallel(
    stage: &Stage,
    runs: u64,
    trials: usize,
    threads: usize,
    seed: u64,
) -> Result<Vec<SimulationOutcome>> {
    let work = || {
        (0..trials)
            .into_par_iter()
            .map(|i| {
                let mut rng = FastRng::new(seed.wrapping_add(i as u64));
                simulate_stage(stage, runs, &mut rng)
            })
            .collect::<Result<Vec<_>>>()
    };

    match ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(work),
        Err(e) => {
            log::warn!("could not build a {threads}-thread pool ({e}), using the global pool");
            work()
        }
    }
}

/// Run trials one after another on a single RNG
pub fn run_trials_sequential(
    stage: &Stage,
    runs: u64,
    trials: usize,
    seed: u64,
) -> Result<Vec<SimulationOutcome>> {
    let mut rng = FastRng::new(seed);
    (0..trials)
        .map(|_| simulate_stage(stage, runs, &mut rng))
        .collect()
}

/// Run trials and return aggregated stats; one aborted trial fails the batch
pub fn run_trials(stage: &Stage, runs: u64, options: &TrialOptions) -> Result<TrialStats> {
    stamina_for_runs(stage, runs)?;
    let outcomes = if options.parallel {
        let threads = options.threads.unwrap_or_else(default_threads).max(1);
        log::info!("running {} trials of {} on {} threads", options.trials, stage.id, threads);
        run_trials_parallel(stage, runs, options.trials, threads, options.seed)?
    } else {
        run_trials_sequential(stage, runs, options.trials, options.seed)?
    };

    Ok(TrialStats::from_outcomes(stage, runs, &outcomes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn entry(item: &str, quantity: u32, probability: f64) -> PoolEntry {
        PoolEntry {
            item: item.to_string(),
            quantity,
            probability,
        }
    }

    fn single_pool(stamina: u32, rolls: u32, entries: Vec<PoolEntry>) -> Stage {
        Stage {
            id: StageId::new("Test", "Easy"),
            stamina,
            pools: vec![DropPool {
                category: "normal".into(),
                rolls,
                kind: PoolKind::classify(entries),
            }],
        }
    }

    fn coin_flip(rolls: u32) -> Stage {
        single_pool(10, rolls, vec![entry("A", 1, 0.5), entry("B", 1, 0.5)])
    }

    #[test]
    fn bundle_grants_everything_each_roll() {
        let stage = single_pool(50, 3, vec![entry("Coin", 1, 1.0), entry("Crystal", 2, 1.0)]);
        for seed in 0..5 {
            let outcome = simulate_stage(&stage, 1, &mut FastRng::new(seed)).unwrap();
            assert_eq!(outcome.loot.get("Coin"), 3);
            assert_eq!(outcome.loot.get("Crystal"), 6);
            assert_eq!(outcome.loot.len(), 2);
        }
    }

    #[test]
    fn bundle_is_independent_of_rng() {
        let stage = single_pool(50, 2, vec![entry("Coin", 1, 1.0), entry("Crystal", 1, 1.0)]);
        let a = simulate_stage(&stage, 7, &mut FastRng::new(1)).unwrap();
        let b = simulate_stage(&stage, 7, &mut SmallRng::seed_from_u64(99)).unwrap();
        assert_eq!(a.loot, b.loot);
        assert_eq!(a.loot.get("Coin"), 14);
    }

    #[test]
    fn zero_runs_yields_nothing() {
        let outcome = simulate_stage(&coin_flip(1000), 0, &mut FastRng::new(3)).unwrap();
        assert!(outcome.loot.is_empty());
        assert_eq!(outcome.stamina_spent, 0);
        assert_eq!(outcome.runs, 0);
    }

    #[test]
    fn stamina_is_cost_times_runs() {
        let outcome = simulate_stage(&coin_flip(1), 12, &mut FastRng::new(3)).unwrap();
        assert_eq!(outcome.stamina_spent, 120);
    }

    #[test]
    fn overflowing_stamina_is_rejected_before_drawing() {
        let stage = single_pool(70, 1, vec![entry("A", 1, 1.0)]);
        let err = simulate_stage(&stage, u64::MAX / 2, &mut FastRng::new(0)).unwrap_err();
        assert!(matches!(
            err,
            LootError::RunCountTooLarge { runs, .. } if runs == u64::MAX / 2
        ));
        assert!(err.is_recoverable());

        let options = TrialOptions::default();
        assert!(matches!(
            run_trials(&stage, u64::MAX, &options),
            Err(LootError::RunCountTooLarge { .. })
        ));
    }

    #[test]
    fn zero_runs_never_builds_samplers() {
        let stage = single_pool(10, 1, vec![entry("A", 1, f64::NAN), entry("B", 1, 0.5)]);
        let outcome = simulate_stage(&stage, 0, &mut FastRng::new(4)).unwrap();
        assert!(outcome.loot.is_empty());
        assert_eq!(outcome.stamina_spent, 0);
    }

    #[test]
    fn weighted_pool_draws_rolls_times() {
        let outcome = simulate_stage(&coin_flip(4), 25, &mut FastRng::new(11)).unwrap();
        assert_eq!(outcome.loot.get("A") + outcome.loot.get("B"), 100);
    }

    #[test]
    fn quantity_is_granted_per_draw() {
        let stage = single_pool(10, 1, vec![entry("Crystal", 4, 1.0)]);
        let outcome = simulate_stage(&stage, 5, &mut FastRng::new(0)).unwrap();
        assert_eq!(outcome.loot.get("Crystal"), 20);
    }

    #[test]
    fn weights_need_not_sum_to_one() {
        // 0.1 vs 0.3 sampled proportionally: 25% / 75%
        let stage = single_pool(10, 1, vec![entry("A", 1, 0.1), entry("B", 1, 0.3)]);
        let outcome = simulate_stage(&stage, 40_000, &mut FastRng::new(5)).unwrap();
        let share = outcome.loot.get("A") as f64 / 40_000.0;
        assert!((share - 0.25).abs() < 0.02, "share of A was {share}");
    }

    #[test]
    fn zero_weight_entry_never_drops() {
        let stage = single_pool(10, 3, vec![entry("A", 1, 0.0), entry("B", 1, 0.4)]);
        let outcome = simulate_stage(&stage, 500, &mut FastRng::new(8)).unwrap();
        assert_eq!(outcome.loot.get("A"), 0);
        assert_eq!(outcome.loot.get("B"), 1500);
    }

    #[test]
    fn coin_flip_splits_evenly() {
        let stage = coin_flip(1000);
        let mut rng = FastRng::new(2024);
        for _ in 0..50 {
            let outcome = simulate_stage(&stage, 1, &mut rng).unwrap();
            let a = outcome.loot.get("A") as f64;
            let b = outcome.loot.get("B") as f64;
            assert_eq!(a + b, 1000.0);
            // 6 standard deviations of a binomial(1000, 0.5)
            assert!((a - 500.0).abs() < 95.0, "A drew {a}");
        }
    }

    #[test]
    fn all_zero_weights_are_skipped() {
        let mut stage = single_pool(10, 2, vec![entry("A", 1, 0.0), entry("B", 1, 0.0)]);
        stage.pools.push(DropPool {
            category: "part".into(),
            rolls: 1,
            kind: PoolKind::classify(vec![entry("Coin", 1, 1.0)]),
        });
        let outcome = simulate_stage(&stage, 10, &mut FastRng::new(4)).unwrap();
        assert_eq!(outcome.loot.get("A") + outcome.loot.get("B"), 0);
        assert_eq!(outcome.loot.get("Coin"), 10);
        assert_eq!(outcome.stamina_spent, 100);
    }

    #[test]
    fn malformed_weights_abort_the_run() {
        // Bypasses dataset validation to hit a sampler failure other than all-zero
        let stage = single_pool(10, 1, vec![entry("A", 1, f64::NAN), entry("B", 1, 0.5)]);
        let err = simulate_stage(&stage, 3, &mut FastRng::new(4)).unwrap_err();
        match err {
            LootError::SimulationAborted { stage, category, .. } => {
                assert_eq!(stage, "Test-Easy");
                assert_eq!(category, "normal");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_stage_fails_cleanly() {
        let dataset = Dataset {
            stages: vec![coin_flip(1)],
        };
        let missing = StageId::new("NoSuchBoss", "Easy");
        let err = simulate(&dataset, &missing, 10, &mut FastRng::new(0)).unwrap_err();
        assert!(matches!(err, LootError::UnknownStage { .. }));
        assert!(err.is_recoverable());

        let known = StageId::new("Test", "Easy");
        let ok = simulate(&dataset, &known, 10, &mut FastRng::new(0)).unwrap();
        assert_eq!(ok.loot.total(), 10);
    }

    #[test]
    fn same_seed_same_loot() {
        let stage = coin_flip(10);
        let a = simulate_stage(&stage, 20, &mut FastRng::new(77)).unwrap();
        let b = simulate_stage(&stage, 20, &mut FastRng::new(77)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn stamina_budget_floors() {
        let stage = single_pool(35, 1, vec![entry("A", 1, 1.0)]);
        assert_eq!(runs_for_stamina(&stage, 35).unwrap(), 1);
        assert_eq!(runs_for_stamina(&stage, 100).unwrap(), 2);
        let err = runs_for_stamina(&stage, 34).unwrap_err();
        assert!(matches!(
            err,
            LootError::InsufficientStamina { required: 35, available: 34, .. }
        ));
    }

    #[test]
    fn parallel_trials_are_reproducible() {
        let stage = coin_flip(10);
        let a = run_trials_parallel(&stage, 5, 16, 2, 9).unwrap();
        let b = run_trials_parallel(&stage, 5, 16, 2, 9).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        // Trial i uses seed + i
        let third = simulate_stage(&stage, 5, &mut FastRng::new(11)).unwrap();
        assert_eq!(a[2], third);
    }

    #[test]
    fn trials_aggregate_near_expectation() {
        let stage = coin_flip(100);
        let options = TrialOptions {
            trials: 200,
            parallel: true,
            threads: Some(2),
            seed: 1,
        };
        let stats = run_trials(&stage, 1, &options).unwrap();
        assert_eq!(stats.trials, 200);
        let a = &stats.items["A"];
        assert!((a.mean - 50.0).abs() < 3.0, "mean was {}", a.mean);
        assert_eq!(a.expected_per_stamina, 5.0);

        let sequential = TrialOptions {
            parallel: false,
            ..options
        };
        let sequential = run_trials(&stage, 1, &sequential).unwrap();
        assert_eq!(sequential.trials, 200);
    }

    #[test]
    fn aborted_trial_fails_batch() {
        let stage = single_pool(10, 1, vec![entry("A", 1, f64::NAN)]);
        assert!(run_trials(&stage, 1, &TrialOptions::default()).is_err());
    }
}
