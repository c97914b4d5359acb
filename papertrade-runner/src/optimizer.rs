//! Candidate generation and one optimization cycle.
//!
//! A cycle takes a candle window, builds a candidate set (the baseline
//! catalog, carried winners, and seeded perturbations of each), backtests
//! every candidate in parallel on its own isolated ledger, and returns them
//! ranked by composite score. Every Nth cycle is a discovery cycle with a
//! wider perturbation fan-out.
//!
//! Perturbation seeds are derived by hashing (master seed, cycle, strategy
//! id, variant index), not by drawing from a shared RNG, so the candidate set
//! is identical regardless of generation order or thread count.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::metrics::PerformanceStats;
use crate::score::{rank, ScoredCandidate};
use papertrade_core::backtest::run_backtest;
use papertrade_core::domain::Candle;
use papertrade_core::risk::RiskPolicy;
use papertrade_core::strategy::{seed_catalog, Strategy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Perturbed variants generated per pool entry on a regular cycle.
    pub variants_per_seed: usize,
    /// Variants per pool entry on a discovery cycle.
    pub discovery_variants: usize,
    /// Every Nth cycle widens the search to `discovery_variants`.
    /// Zero disables discovery cycles.
    pub discovery_every: u64,
    /// Master seed for variant derivation.
    pub master_seed: u64,
    /// Ranked candidates kept in the report.
    pub top_k: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            variants_per_seed: 8,
            discovery_variants: 24,
            discovery_every: 3,
            master_seed: 0,
            top_k: 10,
        }
    }
}

/// Result of one optimization cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub ranked: Vec<ScoredCandidate>,
    pub evaluated: usize,
    pub skipped: usize,
    pub generated_at: DateTime<Utc>,
}

impl OptimizationReport {
    pub fn best(&self) -> Option<&ScoredCandidate> {
        self.ranked.first()
    }
}

fn variant_seed(master_seed: u64, cycle: u64, strategy: &Strategy, variant: u64) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&master_seed.to_le_bytes());
    hasher.update(&cycle.to_le_bytes());
    hasher.update(strategy.id.as_str().as_bytes());
    hasher.update(&variant.to_le_bytes());
    let hash = hasher.finalize();
    u64::from_le_bytes(hash.as_bytes()[..8].try_into().expect("blake3 is 32 bytes"))
}

fn is_discovery_cycle(config: &OptimizerConfig, cycle: u64) -> bool {
    config.discovery_every > 0 && cycle % config.discovery_every == 0
}

/// The candidate set for one cycle: catalog entries, carried strategies
/// (previous winners and the active strategy), and perturbations of all of
/// them, deduplicated by strategy id in a stable order.
///
/// The cycle index feeds the perturbation seeds, so successive cycles explore
/// different parameter neighborhoods while any single cycle stays
/// reproducible.
pub fn generate_candidates(
    config: &OptimizerConfig,
    carried: &[Strategy],
    cycle: u64,
) -> Vec<Strategy> {
    let variants = if is_discovery_cycle(config, cycle) {
        config.discovery_variants
    } else {
        config.variants_per_seed
    };

    let mut pool = seed_catalog();
    pool.extend(carried.iter().cloned());

    let mut candidates = Vec::new();
    let mut seen = std::collections::BTreeSet::new();
    for base in pool {
        if seen.insert(base.id.clone()) {
            candidates.push(base.clone());
        }
        for variant in 0..variants as u64 {
            let seed = variant_seed(config.master_seed, cycle, &base, variant);
            let mut rng = StdRng::seed_from_u64(seed);
            let perturbed = base.perturb(&mut rng);
            if seen.insert(perturbed.id.clone()) {
                candidates.push(perturbed);
            }
        }
    }
    candidates
}

/// Backtest every candidate over `candles` and rank the survivors.
///
/// Candidates whose warmup window exceeds the series are skipped, not failed;
/// a cycle with zero survivors returns an empty ranking.
pub fn run_cycle(
    config: &OptimizerConfig,
    policy: &RiskPolicy,
    candles: &[Candle],
    carried: &[Strategy],
    cycle: u64,
) -> OptimizationReport {
    let candidates = generate_candidates(config, carried, cycle);
    let total = candidates.len();
    let timeframe = candles.first().map(|c| c.timeframe);

    let scored: Vec<Option<ScoredCandidate>> = candidates
        .into_par_iter()
        .enumerate()
        .map(|(discovery_index, strategy)| {
            let report = match run_backtest(&strategy, policy, candles) {
                Ok(r) => r,
                Err(err) => {
                    debug!(strategy = %strategy.id, %err, "candidate skipped");
                    return None;
                }
            };
            let timeframe = timeframe?;
            let stats = PerformanceStats::compute(
                &report.portfolio.equity_curve,
                &report.portfolio.trades,
                timeframe,
            );
            Some(ScoredCandidate::new(strategy, stats, discovery_index))
        })
        .collect();

    let survivors: Vec<ScoredCandidate> = scored.into_iter().flatten().collect();
    let evaluated = survivors.len();
    let skipped = total - evaluated;

    let mut ranked = rank(survivors);
    ranked.truncate(config.top_k);

    if let Some(best) = ranked.first() {
        info!(
            strategy = %best.strategy.id,
            family = best.strategy.kind.family(),
            score = best.score,
            evaluated,
            skipped,
            "optimization cycle complete"
        );
    }

    OptimizationReport {
        ranked,
        evaluated,
        skipped,
        generated_at: Utc::now(),
    }
}
