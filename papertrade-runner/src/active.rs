//! The active-strategy slot: what the live loop is currently trading.
//!
//! The slot holds an `Arc<ActiveStrategy>` behind an `RwLock`. Readers (the
//! decision loop, status queries) clone the `Arc` and never block each other;
//! promotion takes the write lock, re-checks the incumbent under it, and
//! swaps atomically. A candidate promotes only when it clears the score
//! threshold AND strictly beats whatever holds the slot at swap time, so a
//! concurrent better promotion can never be overwritten by a worse one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::info;

use crate::metrics::PerformanceStats;
use crate::score::ScoredCandidate;
use papertrade_core::strategy::Strategy;

/// Minimum composite score a candidate needs to be considered for promotion.
pub const PROMOTION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PromotionFailure {
    #[error("score {score:.3} below promotion threshold {threshold:.3}")]
    BelowThreshold { score: f64, threshold: f64 },
    #[error("score {score:.3} does not beat incumbent {incumbent:.3}")]
    NotBetterThanIncumbent { score: f64, incumbent: f64 },
}

/// The strategy currently authorized to trade, with the evidence that
/// promoted it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveStrategy {
    pub strategy: Strategy,
    pub score: f64,
    pub stats: PerformanceStats,
    pub promoted_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ActiveSlot {
    threshold: f64,
    slot: RwLock<Option<Arc<ActiveStrategy>>>,
}

impl Default for ActiveSlot {
    fn default() -> Self {
        Self::new(PROMOTION_THRESHOLD)
    }
}

impl ActiveSlot {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            slot: RwLock::new(None),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Cheap snapshot of the current occupant.
    pub fn current(&self) -> Option<Arc<ActiveStrategy>> {
        self.slot
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.current().is_none()
    }

    /// Attempt to install `candidate`. The incumbent comparison happens under
    /// the write lock, so two racing promotions always leave the higher score
    /// in place.
    pub fn try_promote(
        &self,
        candidate: &ScoredCandidate,
    ) -> Result<Arc<ActiveStrategy>, PromotionFailure> {
        if candidate.score < self.threshold {
            return Err(PromotionFailure::BelowThreshold {
                score: candidate.score,
                threshold: self.threshold,
            });
        }

        let mut slot = self.slot.write().unwrap_or_else(|p| p.into_inner());
        if let Some(incumbent) = slot.as_ref() {
            if candidate.score <= incumbent.score {
                return Err(PromotionFailure::NotBetterThanIncumbent {
                    score: candidate.score,
                    incumbent: incumbent.score,
                });
            }
        }

        let active = Arc::new(ActiveStrategy {
            strategy: candidate.strategy.clone(),
            score: candidate.score,
            stats: candidate.stats.clone(),
            promoted_at: Utc::now(),
        });
        info!(
            strategy = %active.strategy.id,
            family = active.strategy.kind.family(),
            score = active.score,
            "strategy promoted"
        );
        *slot = Some(active.clone());
        Ok(active)
    }

    /// Reinstall a previously persisted occupant without threshold checks.
    /// Used when restoring engine state from disk.
    pub fn restore(&self, active: ActiveStrategy) {
        let mut slot = self.slot.write().unwrap_or_else(|p| p.into_inner());
        *slot = Some(Arc::new(active));
    }

    pub fn clear(&self) {
        let mut slot = self.slot.write().unwrap_or_else(|p| p.into_inner());
        *slot = None;
    }
}
