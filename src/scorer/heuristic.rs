//! Heuristic scorer used when no trained model is loaded.
//!
//! The probability is a base rate plus independent contributions from the
//! amount, the transaction type, the origin balance movement and the
//! origin/destination ratios. Each table is evaluated top to bottom and only
//! the first matching tier counts.

use crate::scorer::jitter::Jitter;
use crate::scorer::{first_match, Threshold};
use crate::types::prediction::PredictionResult;
use crate::types::transaction::{TransactionRequest, TransactionType};
use std::ops::RangeInclusive;

/// Starting probability before any contribution
pub const BASE_PROBABILITY: f64 = 0.05;

/// Probability above which a transaction is flagged
pub const FRAUD_THRESHOLD: f64 = 0.5;

/// Jitter factor range for this path
pub const JITTER_RANGE: RangeInclusive<f64> = 0.95..=1.05;

/// Amount tiers (highest match only)
pub const AMOUNT_TIERS: [(Threshold, f64); 7] = [
    (Threshold::Above(100_000.0), 0.35),
    (Threshold::Above(50_000.0), 0.25),
    (Threshold::Above(25_000.0), 0.18),
    (Threshold::Above(10_000.0), 0.12),
    (Threshold::Above(5_000.0), 0.08),
    (Threshold::Above(1_000.0), 0.03),
    (Threshold::Above(100.0), 0.01),
];

/// Origin balance movement in multiples of the amount
pub const BALANCE_MISMATCH_TIERS: [(Threshold, f64); 3] = [
    (Threshold::Above(1.2), 0.15),
    (Threshold::Above(1.1), 0.08),
    (Threshold::Above(1.05), 0.03),
];

/// `amount / oldbalanceOrg` tiers
pub const ORIGIN_RATIO_TIERS: [(Threshold, f64); 4] = [
    (Threshold::Above(0.95), 0.25),
    (Threshold::Above(0.8), 0.15),
    (Threshold::Above(0.5), 0.08),
    (Threshold::Above(0.2), 0.03),
];

/// `amount / newbalanceDest` tiers
pub const DESTINATION_RATIO_TIERS: [(Threshold, f64); 1] = [(Threshold::Above(0.5), 0.05)];

/// Per-type contribution; unknown types contribute nothing
pub fn type_contribution(kind: &TransactionType) -> f64 {
    match kind {
        TransactionType::CashOut => 0.12,
        TransactionType::Transfer => 0.08,
        TransactionType::Debit => 0.05,
        TransactionType::Payment => -0.02,
        TransactionType::CashIn => -0.01,
        TransactionType::Other(_) => 0.0,
    }
}

/// Individual contributions to the heuristic probability
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HeuristicBreakdown {
    pub amount: f64,
    pub kind: f64,
    pub balance_mismatch: f64,
    pub origin_ratio: f64,
    pub destination_ratio: f64,
}

impl HeuristicBreakdown {
    /// Compute every contribution for a transaction
    pub fn for_transaction(tx: &TransactionRequest) -> Self {
        let amount = tx.amount;

        // Thresholds are multiples of the amount
        let balance_diff = tx.balance_diff_origin().abs();
        let balance_mismatch = BALANCE_MISMATCH_TIERS
            .iter()
            .find(|(threshold, _)| threshold.scaled(amount).matches(balance_diff))
            .map(|(_, delta)| *delta)
            .unwrap_or(0.0);

        let origin_ratio = if tx.old_balance_origin > 0.0 {
            first_match(amount / tx.old_balance_origin, &ORIGIN_RATIO_TIERS)
        } else {
            0.0
        };

        let destination_ratio = if tx.new_balance_destination > 0.0 {
            first_match(amount / tx.new_balance_destination, &DESTINATION_RATIO_TIERS)
        } else {
            0.0
        };

        Self {
            amount: first_match(amount, &AMOUNT_TIERS),
            kind: type_contribution(&tx.kind),
            balance_mismatch,
            origin_ratio,
            destination_ratio,
        }
    }

    /// Probability before jitter and clamping
    pub fn raw_probability(&self) -> f64 {
        BASE_PROBABILITY
            + self.amount
            + self.kind
            + self.balance_mismatch
            + self.origin_ratio
            + self.destination_ratio
    }
}

/// Score a transaction without a model.
///
/// Unlike the model path, the fraud flag is derived from the final probability.
pub fn score(tx: &TransactionRequest, jitter: &Jitter) -> PredictionResult {
    let breakdown = HeuristicBreakdown::for_transaction(tx);
    let probability =
        (breakdown.raw_probability() * jitter.factor(&JITTER_RANGE)).clamp(0.0, 1.0);

    tracing::trace!(?breakdown, probability, "Heuristic score");

    PredictionResult::new(probability > FRAUD_THRESHOLD, probability)
}
