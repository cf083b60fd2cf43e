//! Post-hoc adjustment of classifier probabilities.
//!
//! Steps run in a fixed order: transfer compression, per-type scaling,
//! amount bump, origin-ratio bump, jitter. Additive steps clamp into [0, 1]
//! as they are applied.

use crate::scorer::jitter::Jitter;
use crate::scorer::{first_match, Threshold};
use crate::types::transaction::{TransactionRequest, TransactionType};
use std::ops::RangeInclusive;

/// Jitter factor range for this path
pub const JITTER_RANGE: RangeInclusive<f64> = 0.98..=1.02;

/// Transfer compression knees: `(knee, factor)`, excess above the first
/// matching knee is scaled by `factor`
pub const TRANSFER_COMPRESSION: [(f64, f64); 2] = [(0.8, 0.3), (0.6, 0.7)];

/// Additive bumps by amount (first match only)
pub const AMOUNT_BUMPS: [(Threshold, f64); 4] = [
    (Threshold::Above(100_000.0), 0.15),
    (Threshold::Above(50_000.0), 0.10),
    (Threshold::Above(25_000.0), 0.05),
    (Threshold::Below(100.0), -0.05),
];

/// Additive bumps by `amount / oldbalanceOrg` (first match only)
pub const ORIGIN_RATIO_BUMPS: [(Threshold, f64); 2] = [
    (Threshold::Above(0.9), 0.10),
    (Threshold::Above(0.5), 0.05),
];

/// Multiplier applied for the transaction type, if any
pub fn type_multiplier(kind: &TransactionType) -> Option<f64> {
    match kind {
        TransactionType::Payment => Some(0.4),
        TransactionType::CashIn => Some(0.2),
        TransactionType::CashOut => Some(1.2),
        _ => None,
    }
}

/// Compress high transfer probabilities toward their knee
pub fn compress_transfer(probability: f64) -> f64 {
    TRANSFER_COMPRESSION
        .iter()
        .find(|(knee, _)| probability > *knee)
        .map(|(knee, factor)| knee + (probability - knee) * factor)
        .unwrap_or(probability)
}

fn bump(probability: f64, delta: f64) -> f64 {
    (probability + delta).clamp(0.0, 1.0)
}

/// Apply every adjustment step except jitter
pub fn adjust_deterministic(probability: f64, tx: &TransactionRequest) -> f64 {
    let mut p = probability;

    if tx.kind == TransactionType::Transfer {
        p = compress_transfer(p);
    }

    if let Some(multiplier) = type_multiplier(&tx.kind) {
        p = (p * multiplier).min(1.0);
    }

    p = bump(p, first_match(tx.amount, &AMOUNT_BUMPS));

    if tx.old_balance_origin > 0.0 {
        let ratio = tx.amount / tx.old_balance_origin;
        p = bump(p, first_match(ratio, &ORIGIN_RATIO_BUMPS));
    }

    p
}

/// Full adjustment: deterministic steps, jitter, final clamp
pub fn adjust(probability: f64, tx: &TransactionRequest, jitter: &Jitter) -> f64 {
    let p = adjust_deterministic(probability, tx);
    (p * jitter.factor(&JITTER_RANGE)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn tx(kind: TransactionType, amount: f64) -> TransactionRequest {
        TransactionRequest::new(kind, amount)
    }

    #[test]
    fn test_transfer_compression() {
        assert!(approx(compress_transfer(0.9), 0.83));
        assert!(approx(compress_transfer(0.7), 0.67));
        assert!(approx(compress_transfer(0.8), 0.74));
        assert_eq!(compress_transfer(0.6), 0.6);
        assert_eq!(compress_transfer(0.2), 0.2);
    }

    #[test]
    fn test_type_scaling() {
        let amount = 1_000.0;
        assert!(approx(adjust_deterministic(0.5, &tx(TransactionType::Payment, amount)), 0.2));
        assert!(approx(adjust_deterministic(0.5, &tx(TransactionType::CashIn, amount)), 0.1));
        assert!(approx(adjust_deterministic(0.5, &tx(TransactionType::CashOut, amount)), 0.6));
        assert_eq!(adjust_deterministic(0.9, &tx(TransactionType::CashOut, amount)), 1.0);
        assert_eq!(adjust_deterministic(0.5, &tx(TransactionType::Debit, amount)), 0.5);
        assert_eq!(
            adjust_deterministic(0.5, &tx(TransactionType::Other("X".into()), amount)),
            0.5
        );
    }

    #[test]
    fn test_amount_bumps() {
        let debit = |amount: f64| adjust_deterministic(0.5, &tx(TransactionType::Debit, amount));

        assert!(approx(debit(150_000.0), 0.65));
        assert!(approx(debit(60_000.0), 0.6));
        assert!(approx(debit(30_000.0), 0.55));
        assert_eq!(debit(5_000.0), 0.5);
        assert!(approx(debit(50.0), 0.45));
    }

    #[test]
    fn test_bumps_clamp_when_applied() {
        assert_eq!(adjust_deterministic(0.95, &tx(TransactionType::Debit, 200_000.0)), 1.0);
        assert_eq!(adjust_deterministic(0.02, &tx(TransactionType::Debit, 10.0)), 0.0);
    }

    #[test]
    fn test_origin_ratio_bumps() {
        let drained = tx(TransactionType::Debit, 950.0).with_origin(1_000.0, 50.0);
        let half = tx(TransactionType::Debit, 600.0).with_origin(1_000.0, 400.0);
        let small = tx(TransactionType::Debit, 200.0).with_origin(1_000.0, 800.0);

        assert!(approx(adjust_deterministic(0.3, &drained), 0.4));
        assert!(approx(adjust_deterministic(0.3, &half), 0.35));
        assert!(approx(adjust_deterministic(0.3, &small), 0.3));
    }

    #[test]
    fn test_steps_compose_in_order() {
        // TRANSFER 0.9 -> 0.83, amount > 100k -> 0.98, ratio 1.0 -> 1.0
        let t = tx(TransactionType::Transfer, 200_000.0).with_origin(200_000.0, 0.0);
        assert_eq!(adjust_deterministic(0.9, &t), 1.0);

        let t = tx(TransactionType::Transfer, 30_000.0);
        assert!(approx(adjust_deterministic(0.7, &t), 0.72));
    }

    #[test]
    fn test_jitter_bounds() {
        let t = tx(TransactionType::Debit, 5_000.0);

        assert!(approx(adjust(0.5, &t, &Jitter::Fixed(0.98)), 0.49));
        assert!(approx(adjust(0.5, &t, &Jitter::Fixed(1.02)), 0.51));

        for _ in 0..200 {
            let p = adjust(0.5, &t, &Jitter::Uniform);
            assert!((0.49 - 1e-12..=0.51 + 1e-12).contains(&p));
        }
    }

    #[test]
    fn test_result_stays_in_unit_interval() {
        let t = tx(TransactionType::CashOut, 500_000.0).with_origin(100.0, 0.0);
        for _ in 0..200 {
            let p = adjust(1.0, &t, &Jitter::Uniform);
            assert!((0.0..=1.0).contains(&p));
        }
    }
}
