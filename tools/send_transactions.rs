//! Test Transaction Sender
//!
//! Generates synthetic transactions and posts them to a running scoring
//! service, then reports how many were flagged.

use futures::stream::{self, StreamExt};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Transaction structure matching the service's expected format
#[derive(Debug, Clone, Serialize)]
struct Transaction {
    #[serde(rename = "type")]
    kind: &'static str,
    amount: f64,
    #[serde(rename = "oldbalanceOrg")]
    old_balance_origin: f64,
    #[serde(rename = "newbalanceOrig")]
    new_balance_origin: f64,
    #[serde(rename = "oldbalanceDest")]
    old_balance_destination: f64,
    #[serde(rename = "newbalanceDest")]
    new_balance_destination: f64,
}

/// Response returned by `/predict`
#[derive(Debug, Deserialize)]
struct Prediction {
    is_fraud: bool,
    fraud_probability: f64,
}

/// Transaction generator for testing
struct TransactionGenerator {
    rng: rand::rngs::ThreadRng,
}

impl TransactionGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Generate a random everyday transaction with consistent balances
    fn generate_legitimate(&mut self) -> Transaction {
        let kind = self.random_choice(&["PAYMENT", "CASH_IN", "DEBIT", "PAYMENT"]);
        let amount: f64 = self.rng.gen_range(10.0..2_000.0);
        let old_origin: f64 = self.rng.gen_range(amount..amount * 20.0);
        let old_dest: f64 = self.rng.gen_range(0.0..50_000.0);

        Transaction {
            kind,
            amount,
            old_balance_origin: old_origin,
            new_balance_origin: old_origin - amount,
            old_balance_destination: old_dest,
            new_balance_destination: old_dest + amount,
        }
    }

    /// Generate a suspicious transaction: large, draining the origin account
    fn generate_suspicious(&mut self) -> Transaction {
        let kind = self.random_choice(&["TRANSFER", "CASH_OUT"]);
        let amount: f64 = self.rng.gen_range(25_000.0..500_000.0);
        let old_origin = amount * self.rng.gen_range(0.9..1.05);

        Transaction {
            kind,
            amount,
            old_balance_origin: old_origin,
            new_balance_origin: 0.0, // Emptied
            old_balance_destination: 0.0,
            new_balance_destination: if self.rng.gen_bool(0.5) { amount } else { 0.0 },
        }
    }

    fn random_choice(&mut self, choices: &[&'static str]) -> &'static str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("send_transactions=info".parse()?),
        )
        .init();

    info!("Starting Test Transaction Sender");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let base_url = args
        .get(1)
        .map(|s| s.trim_end_matches('/').to_string())
        .unwrap_or_else(|| "http://localhost:8000".to_string());
    let count: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);
    let fraud_rate: f64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let concurrency: usize = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(8);

    info!(
        base_url = %base_url,
        count = count,
        fraud_rate = fraud_rate,
        concurrency = concurrency,
        "Configuration loaded"
    );

    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();
    let transactions: Vec<(bool, Transaction)> = (0..count)
        .map(|_| {
            if rng.gen_bool(fraud_rate.clamp(0.0, 1.0)) {
                (true, generator.generate_suspicious())
            } else {
                (false, generator.generate_legitimate())
            }
        })
        .collect();

    let client = reqwest::Client::new();
    let url = format!("{}/predict", base_url);
    let flagged = Arc::new(AtomicU64::new(0));
    let flagged_suspicious = Arc::new(AtomicU64::new(0));
    let failed = Arc::new(AtomicU64::new(0));

    stream::iter(transactions.into_iter().enumerate())
        .for_each_concurrent(concurrency.max(1), |(i, (suspicious, tx))| {
            let client = client.clone();
            let url = url.clone();
            let flagged = flagged.clone();
            let flagged_suspicious = flagged_suspicious.clone();
            let failed = failed.clone();

            async move {
                let response = match client.post(&url).json(&tx).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                        warn!(error = %e, "Request failed");
                        return;
                    }
                };

                let status = response.status();
                if !status.is_success() {
                    failed.fetch_add(1, Ordering::Relaxed);
                    let body = response.text().await.unwrap_or_default();
                    warn!(status = %status, body = %body, "Prediction rejected");
                    return;
                }

                match response.json::<Prediction>().await {
                    Ok(prediction) => {
                        if prediction.is_fraud {
                            flagged.fetch_add(1, Ordering::Relaxed);
                            if suspicious {
                                flagged_suspicious.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                        if (i + 1) % 10 == 0 {
                            info!(
                                sent = i + 1,
                                kind = tx.kind,
                                amount = format!("{:.2}", tx.amount),
                                suspicious = suspicious,
                                is_fraud = prediction.is_fraud,
                                fraud_probability = prediction.fraud_probability,
                                "Progress"
                            );
                        }
                    }
                    Err(e) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                        warn!(error = %e, "Invalid prediction body");
                    }
                }
            }
        })
        .await;

    info!(
        "Completed! Sent {} transactions: {} flagged ({} of them generated as suspicious), {} failed",
        count,
        flagged.load(Ordering::Relaxed),
        flagged_suspicious.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed)
    );

    Ok(())
}
