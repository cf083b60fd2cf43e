//! Transaction records submitted for fraud scoring

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction type as reported by the payment system.
///
/// Unknown codes are kept verbatim so they can be logged; every scoring
/// table treats them as contributing nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionType {
    CashOut,
    Transfer,
    Debit,
    Payment,
    CashIn,
    Other(String),
}

impl TransactionType {
    /// Wire code for this type (`CASH_OUT`, `TRANSFER`, ...)
    pub fn as_str(&self) -> &str {
        match self {
            TransactionType::CashOut => "CASH_OUT",
            TransactionType::Transfer => "TRANSFER",
            TransactionType::Debit => "DEBIT",
            TransactionType::Payment => "PAYMENT",
            TransactionType::CashIn => "CASH_IN",
            TransactionType::Other(code) => code,
        }
    }

    /// Label-encoder code used by the trained model (alphabetical vocabulary).
    pub fn category_code(&self) -> f32 {
        match self {
            TransactionType::CashIn => 0.0,
            TransactionType::CashOut => 1.0,
            TransactionType::Debit => 2.0,
            TransactionType::Payment => 3.0,
            TransactionType::Transfer => 4.0,
            TransactionType::Other(_) => -1.0,
        }
    }
}

impl From<String> for TransactionType {
    fn from(code: String) -> Self {
        match code.as_str() {
            "CASH_OUT" => TransactionType::CashOut,
            "TRANSFER" => TransactionType::Transfer,
            "DEBIT" => TransactionType::Debit,
            "PAYMENT" => TransactionType::Payment,
            "CASH_IN" => TransactionType::CashIn,
            _ => TransactionType::Other(code),
        }
    }
}

impl From<TransactionType> for String {
    fn from(kind: TransactionType) -> Self {
        match kind {
            TransactionType::Other(code) => code,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single transaction to be scored.
///
/// Field names on the wire follow the training data columns; the descriptive
/// camelCase names are accepted as aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Transaction type code
    #[serde(rename = "type")]
    pub kind: TransactionType,

    /// Transaction amount
    pub amount: f64,

    /// Origin account balance before the transaction
    #[serde(rename = "oldbalanceOrg", alias = "oldBalanceOrigin")]
    pub old_balance_origin: f64,

    /// Origin account balance after the transaction
    #[serde(rename = "newbalanceOrig", alias = "newBalanceOrigin")]
    pub new_balance_origin: f64,

    /// Destination account balance before the transaction
    #[serde(rename = "oldbalanceDest", alias = "oldBalanceDestination")]
    pub old_balance_destination: f64,

    /// Destination account balance after the transaction
    #[serde(rename = "newbalanceDest", alias = "newBalanceDestination")]
    pub new_balance_destination: f64,
}

impl TransactionRequest {
    /// Create a transaction with zeroed balances
    pub fn new(kind: TransactionType, amount: f64) -> Self {
        Self {
            kind,
            amount,
            old_balance_origin: 0.0,
            new_balance_origin: 0.0,
            old_balance_destination: 0.0,
            new_balance_destination: 0.0,
        }
    }

    /// Set origin balances (before, after)
    pub fn with_origin(mut self, old_balance: f64, new_balance: f64) -> Self {
        self.old_balance_origin = old_balance;
        self.new_balance_origin = new_balance;
        self
    }

    /// Set destination balances (before, after)
    pub fn with_destination(mut self, old_balance: f64, new_balance: f64) -> Self {
        self.old_balance_destination = old_balance;
        self.new_balance_destination = new_balance;
        self
    }

    /// `oldbalanceOrg - newbalanceOrig`
    pub fn balance_diff_origin(&self) -> f64 {
        self.old_balance_origin - self.new_balance_origin
    }

    /// `newbalanceDest - oldbalanceDest`
    pub fn balance_diff_destination(&self) -> f64 {
        self.new_balance_destination - self.old_balance_destination
    }
}
