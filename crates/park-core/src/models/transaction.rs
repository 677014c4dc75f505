//! Balance transaction model
//!
//! Immutable history of balance changes shown on the balance screen.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Transaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Credit added to the balance
    TopUp,
    /// Paid extension of a parking session
    Extension,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::TopUp => write!(f, "top_up"),
            TransactionKind::Extension => write!(f, "extension"),
        }
    }
}

/// Balance transaction entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceTransaction {
    /// Unique identifier
    pub id: Uuid,

    /// Session the transaction belongs to, if any
    pub session_id: Option<Uuid>,

    /// Transaction amount (positive or negative)
    pub amount: Decimal,

    /// Balance before transaction
    pub previous_balance: Decimal,

    /// Balance after transaction
    pub new_balance: Decimal,

    /// Type of transaction
    pub kind: TransactionKind,

    /// Reason/description
    pub description: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl BalanceTransaction {
    /// Create a new transaction record
    pub fn new(
        session_id: Option<Uuid>,
        amount: Decimal,
        previous_balance: Decimal,
        kind: TransactionKind,
        description: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            amount,
            previous_balance,
            new_balance: previous_balance + amount,
            kind,
            description: description.into(),
            created_at,
        }
    }

    /// Check if this is a debit transaction (reduces balance)
    pub fn is_debit(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Check if this is a credit transaction (increases balance)
    pub fn is_credit(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Signed amount with two decimals, e.g. `+500.00` or `-100.00`
    pub fn signed_amount(&self) -> String {
        let sign = if self.is_credit() { "+" } else { "-" };
        format!("{}{:.2}", sign, self.amount.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transaction_new() {
        let tx = BalanceTransaction::new(
            None,
            dec!(500.00),
            dec!(1250.00),
            TransactionKind::TopUp,
            "Top-up",
            Utc::now(),
        );

        assert_eq!(tx.previous_balance, dec!(1250.00));
        assert_eq!(tx.new_balance, dec!(1750.00));
        assert!(tx.is_credit());
        assert_eq!(tx.signed_amount(), "+500.00");
    }

    #[test]
    fn test_transaction_debit() {
        let tx = BalanceTransaction::new(
            Some(Uuid::new_v4()),
            dec!(-100),
            dec!(200),
            TransactionKind::Extension,
            "Extension 2h",
            Utc::now(),
        );

        assert_eq!(tx.new_balance, dec!(100));
        assert!(tx.is_debit());
        assert_eq!(tx.signed_amount(), "-100.00");
    }
}
