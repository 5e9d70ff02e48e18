use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, Cents};

pub type TransactionId = Uuid;
pub type TransferRef = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Deposit,
    Withdrawal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "Deposit",
            TransactionType::Withdrawal => "Withdrawal",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "deposit" => Some(TransactionType::Deposit),
            "withdrawal" => Some(TransactionType::Withdrawal),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An append-only ledger entry against a single account.
/// Entries are never updated or deleted once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    /// Amount in cents (always positive); the direction is in `transaction_type`
    pub amount_cents: Cents,
    pub transaction_type: TransactionType,
    pub timestamp: DateTime<Utc>,
    /// Shared by the two legs of a transfer
    pub transfer_ref: Option<TransferRef>,
}

impl Transaction {
    fn new(account_id: AccountId, amount_cents: Cents, transaction_type: TransactionType) -> Self {
        assert!(amount_cents > 0, "Transaction amount must be positive");
        Self {
            id: Uuid::new_v4(),
            account_id,
            amount_cents,
            transaction_type,
            timestamp: Utc::now(),
            transfer_ref: None,
        }
    }

    pub fn deposit(account_id: AccountId, amount_cents: Cents) -> Self {
        Self::new(account_id, amount_cents, TransactionType::Deposit)
    }

    pub fn withdrawal(account_id: AccountId, amount_cents: Cents) -> Self {
        Self::new(account_id, amount_cents, TransactionType::Withdrawal)
    }

    pub fn with_transfer_ref(mut self, transfer_ref: TransferRef) -> Self {
        self.transfer_ref = Some(transfer_ref);
        self
    }

    /// Signed effect of this entry on its account balance.
    pub fn signed_amount(&self) -> Cents {
        match self.transaction_type {
            TransactionType::Deposit => self.amount_cents,
            TransactionType::Withdrawal => -self.amount_cents,
        }
    }
}

/// The two legs of a transfer: a withdrawal on the source account and a
/// deposit on the destination, stamped with the same time and reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferLegs {
    pub from: Transaction,
    pub to: Transaction,
}

impl TransferLegs {
    pub fn new(from_account: AccountId, to_account: AccountId, amount_cents: Cents) -> Self {
        let transfer_ref = Uuid::new_v4();
        let from = Transaction::withdrawal(from_account, amount_cents).with_transfer_ref(transfer_ref);
        let mut to = Transaction::deposit(to_account, amount_cents).with_transfer_ref(transfer_ref);
        to.timestamp = from.timestamp;
        Self { from, to }
    }

    pub fn transfer_ref(&self) -> Option<TransferRef> {
        self.from.transfer_ref
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_amount() {
        let account = Uuid::new_v4();
        assert_eq!(Transaction::deposit(account, 5000).signed_amount(), 5000);
        assert_eq!(Transaction::withdrawal(account, 3000).signed_amount(), -3000);
    }

    #[test]
    fn test_transfer_legs_are_paired() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let legs = TransferLegs::new(a, b, 2500);

        assert_eq!(legs.from.account_id, a);
        assert_eq!(legs.from.transaction_type, TransactionType::Withdrawal);
        assert_eq!(legs.to.account_id, b);
        assert_eq!(legs.to.transaction_type, TransactionType::Deposit);
        assert_ne!(legs.from.id, legs.to.id);
        assert_eq!(legs.from.transfer_ref, legs.to.transfer_ref);
        assert!(legs.transfer_ref().is_some());
        assert_eq!(legs.from.signed_amount() + legs.to.signed_amount(), 0);
    }

    #[test]
    #[should_panic(expected = "Transaction amount must be positive")]
    fn test_transaction_requires_positive_amount() {
        Transaction::deposit(Uuid::new_v4(), 0);
    }
}
