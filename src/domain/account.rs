use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, CustomerId, is_low_balance};

pub type AccountId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    Savings,
    Current,
    #[serde(alias = "Fixed Deposit")]
    FixedDeposit,
    #[serde(alias = "Recurring Deposit")]
    RecurringDeposit,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Savings => "Savings",
            AccountType::Current => "Current",
            AccountType::FixedDeposit => "FixedDeposit",
            AccountType::RecurringDeposit => "RecurringDeposit",
        }
    }

    /// Accepts the canonical names as well as the spaced forms
    /// ("Fixed Deposit") used by the dashboard forms.
    pub fn from_str(s: &str) -> Option<Self> {
        let key: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "savings" => Some(AccountType::Savings),
            "current" => Some(AccountType::Current),
            "fixeddeposit" => Some(AccountType::FixedDeposit),
            "recurringdeposit" => Some(AccountType::RecurringDeposit),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub customer_id: CustomerId,
    pub account_type: AccountType,
    /// Always >= 0 once committed
    pub balance_cents: Cents,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(customer_id: CustomerId, account_type: AccountType, balance_cents: Cents) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            account_type,
            balance_cents,
            created_at: Utc::now(),
        }
    }

    pub fn is_low_balance(&self) -> bool {
        is_low_balance(self.balance_cents)
    }
}
