use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, CustomerId, MoneyError, cents_to_decimal, round_to_cents};

pub type LoanId = Uuid;

/// Every loan is amortized over a fixed one-year tenure.
pub const LOAN_TENURE_MONTHS: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    Pending,
    Approved,
    Closed,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "Pending",
            LoanStatus::Approved => "Approved",
            LoanStatus::Closed => "Closed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(LoanStatus::Pending),
            "approved" => Some(LoanStatus::Approved),
            "closed" => Some(LoanStatus::Closed),
            _ => None,
        }
    }

    /// Pending -> Approved. Any other starting state is rejected.
    pub fn approve(self) -> Result<LoanStatus, TransitionError> {
        match self {
            LoanStatus::Pending => Ok(LoanStatus::Approved),
            from => Err(TransitionError {
                from,
                action: LoanAction::Approve,
            }),
        }
    }

    /// Approved -> Closed. Any other starting state is rejected.
    pub fn close(self) -> Result<LoanStatus, TransitionError> {
        match self {
            LoanStatus::Approved => Ok(LoanStatus::Closed),
            from => Err(TransitionError {
                from,
                action: LoanAction::Close,
            }),
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanAction {
    Approve,
    Close,
}

impl std::fmt::Display for LoanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoanAction::Approve => write!(f, "approve"),
            LoanAction::Close => write!(f, "close"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionError {
    pub from: LoanStatus,
    pub action: LoanAction,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot {} a loan that is {}", self.action, self.from)
    }
}

impl std::error::Error for TransitionError {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub customer_id: CustomerId,
    /// Principal in cents (always positive)
    pub amount_cents: Cents,
    /// Annual rate in percent
    pub interest_rate: Decimal,
    pub emi_cents: Cents,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
}

impl Loan {
    /// Create a pending loan with its EMI computed from amount and rate.
    pub fn new(
        customer_id: CustomerId,
        amount_cents: Cents,
        interest_rate: Decimal,
    ) -> Result<Self, MoneyError> {
        let emi_cents = calculate_emi(amount_cents, interest_rate)?;
        let loan = Self {
            id: Uuid::new_v4(),
            customer_id,
            amount_cents,
            interest_rate,
            emi_cents,
            status: LoanStatus::Pending,
            created_at: Utc::now(),
        };
        // A stored loan must always be able to report its totals.
        loan.total_repayment()?;
        Ok(loan)
    }

    pub fn total_interest(&self) -> Result<Cents, MoneyError> {
        total_interest(self.amount_cents, self.interest_rate)
    }

    pub fn total_repayment(&self) -> Result<Cents, MoneyError> {
        let interest = self.total_interest()?;
        self.amount_cents.checked_add(interest).ok_or_else(|| {
            MoneyError::OutOfRange(cents_to_decimal(self.amount_cents) + cents_to_decimal(interest))
        })
    }
}

/// Monthly installment over `LOAN_TENURE_MONTHS`:
/// `P * r * (1+r)^n / ((1+r)^n - 1)` with `r = rate / 12 / 100`.
/// A zero rate degenerates to `P / n`.
pub fn calculate_emi(amount_cents: Cents, interest_rate: Decimal) -> Result<Cents, MoneyError> {
    let principal = cents_to_decimal(amount_cents);
    let months = Decimal::from(LOAN_TENURE_MONTHS);

    if interest_rate.is_zero() {
        return round_to_cents(principal / months);
    }

    let monthly_rate = interest_rate / Decimal::from(12) / Decimal::ONE_HUNDRED;
    let growth = compound(Decimal::ONE + monthly_rate, LOAN_TENURE_MONTHS)
        .ok_or(MoneyError::OutOfRange(interest_rate))?;
    let emi = principal
        .checked_mul(monthly_rate)
        .and_then(|v| v.checked_mul(growth))
        .and_then(|v| v.checked_div(growth - Decimal::ONE))
        .ok_or(MoneyError::OutOfRange(principal))?;
    round_to_cents(emi)
}

/// Flat, single-period interest: `amount * rate / 100`.
pub fn total_interest(amount_cents: Cents, interest_rate: Decimal) -> Result<Cents, MoneyError> {
    let interest = cents_to_decimal(amount_cents)
        .checked_mul(interest_rate)
        .ok_or(MoneyError::OutOfRange(interest_rate))?
        / Decimal::ONE_HUNDRED;
    round_to_cents(interest)
}

fn compound(base: Decimal, periods: u32) -> Option<Decimal> {
    (0..periods).try_fold(Decimal::ONE, |acc, _| acc.checked_mul(base))
}
