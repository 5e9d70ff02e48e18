use std::time::Duration;

use thiserror::Error;

use crate::domain::{
    AccountId, Cents, CustomerError, CustomerId, LoanId, MoneyError, TransitionError,
    format_cents,
};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Loan not found: {0}")]
    LoanNotFound(LoanId),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Insufficient funds in account {account_id}: balance {}, required {}", money(.balance), money(.required))]
    InsufficientFunds {
        account_id: AccountId,
        balance: Cents,
        required: Cents,
    },

    #[error("Loan {loan_id}: {source}")]
    InvalidLoanTransition {
        loan_id: LoanId,
        source: TransitionError,
    },

    #[error("Customer {customer_id} still owns {accounts} account(s) and {loans} loan(s)")]
    CustomerHasDependents {
        customer_id: CustomerId,
        accounts: i64,
        loans: i64,
    },

    #[error("Account {account_id} cannot be deleted: balance {}, {transactions} recorded transaction(s)", money(.balance))]
    AccountInUse {
        account_id: AccountId,
        balance: Cents,
        transactions: i64,
    },

    #[error("Loan {0} is approved and cannot be deleted")]
    LoanActive(LoanId),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

fn money(cents: &Cents) -> String {
    format_cents(*cents)
}

/// Machine-readable classification of an `AppError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    InsufficientFunds,
    InvalidState,
    Unavailable,
    Internal,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Internal => "internal",
        }
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::CustomerNotFound(_)
            | AppError::AccountNotFound(_)
            | AppError::LoanNotFound(_) => ErrorKind::NotFound,
            AppError::InvalidAmount(_) | AppError::InvalidArgument(_) => {
                ErrorKind::InvalidArgument
            }
            AppError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            AppError::InvalidLoanTransition { .. }
            | AppError::CustomerHasDependents { .. }
            | AppError::AccountInUse { .. }
            | AppError::LoanActive(_) => ErrorKind::InvalidState,
            AppError::Timeout(_) => ErrorKind::Unavailable,
            AppError::Database(_) => ErrorKind::Internal,
        }
    }
}

impl From<MoneyError> for AppError {
    fn from(err: MoneyError) -> Self {
        AppError::InvalidAmount(err.to_string())
    }
}

impl From<CustomerError> for AppError {
    fn from(err: CustomerError) -> Self {
        AppError::InvalidArgument(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::domain::LoanStatus;

    #[test]
    fn test_kinds() {
        let id = Uuid::new_v4();
        assert_eq!(AppError::AccountNotFound(id).kind(), ErrorKind::NotFound);
        assert_eq!(
            AppError::InvalidAmount("zero".into()).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            AppError::InsufficientFunds {
                account_id: id,
                balance: 0,
                required: 1
            }
            .kind(),
            ErrorKind::InsufficientFunds
        );
        assert_eq!(
            AppError::Timeout(Duration::from_secs(1)).kind(),
            ErrorKind::Unavailable
        );
        assert_eq!(
            AppError::Database(anyhow::anyhow!("disk")).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_transition_message_names_the_loan() {
        let id = Uuid::new_v4();
        let err = AppError::InvalidLoanTransition {
            loan_id: id,
            source: LoanStatus::Closed.approve().unwrap_err(),
        };
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(
            err.to_string(),
            format!("Loan {}: cannot approve a loan that is Closed", id)
        );
    }

    #[test]
    fn test_insufficient_funds_message_formats_money() {
        let id = Uuid::new_v4();
        let err = AppError::InsufficientFunds {
            account_id: id,
            balance: 40000,
            required: 60000,
        };
        assert_eq!(
            err.to_string(),
            format!(
                "Insufficient funds in account {}: balance 400.00, required 600.00",
                id
            )
        );
    }
}
