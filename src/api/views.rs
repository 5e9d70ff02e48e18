//! JSON shapes exchanged with HTTP clients. Field names are camelCase and
//! money travels as a JSON number with two decimal places.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::AppError;
use crate::domain::{
    Account, AccountId, AccountType, Customer, CustomerId, Gender, Loan, LoanId, LoanStatus,
    MoneyError, Transaction, TransactionId, TransactionType, TransferLegs, TransferRef,
    cents_to_decimal,
};

// ========================
// Requests
// ========================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub customer_id: Option<CustomerId>,
    #[serde(rename = "type")]
    pub account_type: Option<AccountType>,
    /// Opening balance; an account may be opened empty.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub balance: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    #[serde(rename = "type")]
    pub account_type: Option<AccountType>,
}

/// `emi` and `status` may be sent by older clients; both are decided by
/// the service and ignored here.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoanRequest {
    pub customer_id: Option<CustomerId>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub interest_rate: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyMovementRequest {
    pub account_id: Option<AccountId>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub from_account_id: Option<AccountId>,
    pub to_account_id: Option<AccountId>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
}

/// Unwrap a required request field or report it as missing.
pub fn required<T>(value: Option<T>, field: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::InvalidArgument(format!("Missing required field: {}", field)))
}

// ========================
// Responses
// ========================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerView {
    pub id: CustomerId,
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub phone: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

impl From<Customer> for CustomerView {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id,
            name: customer.name,
            age: customer.age,
            gender: customer.gender,
            phone: customer.phone,
            address: customer.address,
            created_at: customer.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: AccountId,
    pub customer_id: CustomerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    pub low_balance: bool,
    pub created_at: DateTime<Utc>,
}

impl AccountView {
    pub fn new(account: Account, names: &HashMap<CustomerId, String>) -> Self {
        let mut view = Self::from(account);
        view.customer_name = names.get(&view.customer_id).cloned();
        view
    }
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            low_balance: account.is_low_balance(),
            id: account.id,
            customer_id: account.customer_id,
            customer_name: None,
            account_type: account.account_type,
            balance: cents_to_decimal(account.balance_cents),
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanView {
    pub id: LoanId,
    pub customer_id: CustomerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub interest_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub emi: Decimal,
    pub status: LoanStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_interest: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_repayment: Decimal,
    pub created_at: DateTime<Utc>,
}

impl LoanView {
    pub fn new(loan: Loan, names: &HashMap<CustomerId, String>) -> Result<Self, MoneyError> {
        let mut view = Self::try_from(loan)?;
        view.customer_name = names.get(&view.customer_id).cloned();
        Ok(view)
    }
}

impl TryFrom<Loan> for LoanView {
    type Error = MoneyError;

    fn try_from(loan: Loan) -> Result<Self, Self::Error> {
        let total_interest = loan.total_interest()?;
        let total_repayment = loan.total_repayment()?;
        Ok(Self {
            id: loan.id,
            customer_id: loan.customer_id,
            customer_name: None,
            amount: cents_to_decimal(loan.amount_cents),
            interest_rate: loan.interest_rate,
            emi: cents_to_decimal(loan.emi_cents),
            status: loan.status,
            total_interest: cents_to_decimal(total_interest),
            total_repayment: cents_to_decimal(total_repayment),
            created_at: loan.created_at,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: TransactionId,
    pub account_id: AccountId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_type: Option<AccountType>,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_ref: Option<TransferRef>,
}

impl TransactionView {
    pub fn new(txn: Transaction, types: &HashMap<AccountId, AccountType>) -> Self {
        let mut view = Self::from(txn);
        view.account_type = types.get(&view.account_id).copied();
        view
    }
}

impl From<Transaction> for TransactionView {
    fn from(txn: Transaction) -> Self {
        Self {
            id: txn.id,
            account_id: txn.account_id,
            account_type: None,
            amount: cents_to_decimal(txn.amount_cents),
            transaction_type: txn.transaction_type,
            timestamp: txn.timestamp,
            transfer_ref: txn.transfer_ref,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransferView {
    pub from: TransactionView,
    pub to: TransactionView,
}

impl From<TransferLegs> for TransferView {
    fn from(legs: TransferLegs) -> Self {
        Self {
            from: legs.from.into(),
            to: legs.to.into(),
        }
    }
}
