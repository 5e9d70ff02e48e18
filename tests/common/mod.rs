// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use tellerbook::application::LedgerService;
use tellerbook::domain::{Account, AccountType, Customer, Gender};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to register a customer with plausible details
pub async fn create_customer(service: &LedgerService, name: &str) -> Result<Customer> {
    let customer = service
        .create_customer(
            name.to_string(),
            34,
            Gender::Female,
            "+91 98200 00000".to_string(),
            "12 MG Road, Pune".to_string(),
        )
        .await?;
    Ok(customer)
}

/// Test fixture: one customer owning a savings and a current account
pub struct Household {
    pub customer: Customer,
    pub savings: Account,
    pub current: Account,
}

impl Household {
    pub async fn create(
        service: &LedgerService,
        savings_cents: i64,
        current_cents: i64,
    ) -> Result<Self> {
        let customer = create_customer(service, "Asha Rao").await?;
        let savings = service
            .create_account(customer.id, AccountType::Savings, savings_cents)
            .await?;
        let current = service
            .create_account(customer.id, AccountType::Current, current_cents)
            .await?;
        Ok(Self {
            customer,
            savings,
            current,
        })
    }
}

/// Current balance of an account, in cents
pub async fn balance(service: &LedgerService, account: &Account) -> Result<i64> {
    Ok(service.get_account(account.id).await?.balance_cents)
}
