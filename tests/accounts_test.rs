mod common;

use anyhow::Result;
use common::{Household, create_customer, test_service};
use tellerbook::application::{AppError, ErrorKind};
use tellerbook::domain::{AccountType, LOW_BALANCE_THRESHOLD};
use uuid::Uuid;

#[tokio::test]
async fn test_open_account_with_initial_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = create_customer(&service, "Asha Rao").await?;

    let account = service
        .create_account(customer.id, AccountType::FixedDeposit, 2_500_000)
        .await?;

    let fetched = service.get_account(account.id).await?;
    assert_eq!(fetched.customer_id, customer.id);
    assert_eq!(fetched.account_type, AccountType::FixedDeposit);
    assert_eq!(fetched.balance_cents, 2_500_000);
    assert!(!fetched.is_low_balance());

    // Opening balance is not a transaction
    assert!(service.list_transactions().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_open_account_for_unknown_customer() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service
        .create_account(Uuid::new_v4(), AccountType::Savings, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CustomerNotFound(_)));
    assert!(service.list_accounts().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_open_account_rejects_negative_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = create_customer(&service, "Asha Rao").await?;

    let err = service
        .create_account(customer.id, AccountType::Savings, -1)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    Ok(())
}

#[tokio::test]
async fn test_low_balance_accounts() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let household = Household::create(&service, LOW_BALANCE_THRESHOLD - 1, LOW_BALANCE_THRESHOLD)
        .await?;

    let low = service.low_balance_accounts().await?;
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].id, household.savings.id);

    // Depositing lifts the account over the threshold
    service.deposit(household.savings.id, 1).await?;
    assert!(service.low_balance_accounts().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_list_accounts_for_customer() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let household = Household::create(&service, 0, 0).await?;
    let other = create_customer(&service, "Vikram Shah").await?;
    service
        .create_account(other.id, AccountType::RecurringDeposit, 0)
        .await?;

    let accounts = service
        .list_accounts_for_customer(household.customer.id)
        .await?;
    assert_eq!(accounts.len(), 2);
    assert!(accounts.iter().all(|a| a.customer_id == household.customer.id));

    let err = service
        .list_accounts_for_customer(Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn test_update_account_type_keeps_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let household = Household::create(&service, 75_000, 0).await?;

    let updated = service
        .update_account_type(household.savings.id, AccountType::Current)
        .await?;
    assert_eq!(updated.account_type, AccountType::Current);
    assert_eq!(updated.balance_cents, 75_000);
    Ok(())
}

#[tokio::test]
async fn test_delete_account_rules() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let household = Household::create(&service, 10_000, 0).await?;

    // Non-zero balance
    let err = service.delete_account(household.savings.id).await.unwrap_err();
    assert!(matches!(err, AppError::AccountInUse { balance: 10_000, .. }));
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    // Zero balance but with history
    service.deposit(household.current.id, 500).await?;
    service.withdraw(household.current.id, 500).await?;
    let err = service.delete_account(household.current.id).await.unwrap_err();
    assert!(matches!(err, AppError::AccountInUse { transactions: 2, .. }));

    // Empty and untouched
    let fresh = service
        .create_account(household.customer.id, AccountType::Savings, 0)
        .await?;
    service.delete_account(fresh.id).await?;
    assert!(matches!(
        service.get_account(fresh.id).await.unwrap_err(),
        AppError::AccountNotFound(_)
    ));
    Ok(())
}
