mod common;

use std::sync::Arc;

use anyhow::Result;
use common::{Household, create_customer, test_service};
use tellerbook::application::{AppError, ErrorKind};
use tellerbook::domain::{AccountType, CustomerPatch, Gender};
use uuid::Uuid;

#[tokio::test]
async fn test_create_and_list_customers() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let asha = create_customer(&service, "Asha Rao").await?;
    let vikram = create_customer(&service, "Vikram Shah").await?;

    let customers = service.list_customers().await?;
    assert_eq!(customers.len(), 2);
    assert!(customers.iter().any(|c| c.id == asha.id));
    assert!(customers.iter().any(|c| c.id == vikram.id));

    let fetched = service.get_customer(asha.id).await?;
    assert_eq!(fetched.name, "Asha Rao");
    assert_eq!(fetched.gender, Gender::Female);
    assert_eq!(fetched.age, 34);

    Ok(())
}

#[tokio::test]
async fn test_create_customer_rejects_blank_fields() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service
        .create_customer(
            "  ".to_string(),
            30,
            Gender::Male,
            "555-0101".to_string(),
            "Somewhere".to_string(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = service
        .create_customer(
            "Ravi".to_string(),
            0,
            Gender::Male,
            "555-0101".to_string(),
            "Somewhere".to_string(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    assert!(service.list_customers().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_update_customer_changes_only_given_fields() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = create_customer(&service, "Asha Rao").await?;

    let patch = CustomerPatch {
        phone: Some("555-0199".to_string()),
        ..Default::default()
    };
    let updated = service.update_customer(customer.id, patch).await?;

    assert_eq!(updated.phone, "555-0199");
    assert_eq!(updated.name, customer.name);
    assert_eq!(updated.address, customer.address);

    let reloaded = service.get_customer(customer.id).await?;
    assert_eq!(reloaded.phone, "555-0199");
    Ok(())
}

#[tokio::test]
async fn test_get_unknown_customer_is_not_found() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let missing = Uuid::new_v4();
    let err = service.get_customer(missing).await.unwrap_err();
    assert!(matches!(err, AppError::CustomerNotFound(id) if id == missing));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn test_delete_customer_without_dependents() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = create_customer(&service, "Asha Rao").await?;

    service.delete_customer(customer.id).await?;

    assert!(service.list_customers().await?.is_empty());
    let err = service.delete_customer(customer.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn test_delete_customer_with_accounts_is_refused() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let household = Household::create(&service, 0, 0).await?;

    let err = service
        .delete_customer(household.customer.id)
        .await
        .unwrap_err();
    match err {
        AppError::CustomerHasDependents {
            accounts, loans, ..
        } => {
            assert_eq!(accounts, 2);
            assert_eq!(loans, 0);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Nothing was removed
    assert_eq!(service.list_customers().await?.len(), 1);
    assert_eq!(service.list_accounts().await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_delete_customer_after_accounts_removed() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = create_customer(&service, "Asha Rao").await?;
    let account = service
        .create_account(customer.id, AccountType::Savings, 0)
        .await?;

    service.delete_account(account.id).await?;
    service.delete_customer(customer.id).await?;

    assert!(service.list_customers().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_delete_customer_racing_account_removal() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let service = Arc::new(service);

    for _ in 0..10 {
        let customer = create_customer(&service, "Asha Rao").await?;
        let account = service
            .create_account(customer.id, AccountType::Savings, 0)
            .await?;

        let remove_account = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.delete_account(account.id).await }
        });
        let remove_customer = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.delete_customer(customer.id).await }
        });

        remove_account.await??;
        match remove_customer.await? {
            Ok(()) => {}
            Err(AppError::CustomerHasDependents {
                accounts, loans, ..
            }) => {
                // A refusal must name the dependents that caused it
                assert!(accounts + loans > 0);
                service.delete_customer(customer.id).await?;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert!(service.list_customers().await?.is_empty());
    Ok(())
}
