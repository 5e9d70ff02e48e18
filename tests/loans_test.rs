mod common;

use anyhow::Result;
use common::{Household, create_customer, test_service};
use rust_decimal::Decimal;
use tellerbook::application::{AppError, ErrorKind};
use tellerbook::domain::{LoanAction, LoanStatus};
use uuid::Uuid;

#[tokio::test]
async fn test_apply_loan_computes_emi_and_starts_pending() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = create_customer(&service, "Asha Rao").await?;

    let loan = service
        .apply_loan(customer.id, 1_000_000, Decimal::from(12))
        .await?;

    assert_eq!(loan.status, LoanStatus::Pending);
    assert_eq!(loan.emi_cents, 88_849);
    assert_eq!(loan.total_interest()?, 120_000);
    assert_eq!(loan.total_repayment()?, 1_120_000);

    let stored = service.get_loan(loan.id).await?;
    assert_eq!(stored.emi_cents, 88_849);
    assert_eq!(stored.interest_rate, Decimal::from(12));
    Ok(())
}

#[tokio::test]
async fn test_zero_rate_loan() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = create_customer(&service, "Asha Rao").await?;

    let loan = service
        .apply_loan(customer.id, 120_000, Decimal::ZERO)
        .await?;
    assert_eq!(loan.emi_cents, 10_000);
    assert_eq!(loan.total_repayment()?, 120_000);
    Ok(())
}

#[tokio::test]
async fn test_apply_loan_validation() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = create_customer(&service, "Asha Rao").await?;

    let err = service
        .apply_loan(customer.id, 0, Decimal::from(10))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = service
        .apply_loan(customer.id, 100_000, Decimal::from(-1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = service
        .apply_loan(Uuid::new_v4(), 100_000, Decimal::from(10))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CustomerNotFound(_)));

    assert!(service.list_loans().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_loan_with_unrepresentable_totals_is_not_stored() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = create_customer(&service, "Asha Rao").await?;

    // Interest overflows on its own
    let err = service
        .apply_loan(customer.id, 1_000_000_000_000_000_000, Decimal::from(1000))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    // Principal plus interest overflows
    let err = service
        .apply_loan(customer.id, 9_000_000_000_000_000_000, Decimal::from(50))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    assert!(service.list_loans().await?.is_empty());
    assert_eq!(service.dashboard_stats().await?.total_loans, 0);

    // A sane loan for the same customer still lists fine
    service
        .apply_loan(customer.id, 100_000, Decimal::from(10))
        .await?;
    assert_eq!(service.list_loans().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_loan_lifecycle() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = create_customer(&service, "Asha Rao").await?;
    let loan = service
        .apply_loan(customer.id, 500_000, Decimal::from(9))
        .await?;

    // Cannot close a pending loan
    let err = service.close_loan(loan.id).await.unwrap_err();
    match &err {
        AppError::InvalidLoanTransition { source, .. } => {
            assert_eq!(source.from, LoanStatus::Pending);
            assert_eq!(source.action, LoanAction::Close);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let approved = service.approve_loan(loan.id).await?;
    assert_eq!(approved.status, LoanStatus::Approved);

    // Approving twice is refused and leaves the status alone
    let err = service.approve_loan(loan.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(service.get_loan(loan.id).await?.status, LoanStatus::Approved);

    let closed = service.close_loan(loan.id).await?;
    assert_eq!(closed.status, LoanStatus::Closed);

    // Closed is terminal
    assert!(service.approve_loan(loan.id).await.is_err());
    assert!(service.close_loan(loan.id).await.is_err());
    assert_eq!(service.get_loan(loan.id).await?.status, LoanStatus::Closed);
    Ok(())
}

#[tokio::test]
async fn test_transition_unknown_loan() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service.approve_loan(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::LoanNotFound(_)));
    Ok(())
}

#[tokio::test]
async fn test_delete_loan_rules() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = create_customer(&service, "Asha Rao").await?;

    let pending = service
        .apply_loan(customer.id, 100_000, Decimal::from(10))
        .await?;
    service.delete_loan(pending.id).await?;
    assert!(matches!(
        service.get_loan(pending.id).await.unwrap_err(),
        AppError::LoanNotFound(_)
    ));

    let active = service
        .apply_loan(customer.id, 100_000, Decimal::from(10))
        .await?;
    service.approve_loan(active.id).await?;
    let err = service.delete_loan(active.id).await.unwrap_err();
    assert!(matches!(err, AppError::LoanActive(id) if id == active.id));

    service.close_loan(active.id).await?;
    service.delete_loan(active.id).await?;
    assert!(service.list_loans().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_customer_with_loan_cannot_be_deleted() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = create_customer(&service, "Asha Rao").await?;
    service
        .apply_loan(customer.id, 100_000, Decimal::from(10))
        .await?;

    let err = service.delete_customer(customer.id).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::CustomerHasDependents {
            accounts: 0,
            loans: 1,
            ..
        }
    ));
    Ok(())
}

#[tokio::test]
async fn test_dashboard_stats() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let household = Household::create(&service, 100_000, 0).await?;
    create_customer(&service, "Vikram Shah").await?;
    create_customer(&service, "Meera Iyer").await?;
    service
        .apply_loan(household.customer.id, 200_000, Decimal::from(8))
        .await?;

    service.deposit(household.savings.id, 1_000).await?;
    service.withdraw(household.savings.id, 500).await?;
    service
        .transfer(household.savings.id, household.current.id, 2_000)
        .await?;

    let stats = service.dashboard_stats().await?;
    assert_eq!(stats.total_customers, 3);
    assert_eq!(stats.total_accounts, 2);
    assert_eq!(stats.total_loans, 1);
    assert_eq!(stats.total_transactions, 4);
    Ok(())
}
