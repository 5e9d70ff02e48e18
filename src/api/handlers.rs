use std::collections::HashMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::application::{AppError, DashboardStats};
use crate::domain::{CustomerId, CustomerPatch, Loan, decimal_to_cents};

use super::error::{ApiError, JsonBody, PathId};
use super::views::{
    AccountView, CreateAccountRequest, CreateCustomerRequest, CreateLoanRequest, CustomerView,
    LoanView, MoneyMovementRequest, TransactionView, TransferRequest, TransferView,
    UpdateAccountRequest, required,
};
use super::AppState;

type ApiResult<T> = Result<T, ApiError>;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

// ========================
// Customers
// ========================

pub async fn list_customers(State(state): State<AppState>) -> ApiResult<Json<Vec<CustomerView>>> {
    let customers = state.service.list_customers().await?;
    Ok(Json(customers.into_iter().map(CustomerView::from).collect()))
}

pub async fn create_customer(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateCustomerRequest>,
) -> ApiResult<(StatusCode, Json<CustomerView>)> {
    let customer = state
        .service
        .create_customer(
            required(payload.name, "name")?,
            required(payload.age, "age")?,
            required(payload.gender, "gender")?,
            required(payload.phone, "phone")?,
            required(payload.address, "address")?,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(customer.into())))
}

pub async fn get_customer(
    State(state): State<AppState>,
    PathId(id): PathId<Uuid>,
) -> ApiResult<Json<CustomerView>> {
    let customer = state.service.get_customer(id).await?;
    Ok(Json(customer.into()))
}

pub async fn update_customer(
    State(state): State<AppState>,
    PathId(id): PathId<Uuid>,
    JsonBody(patch): JsonBody<CustomerPatch>,
) -> ApiResult<Json<CustomerView>> {
    let customer = state.service.update_customer(id, patch).await?;
    Ok(Json(customer.into()))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    PathId(id): PathId<Uuid>,
) -> ApiResult<StatusCode> {
    state.service.delete_customer(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ========================
// Accounts
// ========================

pub async fn list_accounts(State(state): State<AppState>) -> ApiResult<Json<Vec<AccountView>>> {
    let names = state.service.customer_names().await?;
    let accounts = state.service.list_accounts().await?;
    Ok(Json(
        accounts
            .into_iter()
            .map(|a| AccountView::new(a, &names))
            .collect(),
    ))
}

pub async fn list_low_balance_accounts(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<AccountView>>> {
    let names = state.service.customer_names().await?;
    let accounts = state.service.low_balance_accounts().await?;
    Ok(Json(
        accounts
            .into_iter()
            .map(|a| AccountView::new(a, &names))
            .collect(),
    ))
}

pub async fn list_customer_accounts(
    State(state): State<AppState>,
    PathId(customer_id): PathId<Uuid>,
) -> ApiResult<Json<Vec<AccountView>>> {
    let accounts = state.service.list_accounts_for_customer(customer_id).await?;
    Ok(Json(accounts.into_iter().map(AccountView::from).collect()))
}

pub async fn create_account(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateAccountRequest>,
) -> ApiResult<(StatusCode, Json<AccountView>)> {
    let customer_id = required(payload.customer_id, "customerId")?;
    let account_type = required(payload.account_type, "type")?;
    let balance = payload
        .balance
        .map(decimal_to_cents)
        .transpose()
        .map_err(AppError::from)?
        .unwrap_or(0);

    let account = state
        .service
        .create_account(customer_id, account_type, balance)
        .await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

pub async fn get_account(
    State(state): State<AppState>,
    PathId(id): PathId<Uuid>,
) -> ApiResult<Json<AccountView>> {
    let account = state.service.get_account(id).await?;
    Ok(Json(account.into()))
}

pub async fn update_account(
    State(state): State<AppState>,
    PathId(id): PathId<Uuid>,
    JsonBody(payload): JsonBody<UpdateAccountRequest>,
) -> ApiResult<Json<AccountView>> {
    let account_type = required(payload.account_type, "type")?;
    let account = state.service.update_account_type(id, account_type).await?;
    Ok(Json(account.into()))
}

pub async fn delete_account(
    State(state): State<AppState>,
    PathId(id): PathId<Uuid>,
) -> ApiResult<StatusCode> {
    state.service.delete_account(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ========================
// Transactions
// ========================

pub async fn list_transactions(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<TransactionView>>> {
    let types = state.service.account_types().await?;
    let transactions = state.service.list_transactions().await?;
    Ok(Json(
        transactions
            .into_iter()
            .map(|t| TransactionView::new(t, &types))
            .collect(),
    ))
}

pub async fn list_account_transactions(
    State(state): State<AppState>,
    PathId(account_id): PathId<Uuid>,
) -> ApiResult<Json<Vec<TransactionView>>> {
    let transactions = state
        .service
        .list_transactions_for_account(account_id)
        .await?;
    Ok(Json(
        transactions.into_iter().map(TransactionView::from).collect(),
    ))
}

pub async fn deposit(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<MoneyMovementRequest>,
) -> ApiResult<(StatusCode, Json<TransactionView>)> {
    let account_id = required(payload.account_id, "accountId")?;
    let amount = decimal_to_cents(required(payload.amount, "amount")?).map_err(AppError::from)?;

    let txn = state.service.deposit(account_id, amount).await?;
    Ok((StatusCode::CREATED, Json(txn.into())))
}

pub async fn withdraw(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<MoneyMovementRequest>,
) -> ApiResult<(StatusCode, Json<TransactionView>)> {
    let account_id = required(payload.account_id, "accountId")?;
    let amount = decimal_to_cents(required(payload.amount, "amount")?).map_err(AppError::from)?;

    let txn = state.service.withdraw(account_id, amount).await?;
    Ok((StatusCode::CREATED, Json(txn.into())))
}

pub async fn transfer(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<TransferRequest>,
) -> ApiResult<(StatusCode, Json<TransferView>)> {
    let from = required(payload.from_account_id, "fromAccountId")?;
    let to = required(payload.to_account_id, "toAccountId")?;
    let amount = decimal_to_cents(required(payload.amount, "amount")?).map_err(AppError::from)?;

    let legs = state.service.transfer(from, to, amount).await?;
    Ok((StatusCode::CREATED, Json(legs.into())))
}

// ========================
// Loans
// ========================

fn loan_view(loan: Loan, names: &HashMap<CustomerId, String>) -> Result<LoanView, ApiError> {
    LoanView::new(loan, names).map_err(|e| ApiError(AppError::from(e)))
}

/// View of a single loan, named after its owner.
async fn named_loan_view(state: &AppState, loan: Loan) -> Result<LoanView, ApiError> {
    let owner = state.service.get_customer(loan.customer_id).await?;
    loan_view(loan, &HashMap::from([(owner.id, owner.name)]))
}

pub async fn list_loans(State(state): State<AppState>) -> ApiResult<Json<Vec<LoanView>>> {
    let names = state.service.customer_names().await?;
    let loans = state.service.list_loans().await?;
    let views = loans
        .into_iter()
        .map(|l| loan_view(l, &names))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(views))
}

pub async fn list_customer_loans(
    State(state): State<AppState>,
    PathId(customer_id): PathId<Uuid>,
) -> ApiResult<Json<Vec<LoanView>>> {
    let names = state.service.customer_names().await?;
    let loans = state.service.list_loans_for_customer(customer_id).await?;
    let views = loans
        .into_iter()
        .map(|l| loan_view(l, &names))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(views))
}

pub async fn apply_loan(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateLoanRequest>,
) -> ApiResult<(StatusCode, Json<LoanView>)> {
    let customer_id = required(payload.customer_id, "customerId")?;
    let amount = decimal_to_cents(required(payload.amount, "amount")?).map_err(AppError::from)?;
    let interest_rate = required(payload.interest_rate, "interestRate")?;

    let loan = state
        .service
        .apply_loan(customer_id, amount, interest_rate)
        .await?;
    Ok((StatusCode::CREATED, Json(named_loan_view(&state, loan).await?)))
}

pub async fn get_loan(
    State(state): State<AppState>,
    PathId(id): PathId<Uuid>,
) -> ApiResult<Json<LoanView>> {
    let loan = state.service.get_loan(id).await?;
    Ok(Json(named_loan_view(&state, loan).await?))
}

pub async fn approve_loan(
    State(state): State<AppState>,
    PathId(id): PathId<Uuid>,
) -> ApiResult<Json<LoanView>> {
    let loan = state.service.approve_loan(id).await?;
    Ok(Json(named_loan_view(&state, loan).await?))
}

pub async fn close_loan(
    State(state): State<AppState>,
    PathId(id): PathId<Uuid>,
) -> ApiResult<Json<LoanView>> {
    let loan = state.service.close_loan(id).await?;
    Ok(Json(named_loan_view(&state, loan).await?))
}

pub async fn delete_loan(
    State(state): State<AppState>,
    PathId(id): PathId<Uuid>,
) -> ApiResult<StatusCode> {
    state.service.delete_loan(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ========================
// Dashboard
// ========================

pub async fn dashboard_stats(State(state): State<AppState>) -> ApiResult<Json<DashboardStats>> {
    Ok(Json(state.service.dashboard_stats().await?))
}
