use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::domain::{
    Account, AccountId, AccountType, Cents, Customer, CustomerId, CustomerPatch, Gender, Loan,
    LoanId, LoanStatus, Transaction, TransferLegs, TransitionError, format_cents,
};
use crate::storage::{BalanceChange, Repository};

use super::{AppError, DashboardStats};

/// Deadline applied to every service operation unless overridden.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Application service providing the ledger operations.
/// This is the primary interface for any client (HTTP API, CLI, tests).
pub struct LedgerService {
    repo: Repository,
    operation_timeout: Duration,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Open (creating if needed) and migrate the database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    pub fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }

    /// Run an operation under the configured deadline. A timed-out
    /// operation is dropped, which rolls back any open database transaction.
    async fn bounded<T>(
        &self,
        operation: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        tokio::time::timeout(self.operation_timeout, operation)
            .await
            .map_err(|_| {
                warn!(timeout = ?self.operation_timeout, "operation timed out");
                AppError::Timeout(self.operation_timeout)
            })?
    }

    // ========================
    // Customer operations
    // ========================

    /// Register a new customer.
    pub async fn create_customer(
        &self,
        name: String,
        age: u32,
        gender: Gender,
        phone: String,
        address: String,
    ) -> Result<Customer, AppError> {
        self.bounded(async {
            let customer = Customer::new(name, age, gender, phone, address);
            customer.validate()?;

            self.repo.save_customer(&customer).await?;
            info!(customer_id = %customer.id, "customer created");
            Ok(customer)
        })
        .await
    }

    pub async fn get_customer(&self, id: CustomerId) -> Result<Customer, AppError> {
        self.bounded(self.fetch_customer(id)).await
    }

    async fn fetch_customer(&self, id: CustomerId) -> Result<Customer, AppError> {
        self.repo
            .get_customer(id)
            .await?
            .ok_or(AppError::CustomerNotFound(id))
    }

    pub async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        self.bounded(async { Ok(self.repo.list_customers().await?) })
            .await
    }

    /// Apply a partial update; only the provided fields change.
    pub async fn update_customer(
        &self,
        id: CustomerId,
        patch: CustomerPatch,
    ) -> Result<Customer, AppError> {
        self.bounded(async {
            let mut customer = self.fetch_customer(id).await?;
            customer.apply(patch);
            customer.validate()?;

            if !self.repo.update_customer(&customer).await? {
                return Err(AppError::CustomerNotFound(id));
            }
            info!(customer_id = %id, "customer updated");
            Ok(customer)
        })
        .await
    }

    /// Delete a customer. Refused while the customer still owns accounts or loans.
    pub async fn delete_customer(&self, id: CustomerId) -> Result<(), AppError> {
        self.bounded(async {
            loop {
                if self.repo.delete_customer_if_unreferenced(id).await? {
                    info!(customer_id = %id, "customer deleted");
                    return Ok(());
                }

                self.fetch_customer(id).await?;
                let (accounts, loans) = self.repo.count_customer_dependents(id).await?;
                if accounts == 0 && loans == 0 {
                    // Dependents went away after the delete was refused
                    debug!(customer_id = %id, "retrying customer deletion");
                    continue;
                }
                warn!(customer_id = %id, accounts, loans, "customer deletion refused");
                return Err(AppError::CustomerHasDependents {
                    customer_id: id,
                    accounts,
                    loans,
                });
            }
        })
        .await
    }

    /// Get a map of customer IDs to names (useful for display).
    pub async fn customer_names(&self) -> Result<HashMap<CustomerId, String>, AppError> {
        let customers = self.list_customers().await?;
        Ok(customers.into_iter().map(|c| (c.id, c.name)).collect())
    }

    // ========================
    // Account operations
    // ========================

    /// Open an account for an existing customer.
    pub async fn create_account(
        &self,
        customer_id: CustomerId,
        account_type: AccountType,
        initial_balance: Cents,
    ) -> Result<Account, AppError> {
        self.bounded(async {
            if initial_balance < 0 {
                return Err(AppError::InvalidAmount(
                    "Initial balance must not be negative".to_string(),
                ));
            }
            self.fetch_customer(customer_id).await?;

            let account = Account::new(customer_id, account_type, initial_balance);
            self.repo.save_account(&account).await?;
            info!(
                account_id = %account.id,
                customer_id = %customer_id,
                account_type = %account_type,
                "account opened"
            );
            Ok(account)
        })
        .await
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account, AppError> {
        self.bounded(self.fetch_account(id)).await
    }

    async fn fetch_account(&self, id: AccountId) -> Result<Account, AppError> {
        self.repo
            .get_account(id)
            .await?
            .ok_or(AppError::AccountNotFound(id))
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        self.bounded(async { Ok(self.repo.list_accounts().await?) })
            .await
    }

    pub async fn list_accounts_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Account>, AppError> {
        self.bounded(async {
            self.fetch_customer(customer_id).await?;
            Ok(self.repo.list_accounts_for_customer(customer_id).await?)
        })
        .await
    }

    /// Accounts currently under the low-balance threshold.
    pub async fn low_balance_accounts(&self) -> Result<Vec<Account>, AppError> {
        let accounts = self.list_accounts().await?;
        Ok(accounts.into_iter().filter(Account::is_low_balance).collect())
    }

    /// Change the type of an account. Balances are never edited directly.
    pub async fn update_account_type(
        &self,
        id: AccountId,
        account_type: AccountType,
    ) -> Result<Account, AppError> {
        self.bounded(async {
            if !self.repo.update_account_type(id, account_type).await? {
                return Err(AppError::AccountNotFound(id));
            }
            info!(account_id = %id, account_type = %account_type, "account type changed");
            self.fetch_account(id).await
        })
        .await
    }

    /// Delete an account that is empty and has never been transacted on.
    pub async fn delete_account(&self, id: AccountId) -> Result<(), AppError> {
        self.bounded(async {
            if self.repo.delete_account_if_unused(id).await? {
                info!(account_id = %id, "account deleted");
                return Ok(());
            }

            let account = self.fetch_account(id).await?;
            let transactions = self.repo.count_transactions_for_account(id).await?;
            warn!(account_id = %id, transactions, "account deletion refused");
            Err(AppError::AccountInUse {
                account_id: id,
                balance: account.balance_cents,
                transactions,
            })
        })
        .await
    }

    /// Get a map of account IDs to their types (useful for display).
    pub async fn account_types(&self) -> Result<HashMap<AccountId, AccountType>, AppError> {
        let accounts = self.list_accounts().await?;
        Ok(accounts
            .into_iter()
            .map(|a| (a.id, a.account_type))
            .collect())
    }

    // ========================
    // Money movement
    // ========================

    /// Credit an account and record a deposit.
    pub async fn deposit(
        &self,
        account_id: AccountId,
        amount_cents: Cents,
    ) -> Result<Transaction, AppError> {
        self.bounded(async {
            validate_amount(amount_cents)?;

            let deposit = Transaction::deposit(account_id, amount_cents);
            let change = self.repo.apply_deposit(&deposit).await?;
            balance_change_result(change, amount_cents)?;

            info!(account_id = %account_id, amount_cents, "deposit recorded");
            Ok(deposit)
        })
        .await
    }

    /// Debit an account and record a withdrawal. Never overdraws.
    pub async fn withdraw(
        &self,
        account_id: AccountId,
        amount_cents: Cents,
    ) -> Result<Transaction, AppError> {
        self.bounded(async {
            validate_amount(amount_cents)?;

            let withdrawal = Transaction::withdrawal(account_id, amount_cents);
            let change = self.repo.apply_withdrawal(&withdrawal).await?;
            balance_change_result(change, amount_cents)?;

            info!(account_id = %account_id, amount_cents, "withdrawal recorded");
            Ok(withdrawal)
        })
        .await
    }

    /// Move money between two accounts as one atomic unit, recording a
    /// withdrawal on the source and a deposit on the destination.
    pub async fn transfer(
        &self,
        from_account: AccountId,
        to_account: AccountId,
        amount_cents: Cents,
    ) -> Result<TransferLegs, AppError> {
        self.bounded(async {
            validate_amount(amount_cents)?;
            if from_account == to_account {
                return Err(AppError::InvalidArgument(
                    "Source and destination accounts must differ".to_string(),
                ));
            }

            let legs = TransferLegs::new(from_account, to_account, amount_cents);
            let change = self.repo.apply_transfer(&legs).await?;
            balance_change_result(change, amount_cents)?;

            info!(
                from = %from_account,
                to = %to_account,
                amount_cents,
                transfer_ref = ?legs.transfer_ref(),
                "transfer recorded"
            );
            Ok(legs)
        })
        .await
    }

    pub async fn list_transactions(&self) -> Result<Vec<Transaction>, AppError> {
        self.bounded(async { Ok(self.repo.list_transactions().await?) })
            .await
    }

    pub async fn list_transactions_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, AppError> {
        self.bounded(async {
            self.fetch_account(account_id).await?;
            Ok(self.repo.list_transactions_for_account(account_id).await?)
        })
        .await
    }

    // ========================
    // Loan operations
    // ========================

    /// Apply for a loan. The EMI is computed here and the loan starts Pending.
    pub async fn apply_loan(
        &self,
        customer_id: CustomerId,
        amount_cents: Cents,
        interest_rate: Decimal,
    ) -> Result<Loan, AppError> {
        self.bounded(async {
            validate_amount(amount_cents)?;
            if interest_rate < Decimal::ZERO {
                return Err(AppError::InvalidArgument(
                    "Interest rate must not be negative".to_string(),
                ));
            }
            self.fetch_customer(customer_id).await?;

            let loan = Loan::new(customer_id, amount_cents, interest_rate)?;
            self.repo.save_loan(&loan).await?;
            info!(
                loan_id = %loan.id,
                customer_id = %customer_id,
                amount_cents,
                emi_cents = loan.emi_cents,
                "loan application recorded"
            );
            Ok(loan)
        })
        .await
    }

    pub async fn get_loan(&self, id: LoanId) -> Result<Loan, AppError> {
        self.bounded(self.fetch_loan(id)).await
    }

    async fn fetch_loan(&self, id: LoanId) -> Result<Loan, AppError> {
        self.repo
            .get_loan(id)
            .await?
            .ok_or(AppError::LoanNotFound(id))
    }

    pub async fn list_loans(&self) -> Result<Vec<Loan>, AppError> {
        self.bounded(async { Ok(self.repo.list_loans().await?) })
            .await
    }

    pub async fn list_loans_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Loan>, AppError> {
        self.bounded(async {
            self.fetch_customer(customer_id).await?;
            Ok(self.repo.list_loans_for_customer(customer_id).await?)
        })
        .await
    }

    /// Pending -> Approved.
    pub async fn approve_loan(&self, id: LoanId) -> Result<Loan, AppError> {
        self.bounded(self.transition_loan(id, LoanStatus::approve))
            .await
    }

    /// Approved -> Closed.
    pub async fn close_loan(&self, id: LoanId) -> Result<Loan, AppError> {
        self.bounded(self.transition_loan(id, LoanStatus::close))
            .await
    }

    /// Statuses only move forward, so a lost race is retried against the
    /// loan's new status, which then fails the transition check.
    async fn transition_loan(
        &self,
        id: LoanId,
        step: fn(LoanStatus) -> Result<LoanStatus, TransitionError>,
    ) -> Result<Loan, AppError> {
        loop {
            let mut loan = self.fetch_loan(id).await?;
            let next = step(loan.status).map_err(|source| {
                warn!(loan_id = %id, status = %loan.status, "loan transition refused");
                AppError::InvalidLoanTransition {
                    loan_id: id,
                    source,
                }
            })?;

            if self.repo.transition_loan(id, loan.status, next).await? {
                info!(loan_id = %id, from = %loan.status, to = %next, "loan status changed");
                loan.status = next;
                return Ok(loan);
            }
        }
    }

    /// Delete a loan that is not currently approved.
    pub async fn delete_loan(&self, id: LoanId) -> Result<(), AppError> {
        self.bounded(async {
            if self.repo.delete_inactive_loan(id).await? {
                info!(loan_id = %id, "loan deleted");
                return Ok(());
            }
            self.fetch_loan(id).await?;
            warn!(loan_id = %id, "refused to delete active loan");
            Err(AppError::LoanActive(id))
        })
        .await
    }

    // ========================
    // Dashboard
    // ========================

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, AppError> {
        self.bounded(async {
            let counts = self.repo.count_collections().await?;
            debug!(?counts, "dashboard stats computed");
            Ok(DashboardStats::from(counts))
        })
        .await
    }
}

fn validate_amount(amount_cents: Cents) -> Result<(), AppError> {
    if amount_cents <= 0 {
        return Err(AppError::InvalidAmount(
            "Amount must be positive".to_string(),
        ));
    }
    Ok(())
}

fn balance_change_result(change: BalanceChange, required: Cents) -> Result<(), AppError> {
    match change {
        BalanceChange::Applied => Ok(()),
        BalanceChange::AccountMissing(id) => Err(AppError::AccountNotFound(id)),
        BalanceChange::Insufficient {
            account_id,
            balance,
        } => {
            warn!(account_id = %account_id, balance, required, "insufficient funds");
            Err(AppError::InsufficientFunds {
                account_id,
                balance,
                required,
            })
        }
        BalanceChange::Overflow {
            account_id,
            balance,
        } => {
            warn!(account_id = %account_id, balance, required, "credit would overflow balance");
            Err(AppError::InvalidAmount(format!(
                "Crediting {} to account {} would exceed the maximum balance",
                format_cents(required),
                account_id
            )))
        }
    }
}
