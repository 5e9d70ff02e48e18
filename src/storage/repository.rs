use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Account, AccountId, AccountType, Cents, Customer, CustomerId, Gender, Loan, LoanId,
    LoanStatus, Transaction, TransactionType, TransferLegs,
};

use super::MIGRATION_001_INITIAL;

/// How long a connection waits for SQLite's write lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CUSTOMER_COLUMNS: &str = "id, name, age, gender, phone, address, created_at";
const ACCOUNT_COLUMNS: &str = "id, customer_id, account_type, balance_cents, created_at";
const LOAN_COLUMNS: &str =
    "id, customer_id, amount_cents, interest_rate, emi_cents, status, created_at";
const TRANSACTION_COLUMNS: &str =
    "id, account_id, amount_cents, transaction_type, timestamp, transfer_ref";

/// Result of an attempt to move money on one or two accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceChange {
    Applied,
    AccountMissing(AccountId),
    Insufficient { account_id: AccountId, balance: Cents },
    /// The credit would push the balance past what a cent count can hold.
    Overflow { account_id: AccountId, balance: Cents },
}

/// Row counts across the four collections, read in a single statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionCounts {
    pub customers: i64,
    pub accounts: i64,
    pub loans: i64,
    pub transactions: i64,
}

/// Repository for persisting and querying customers, accounts, loans and
/// the transaction ledger.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL such as `sqlite:bank.db?mode=rwc`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations. Safe to run repeatedly.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Customer operations
    // ========================

    pub async fn save_customer(&self, customer: &Customer) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, name, age, gender, phone, address, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(customer.id.to_string())
        .bind(&customer.name)
        .bind(customer.age as i64)
        .bind(customer.gender.as_str())
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(customer.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save customer")?;
        Ok(())
    }

    pub async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM customers WHERE id = ?",
            CUSTOMER_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch customer")?;

        row.as_ref().map(Self::row_to_customer).transpose()
    }

    pub async fn list_customers(&self) -> Result<Vec<Customer>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM customers ORDER BY created_at, id",
            CUSTOMER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list customers")?;

        rows.iter().map(Self::row_to_customer).collect()
    }

    /// Overwrite the mutable fields of a customer. Returns false if no row matched.
    pub async fn update_customer(&self, customer: &Customer) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE customers
            SET name = ?, age = ?, gender = ?, phone = ?, address = ?
            WHERE id = ?
            "#,
        )
        .bind(&customer.name)
        .bind(customer.age as i64)
        .bind(customer.gender.as_str())
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(customer.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update customer")?;
        Ok(result.rows_affected() == 1)
    }

    /// Delete a customer only if no account or loan references it.
    /// Returns false if nothing was deleted (missing or still referenced).
    pub async fn delete_customer_if_unreferenced(&self, id: CustomerId) -> Result<bool> {
        let id = id.to_string();
        let result = sqlx::query(
            r#"
            DELETE FROM customers
            WHERE id = ?
              AND NOT EXISTS (SELECT 1 FROM accounts WHERE customer_id = ?)
              AND NOT EXISTS (SELECT 1 FROM loans WHERE customer_id = ?)
            "#,
        )
        .bind(&id)
        .bind(&id)
        .bind(&id)
        .execute(&self.pool)
        .await
        .context("Failed to delete customer")?;
        Ok(result.rows_affected() == 1)
    }

    /// Count (accounts, loans) owned by a customer.
    pub async fn count_customer_dependents(&self, id: CustomerId) -> Result<(i64, i64)> {
        let id = id.to_string();
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM accounts WHERE customer_id = ?) AS accounts,
                (SELECT COUNT(*) FROM loans WHERE customer_id = ?) AS loans
            "#,
        )
        .bind(&id)
        .bind(&id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count customer dependents")?;
        Ok((row.get("accounts"), row.get("loans")))
    }

    fn row_to_customer(row: &SqliteRow) -> Result<Customer> {
        let gender_str: String = row.get("gender");
        let age: i64 = row.get("age");

        Ok(Customer {
            id: parse_id(row, "id")?,
            name: row.get("name"),
            age: u32::try_from(age).context("Invalid customer age")?,
            gender: Gender::from_str(&gender_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid gender: {}", gender_str))?,
            phone: row.get("phone"),
            address: row.get("address"),
            created_at: parse_timestamp(row, "created_at")?,
        })
    }

    // ========================
    // Account operations
    // ========================

    pub async fn save_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, customer_id, account_type, balance_cents, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(account.customer_id.to_string())
        .bind(account.account_type.as_str())
        .bind(account.balance_cents)
        .bind(account.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;
        Ok(())
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE id = ?",
            ACCOUNT_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM accounts ORDER BY created_at, id",
            ACCOUNT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    pub async fn list_accounts_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE customer_id = ? ORDER BY created_at, id",
            ACCOUNT_COLUMNS
        ))
        .bind(customer_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts for customer")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    pub async fn update_account_type(
        &self,
        id: AccountId,
        account_type: AccountType,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE accounts SET account_type = ? WHERE id = ?")
            .bind(account_type.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update account type")?;
        Ok(result.rows_affected() == 1)
    }

    /// Delete an account only if it is empty and has no ledger history.
    pub async fn delete_account_if_unused(&self, id: AccountId) -> Result<bool> {
        let id = id.to_string();
        let result = sqlx::query(
            r#"
            DELETE FROM accounts
            WHERE id = ?
              AND balance_cents = 0
              AND NOT EXISTS (SELECT 1 FROM transactions WHERE account_id = ?)
            "#,
        )
        .bind(&id)
        .bind(&id)
        .execute(&self.pool)
        .await
        .context("Failed to delete account")?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn count_transactions_for_account(&self, id: AccountId) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM transactions WHERE account_id = ?")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await
            .context("Failed to count account transactions")?;
        Ok(row.get("count"))
    }

    fn row_to_account(row: &SqliteRow) -> Result<Account> {
        let type_str: String = row.get("account_type");

        Ok(Account {
            id: parse_id(row, "id")?,
            customer_id: parse_id(row, "customer_id")?,
            account_type: AccountType::from_str(&type_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid account type: {}", type_str))?,
            balance_cents: row
                .try_get("balance_cents")
                .context("Corrupt account balance")?,
            created_at: parse_timestamp(row, "created_at")?,
        })
    }

    // ========================
    // Balance mutations
    // ========================
    //
    // Every mutation opens a transaction whose first statement is a write,
    // so SQLite hands out the write lock before any balance is read.

    /// Credit an account and record the deposit, atomically.
    pub async fn apply_deposit(&self, deposit: &Transaction) -> Result<BalanceChange> {
        let mut tx = self.pool.begin().await.context("Failed to begin deposit")?;

        let outcome = credit(&mut tx, deposit.account_id, deposit.amount_cents).await?;
        if outcome != BalanceChange::Applied {
            tx.rollback().await.context("Failed to roll back deposit")?;
            return Ok(outcome);
        }
        insert_transaction(&mut tx, deposit).await?;

        tx.commit().await.context("Failed to commit deposit")?;
        Ok(BalanceChange::Applied)
    }

    /// Debit an account and record the withdrawal, atomically.
    /// The balance check and the debit are a single conditional update.
    pub async fn apply_withdrawal(&self, withdrawal: &Transaction) -> Result<BalanceChange> {
        let mut tx = self.pool.begin().await.context("Failed to begin withdrawal")?;

        let outcome = debit(&mut tx, withdrawal.account_id, withdrawal.amount_cents).await?;
        if outcome != BalanceChange::Applied {
            tx.rollback().await.context("Failed to roll back withdrawal")?;
            return Ok(outcome);
        }
        insert_transaction(&mut tx, withdrawal).await?;

        tx.commit().await.context("Failed to commit withdrawal")?;
        Ok(BalanceChange::Applied)
    }

    /// Move money between two accounts and record both legs, atomically.
    /// On any failure the whole transfer is rolled back.
    pub async fn apply_transfer(&self, legs: &TransferLegs) -> Result<BalanceChange> {
        let mut tx = self.pool.begin().await.context("Failed to begin transfer")?;

        let outcome = credit(&mut tx, legs.to.account_id, legs.to.amount_cents).await?;
        if outcome != BalanceChange::Applied {
            tx.rollback().await.context("Failed to roll back transfer")?;
            return Ok(outcome);
        }

        let outcome = debit(&mut tx, legs.from.account_id, legs.from.amount_cents).await?;
        if outcome != BalanceChange::Applied {
            tx.rollback().await.context("Failed to roll back transfer")?;
            return Ok(outcome);
        }

        insert_transaction(&mut tx, &legs.from).await?;
        insert_transaction(&mut tx, &legs.to).await?;

        tx.commit().await.context("Failed to commit transfer")?;
        Ok(BalanceChange::Applied)
    }

    // ========================
    // Transaction queries
    // ========================

    /// List all ledger entries in recording order.
    pub async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM transactions ORDER BY sequence",
            TRANSACTION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    pub async fn list_transactions_for_account(&self, id: AccountId) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM transactions WHERE account_id = ? ORDER BY sequence",
            TRANSACTION_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions for account")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
        let type_str: String = row.get("transaction_type");
        let transfer_ref: Option<String> = row.get("transfer_ref");

        Ok(Transaction {
            id: parse_id(row, "id")?,
            account_id: parse_id(row, "account_id")?,
            amount_cents: row
                .try_get("amount_cents")
                .context("Corrupt transaction amount")?,
            transaction_type: TransactionType::from_str(&type_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction type: {}", type_str))?,
            timestamp: parse_timestamp(row, "timestamp")?,
            transfer_ref: transfer_ref
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid transfer reference")?,
        })
    }

    // ========================
    // Loan operations
    // ========================

    pub async fn save_loan(&self, loan: &Loan) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO loans (id, customer_id, amount_cents, interest_rate, emi_cents, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(loan.id.to_string())
        .bind(loan.customer_id.to_string())
        .bind(loan.amount_cents)
        .bind(loan.interest_rate.to_string())
        .bind(loan.emi_cents)
        .bind(loan.status.as_str())
        .bind(loan.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save loan")?;
        Ok(())
    }

    pub async fn get_loan(&self, id: LoanId) -> Result<Option<Loan>> {
        let row = sqlx::query(&format!("SELECT {} FROM loans WHERE id = ?", LOAN_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch loan")?;

        row.as_ref().map(Self::row_to_loan).transpose()
    }

    pub async fn list_loans(&self) -> Result<Vec<Loan>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM loans ORDER BY created_at, id",
            LOAN_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list loans")?;

        rows.iter().map(Self::row_to_loan).collect()
    }

    pub async fn list_loans_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Loan>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM loans WHERE customer_id = ? ORDER BY created_at, id",
            LOAN_COLUMNS
        ))
        .bind(customer_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list loans for customer")?;

        rows.iter().map(Self::row_to_loan).collect()
    }

    /// Move a loan from `expected` to `next`. Returns false if the loan is
    /// missing or no longer in `expected`, so two racing transitions cannot
    /// both win.
    pub async fn transition_loan(
        &self,
        id: LoanId,
        expected: LoanStatus,
        next: LoanStatus,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE loans SET status = ? WHERE id = ? AND status = ?")
            .bind(next.as_str())
            .bind(id.to_string())
            .bind(expected.as_str())
            .execute(&self.pool)
            .await
            .context("Failed to update loan status")?;
        Ok(result.rows_affected() == 1)
    }

    /// Delete a loan unless it is currently approved (active).
    pub async fn delete_inactive_loan(&self, id: LoanId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM loans WHERE id = ? AND status != ?")
            .bind(id.to_string())
            .bind(LoanStatus::Approved.as_str())
            .execute(&self.pool)
            .await
            .context("Failed to delete loan")?;
        Ok(result.rows_affected() == 1)
    }

    fn row_to_loan(row: &SqliteRow) -> Result<Loan> {
        let rate_str: String = row.get("interest_rate");
        let status_str: String = row.get("status");

        Ok(Loan {
            id: parse_id(row, "id")?,
            customer_id: parse_id(row, "customer_id")?,
            amount_cents: row
                .try_get("amount_cents")
                .context("Corrupt loan amount")?,
            interest_rate: Decimal::from_str(&rate_str)
                .with_context(|| format!("Invalid interest rate: {}", rate_str))?,
            emi_cents: row.try_get("emi_cents").context("Corrupt loan EMI")?,
            status: LoanStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid loan status: {}", status_str))?,
            created_at: parse_timestamp(row, "created_at")?,
        })
    }

    // ========================
    // Aggregates
    // ========================

    pub async fn count_collections(&self) -> Result<CollectionCounts> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM customers) AS customers,
                (SELECT COUNT(*) FROM accounts) AS accounts,
                (SELECT COUNT(*) FROM loans) AS loans,
                (SELECT COUNT(*) FROM transactions) AS transactions
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count collections")?;

        Ok(CollectionCounts {
            customers: row.get("customers"),
            accounts: row.get("accounts"),
            loans: row.get("loans"),
            transactions: row.get("transactions"),
        })
    }
}

/// Add to a balance only if the result still fits in an `i64`.
/// SQLite would otherwise silently widen the column to REAL.
async fn credit(conn: &mut SqliteConnection, id: AccountId, amount: Cents) -> Result<BalanceChange> {
    let result = sqlx::query(
        r#"
        UPDATE accounts
        SET balance_cents = balance_cents + ?
        WHERE id = ? AND balance_cents <= ?
        "#,
    )
    .bind(amount)
    .bind(id.to_string())
    .bind(Cents::MAX - amount)
    .execute(&mut *conn)
    .await
    .context("Failed to credit account")?;

    if result.rows_affected() == 1 {
        return Ok(BalanceChange::Applied);
    }

    Ok(match current_balance(conn, id).await? {
        Some(balance) => BalanceChange::Overflow {
            account_id: id,
            balance,
        },
        None => BalanceChange::AccountMissing(id),
    })
}

/// Subtract from a balance only if it stays non-negative.
async fn debit(conn: &mut SqliteConnection, id: AccountId, amount: Cents) -> Result<BalanceChange> {
    let result = sqlx::query(
        r#"
        UPDATE accounts
        SET balance_cents = balance_cents - ?
        WHERE id = ? AND balance_cents >= ?
        "#,
    )
    .bind(amount)
    .bind(id.to_string())
    .bind(amount)
    .execute(&mut *conn)
    .await
    .context("Failed to debit account")?;

    if result.rows_affected() == 1 {
        return Ok(BalanceChange::Applied);
    }

    Ok(match current_balance(conn, id).await? {
        Some(balance) => BalanceChange::Insufficient {
            account_id: id,
            balance,
        },
        None => BalanceChange::AccountMissing(id),
    })
}

async fn current_balance(conn: &mut SqliteConnection, id: AccountId) -> Result<Option<Cents>> {
    sqlx::query("SELECT balance_cents FROM accounts WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to read account balance")?
        .map(|row| row.try_get::<Cents, _>("balance_cents"))
        .transpose()
        .context("Corrupt account balance")
}

async fn insert_transaction(conn: &mut SqliteConnection, txn: &Transaction) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO transactions (id, sequence, account_id, amount_cents, transaction_type, timestamp, transfer_ref)
        VALUES (?, (SELECT COALESCE(MAX(sequence), 0) + 1 FROM transactions), ?, ?, ?, ?, ?)
        "#,
    )
    .bind(txn.id.to_string())
    .bind(txn.account_id.to_string())
    .bind(txn.amount_cents)
    .bind(txn.transaction_type.as_str())
    .bind(txn.timestamp.to_rfc3339())
    .bind(txn.transfer_ref.map(|id| id.to_string()))
    .execute(&mut *conn)
    .await
    .context("Failed to record transaction")?;
    Ok(())
}

fn parse_id(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let raw: String = row.get(column);
    Uuid::parse_str(&raw).with_context(|| format!("Invalid {}: {}", column, raw))
}

fn parse_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let raw: String = row.get(column);
    Ok(DateTime::parse_from_rfc3339(&raw)
        .with_context(|| format!("Invalid {} timestamp: {}", column, raw))?
        .with_timezone(&Utc))
}
