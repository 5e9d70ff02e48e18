use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::application::LedgerService;
use crate::config::{DEFAULT_BIND, DEFAULT_DATABASE, ServerConfig};
use crate::domain::{
    Account, AccountType, CustomerPatch, Gender, Loan, Transaction, format_cents, parse_cents,
};

/// Tellerbook - bank ledger service
#[derive(Parser)]
#[command(name = "tellerbook")]
#[command(about = "Customers, accounts, loans and transactions behind a small HTTP API")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "TELLERBOOK_DB", default_value = DEFAULT_DATABASE)]
    pub database: String,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "TELLERBOOK_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Serve the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, env = "TELLERBOOK_BIND", default_value = DEFAULT_BIND)]
        bind: SocketAddr,

        /// Per-operation timeout in milliseconds
        #[arg(long, env = "TELLERBOOK_TIMEOUT_MS", default_value_t = 5000)]
        timeout_ms: u64,
    },

    /// Customer management commands
    #[command(subcommand)]
    Customer(CustomerCommands),

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Deposit money into an account
    Deposit {
        /// Account ID
        account: Uuid,

        /// Amount (e.g., "50.00" or "50")
        amount: String,
    },

    /// Withdraw money from an account
    Withdraw {
        /// Account ID
        account: Uuid,

        /// Amount (e.g., "50.00" or "50")
        amount: String,
    },

    /// Transfer money between two accounts
    Transfer {
        /// Amount to transfer (e.g., "50.00" or "50")
        amount: String,

        /// Source account ID
        #[arg(long)]
        from: Uuid,

        /// Destination account ID
        #[arg(long)]
        to: Uuid,
    },

    /// List recorded transactions
    Transactions {
        /// Only show transactions for this account
        #[arg(long)]
        account: Option<Uuid>,
    },

    /// Loan management commands
    #[command(subcommand)]
    Loan(LoanCommands),

    /// Show dashboard counts
    Stats,
}

#[derive(Subcommand)]
pub enum CustomerCommands {
    /// Register a new customer
    Create {
        /// Full name
        name: String,

        #[arg(long)]
        age: u32,

        /// Gender: male, female, other
        #[arg(long)]
        gender: String,

        #[arg(long)]
        phone: String,

        #[arg(long)]
        address: String,
    },

    /// List all customers
    List,

    /// Show a customer with their accounts and loans
    Show {
        /// Customer ID
        id: Uuid,
    },

    /// Update some fields of a customer
    Update {
        /// Customer ID
        id: Uuid,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        age: Option<u32>,

        /// Gender: male, female, other
        #[arg(long)]
        gender: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        address: Option<String>,
    },

    /// Delete a customer without accounts or loans
    Delete {
        /// Customer ID
        id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open an account for a customer
    Create {
        /// Customer ID
        customer: Uuid,

        /// Account type: savings, current, fixed-deposit, recurring-deposit
        #[arg(short = 't', long = "type")]
        account_type: String,

        /// Opening balance
        #[arg(short, long, default_value = "0")]
        balance: String,
    },

    /// List accounts
    List {
        /// Only accounts below the low-balance threshold
        #[arg(long)]
        low: bool,
    },

    /// Delete an empty account with no transactions
    Delete {
        /// Account ID
        id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum LoanCommands {
    /// Apply for a loan (EMI is computed over 12 months)
    Apply {
        /// Customer ID
        customer: Uuid,

        /// Principal amount
        #[arg(short, long)]
        amount: String,

        /// Annual interest rate in percent
        #[arg(short, long)]
        rate: Decimal,
    },

    /// List all loans
    List,

    /// Approve a pending loan
    Approve {
        /// Loan ID
        id: Uuid,
    },

    /// Close an approved loan
    Close {
        /// Loan ID
        id: Uuid,
    },

    /// Delete a loan that is not active
    Delete {
        /// Loan ID
        id: Uuid,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                LedgerService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Serve { bind, timeout_ms } => {
                let config = ServerConfig::new(self.database, bind)
                    .with_operation_timeout(Duration::from_millis(timeout_ms));
                crate::api::run_server(config).await?;
            }

            Commands::Customer(cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_customer_command(&service, cmd).await?;
            }

            Commands::Account(cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_account_command(&service, cmd).await?;
            }

            Commands::Deposit { account, amount } => {
                let service = LedgerService::connect(&self.database).await?;
                let txn = service.deposit(account, parse_amount(&amount)?).await?;
                print_transaction_receipt(&txn);
            }

            Commands::Withdraw { account, amount } => {
                let service = LedgerService::connect(&self.database).await?;
                let txn = service.withdraw(account, parse_amount(&amount)?).await?;
                print_transaction_receipt(&txn);
            }

            Commands::Transfer { amount, from, to } => {
                let service = LedgerService::connect(&self.database).await?;
                let legs = service.transfer(from, to, parse_amount(&amount)?).await?;
                println!(
                    "Transferred {}: {} -> {}",
                    format_cents(legs.from.amount_cents),
                    from,
                    to
                );
                print_transaction_receipt(&legs.from);
                print_transaction_receipt(&legs.to);
            }

            Commands::Transactions { account } => {
                let service = LedgerService::connect(&self.database).await?;
                let transactions = match account {
                    Some(id) => service.list_transactions_for_account(id).await?,
                    None => service.list_transactions().await?,
                };
                print_transactions(&transactions);
            }

            Commands::Loan(cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_loan_command(&service, cmd).await?;
            }

            Commands::Stats => {
                let service = LedgerService::connect(&self.database).await?;
                let stats = service.dashboard_stats().await?;
                println!("Customers:     {}", stats.total_customers);
                println!("Accounts:      {}", stats.total_accounts);
                println!("Loans:         {}", stats.total_loans);
                println!("Transactions:  {}", stats.total_transactions);
            }
        }

        Ok(())
    }
}

async fn run_customer_command(service: &LedgerService, cmd: CustomerCommands) -> Result<()> {
    match cmd {
        CustomerCommands::Create {
            name,
            age,
            gender,
            phone,
            address,
        } => {
            let gender = parse_gender(&gender)?;
            let customer = service
                .create_customer(name, age, gender, phone, address)
                .await?;
            println!("Created customer: {} ({})", customer.name, customer.id);
        }

        CustomerCommands::List => {
            let customers = service.list_customers().await?;
            if customers.is_empty() {
                println!("No customers found.");
            } else {
                println!(
                    "{:<36}  {:<24} {:>4} {:<7} {:<14}",
                    "ID", "NAME", "AGE", "GENDER", "PHONE"
                );
                println!("{}", "-".repeat(90));
                for c in customers {
                    println!(
                        "{:<36}  {:<24} {:>4} {:<7} {:<14}",
                        c.id, c.name, c.age, c.gender, c.phone
                    );
                }
            }
        }

        CustomerCommands::Show { id } => {
            let customer = service.get_customer(id).await?;
            let accounts = service.list_accounts_for_customer(id).await?;
            let loans = service.list_loans_for_customer(id).await?;

            println!("Customer: {}", customer.name);
            println!("  ID:       {}", customer.id);
            println!("  Age:      {}", customer.age);
            println!("  Gender:   {}", customer.gender);
            println!("  Phone:    {}", customer.phone);
            println!("  Address:  {}", customer.address);
            println!(
                "  Created:  {}",
                customer.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!();
            print_accounts(&accounts);
            println!();
            print_loans(&loans)?;
        }

        CustomerCommands::Update {
            id,
            name,
            age,
            gender,
            phone,
            address,
        } => {
            let patch = CustomerPatch {
                name,
                age,
                gender: gender.as_deref().map(parse_gender).transpose()?,
                phone,
                address,
            };
            if patch.is_empty() {
                anyhow::bail!("Nothing to update. Pass at least one field.");
            }
            let customer = service.update_customer(id, patch).await?;
            println!("Updated customer: {} ({})", customer.name, customer.id);
        }

        CustomerCommands::Delete { id } => {
            service.delete_customer(id).await?;
            println!("Deleted customer: {}", id);
        }
    }
    Ok(())
}

async fn run_account_command(service: &LedgerService, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Create {
            customer,
            account_type,
            balance,
        } => {
            let at = AccountType::from_str(&account_type).ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid account type '{}'. Valid types: savings, current, fixed-deposit, recurring-deposit",
                    account_type
                )
            })?;
            let balance = parse_cents(&balance)
                .with_context(|| format!("Invalid balance '{}'. Use '50.00' or '50'", balance))?;

            let account = service.create_account(customer, at, balance).await?;
            println!(
                "Opened {} account {} with balance {}",
                account.account_type,
                account.id,
                format_cents(account.balance_cents)
            );
        }

        AccountCommands::List { low } => {
            let accounts = if low {
                service.low_balance_accounts().await?
            } else {
                service.list_accounts().await?
            };
            print_accounts(&accounts);
        }

        AccountCommands::Delete { id } => {
            service.delete_account(id).await?;
            println!("Deleted account: {}", id);
        }
    }
    Ok(())
}

async fn run_loan_command(service: &LedgerService, cmd: LoanCommands) -> Result<()> {
    match cmd {
        LoanCommands::Apply {
            customer,
            amount,
            rate,
        } => {
            let loan = service
                .apply_loan(customer, parse_amount(&amount)?, rate)
                .await?;
            println!(
                "Loan {} pending: {} at {}% -> EMI {}",
                loan.id,
                format_cents(loan.amount_cents),
                loan.interest_rate,
                format_cents(loan.emi_cents)
            );
        }

        LoanCommands::List => {
            let loans = service.list_loans().await?;
            print_loans(&loans)?;
        }

        LoanCommands::Approve { id } => {
            let loan = service.approve_loan(id).await?;
            println!("Loan {} is now {}", loan.id, loan.status);
        }

        LoanCommands::Close { id } => {
            let loan = service.close_loan(id).await?;
            println!("Loan {} is now {}", loan.id, loan.status);
        }

        LoanCommands::Delete { id } => {
            service.delete_loan(id).await?;
            println!("Deleted loan: {}", id);
        }
    }
    Ok(())
}

fn parse_amount(input: &str) -> Result<i64> {
    parse_cents(input).with_context(|| format!("Invalid amount '{}'. Use '50.00' or '50'", input))
}

fn parse_gender(input: &str) -> Result<Gender> {
    Gender::from_str(input).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid gender '{}'. Valid values: male, female, other",
            input
        )
    })
}

fn print_transaction_receipt(txn: &Transaction) {
    println!(
        "{} {} on {} ({})",
        txn.transaction_type,
        format_cents(txn.amount_cents),
        txn.account_id,
        txn.id
    );
}

fn print_accounts(accounts: &[Account]) {
    if accounts.is_empty() {
        println!("No accounts found.");
        return;
    }
    println!(
        "{:<36}  {:<16} {:>14}",
        "ACCOUNT", "TYPE", "BALANCE"
    );
    println!("{}", "-".repeat(70));
    for a in accounts {
        let flag = if a.is_low_balance() { "  (low)" } else { "" };
        println!(
            "{:<36}  {:<16} {:>14}{}",
            a.id,
            a.account_type,
            format_cents(a.balance_cents),
            flag
        );
    }
}

fn print_loans(loans: &[Loan]) -> Result<()> {
    if loans.is_empty() {
        println!("No loans found.");
        return Ok(());
    }
    println!(
        "{:<36}  {:>12} {:>7} {:>10} {:>12} {:<8}",
        "LOAN", "AMOUNT", "RATE", "EMI", "REPAYMENT", "STATUS"
    );
    println!("{}", "-".repeat(92));
    for l in loans {
        println!(
            "{:<36}  {:>12} {:>6}% {:>10} {:>12} {:<8}",
            l.id,
            format_cents(l.amount_cents),
            l.interest_rate,
            format_cents(l.emi_cents),
            format_cents(l.total_repayment()?),
            l.status
        );
    }
    Ok(())
}

fn print_transactions(transactions: &[Transaction]) {
    if transactions.is_empty() {
        println!("No transactions found.");
        return;
    }
    println!(
        "{:<20} {:<36}  {:<10} {:>12}",
        "DATE", "ACCOUNT", "TYPE", "AMOUNT"
    );
    println!("{}", "-".repeat(82));
    for t in transactions {
        println!(
            "{:<20} {:<36}  {:<10} {:>12}",
            t.timestamp.format("%Y-%m-%d %H:%M:%S"),
            t.account_id,
            t.transaction_type,
            format_cents(t.amount_cents)
        );
    }
}
