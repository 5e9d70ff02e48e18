use serde::{Deserialize, Serialize};

use crate::storage::CollectionCounts;

/// Headline counts shown on the dashboard, computed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_customers: i64,
    pub total_accounts: i64,
    pub total_loans: i64,
    pub total_transactions: i64,
}

impl From<CollectionCounts> for DashboardStats {
    fn from(counts: CollectionCounts) -> Self {
        Self {
            total_customers: counts.customers,
            total_accounts: counts.accounts,
            total_loans: counts.loans,
            total_transactions: counts.transactions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_serialize_with_dashboard_field_names() {
        let stats = DashboardStats::from(CollectionCounts {
            customers: 3,
            accounts: 2,
            loans: 1,
            transactions: 4,
        });
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "totalCustomers": 3,
                "totalAccounts": 2,
                "totalLoans": 1,
                "totalTransactions": 4
            })
        );
    }
}
