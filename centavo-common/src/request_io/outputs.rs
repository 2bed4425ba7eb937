use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::models::transaction::Transaction;
use crate::models::user::User;

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .expect("Timestamp should always be after the Unix epoch")
        .as_secs()
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OutputUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_timestamp: u64,
}

impl From<User> for OutputUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_timestamp: unix_secs(user.created_timestamp),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OutputSignIn {
    pub message: String,
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OutputSession {
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OutputTransaction {
    pub id: Uuid,
    pub amount_cents: i64,
    pub description: String,
    pub category: String,
    pub transaction_type: String,
    pub date_created: u64,
}

impl From<Transaction> for OutputTransaction {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id,
            amount_cents: transaction.amount_cents,
            description: transaction.description,
            category: transaction.category,
            transaction_type: transaction.transaction_type,
            date_created: unix_secs(transaction.date_created),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OutputTransactionSummary {
    pub income_total_cents: i64,
    pub expense_total_cents: i64,
    pub balance_cents: i64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OutputDeletedCount {
    pub deleted: u64,
}
