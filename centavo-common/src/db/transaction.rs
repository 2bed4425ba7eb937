use diesel::{dsl, ExpressionMethods, QueryDsl, RunQueryDsl};
use diesel::sql_types::BigInt;
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::transaction::{NewTransaction, Transaction};
use crate::request_io::InputTransaction;
use crate::schema::transactions as transaction_fields;
use crate::schema::transactions::dsl::transactions;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct TransactionSummary {
    pub income_total_cents: i64,
    pub expense_total_cents: i64,
}

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn create_transaction(
        &self,
        user_id: Uuid,
        transaction_data: &InputTransaction,
    ) -> Result<Transaction, DaoError> {
        let new_transaction = NewTransaction {
            id: Uuid::now_v7(),
            user_id,
            amount_cents: transaction_data.amount_cents,
            description: &transaction_data.description,
            category: &transaction_data.category,
            transaction_type: &transaction_data.transaction_type,
            date_created: SystemTime::now(),
        };

        Ok(dsl::insert_into(transactions)
            .values(&new_transaction)
            .get_result::<Transaction>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_all_transactions_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Transaction>, DaoError> {
        Ok(transactions
            .filter(transaction_fields::user_id.eq(user_id))
            .order(transaction_fields::date_created.desc())
            .load::<Transaction>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_transaction(
        &self,
        transaction_id: Uuid,
        user_id: Uuid,
    ) -> Result<Transaction, DaoError> {
        Ok(transactions
            .find(transaction_id)
            .filter(transaction_fields::user_id.eq(user_id))
            .get_result::<Transaction>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn edit_transaction(
        &self,
        transaction_id: Uuid,
        user_id: Uuid,
        transaction_data: &InputTransaction,
    ) -> Result<Transaction, DaoError> {
        Ok(dsl::update(
            transactions
                .find(transaction_id)
                .filter(transaction_fields::user_id.eq(user_id)),
        )
        .set((
            transaction_fields::amount_cents.eq(transaction_data.amount_cents),
            transaction_fields::description.eq(&transaction_data.description),
            transaction_fields::category.eq(&transaction_data.category),
            transaction_fields::transaction_type.eq(&transaction_data.transaction_type),
        ))
        .get_result::<Transaction>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn delete_transaction(
        &self,
        transaction_id: Uuid,
        user_id: Uuid,
    ) -> Result<usize, DaoError> {
        Ok(diesel::delete(
            transactions
                .find(transaction_id)
                .filter(transaction_fields::user_id.eq(user_id)),
        )
        .execute(&mut self.db_thread_pool.get()?)?)
    }

    /// One grouped sum over the user's rows; missing groups read as zero.
    pub fn get_transaction_summary(&self, user_id: Uuid) -> Result<TransactionSummary, DaoError> {
        let totals = transactions
            .filter(transaction_fields::user_id.eq(user_id))
            .group_by(transaction_fields::transaction_type)
            .select((
                transaction_fields::transaction_type,
                dsl::sql::<BigInt>("SUM(amount_cents)::BIGINT"),
            ))
            .load::<(String, i64)>(&mut self.db_thread_pool.get()?)?;

        let mut summary = TransactionSummary::default();

        for (transaction_type, total) in totals {
            match transaction_type.as_str() {
                "income" => summary.income_total_cents = total,
                _ => summary.expense_total_cents = total,
            }
        }

        Ok(summary)
    }

    pub fn delete_all_transactions_for_user(&self, user_id: Uuid) -> Result<usize, DaoError> {
        Ok(
            diesel::delete(transactions.filter(transaction_fields::user_id.eq(user_id)))
                .execute(&mut self.db_thread_pool.get()?)?,
        )
    }
}
