use diesel::{Insertable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::user::User;
use crate::schema::transactions;

#[derive(
    Clone, Debug, Serialize, Deserialize, Identifiable, Associations, Queryable, QueryableByName,
)]
#[diesel(table_name = transactions)]
#[diesel(belongs_to(User, foreign_key = user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub description: String,
    pub category: String,
    pub transaction_type: String,
    pub date_created: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewTransaction<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub description: &'a str,
    pub category: &'a str,
    pub transaction_type: &'a str,
    pub date_created: SystemTime,
}
