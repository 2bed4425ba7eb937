use diesel::{dsl, ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::login_attempts::NewLoginAttempts;
use crate::models::user::{NewUser, User};
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

use crate::schema::login_attempts::dsl::login_attempts;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    /// Creates the user and its zeroed login-attempts record in one
    /// transaction.
    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let email_lowercase = email.to_lowercase();

        let user = db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                let current_time = SystemTime::now();

                let new_user = NewUser {
                    id: Uuid::now_v7(),
                    username,
                    email: &email_lowercase,
                    password_hash,
                    created_timestamp: current_time,
                };

                let user = dsl::insert_into(users)
                    .values(&new_user)
                    .get_result::<User>(conn)?;

                dsl::insert_into(login_attempts)
                    .values(&NewLoginAttempts::zeroed(user.id, current_time))
                    .execute(conn)?;

                Ok(user)
            })?;

        Ok(user)
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<User, DaoError> {
        Ok(users
            .filter(user_fields::username.eq(username))
            .get_result::<User>(&mut self.db_thread_pool.get()?)?)
    }

    /// Lookup matching both id and username exactly. Used by session
    /// restoration to reject markers whose user id was deleted and recycled
    /// under a different name.
    pub fn find_user_by_id_and_username(
        &self,
        user_id: Uuid,
        username: &str,
    ) -> Result<Option<User>, DaoError> {
        Ok(users
            .find(user_id)
            .filter(user_fields::username.eq(username))
            .get_result::<User>(&mut self.db_thread_pool.get()?)
            .optional()?)
    }
}
