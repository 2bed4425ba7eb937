use diesel::{dsl, ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::login_attempts::{LockState, LoginAttempts, NewLoginAttempts};
use crate::models::session::{NewSession, Session};
use crate::schema::login_attempts as login_attempt_fields;
use crate::schema::login_attempts::dsl::login_attempts;
use crate::schema::sessions as session_fields;
use crate::schema::sessions::dsl::sessions;

/// Session tokens are never stored raw; rows are keyed by this digest.
pub fn session_token_digest(token: &[u8]) -> Vec<u8> {
    Sha256::digest(token).to_vec()
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

    pub fn get_or_create_login_attempts(&self, user_id: Uuid) -> Result<LoginAttempts, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let record = db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                dsl::insert_into(login_attempts)
                    .values(&NewLoginAttempts::zeroed(user_id, SystemTime::now()))
                    .on_conflict(login_attempt_fields::user_id)
                    .do_nothing()
                    .execute(conn)?;

                login_attempts
                    .find(user_id)
                    .get_result::<LoginAttempts>(conn)
            })?;

        Ok(record)
    }

    /// Records a failed sign-in attempt, locking the account once the attempt
    /// count reaches `max_attempts`. The increment is an upsert inside a
    /// single transaction so concurrent failures for the same user cannot
    /// lose updates.
    pub fn mark_failed_attempt(
        &self,
        user_id: Uuid,
        max_attempts: i16,
        lockout_duration: Duration,
    ) -> Result<LoginAttempts, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let record = db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                let now = SystemTime::now();

                let new_attempt = NewLoginAttempts {
                    user_id,
                    failed_attempts: 1,
                    last_attempt: Some(now),
                    is_locked: false,
                    locked_until: None,
                    created_timestamp: now,
                    modified_timestamp: now,
                };

                let mut record = dsl::insert_into(login_attempts)
                    .values(&new_attempt)
                    .on_conflict(login_attempt_fields::user_id)
                    .do_update()
                    .set((
                        login_attempt_fields::failed_attempts
                            .eq(login_attempt_fields::failed_attempts + 1),
                        login_attempt_fields::last_attempt.eq(Some(now)),
                        login_attempt_fields::modified_timestamp.eq(now),
                    ))
                    .get_result::<LoginAttempts>(conn)?;

                if record.failed_attempts >= max_attempts {
                    record = dsl::update(login_attempts.find(user_id))
                        .set((
                            login_attempt_fields::is_locked.eq(true),
                            login_attempt_fields::locked_until.eq(Some(now + lockout_duration)),
                            login_attempt_fields::modified_timestamp.eq(now),
                        ))
                        .get_result::<LoginAttempts>(conn)?;
                }

                Ok(record)
            })?;

        Ok(record)
    }

    pub fn reset_attempts(&self, user_id: Uuid) -> Result<(), DaoError> {
        let now = SystemTime::now();

        dsl::insert_into(login_attempts)
            .values(&NewLoginAttempts::zeroed(user_id, now))
            .on_conflict(login_attempt_fields::user_id)
            .do_update()
            .set((
                login_attempt_fields::failed_attempts.eq(0i16),
                login_attempt_fields::is_locked.eq(false),
                login_attempt_fields::locked_until.eq(None::<SystemTime>),
                login_attempt_fields::modified_timestamp.eq(now),
            ))
            .execute(&mut self.db_thread_pool.get()?)?;

        Ok(())
    }

    /// Evaluates the lock lazily. A lock whose deadline has passed is cleared
    /// (and the attempt counter zeroed) as a side effect of this read; there
    /// is no background sweeper. A missing record means the account was never
    /// locked.
    pub fn get_lock_status(&self, user_id: Uuid) -> Result<LockState, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let state = db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                let record = login_attempts
                    .find(user_id)
                    .get_result::<LoginAttempts>(conn)
                    .optional()?;

                let Some(record) = record else {
                    return Ok(LockState::Unlocked);
                };

                match record.lock_state(SystemTime::now()) {
                    LockState::Expired => {
                        dsl::update(login_attempts.find(user_id))
                            .set((
                                login_attempt_fields::failed_attempts.eq(0i16),
                                login_attempt_fields::is_locked.eq(false),
                                login_attempt_fields::locked_until.eq(None::<SystemTime>),
                                login_attempt_fields::modified_timestamp.eq(SystemTime::now()),
                            ))
                            .execute(conn)?;

                        Ok(LockState::Unlocked)
                    }
                    state => Ok(state),
                }
            })?;

        Ok(state)
    }

    pub fn create_session(
        &self,
        token_digest: &[u8],
        user_id: Uuid,
        username: &str,
        lifetime: Duration,
    ) -> Result<(), DaoError> {
        let now = SystemTime::now();

        let new_session = NewSession {
            token_digest,
            user_id: Some(user_id),
            username: Some(username),
            is_authenticated: Some(true),
            expiration: now + lifetime,
            created_timestamp: now,
            modified_timestamp: now,
        };

        dsl::insert_into(sessions)
            .values(&new_session)
            .execute(&mut self.db_thread_pool.get()?)?;

        Ok(())
    }

    pub fn get_session(&self, token_digest: &[u8]) -> Result<Option<Session>, DaoError> {
        Ok(sessions
            .find(token_digest)
            .get_result::<Session>(&mut self.db_thread_pool.get()?)
            .optional()?)
    }

    pub fn refresh_session_marker(
        &self,
        token_digest: &[u8],
        user_id: Uuid,
        username: &str,
    ) -> Result<(), DaoError> {
        dsl::update(sessions.find(token_digest))
            .set((
                session_fields::user_id.eq(Some(user_id)),
                session_fields::username.eq(Some(username)),
                session_fields::is_authenticated.eq(Some(true)),
                session_fields::modified_timestamp.eq(SystemTime::now()),
            ))
            .execute(&mut self.db_thread_pool.get()?)?;

        Ok(())
    }

    pub fn clear_session_marker(&self, token_digest: &[u8]) -> Result<(), DaoError> {
        dsl::update(sessions.find(token_digest))
            .set((
                session_fields::user_id.eq(None::<Uuid>),
                session_fields::username.eq(None::<String>),
                session_fields::is_authenticated.eq(None::<bool>),
                session_fields::modified_timestamp.eq(SystemTime::now()),
            ))
            .execute(&mut self.db_thread_pool.get()?)?;

        Ok(())
    }

    pub fn delete_session(&self, token_digest: &[u8]) -> Result<(), DaoError> {
        diesel::delete(sessions.find(token_digest))
            .execute(&mut self.db_thread_pool.get()?)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::db::test_utils::{self, DB_THREAD_POOL};
    use crate::db::user;
    use crate::models::user::User;
    use crate::threadrand::SecureRng;

    const MAX_ATTEMPTS: i16 = 3;
    const LOCKOUT_DURATION: Duration = Duration::from_secs(300);

    fn create_test_user() -> User {
        let user_dao = user::Dao::new(&DB_THREAD_POOL);
        user_dao
            .create_user(
                &test_utils::unique_username(),
                &test_utils::unique_email(),
                "test_hash",
            )
            .expect("Failed to create test user")
    }

    fn random_token() -> [u8; 32] {
        let mut token = [0u8; 32];
        SecureRng::fill_bytes(&mut token);
        token
    }

    #[test]
    fn test_get_or_create_login_attempts_is_idempotent() {
        let user = create_test_user();
        let dao = Dao::new(&DB_THREAD_POOL);

        let first = dao.get_or_create_login_attempts(user.id).unwrap();
        assert_eq!(first.user_id, user.id);
        assert_eq!(first.failed_attempts, 0);
        assert!(!first.is_locked);
        assert!(first.locked_until.is_none());

        let second = dao.get_or_create_login_attempts(user.id).unwrap();
        assert_eq!(second.failed_attempts, 0);
        assert_eq!(second.created_timestamp, first.created_timestamp);
    }

    #[test]
    fn test_mark_failed_attempt_counts_up_to_the_threshold() {
        let user = create_test_user();
        let dao = Dao::new(&DB_THREAD_POOL);

        for k in 1..MAX_ATTEMPTS {
            let record = dao
                .mark_failed_attempt(user.id, MAX_ATTEMPTS, LOCKOUT_DURATION)
                .unwrap();

            assert_eq!(record.failed_attempts, k);
            assert!(!record.is_locked);
            assert!(record.last_attempt.is_some());
            assert_eq!(dao.get_lock_status(user.id).unwrap(), LockState::Unlocked);
        }
    }

    #[test]
    fn test_reaching_the_threshold_locks_the_account() {
        let user = create_test_user();
        let dao = Dao::new(&DB_THREAD_POOL);

        for _ in 0..MAX_ATTEMPTS {
            dao.mark_failed_attempt(user.id, MAX_ATTEMPTS, LOCKOUT_DURATION)
                .unwrap();
        }

        let record = dao.get_or_create_login_attempts(user.id).unwrap();
        assert_eq!(record.failed_attempts, MAX_ATTEMPTS);
        assert!(record.is_locked);
        assert!(record.locked_until.is_some());

        let LockState::Locked {
            time_remaining: Some(remaining),
        } = dao.get_lock_status(user.id).unwrap()
        else {
            panic!("Account should be locked with a deadline");
        };

        assert!(remaining > Duration::ZERO);
        assert!(remaining <= LOCKOUT_DURATION);
    }

    #[test]
    fn test_expired_lock_is_cleared_on_read() {
        let user = create_test_user();
        let dao = Dao::new(&DB_THREAD_POOL);

        for _ in 0..MAX_ATTEMPTS {
            dao.mark_failed_attempt(user.id, MAX_ATTEMPTS, LOCKOUT_DURATION)
                .unwrap();
        }

        // Rewind the deadline rather than waiting for it
        dsl::update(login_attempts.find(user.id))
            .set(
                login_attempt_fields::locked_until
                    .eq(Some(SystemTime::now() - Duration::from_secs(1))),
            )
            .execute(&mut DB_THREAD_POOL.get().unwrap())
            .unwrap();

        assert_eq!(dao.get_lock_status(user.id).unwrap(), LockState::Unlocked);

        let record = dao.get_or_create_login_attempts(user.id).unwrap();
        assert_eq!(record.failed_attempts, 0);
        assert!(!record.is_locked);
        assert!(record.locked_until.is_none());

        // Re-reading must not change anything
        assert_eq!(dao.get_lock_status(user.id).unwrap(), LockState::Unlocked);
        let record = dao.get_or_create_login_attempts(user.id).unwrap();
        assert_eq!(record.failed_attempts, 0);
    }

    #[test]
    fn test_reset_attempts_clears_any_prior_state() {
        let user = create_test_user();
        let dao = Dao::new(&DB_THREAD_POOL);

        for _ in 0..(MAX_ATTEMPTS + 2) {
            dao.mark_failed_attempt(user.id, MAX_ATTEMPTS, LOCKOUT_DURATION)
                .unwrap();
        }

        dao.reset_attempts(user.id).unwrap();

        let record = dao.get_or_create_login_attempts(user.id).unwrap();
        assert_eq!(record.failed_attempts, 0);
        assert!(!record.is_locked);
        assert!(record.locked_until.is_none());
        assert_eq!(dao.get_lock_status(user.id).unwrap(), LockState::Unlocked);
    }

    #[test]
    fn test_lock_status_for_user_without_record_is_unlocked() {
        let dao = Dao::new(&DB_THREAD_POOL);

        assert_eq!(
            dao.get_lock_status(Uuid::now_v7()).unwrap(),
            LockState::Unlocked,
        );
    }

    #[test]
    fn test_create_and_get_session() {
        let user = create_test_user();
        let dao = Dao::new(&DB_THREAD_POOL);

        let token = random_token();
        let digest = session_token_digest(&token);

        dao.create_session(&digest, user.id, &user.username, Duration::from_secs(1_209_600))
            .unwrap();

        let session = dao.get_session(&digest).unwrap().unwrap();
        assert_eq!(
            session.identity_marker(),
            Some((user.id, user.username.as_str())),
        );
        assert!(!session.is_expired(SystemTime::now()));

        let lower_bound = SystemTime::now() + Duration::from_secs(1_209_600 - 60);
        assert!(session.expiration > lower_bound);
    }

    #[test]
    fn test_refresh_session_marker_rewrites_all_fields() {
        let user = create_test_user();
        let other_user = create_test_user();
        let dao = Dao::new(&DB_THREAD_POOL);

        let token = random_token();
        let digest = session_token_digest(&token);

        dao.create_session(&digest, user.id, &user.username, Duration::from_secs(60))
            .unwrap();
        dao.refresh_session_marker(&digest, other_user.id, &other_user.username)
            .unwrap();

        let session = dao.get_session(&digest).unwrap().unwrap();
        assert_eq!(
            session.identity_marker(),
            Some((other_user.id, other_user.username.as_str())),
        );
    }

    #[test]
    fn test_clear_session_marker_nulls_the_identity() {
        let user = create_test_user();
        let dao = Dao::new(&DB_THREAD_POOL);

        let token = random_token();
        let digest = session_token_digest(&token);

        dao.create_session(&digest, user.id, &user.username, Duration::from_secs(60))
            .unwrap();
        dao.clear_session_marker(&digest).unwrap();

        let session = dao.get_session(&digest).unwrap().unwrap();
        assert!(session.identity_marker().is_none());
        assert!(session.user_id.is_none());
        assert!(session.username.is_none());
        assert!(session.is_authenticated.is_none());
    }

    #[test]
    fn test_delete_session() {
        let user = create_test_user();
        let dao = Dao::new(&DB_THREAD_POOL);

        let token = random_token();
        let digest = session_token_digest(&token);

        dao.create_session(&digest, user.id, &user.username, Duration::from_secs(60))
            .unwrap();
        dao.delete_session(&digest).unwrap();

        assert!(dao.get_session(&digest).unwrap().is_none());
    }
}
