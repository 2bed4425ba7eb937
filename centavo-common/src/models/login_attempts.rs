use diesel::{Insertable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::models::user::User;
use crate::schema::login_attempts;

/// Result of evaluating a `LoginAttempts` record against a point in time.
///
/// `Expired` means the lock deadline has passed; the caller is responsible for
/// persisting the cleared state (lock expiry is lazy, there is no sweeper).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked { time_remaining: Option<Duration> },
    Expired,
}

#[derive(
    Clone, Debug, Serialize, Deserialize, Identifiable, Associations, Queryable, QueryableByName,
)]
#[diesel(table_name = login_attempts, primary_key(user_id))]
#[diesel(belongs_to(User, foreign_key = user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LoginAttempts {
    pub user_id: Uuid,
    pub failed_attempts: i16,
    pub last_attempt: Option<SystemTime>,
    pub is_locked: bool,
    pub locked_until: Option<SystemTime>,
    pub created_timestamp: SystemTime,
    pub modified_timestamp: SystemTime,
}

impl LoginAttempts {
    pub fn lock_state(&self, now: SystemTime) -> LockState {
        if !self.is_locked {
            return LockState::Unlocked;
        }

        let Some(deadline) = self.locked_until else {
            // Mid-transition record; stays locked until a deadline is recorded
            // or the attempts are reset
            return LockState::Locked {
                time_remaining: None,
            };
        };

        match deadline.duration_since(now) {
            Ok(remaining) if !remaining.is_zero() => LockState::Locked {
                time_remaining: Some(remaining),
            },
            _ => LockState::Expired,
        }
    }

    pub fn time_until_unlock(&self, now: SystemTime) -> Option<Duration> {
        match self.lock_state(now) {
            LockState::Locked { time_remaining } => time_remaining,
            _ => None,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = login_attempts, primary_key(user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewLoginAttempts {
    pub user_id: Uuid,
    pub failed_attempts: i16,
    pub last_attempt: Option<SystemTime>,
    pub is_locked: bool,
    pub locked_until: Option<SystemTime>,
    pub created_timestamp: SystemTime,
    pub modified_timestamp: SystemTime,
}

impl NewLoginAttempts {
    pub fn zeroed(user_id: Uuid, now: SystemTime) -> Self {
        Self {
            user_id,
            failed_attempts: 0,
            last_attempt: None,
            is_locked: false,
            locked_until: None,
            created_timestamp: now,
            modified_timestamp: now,
        }
    }
}
