use diesel::{Insertable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::schema::sessions;

/// Server-side session row, keyed by the SHA-256 digest of the session token.
/// The `user_id`/`username`/`is_authenticated` triple is the identity marker
/// used to restore a signed-in user after the in-memory session backing is
/// lost. All three are nullable; a cleared marker keeps the row but nulls the
/// triple.
#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable, QueryableByName)]
#[diesel(table_name = sessions, primary_key(token_digest))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Session {
    pub token_digest: Vec<u8>,
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
    pub is_authenticated: Option<bool>,
    pub expiration: SystemTime,
    pub created_timestamp: SystemTime,
    pub modified_timestamp: SystemTime,
}

impl Session {
    pub fn is_expired(&self, now: SystemTime) -> bool {
        now > self.expiration
    }

    /// Returns the identity marker if all three fields are present and the
    /// authenticated flag is set.
    pub fn identity_marker(&self) -> Option<(Uuid, &str)> {
        match (self.user_id, self.username.as_deref(), self.is_authenticated) {
            (Some(user_id), Some(username), Some(true)) => Some((user_id, username)),
            _ => None,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = sessions, primary_key(token_digest))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewSession<'a> {
    pub token_digest: &'a [u8],
    pub user_id: Option<Uuid>,
    pub username: Option<&'a str>,
    pub is_authenticated: Option<bool>,
    pub expiration: SystemTime,
    pub created_timestamp: SystemTime,
    pub modified_timestamp: SystemTime,
}
