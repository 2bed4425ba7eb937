use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::time::SystemTime;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory table of live authenticated sessions, keyed by session token
/// digest. This is the ephemeral half of session storage: it does not survive
/// a process restart. The persisted identity markers (the `sessions` table)
/// exist so the restore middleware can repopulate this map afterwards.
static LIVE_SESSIONS: Lazy<RwLock<HashMap<Vec<u8>, LiveSession>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

#[derive(Clone, Debug)]
pub struct LiveSession {
    pub user_id: Uuid,
    pub username: String,
    pub expiration: SystemTime,
}

/// Returns the live session for the given token digest, if one exists and has
/// not expired. Expired entries are evicted lazily by this lookup.
pub async fn get(token_digest: &[u8]) -> Option<LiveSession> {
    let expired = {
        // The read lock is intentionally scoped in this block to ensure it
        // gets dropped before the write lock is acquired
        let table = LIVE_SESSIONS.read().await;

        match table.get(token_digest) {
            Some(session) if session.expiration > SystemTime::now() => {
                return Some(session.clone());
            }
            Some(_) => true,
            None => false,
        }
    };

    if expired {
        LIVE_SESSIONS.write().await.remove(token_digest);
    }

    None
}

pub async fn insert(token_digest: Vec<u8>, session: LiveSession) {
    LIVE_SESSIONS.write().await.insert(token_digest, session);
}

pub async fn remove(token_digest: &[u8]) {
    LIVE_SESSIONS.write().await.remove(token_digest);
}
