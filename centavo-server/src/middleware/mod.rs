pub mod auth;

mod session_restore;

pub use session_restore::SessionRestore;

use base64::engine::general_purpose::URL_SAFE as b64_urlsafe;
use base64::Engine;

pub const SESSION_TOKEN_COOKIE: &str = "session_token";
pub const SESSION_TOKEN_LENGTH: usize = 32;

/// Decodes a session cookie value into the raw token. Anything that isn't
/// valid base64 of the expected length is treated as no token at all.
pub(crate) fn decode_session_token(cookie_value: &str) -> Option<Vec<u8>> {
    let token = b64_urlsafe.decode(cookie_value).ok()?;

    if token.len() != SESSION_TOKEN_LENGTH {
        return None;
    }

    Some(token)
}
