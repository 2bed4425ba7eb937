use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use uuid::Uuid;

use centavo_common::db::auth::session_token_digest;

use crate::handlers::error::ServerError;
use crate::middleware::{decode_session_token, SESSION_TOKEN_COOKIE};
use crate::utils::session_table;

/// Identity established from a live session. Requests without a live session
/// are rejected here; the session-restore middleware has already had its
/// chance to repopulate the live table from a persisted marker.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = ServerError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        const NOT_SIGNED_IN_MSG: &str = "Not signed in";

        let token_digest = req
            .cookie(SESSION_TOKEN_COOKIE)
            .and_then(|cookie| decode_session_token(cookie.value()))
            .map(|token| session_token_digest(&token));

        Box::pin(async move {
            let Some(token_digest) = token_digest else {
                return Err(ServerError::UserUnauthorized(Some(String::from(
                    NOT_SIGNED_IN_MSG,
                ))));
            };

            match session_table::get(&token_digest).await {
                Some(session) => Ok(AuthenticatedUser {
                    user_id: session.user_id,
                    username: session.username,
                }),
                None => Err(ServerError::UserUnauthorized(Some(String::from(
                    NOT_SIGNED_IN_MSG,
                )))),
            }
        })
    }
}
