use std::future::{ready, Ready};
use std::time::SystemTime;

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::web::{self, Data};
use actix_web::HttpMessage;
use futures::future::LocalBoxFuture;

use centavo_common::db::auth::session_token_digest;
use centavo_common::db::{self, DbThreadPool};

use crate::middleware::{decode_session_token, SESSION_TOKEN_COOKIE};
use crate::utils::session_table::{self, LiveSession};

/// Re-establishes a signed-in identity from the persisted session marker when
/// the live session backing has been lost (the in-memory table is wiped by
/// every process restart under ephemeral storage).
///
/// This is best-effort recovery, not an authorization gate: no branch below
/// produces an error response, and a request that cannot be restored simply
/// continues unauthenticated into the normal session check.
pub struct SessionRestore;

impl<S, B> Transform<S, ServiceRequest> for SessionRestore
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = SessionRestoreMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionRestoreMiddleware { service }))
    }
}

pub struct SessionRestoreMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for SessionRestoreMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token_digest = req
            .cookie(SESSION_TOKEN_COOKIE)
            .and_then(|cookie| decode_session_token(cookie.value()))
            .map(|token| session_token_digest(&token));

        let db_thread_pool = req.app_data::<Data<DbThreadPool>>().cloned();

        let req_fut = self.service.call(req);

        Box::pin(async move {
            if let (Some(token_digest), Some(db_thread_pool)) = (token_digest, db_thread_pool) {
                if session_table::get(&token_digest).await.is_none() {
                    restore_session(token_digest, &db_thread_pool).await;
                }
            }

            req_fut.await
        })
    }
}

async fn restore_session(token_digest: Vec<u8>, db_thread_pool: &DbThreadPool) {
    let auth_dao = db::auth::Dao::new(db_thread_pool);
    let digest = token_digest.clone();

    let session = match web::block(move || auth_dao.get_session(&digest)).await {
        Ok(Ok(Some(s))) => s,
        Ok(Ok(None)) => return,
        Ok(Err(e)) => {
            log::error!("{e}");
            return;
        }
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };

    if session.is_expired(SystemTime::now()) {
        return;
    }

    let Some((user_id, username)) = session.identity_marker() else {
        return;
    };
    let username = String::from(username);

    let user_dao = db::user::Dao::new(db_thread_pool);
    let username_for_lookup = username.clone();

    let user = match web::block(move || {
        user_dao.find_user_by_id_and_username(user_id, &username_for_lookup)
    })
    .await
    {
        Ok(Ok(u)) => u,
        Ok(Err(e)) => {
            log::error!("{e}");
            return;
        }
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };

    let auth_dao = db::auth::Dao::new(db_thread_pool);

    match user {
        Some(user) => {
            session_table::insert(
                token_digest.clone(),
                LiveSession {
                    user_id: user.id,
                    username: user.username.clone(),
                    expiration: session.expiration,
                },
            )
            .await;

            let refresh_result = web::block(move || {
                auth_dao.refresh_session_marker(&token_digest, user.id, &user.username)
            })
            .await;

            match refresh_result {
                Ok(Ok(_)) => (),
                Ok(Err(e)) => log::error!("{e}"),
                Err(e) => log::error!("{e}"),
            }
        }
        None => {
            // Stale or mismatched marker (the user may have been deleted and
            // the id recycled); drop the identity so it can't be replayed
            let clear_result =
                web::block(move || auth_dao.clear_session_marker(&token_digest)).await;

            match clear_result {
                Ok(Ok(_)) => (),
                Ok(Err(e)) => log::error!("{e}"),
                Err(e) => log::error!("{e}"),
            }
        }
    }
}
