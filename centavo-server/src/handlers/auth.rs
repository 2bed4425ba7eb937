use actix_web::cookie::{time::Duration as CookieDuration, Cookie};
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use base64::engine::general_purpose::URL_SAFE as b64_urlsafe;
use base64::Engine;
use std::time::{Duration, SystemTime};
use zeroize::Zeroizing;

use centavo_common::db::auth::session_token_digest;
use centavo_common::db::{self, DaoError, DbThreadPool};
use centavo_common::models::login_attempts::LockState;
use centavo_common::request_io::{CredentialPair, OutputSession, OutputSignIn};
use centavo_common::threadrand::SecureRng;

use crate::env;
use crate::handlers::error::ServerError;
use crate::handlers::password;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::{decode_session_token, SESSION_TOKEN_COOKIE, SESSION_TOKEN_LENGTH};
use crate::utils::session_table::{self, LiveSession};

const INVALID_CREDENTIALS_MSG: &str = "Invalid credentials.";

pub async fn sign_in(
    db_thread_pool: web::Data<DbThreadPool>,
    credentials: web::Json<CredentialPair>,
) -> Result<HttpResponse, ServerError> {
    let credentials = credentials.into_inner();
    let username = credentials.username;
    let password = Zeroizing::new(credentials.password.into_bytes());

    if username.is_empty() || username.len() > 255 {
        return Err(ServerError::UserUnauthorized(Some(String::from(
            INVALID_CREDENTIALS_MSG,
        ))));
    }

    let user_dao = db::user::Dao::new(&db_thread_pool);
    let username_for_lookup = username.clone();

    let user = match web::block(move || user_dao.get_user_by_username(&username_for_lookup)).await?
    {
        Ok(u) => u,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            // Unknown usernames get the same rejection as a wrong password,
            // and no lockout bookkeeping is created for them
            return Err(ServerError::UserUnauthorized(Some(String::from(
                INVALID_CREDENTIALS_MSG,
            ))));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(ServerError::DatabaseTransactionError(Some(String::from(
                "Failed to look up user",
            ))));
        }
    };

    // The lock check must happen before the password is verified; attempts
    // against a locked account never touch the credential path
    let user_id = user.id;
    let auth_dao = db::auth::Dao::new(&db_thread_pool);

    let lock_status = match web::block(move || auth_dao.get_lock_status(user_id)).await? {
        Ok(s) => s,
        Err(e) => {
            log::error!("{e}");
            return Err(ServerError::DatabaseTransactionError(Some(String::from(
                "Failed to check account lock",
            ))));
        }
    };

    if let LockState::Locked { time_remaining } = lock_status {
        return Err(ServerError::AccountLocked(Some(locked_message(
            time_remaining,
        ))));
    }

    let password_hash = user.password_hash.clone();
    let password_matches =
        web::block(move || password::verify_password(&password, &password_hash)).await??;

    if !password_matches {
        let auth_dao = db::auth::Dao::new(&db_thread_pool);

        let record = match web::block(move || {
            auth_dao.mark_failed_attempt(
                user_id,
                env::CONF.lockout_max_attempts,
                env::CONF.lockout_duration,
            )
        })
        .await?
        {
            Ok(r) => r,
            Err(e) => {
                log::error!("{e}");
                return Err(ServerError::DatabaseTransactionError(Some(String::from(
                    "Failed to record failed sign-in attempt",
                ))));
            }
        };

        let remaining_attempts = env::CONF.lockout_max_attempts - record.failed_attempts;

        if remaining_attempts > 0 {
            return Err(ServerError::UserUnauthorized(Some(format!(
                "Invalid credentials. {remaining_attempts} attempts remaining.",
            ))));
        }

        return Err(ServerError::AccountLocked(Some(String::from(
            "Account locked due to too many failed attempts.",
        ))));
    }

    let auth_dao = db::auth::Dao::new(&db_thread_pool);
    match web::block(move || auth_dao.reset_attempts(user_id)).await? {
        Ok(_) => (),
        Err(e) => {
            log::error!("{e}");
            return Err(ServerError::DatabaseTransactionError(Some(String::from(
                "Failed to reset sign-in attempts",
            ))));
        }
    }

    let mut token = [0u8; SESSION_TOKEN_LENGTH];
    SecureRng::fill_bytes(&mut token);
    let token_digest = session_token_digest(&token);

    let auth_dao = db::auth::Dao::new(&db_thread_pool);
    let digest_for_creation = token_digest.clone();
    let username_for_session = user.username.clone();

    match web::block(move || {
        auth_dao.create_session(
            &digest_for_creation,
            user_id,
            &username_for_session,
            env::CONF.session_lifetime,
        )
    })
    .await?
    {
        Ok(_) => (),
        Err(e) => {
            log::error!("{e}");
            return Err(ServerError::DatabaseTransactionError(Some(String::from(
                "Failed to create session",
            ))));
        }
    }

    session_table::insert(
        token_digest,
        LiveSession {
            user_id,
            username: user.username.clone(),
            expiration: SystemTime::now() + env::CONF.session_lifetime,
        },
    )
    .await;

    let session_cookie = Cookie::build(SESSION_TOKEN_COOKIE, b64_urlsafe.encode(token))
        .path("/")
        .http_only(true)
        .max_age(CookieDuration::seconds(
            env::CONF.session_lifetime.as_secs() as i64,
        ))
        .finish();

    Ok(HttpResponse::Ok().cookie(session_cookie).json(OutputSignIn {
        message: format!("Welcome back, {}!", user.username),
        user_id,
        username: user.username,
    }))
}

pub async fn sign_out(
    db_thread_pool: web::Data<DbThreadPool>,
    req: HttpRequest,
) -> Result<HttpResponse, ServerError> {
    let token_digest = req
        .cookie(SESSION_TOKEN_COOKIE)
        .and_then(|cookie| decode_session_token(cookie.value()))
        .map(|token| session_token_digest(&token));

    let Some(token_digest) = token_digest else {
        return Err(ServerError::UserUnauthorized(Some(String::from(
            "Not signed in",
        ))));
    };

    session_table::remove(&token_digest).await;

    let auth_dao = db::auth::Dao::new(&db_thread_pool);
    match web::block(move || auth_dao.delete_session(&token_digest)).await? {
        Ok(_) => (),
        Err(e) => {
            log::error!("{e}");
            return Err(ServerError::DatabaseTransactionError(Some(String::from(
                "Failed to delete session",
            ))));
        }
    }

    let mut removal_cookie = Cookie::build(SESSION_TOKEN_COOKIE, "").path("/").finish();
    removal_cookie.make_removal();

    Ok(HttpResponse::Ok().cookie(removal_cookie).finish())
}

pub async fn current_session(user: AuthenticatedUser) -> Result<HttpResponse, ServerError> {
    Ok(HttpResponse::Ok().json(OutputSession {
        user_id: user.user_id,
        username: user.username,
    }))
}

fn locked_message(time_remaining: Option<Duration>) -> String {
    match time_remaining {
        Some(remaining) => {
            let minutes = remaining.as_secs() / 60;
            let seconds = remaining.as_secs() % 60;

            format!(
                "Account is locked due to too many failed attempts. \
                 Try again in {minutes}m {seconds}s.",
            )
        }
        None => String::from("Account is locked due to too many failed attempts."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::web::Data;
    use actix_web::App;
    use diesel::{dsl, ExpressionMethods, QueryDsl, RunQueryDsl};

    use centavo_common::models::login_attempts::LoginAttempts;
    use centavo_common::schema::login_attempts as login_attempt_fields;
    use centavo_common::schema::login_attempts::dsl::login_attempts;
    use centavo_common::schema::users as user_fields;
    use centavo_common::schema::users::dsl::users;

    use crate::handlers::test_utils::{self, TEST_PASSWORD};
    use crate::middleware::SessionRestore;

    macro_rules! test_app {
        () => {
            test::init_service(
                App::new()
                    .app_data(Data::new(crate::env::testing::DB_THREAD_POOL.clone()))
                    .wrap(SessionRestore)
                    .configure(crate::services::api::configure),
            )
            .await
        };
    }

    fn sign_in_request(username: &str, password: &str) -> actix_http::Request {
        let credentials = CredentialPair {
            username: String::from(username),
            password: String::from(password),
        };

        TestRequest::post()
            .uri("/api/auth/sign_in")
            .insert_header(("Content-Type", "application/json"))
            .set_payload(serde_json::to_vec(&credentials).unwrap())
            .to_request()
    }

    fn attempts_record(username: &str) -> LoginAttempts {
        let user_id = users
            .filter(user_fields::username.eq(username))
            .select(user_fields::id)
            .get_result::<uuid::Uuid>(&mut crate::env::testing::DB_THREAD_POOL.get().unwrap())
            .unwrap();

        login_attempts
            .find(user_id)
            .get_result::<LoginAttempts>(&mut crate::env::testing::DB_THREAD_POOL.get().unwrap())
            .unwrap()
    }

    #[actix_web::test]
    async fn test_sign_in_sets_a_fourteen_day_session_cookie() {
        let app = test_app!();

        let new_user = test_utils::unique_user_input();
        let req = TestRequest::post()
            .uri("/api/user")
            .insert_header(("Content-Type", "application/json"))
            .set_payload(serde_json::to_vec(&new_user).unwrap())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp =
            test::call_service(&app, sign_in_request(&new_user.username, TEST_PASSWORD)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let session_cookie = resp
            .response()
            .cookies()
            .find(|cookie| cookie.name() == SESSION_TOKEN_COOKIE)
            .expect("Sign-in should set the session cookie")
            .into_owned();

        assert_eq!(
            session_cookie.max_age(),
            Some(CookieDuration::seconds(1_209_600)),
        );
        assert_eq!(session_cookie.http_only(), Some(true));

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["username"], new_user.username.as_str());
        assert_eq!(
            body["message"],
            format!("Welcome back, {}!", new_user.username),
        );
    }

    #[actix_web::test]
    async fn test_session_endpoint_returns_the_signed_in_identity() {
        let (user, session_cookie) = test_utils::create_user_and_sign_in().await;
        let app = test_app!();

        let req = TestRequest::get()
            .uri("/api/auth/session")
            .cookie(Cookie::new(SESSION_TOKEN_COOKIE, session_cookie))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["username"], user.username.as_str());
        assert_eq!(body["user_id"], user.id.to_string().as_str());
    }

    #[actix_web::test]
    async fn test_failed_attempts_count_down_then_lock() {
        let (user, _cookie) = test_utils::create_user_and_sign_in().await;
        let app = test_app!();

        let resp = test::call_service(&app, sign_in_request(&user.username, "Wrong-Pass1!")).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = String::from_utf8_lossy(&test::read_body(resp).await).to_string();
        assert!(body.contains("2 attempts remaining"));

        let resp = test::call_service(&app, sign_in_request(&user.username, "Wrong-Pass1!")).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = String::from_utf8_lossy(&test::read_body(resp).await).to_string();
        assert!(body.contains("1 attempts remaining"));

        let resp = test::call_service(&app, sign_in_request(&user.username, "Wrong-Pass1!")).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body = String::from_utf8_lossy(&test::read_body(resp).await).to_string();
        assert!(body.contains("Account locked due to too many failed attempts."));

        let record = attempts_record(&user.username);
        assert_eq!(record.failed_attempts, 3);
        assert!(record.is_locked);

        // A fourth attempt, even with the correct password, is rejected by
        // the lock check without touching the counter
        let resp = test::call_service(&app, sign_in_request(&user.username, TEST_PASSWORD)).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body = String::from_utf8_lossy(&test::read_body(resp).await).to_string();
        assert!(body.contains("Try again in"));
        assert!(body.contains("m "));
        assert!(body.contains("s."));

        let record = attempts_record(&user.username);
        assert_eq!(record.failed_attempts, 3);
    }

    #[actix_web::test]
    async fn test_unknown_username_gets_a_generic_rejection() {
        let app = test_app!();

        let username = format!("no_such_user{}", SecureRng::next_u128());
        let resp = test::call_service(&app, sign_in_request(&username, "Whatever1!")).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body = String::from_utf8_lossy(&test::read_body(resp).await).to_string();
        assert!(body.contains("Invalid credentials."));
        assert!(!body.contains("remaining"));

        // No account, no bookkeeping
        let user_count = users
            .filter(user_fields::username.eq(&username))
            .count()
            .get_result::<i64>(&mut crate::env::testing::DB_THREAD_POOL.get().unwrap())
            .unwrap();
        assert_eq!(user_count, 0);
    }

    #[actix_web::test]
    async fn test_lock_clears_lazily_after_the_deadline() {
        let (user, _cookie) = test_utils::create_user_and_sign_in().await;
        let app = test_app!();

        for _ in 0..3 {
            test::call_service(&app, sign_in_request(&user.username, "Wrong-Pass1!")).await;
        }
        assert!(attempts_record(&user.username).is_locked);

        // Rewind the deadline instead of waiting out the cooldown
        dsl::update(login_attempts.find(user.id))
            .set(
                login_attempt_fields::locked_until
                    .eq(Some(SystemTime::now() - Duration::from_secs(1))),
            )
            .execute(&mut crate::env::testing::DB_THREAD_POOL.get().unwrap())
            .unwrap();

        let resp = test::call_service(&app, sign_in_request(&user.username, TEST_PASSWORD)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let record = attempts_record(&user.username);
        assert_eq!(record.failed_attempts, 0);
        assert!(!record.is_locked);
        assert!(record.locked_until.is_none());
    }

    #[actix_web::test]
    async fn test_successful_sign_in_resets_the_counter() {
        let (user, _cookie) = test_utils::create_user_and_sign_in().await;
        let app = test_app!();

        for _ in 0..2 {
            test::call_service(&app, sign_in_request(&user.username, "Wrong-Pass1!")).await;
        }
        assert_eq!(attempts_record(&user.username).failed_attempts, 2);

        let resp = test::call_service(&app, sign_in_request(&user.username, TEST_PASSWORD)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let record = attempts_record(&user.username);
        assert_eq!(record.failed_attempts, 0);
        assert!(!record.is_locked);
    }

    #[actix_web::test]
    async fn test_sign_out_invalidates_the_session() {
        let (_user, session_cookie) = test_utils::create_user_and_sign_in().await;
        let app = test_app!();

        let req = TestRequest::post()
            .uri("/api/auth/sign_out")
            .cookie(Cookie::new(SESSION_TOKEN_COOKIE, session_cookie.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        // The marker is gone too, so the session can't be restored
        let req = TestRequest::get()
            .uri("/api/auth/session")
            .cookie(Cookie::new(SESSION_TOKEN_COOKIE, session_cookie))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_locked_message_formats_minutes_and_seconds() {
        let msg = locked_message(Some(Duration::from_secs(185)));
        assert!(msg.contains("3m 5s"));

        let msg = locked_message(Some(Duration::from_secs(299)));
        assert!(msg.contains("4m 59s"));

        let msg = locked_message(None);
        assert_eq!(msg, "Account is locked due to too many failed attempts.");
    }
}
