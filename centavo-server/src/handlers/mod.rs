pub mod auth;
pub mod health;
pub mod transaction;
pub mod user;

pub mod password {
    use std::str::FromStr;

    use super::error::ServerError;
    use crate::env;

    pub fn hash_password(password: &[u8]) -> Result<String, ServerError> {
        let hash_result = argon2_kdf::Hasher::default()
            .algorithm(argon2_kdf::Algorithm::Argon2id)
            .salt_length(env::CONF.hash_salt_length)
            .hash_length(env::CONF.hash_length)
            .iterations(env::CONF.hash_iterations)
            .memory_cost_kib(env::CONF.hash_mem_cost_kib)
            .threads(env::CONF.hash_threads)
            .secret(argon2_kdf::Secret::using_bytes(&env::CONF.hashing_key))
            .hash(password);

        match hash_result {
            Ok(hash) => Ok(hash.to_string()),
            Err(e) => {
                log::error!("{e}");
                Err(ServerError::InternalError(Some(String::from(
                    "Failed to hash password",
                ))))
            }
        }
    }

    pub fn verify_password(password: &[u8], password_hash: &str) -> Result<bool, ServerError> {
        let hash = match argon2_kdf::Hash::from_str(password_hash) {
            Ok(h) => h,
            Err(e) => {
                log::error!("{e}");
                return Err(ServerError::InternalError(Some(String::from(
                    "Failed to verify password",
                ))));
            }
        };

        Ok(hash.verify_with_secret(
            password,
            argon2_kdf::Secret::using_bytes(&env::CONF.hashing_key),
        ))
    }
}

pub mod error {
    use actix_web::http::{header, StatusCode};
    use actix_web::{HttpResponse, HttpResponseBuilder};
    use std::fmt;

    #[derive(Debug)]
    pub enum ServerError {
        // 400 Errors
        InvalidFormat(Option<String>),
        AlreadyExists(Option<String>),

        // 401
        UserUnauthorized(Option<String>),

        // 403
        AccountLocked(Option<String>),

        // 404
        NotFound(Option<String>),

        // 500 Errors
        InternalError(Option<String>),
        DatabaseTransactionError(Option<String>),
    }

    impl std::error::Error for ServerError {}

    impl fmt::Display for ServerError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                ServerError::InvalidFormat(msg) => format_err(f, "Invalid request format", msg),
                ServerError::AlreadyExists(msg) => format_err(f, "Already exists", msg),
                ServerError::UserUnauthorized(msg) => format_err(f, "User unauthorized", msg),
                ServerError::AccountLocked(msg) => format_err(f, "Account locked", msg),
                ServerError::NotFound(msg) => format_err(f, "Not found", msg),
                ServerError::InternalError(msg) => format_err(f, "Internal server error", msg),
                ServerError::DatabaseTransactionError(msg) => {
                    format_err(f, "Database transaction failed", msg)
                }
            }
        }
    }

    impl actix_web::error::ResponseError for ServerError {
        fn error_response(&self) -> HttpResponse {
            HttpResponseBuilder::new(self.status_code())
                .insert_header((header::CONTENT_TYPE, "application/json"))
                .body(self.to_string())
        }

        fn status_code(&self) -> StatusCode {
            match *self {
                ServerError::InvalidFormat(_) | ServerError::AlreadyExists(_) => {
                    StatusCode::BAD_REQUEST
                }
                ServerError::UserUnauthorized(_) => StatusCode::UNAUTHORIZED,
                ServerError::AccountLocked(_) => StatusCode::FORBIDDEN,
                ServerError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl From<actix_web::error::BlockingError> for ServerError {
        fn from(_err: actix_web::error::BlockingError) -> Self {
            ServerError::InternalError(Some(String::from("Actix thread pool failure")))
        }
    }

    fn format_err(
        f: &mut fmt::Formatter<'_>,
        error_txt: &str,
        msg: &Option<String>,
    ) -> fmt::Result {
        let full_msg = match msg {
            Some(msg) => format!("{error_txt}: {msg}"),
            None => String::from(error_txt),
        };

        write!(
            f,
            "{}",
            serde_json::json!({ "error_msg": full_msg }),
        )
    }
}
