use actix_web::{web, HttpResponse};
use zeroize::Zeroizing;

use centavo_common::db::{self, DaoError, DbThreadPool};
use centavo_common::request_io::{InputUser, OutputUser};
use centavo_common::validators::Validity;

use crate::handlers::error::ServerError;
use crate::handlers::password;

pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    user_data: web::Json<InputUser>,
) -> Result<HttpResponse, ServerError> {
    if let Validity::Invalid(msg) = user_data.validate_username() {
        return Err(ServerError::InvalidFormat(Some(msg)));
    }

    if let Validity::Invalid(msg) = user_data.validate_email_address() {
        return Err(ServerError::InvalidFormat(Some(msg)));
    }

    if let Validity::Invalid(msg) = user_data.validate_strong_password() {
        return Err(ServerError::InvalidFormat(Some(msg)));
    }

    let InputUser {
        username,
        email,
        password,
    } = user_data.into_inner();

    let password = Zeroizing::new(password.into_bytes());
    let password_hash = web::block(move || password::hash_password(&password)).await??;

    let user_dao = db::user::Dao::new(&db_thread_pool);

    let user = match web::block(move || user_dao.create_user(&username, &email, &password_hash))
        .await?
    {
        Ok(u) => u,
        Err(DaoError::QueryFailure(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        ))) => {
            return Err(ServerError::AlreadyExists(Some(String::from(
                "A user with that username already exists.",
            ))));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(ServerError::DatabaseTransactionError(Some(String::from(
                "Failed to create user",
            ))));
        }
    };

    Ok(HttpResponse::Created().json(OutputUser::from(user)))
}
