use actix_web::{web, HttpResponse};
use uuid::Uuid;

use centavo_common::db::{self, DaoError, DbThreadPool};
use centavo_common::request_io::{
    InputTransaction, OutputDeletedCount, OutputTransaction, OutputTransactionSummary,
};
use centavo_common::validators::Validity;

use crate::handlers::error::ServerError;
use crate::middleware::auth::AuthenticatedUser;

pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    user: AuthenticatedUser,
    transaction_data: web::Json<InputTransaction>,
) -> Result<HttpResponse, ServerError> {
    if let Validity::Invalid(msg) = transaction_data.validate() {
        return Err(ServerError::InvalidFormat(Some(msg)));
    }

    let transaction_dao = db::transaction::Dao::new(&db_thread_pool);

    let transaction = match web::block(move || {
        transaction_dao.create_transaction(user.user_id, &transaction_data.0)
    })
    .await?
    {
        Ok(t) => t,
        Err(e) => {
            log::error!("{e}");
            return Err(ServerError::DatabaseTransactionError(Some(String::from(
                "Failed to create transaction",
            ))));
        }
    };

    Ok(HttpResponse::Created().json(OutputTransaction::from(transaction)))
}

pub async fn get_all(
    db_thread_pool: web::Data<DbThreadPool>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ServerError> {
    let transaction_dao = db::transaction::Dao::new(&db_thread_pool);

    let transactions =
        match web::block(move || transaction_dao.get_all_transactions_for_user(user.user_id))
            .await?
        {
            Ok(t) => t,
            Err(e) => {
                log::error!("{e}");
                return Err(ServerError::DatabaseTransactionError(Some(String::from(
                    "Failed to fetch transactions",
                ))));
            }
        };

    let transactions = transactions
        .into_iter()
        .map(OutputTransaction::from)
        .collect::<Vec<_>>();

    Ok(HttpResponse::Ok().json(transactions))
}

pub async fn get(
    db_thread_pool: web::Data<DbThreadPool>,
    user: AuthenticatedUser,
    transaction_id: web::Path<Uuid>,
) -> Result<HttpResponse, ServerError> {
    let transaction_id = transaction_id.into_inner();
    let transaction_dao = db::transaction::Dao::new(&db_thread_pool);

    let transaction =
        match web::block(move || transaction_dao.get_transaction(transaction_id, user.user_id))
            .await?
        {
            Ok(t) => t,
            Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
                return Err(ServerError::NotFound(Some(String::from(
                    "Transaction not found",
                ))));
            }
            Err(e) => {
                log::error!("{e}");
                return Err(ServerError::DatabaseTransactionError(Some(String::from(
                    "Failed to fetch transaction",
                ))));
            }
        };

    Ok(HttpResponse::Ok().json(OutputTransaction::from(transaction)))
}

pub async fn edit(
    db_thread_pool: web::Data<DbThreadPool>,
    user: AuthenticatedUser,
    transaction_id: web::Path<Uuid>,
    transaction_data: web::Json<InputTransaction>,
) -> Result<HttpResponse, ServerError> {
    if let Validity::Invalid(msg) = transaction_data.validate() {
        return Err(ServerError::InvalidFormat(Some(msg)));
    }

    let transaction_id = transaction_id.into_inner();
    let transaction_dao = db::transaction::Dao::new(&db_thread_pool);

    let transaction = match web::block(move || {
        transaction_dao.edit_transaction(transaction_id, user.user_id, &transaction_data.0)
    })
    .await?
    {
        Ok(t) => t,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(ServerError::NotFound(Some(String::from(
                "Transaction not found",
            ))));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(ServerError::DatabaseTransactionError(Some(String::from(
                "Failed to edit transaction",
            ))));
        }
    };

    Ok(HttpResponse::Ok().json(OutputTransaction::from(transaction)))
}

pub async fn delete(
    db_thread_pool: web::Data<DbThreadPool>,
    user: AuthenticatedUser,
    transaction_id: web::Path<Uuid>,
) -> Result<HttpResponse, ServerError> {
    let transaction_id = transaction_id.into_inner();
    let transaction_dao = db::transaction::Dao::new(&db_thread_pool);

    let deleted_count =
        match web::block(move || transaction_dao.delete_transaction(transaction_id, user.user_id))
            .await?
        {
            Ok(count) => count,
            Err(e) => {
                log::error!("{e}");
                return Err(ServerError::DatabaseTransactionError(Some(String::from(
                    "Failed to delete transaction",
                ))));
            }
        };

    if deleted_count == 0 {
        return Err(ServerError::NotFound(Some(String::from(
            "Transaction not found",
        ))));
    }

    Ok(HttpResponse::Ok().finish())
}

pub async fn summary(
    db_thread_pool: web::Data<DbThreadPool>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ServerError> {
    let transaction_dao = db::transaction::Dao::new(&db_thread_pool);

    let summary =
        match web::block(move || transaction_dao.get_transaction_summary(user.user_id)).await? {
            Ok(s) => s,
            Err(e) => {
                log::error!("{e}");
                return Err(ServerError::DatabaseTransactionError(Some(String::from(
                    "Failed to compute summary",
                ))));
            }
        };

    Ok(HttpResponse::Ok().json(OutputTransactionSummary {
        income_total_cents: summary.income_total_cents,
        expense_total_cents: summary.expense_total_cents,
        balance_cents: summary.income_total_cents - summary.expense_total_cents,
    }))
}

pub async fn reset(
    db_thread_pool: web::Data<DbThreadPool>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ServerError> {
    let transaction_dao = db::transaction::Dao::new(&db_thread_pool);

    let deleted_count =
        match web::block(move || transaction_dao.delete_all_transactions_for_user(user.user_id))
            .await?
        {
            Ok(count) => count,
            Err(e) => {
                log::error!("{e}");
                return Err(ServerError::DatabaseTransactionError(Some(String::from(
                    "Failed to reset transactions",
                ))));
            }
        };

    Ok(HttpResponse::Ok().json(OutputDeletedCount {
        deleted: deleted_count as u64,
    }))
}
