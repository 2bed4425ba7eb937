use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

use centavo_common::db::{self, DaoError, DbThreadPool};
use centavo_common::request_io::InputTransaction;

use crate::env;
use crate::handlers::error::ServerError;
use crate::handlers::password;

const DEMO_USERNAME: &str = "demo_account";
const DEMO_PASSWORD: &str = "DemoPass1!";

pub async fn heartbeat() -> impl Responder {
    HttpResponse::Ok()
}

pub async fn health(db_thread_pool: web::Data<DbThreadPool>) -> Result<HttpResponse, ServerError> {
    let pool = db_thread_pool.clone();
    let connection_result = web::block(move || pool.get().map(|_| ())).await?;

    if let Err(e) = connection_result {
        log::error!("{e}");

        return Ok(HttpResponse::InternalServerError().json(json!({
            "status": "error",
            "message": "Failed to obtain a database connection",
            "database_ready": false,
        })));
    }

    // Under ephemeral storage the database may have just been recreated, so
    // the demo account gets reseeded on the health check the deployment
    // platform hits after every cold start
    if env::CONF.ephemeral_storage_mode {
        if let Err(e) = seed_demo_data(&db_thread_pool).await {
            log::error!("{e}");

            return Ok(HttpResponse::InternalServerError().json(json!({
                "status": "error",
                "message": "Database initialization failed",
                "database_ready": false,
            })));
        }
    }

    Ok(HttpResponse::Ok().json(json!({
        "status": "ok",
        "message": "Centavo API is running",
        "database_ready": true,
    })))
}

async fn seed_demo_data(db_thread_pool: &DbThreadPool) -> Result<(), ServerError> {
    let user_dao = db::user::Dao::new(db_thread_pool);

    let demo_user = match web::block(move || user_dao.get_user_by_username(DEMO_USERNAME)).await? {
        Ok(_) => return Ok(()),
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            let password_hash =
                web::block(|| password::hash_password(DEMO_PASSWORD.as_bytes())).await??;

            let user_dao = db::user::Dao::new(db_thread_pool);

            match web::block(move || {
                user_dao.create_user(DEMO_USERNAME, "demo@centavo.test", &password_hash)
            })
            .await?
            {
                Ok(u) => u,
                Err(DaoError::QueryFailure(diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                ))) => {
                    // Another request seeded the account first
                    return Ok(());
                }
                Err(e) => {
                    log::error!("{e}");
                    return Err(ServerError::DatabaseTransactionError(Some(String::from(
                        "Failed to create demo account",
                    ))));
                }
            }
        }
        Err(e) => {
            log::error!("{e}");
            return Err(ServerError::DatabaseTransactionError(Some(String::from(
                "Failed to look up demo account",
            ))));
        }
    };

    let transaction_dao = db::transaction::Dao::new(db_thread_pool);
    let demo_user_id = demo_user.id;

    let seed_result = web::block(move || {
        let demo_income = InputTransaction {
            amount_cents: 25000_00,
            description: String::from("Demo Income"),
            category: String::from("salary"),
            transaction_type: String::from("income"),
        };
        transaction_dao.create_transaction(demo_user_id, &demo_income)?;

        let demo_expense = InputTransaction {
            amount_cents: 1500_00,
            description: String::from("Demo Expense"),
            category: String::from("food"),
            transaction_type: String::from("expense"),
        };
        transaction_dao.create_transaction(demo_user_id, &demo_expense)?;

        Ok::<_, DaoError>(())
    })
    .await?;

    if let Err(e) = seed_result {
        log::error!("{e}");
        return Err(ServerError::DatabaseTransactionError(Some(String::from(
            "Failed to seed demo transactions",
        ))));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::web::Data;
    use actix_web::App;

    use centavo_common::db::user;

    #[actix_web::test]
    async fn test_heartbeat() {
        let app =
            test::init_service(App::new().route("/heartbeat", web::get().to(heartbeat))).await;

        let req = TestRequest::get().uri("/heartbeat").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_health_reports_database_ready() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(crate::env::testing::DB_THREAD_POOL.clone()))
                .route("/health", web::get().to(health)),
        )
        .await;

        let req = TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database_ready"], true);
    }

    #[actix_web::test]
    async fn test_seed_demo_data_is_idempotent() {
        let db_thread_pool = crate::env::testing::DB_THREAD_POOL.clone();

        seed_demo_data(&db_thread_pool).await.unwrap();

        let user_dao = user::Dao::new(&db_thread_pool);
        let demo_user = user_dao.get_user_by_username(DEMO_USERNAME).unwrap();

        let transaction_dao = db::transaction::Dao::new(&db_thread_pool);
        let seeded = transaction_dao
            .get_all_transactions_for_user(demo_user.id)
            .unwrap();
        assert_eq!(seeded.len(), 2);

        // A second pass must not duplicate the demo rows
        seed_demo_data(&db_thread_pool).await.unwrap();

        let seeded = transaction_dao
            .get_all_transactions_for_user(demo_user.id)
            .unwrap();
        assert_eq!(seeded.len(), 2);
    }
}
