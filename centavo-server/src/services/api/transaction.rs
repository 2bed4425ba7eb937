use actix_web::web::*;

use crate::handlers::transaction;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/transactions")
            .route("", post().to(transaction::create))
            .route("", get().to(transaction::get_all))
            .route("/summary", get().to(transaction::summary))
            .route("/reset", post().to(transaction::reset))
            .route("/{transaction_id}", get().to(transaction::get))
            .route("/{transaction_id}", put().to(transaction::edit))
            .route("/{transaction_id}", delete().to(transaction::delete)),
    );
}
