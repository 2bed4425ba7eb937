use actix_web::web::*;

mod auth;
mod health;
mod transaction;
mod user;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/api")
            .configure(auth::configure)
            .configure(health::configure)
            .configure(transaction::configure)
            .configure(user::configure),
    );
}
