use actix_web::web::*;

use crate::handlers::auth;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/auth")
            .route("/sign_in", post().to(auth::sign_in))
            .route("/sign_out", post().to(auth::sign_out))
            .route("/session", get().to(auth::current_session)),
    );
}
