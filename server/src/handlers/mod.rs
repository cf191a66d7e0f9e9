use crate::connection::{ws_index, ws_room};
use crate::handlers::sessions::configure_session_handlers;
use actix_web::web;

mod sessions;

pub fn root(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws").route(web::get().to(ws_index)))
        .service(web::resource("/ws/{room}").route(web::get().to(ws_room)))
        .service(web::resource("/health").route(web::get().to(health)));

    configure_session_handlers(cfg);
}

async fn health() -> &'static str {
    "ok"
}
