use actix_web::{error, web, HttpResponse, Responder};
use system::serde_json::json;
use system::SessionData;

use crate::server::{list_sessions, lookup_session, ServerTx};
use crate::session::{describe_session, SessionDescription};

pub fn configure_session_handlers(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/sessions")
            .service(web::resource("").route(web::get().to(list)))
            .service(web::resource("/{name}").route(web::get().to(show)))
            .service(web::resource("/{name}/export").route(web::get().to(export))),
    );
}

async fn list(srv_tx: web::Data<ServerTx>) -> Result<impl Responder, actix_web::Error> {
    let sessions = list_sessions(&srv_tx)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let mut items = Vec::with_capacity(sessions.len());
    for (name, session_tx) in sessions {
        if let Some(desc) = describe_session(&session_tx).await {
            items.push(json!({
                "name": name,
                "participants": desc.users.len(),
                "strokes": desc.strokes.len(),
            }));
        }
    }
    Ok(HttpResponse::Ok().json(items))
}

async fn find(srv_tx: &ServerTx, name: &str) -> Result<SessionDescription, actix_web::Error> {
    let session_tx = lookup_session(srv_tx, name)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("no such session"))?;
    describe_session(&session_tx)
        .await
        .ok_or_else(|| error::ErrorInternalServerError("session is not running"))
}

async fn show(
    path: web::Path<String>,
    srv_tx: web::Data<ServerTx>,
) -> Result<impl Responder, actix_web::Error> {
    let desc = find(&srv_tx, &path).await?;
    Ok(HttpResponse::Ok().json(json!({
        "name": desc.name,
        "users": desc.users,
        "strokes": desc.strokes.len(),
        "undone": desc.undone,
    })))
}

async fn export(
    path: web::Path<String>,
    srv_tx: web::Data<ServerTx>,
) -> Result<impl Responder, actix_web::Error> {
    let desc = find(&srv_tx, &path).await?;
    Ok(HttpResponse::Ok().json(SessionData {
        strokes: desc.strokes,
    }))
}
