use crate::error::RelayError;
use crate::server::{ServerCommand, ServerTx};
use actix_web::web;
use actix_web::HttpResponse;
use actix_web::Result;
use system::{SessionId, SessionSnapshot};
use tokio::sync::oneshot;

pub fn configure_admin_handlers(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .service(
                web::resource("/sessions")
                    .name("admin_sessions")
                    .route(web::get().to(list_sessions)),
            )
            .service(
                web::resource("/sessions/{session_id}")
                    .name("admin_session")
                    .route(web::get().to(show_session)),
            ),
    );
}

async fn ask<T>(
    srv_tx: &ServerTx,
    command: impl FnOnce(oneshot::Sender<T>) -> ServerCommand,
) -> Result<T, RelayError> {
    let (tx, rx) = oneshot::channel();
    srv_tx
        .send(command(tx))
        .await
        .map_err(|_| RelayError::ServerUnavailable)?;
    rx.await.map_err(|_| RelayError::ReplyDropped)
}

pub async fn list_sessions(srv_tx: web::Data<ServerTx>) -> Result<HttpResponse> {
    let sessions: Vec<SessionSnapshot> =
        ask(srv_tx.get_ref(), |tx| ServerCommand::ListSessions { tx }).await?;
    Ok(HttpResponse::Ok().json(sessions))
}

pub async fn show_session(
    path: web::Path<String>,
    srv_tx: web::Data<ServerTx>,
) -> Result<HttpResponse> {
    let session_id = SessionId::from(path.into_inner());
    let snapshot = ask(srv_tx.get_ref(), |tx| ServerCommand::GetSession {
        session_id: session_id.clone(),
        tx,
    })
    .await?
    .ok_or_else(|| RelayError::SessionNotFound(session_id.to_string()))?;
    Ok(HttpResponse::Ok().json(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{spawn_server, ServerOptions};
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn it_lists_no_sessions_on_fresh_server() {
        let srv_tx = spawn_server(ServerOptions::default());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(srv_tx))
                .configure(configure_admin_handlers),
        )
        .await;

        let req = test::TestRequest::get().uri("/admin/sessions").to_request();
        let sessions: Vec<SessionSnapshot> = test::call_and_read_body_json(&app, req).await;
        assert!(sessions.is_empty());
    }

    #[actix_web::test]
    async fn it_answers_not_found_for_unknown_session() {
        let srv_tx = spawn_server(ServerOptions::default());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(srv_tx))
                .configure(configure_admin_handlers),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/admin/sessions/abcd1234")
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
