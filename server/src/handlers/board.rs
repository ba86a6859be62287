use actix_web::http::header;
use actix_web::web;
use actix_web::{HttpRequest, HttpResponse};
use actix_web::{error, Result};
use askama_actix::Template;
use system::SessionId;

#[derive(Template)]
#[template(path = "board.html")]
pub struct BoardTemplate {
    session_id: String,
    ws_path: String,
}

pub fn configure_board_handlers(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/")
            .name("home")
            .route(web::get().to(new_board)),
    )
    .service(web::resource("/board/").route(web::get().to(redirect_home)))
    .service(
        web::resource("/board/{session_id}")
            .name("board")
            .route(web::get().to(show_board)),
    );
}

fn found(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

pub async fn new_board(req: HttpRequest) -> Result<HttpResponse> {
    let session_id = SessionId::generate();
    let location = req.url_for("board", [session_id.as_str()])?;
    Ok(found(location.as_str()))
}

pub async fn redirect_home(req: HttpRequest) -> Result<HttpResponse> {
    let location = req.url_for_static("home")?;
    Ok(found(location.as_str()))
}

/// Sessions are created by the first join over the websocket, not by opening the page.
pub async fn show_board(path: web::Path<String>) -> Result<HttpResponse> {
    let page = BoardTemplate {
        session_id: path.into_inner(),
        ws_path: "/ws/".to_string(),
    }
    .render()
    .map_err(error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn it_redirects_home_to_a_fresh_board() {
        let app = test::init_service(App::new().configure(configure_board_handlers)).await;
        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        assert_eq!(res.status(), StatusCode::FOUND);
        let location = res
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .expect("location header");
        let session_id = location.rsplit('/').next().expect("");
        assert!(location.contains("/board/"));
        assert_eq!(session_id.len(), 8);
    }

    #[actix_web::test]
    async fn it_redirects_empty_board_path_home() {
        let app = test::init_service(App::new().configure(configure_board_handlers)).await;
        let res =
            test::call_service(&app, test::TestRequest::get().uri("/board/").to_request()).await;

        assert_eq!(res.status(), StatusCode::FOUND);
        let location = res.headers().get(header::LOCATION).expect("location header");
        assert!(location.to_str().expect("").ends_with('/'));
    }

    #[actix_web::test]
    async fn it_renders_board_for_session() {
        let app = test::init_service(App::new().configure(configure_board_handlers)).await;
        let req = test::TestRequest::get().uri("/board/abcd1234").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let body = std::str::from_utf8(&body).expect("utf-8");

        assert!(body.contains("data-session-id=\"abcd1234\""));
        assert!(body.contains("data-ws-path=\"/ws/\""));
    }
}
