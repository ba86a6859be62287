use crate::connection::ws_index;
use crate::handlers::admin::configure_admin_handlers;
use crate::handlers::board::configure_board_handlers;
use actix_cors::Cors;
use actix_web::web;

mod admin;
mod board;

pub fn root(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws/").route(web::get().to(ws_index)));

    configure_board_handlers(cfg);
    configure_admin_handlers(cfg);
}

/// Boards are shared by link, so any origin may connect.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST"])
}
