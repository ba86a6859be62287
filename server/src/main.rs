use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;

use board_server::config::Config;
use board_server::handlers::{cors, root};
use board_server::server::spawn_server;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    let srv_tx = spawn_server(config.server_options());
    log::info!(
        "Relay listening on {} (grace period {:?})",
        config.bind,
        config.grace_period()
    );

    let bind = config.bind.clone();
    let config = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(cors())
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(srv_tx.clone()))
            .app_data(config.clone())
            .configure(root)
    })
    .bind(bind)?
    .run()
    .await
}
