use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use clap::Parser;

use shared_canvas_server::config::ServerConfig;
use shared_canvas_server::handlers::root;
use shared_canvas_server::server::{spawn_server, ServerTx};

// Sessions run on their own multi-threaded runtime so different sessions
// progress in parallel; actix workers only run the websocket actors.
fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::parse();
    let palette = config
        .validate()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;

    let sessions = tokio::runtime::Builder::new_multi_thread()
        .thread_name("canvas-session")
        .enable_all()
        .build()?;
    let srv_tx = sessions.block_on(async move { spawn_server(palette) });

    actix_web::rt::System::new().block_on(serve(config, srv_tx))
}

async fn serve(config: ServerConfig, srv_tx: ServerTx) -> std::io::Result<()> {
    let bind = config.bind_address();
    log::info!("Listening on http://{}:{}", bind.0, bind.1);

    let config = web::Data::new(config);
    let srv_tx = web::Data::new(srv_tx);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(srv_tx.clone())
            .app_data(config.clone())
            .configure(root)
    })
    .bind(bind)?
    .run()
    .await
}
