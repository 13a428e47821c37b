// src/main.rs
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::{error, info};
use std::sync::Arc;

use ssmon::config::{Config, JsonFileSink};
use ssmon::handlers;
use ssmon::query::A2sClient;
use ssmon::registry::Registry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger only once at the start
    env_logger::init_from_env(Env::default().default_filter_or("debug"));

    dotenv::dotenv().ok();

    // Load configuration
    let config_path = Config::path_from_env();
    let config = Config::load(&config_path);

    let registry = Registry::new(
        Arc::new(A2sClient::new()),
        Arc::new(JsonFileSink::new(config_path, config.api_port)),
    );

    for entry in &config.servers {
        if let Err(e) = registry.add(entry.clone()) {
            error!(
                "skipping configured server {}:{}: {}",
                entry.host, entry.port, e
            );
        }
    }

    // Get bind address and port from environment or use defaults
    let bind_address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| config.api_port.to_string());
    let bind = format!("{}:{}", bind_address, port);

    info!("Starting status API on {}", bind);
    let app_registry = Arc::clone(&registry);
    let result = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::from(Arc::clone(&app_registry)))
            .route("/player-count", web::get().to(handlers::status::player_count))
            .route("/info", web::get().to(handlers::status::info))
            .route("/servers", web::get().to(handlers::status::servers))
    })
        .bind(&bind)?
        .run().await;

    registry.shutdown();
    result
}
