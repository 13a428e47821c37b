// src/handlers/status.rs
use actix_web::{web, HttpResponse};
use log::debug;
use serde::Deserialize;

use crate::registry::Registry;

#[derive(Deserialize)]
pub struct AddressQuery {
    pub host: String,
    pub port: u16,
}

// Plain-text player count for the exact address, -1 when the address is not
// registered or has never been successfully queried.
pub async fn player_count(
    registry: web::Data<Registry>,
    query: web::Query<AddressQuery>,
) -> HttpResponse {
    let count = registry
        .find_by_addr(&query.host, query.port)
        .and_then(|record| record.last_snapshot)
        .map(|snapshot| snapshot.player_count as i64)
        .unwrap_or(-1);
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(count.to_string())
}

pub async fn info(
    registry: web::Data<Registry>,
    query: web::Query<AddressQuery>,
) -> HttpResponse {
    match registry.find_by_addr(&query.host, query.port) {
        // null until the first successful refresh
        Some(record) => HttpResponse::Ok().json(record.last_snapshot),
        None => HttpResponse::NotFound().body("Server not found"),
    }
}

pub async fn servers(registry: web::Data<Registry>) -> HttpResponse {
    let status = registry.status();
    debug!("building status response with {} servers", status.len());
    HttpResponse::Ok().json(status)
}
