//! EOD API 模块 (日结快照接入)

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/eod", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::ingest))
        .route("/transactions", post(handler::ingest_transactions))
        .route("/{store_code}/{date}", get(handler::get_snapshot))
}
