//! Ledger API 模块 (小时段序号 / 批次账本)

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/ledger", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/hour-range", post(handler::allocate_hour_range))
        .route("/rebuild", post(handler::rebuild))
        .route("/reprint", post(handler::record_reprint))
        .route("/{store_code}/{date}", get(handler::get_ledger))
}
