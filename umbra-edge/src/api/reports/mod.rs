//! Reports API 模块 (商场报表生成)

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/reports", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/ayala/generate", post(handler::generate_ayala))
        .route("/robinson/generate", post(handler::generate_robinson))
        .route("/robinson/resend", post(handler::resend_robinson))
}
