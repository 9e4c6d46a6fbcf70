//! Deliveries API 模块 (投递记录 / 重发队列)
//!
//! `GET /api/deliveries/events` 是 SSE 流: 每当一次清队列全部成功,
//! 推送一条 `{"resent":true}`。

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/deliveries", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list))
        .route("/resend", post(handler::resend))
        .route("/events", get(handler::events))
}
