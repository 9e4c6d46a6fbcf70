//! Deliveries API Handlers

use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use shared::error::{ApiResponse, AppResult};
use shared::models::{DeliveryRecord, DrainReport, DrainState};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::core::ServerState;

const RESENT_EVENT: &str = r#"{"resent":true}"#;

/// Query params for listing deliveries
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// None: 全部
    pub sent: Option<bool>,
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

#[derive(Debug, Serialize)]
pub struct ResendResponse {
    /// 本次请求是否启动了新的 worker
    pub started: bool,
    pub state: DrainState,
}

/// GET /api/deliveries - 投递记录 (新的在前)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Vec<DeliveryRecord>>> {
    let records = state
        .storage
        .list_deliveries(query.sent, query.offset, query.limit)?;
    Ok(ApiResponse::success(records))
}

/// POST /api/deliveries/resend - 触发清队列 (已在运行则合并)
pub async fn resend(State(state): State<ServerState>) -> AppResult<ApiResponse<ResendResponse>> {
    let started = state.service.request_resend();
    let message = if started {
        "Resend started"
    } else {
        "Resend already running"
    };
    Ok(ApiResponse::success_with_message(
        message,
        ResendResponse {
            started,
            state: state.coordinator.state(),
        },
    ))
}

/// GET /api/deliveries/events - SSE: 清队列全部成功时推送 `{"resent":true}`
pub async fn events(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.coordinator.subscribe();
    Sse::new(resent_events(rx)).keep_alive(KeepAlive::default())
}

/// 只转发 `full_sent` 的周期报告
fn resent_events(
    rx: broadcast::Receiver<DrainReport>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(report) if report.full_sent => {
                    let event = Event::default().event("resent").data(RESENT_EVENT);
                    return Some((Ok(event), rx));
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "SSE subscriber lagged behind drain reports");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}
