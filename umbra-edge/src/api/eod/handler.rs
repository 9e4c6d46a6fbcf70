//! EOD API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use shared::error::{ApiResponse, AppError, AppResult};
use shared::models::{EodSnapshot, TransactionMark};

use crate::core::ServerState;

const RESOURCE: &str = "eod_snapshot";

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub store_code: String,
    pub date: chrono::NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub recorded: usize,
}

/// POST /api/eod - 写入日结快照 (每店每日一次)
pub async fn ingest(
    State(state): State<ServerState>,
    Json(snapshot): Json<EodSnapshot>,
) -> AppResult<ApiResponse<IngestResponse>> {
    state.service.ingest_snapshot(&snapshot)?;
    Ok(ApiResponse::success(IngestResponse {
        store_code: snapshot.store_code,
        date: snapshot.date,
    }))
}

/// POST /api/eod/transactions - 记录发票时间点 (用于重建小时段账本)
pub async fn ingest_transactions(
    State(state): State<ServerState>,
    Json(marks): Json<Vec<TransactionMark>>,
) -> AppResult<ApiResponse<TransactionsResponse>> {
    let recorded = state.service.ingest_transactions(&marks)?;
    Ok(ApiResponse::success(TransactionsResponse { recorded }))
}

/// GET /api/eod/:store_code/:date - 获取日结快照
pub async fn get_snapshot(
    State(state): State<ServerState>,
    Path((store_code, date)): Path<(String, String)>,
) -> AppResult<ApiResponse<EodSnapshot>> {
    let date = shared::util::parse_date(&date)?;
    let snapshot = state
        .service
        .snapshot(&store_code, date)?
        .ok_or_else(|| AppError::not_found(format!("{RESOURCE} {store_code}/{date}")))?;
    Ok(ApiResponse::success(snapshot))
}
