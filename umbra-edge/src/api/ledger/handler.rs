//! Ledger API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared::error::{ApiResponse, AppResult};
use shared::models::{BatchLog, HourRange, ReprintEvent};

use crate::core::ServerState;

/// 账本视图
#[derive(Debug, Serialize)]
pub struct LedgerView {
    pub store_code: String,
    pub date: NaiveDate,
    pub hour_ranges: Vec<HourRange>,
    /// None: 该日尚未生成过批次
    pub batch_log: Option<BatchLog>,
}

#[derive(Debug, Deserialize)]
pub struct HourRangeRequest {
    /// 缺省为本机门店
    #[serde(default)]
    pub store_code: Option<String>,
    pub date: String,
    pub hour: u8,
    pub count: u64,
}

#[derive(Debug, Deserialize)]
pub struct RebuildRequest {
    #[serde(default)]
    pub store_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReprintRequest {
    #[serde(default)]
    pub store_code: Option<String>,
    pub date: String,
    #[serde(flatten)]
    pub event: ReprintEvent,
}

fn store_or_default(state: &ServerState, store_code: Option<String>) -> String {
    store_code.unwrap_or_else(|| state.service.settings().store_code.clone())
}

/// GET /api/ledger/:store_code/:date - 小时段与批次账本
pub async fn get_ledger(
    State(state): State<ServerState>,
    Path((store_code, date)): Path<(String, String)>,
) -> AppResult<ApiResponse<LedgerView>> {
    let date = shared::util::parse_date(&date)?;
    let hour_ranges = state.sequence.hour_ranges(&store_code, date)?;
    let batch_log = state.sequence.batch_log(&store_code, date)?;
    Ok(ApiResponse::success(LedgerView {
        store_code,
        date,
        hour_ranges,
        batch_log,
    }))
}

/// POST /api/ledger/hour-range - 分配 (或读取已有) 小时段序号
pub async fn allocate_hour_range(
    State(state): State<ServerState>,
    Json(req): Json<HourRangeRequest>,
) -> AppResult<ApiResponse<HourRange>> {
    let date = shared::util::parse_date(&req.date)?;
    let store_code = store_or_default(&state, req.store_code);
    let range = state
        .sequence
        .allocate_hour_range(&store_code, date, req.hour, req.count)?;
    Ok(ApiResponse::success(range))
}

/// POST /api/ledger/rebuild - 从交易记录重建全部小时段 (破坏性)
pub async fn rebuild(
    State(state): State<ServerState>,
    Json(req): Json<RebuildRequest>,
) -> AppResult<ApiResponse<Vec<HourRange>>> {
    let store_code = store_or_default(&state, req.store_code);
    let ranges = state.sequence.rebuild_all_ledger(&store_code)?;
    Ok(ApiResponse::success(ranges))
}

/// POST /api/ledger/reprint - 记录重打事件
pub async fn record_reprint(
    State(state): State<ServerState>,
    Json(req): Json<ReprintRequest>,
) -> AppResult<ApiResponse<BatchLog>> {
    let date = shared::util::parse_date(&req.date)?;
    let store_code = store_or_default(&state, req.store_code);
    let log = state.sequence.record_reprint(&store_code, date, req.event)?;
    Ok(ApiResponse::success(log))
}
