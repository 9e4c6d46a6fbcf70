//! Reports API Handlers

use axum::{Json, extract::State};
use serde::Deserialize;
use shared::error::{ApiResponse, AppResult};

use crate::core::ServerState;
use crate::sync::GenerationReport;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// 交易日期 YYYY-MM-DD
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendRequest {
    pub date: String,
    /// 缺省为当前批次
    #[serde(default)]
    pub batch: Option<u32>,
}

/// 远程失败不算请求失败: 本地文件已写, 由重发队列补送
fn respond(report: GenerationReport) -> ApiResponse<GenerationReport> {
    let message = if report.remote_synced {
        "Report generated and delivered".to_string()
    } else {
        format!(
            "Report saved locally, {} deliveries queued for resend",
            report.queued
        )
    };
    ApiResponse::success_with_message(message, report)
}

/// POST /api/reports/ayala/generate - 生成并推送 Ayala 四个文件
pub async fn generate_ayala(
    State(state): State<ServerState>,
    Json(req): Json<GenerateRequest>,
) -> AppResult<ApiResponse<GenerationReport>> {
    let date = shared::util::parse_date(&req.date)?;
    let report = state.service.generate_ayala(date).await?;
    Ok(respond(report))
}

/// POST /api/reports/robinson/generate - 生成新批次并推送
pub async fn generate_robinson(
    State(state): State<ServerState>,
    Json(req): Json<GenerateRequest>,
) -> AppResult<ApiResponse<GenerationReport>> {
    let date = shared::util::parse_date(&req.date)?;
    let report = state.service.generate_robinson(date).await?;
    Ok(respond(report))
}

/// POST /api/reports/robinson/resend - 按批次号重新生成并推送
pub async fn resend_robinson(
    State(state): State<ServerState>,
    Json(req): Json<ResendRequest>,
) -> AppResult<ApiResponse<GenerationReport>> {
    let date = shared::util::parse_date(&req.date)?;
    let report = state.service.resend_robinson(date, req.batch).await?;
    Ok(respond(report))
}
