//! 健康检查路由
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /health | GET | 简单健康检查 |
//! | /health/detailed | GET | 数据库 / 重发队列状态 |
//!
//! # 响应示例
//!
//! ```json
//! {
//!   "status": "healthy",
//!   "version": "0.1.0",
//!   "store_code": "STORE01",
//!   "terminal": 1
//! }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use shared::models::DrainState;
use std::time::SystemTime;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/detailed", get(detailed_health))
}

/// 简单健康检查响应
#[derive(Serialize)]
pub struct HealthResponse {
    /// 状态 (healthy | degraded)
    status: &'static str,
    version: &'static str,
    store_code: String,
    terminal: u16,
}

/// 详细健康检查响应
#[derive(Serialize)]
pub struct DetailedHealthResponse {
    status: &'static str,
    version: &'static str,
    /// 运行时间 (秒)
    uptime_seconds: u64,
    checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    database: CheckResult,
    resend: ResendCheck,
}

/// 单项检查结果
#[derive(Serialize)]
pub struct CheckResult {
    /// 状态 (ok | error)
    status: &'static str,
    latency_ms: Option<u64>,
    message: Option<String>,
}

/// 重发队列状态
#[derive(Serialize)]
pub struct ResendCheck {
    state: DrainState,
    active: bool,
    /// 未送达的投递记录数
    pending: Option<usize>,
}

static START_TIME: std::sync::OnceLock<SystemTime> = std::sync::OnceLock::new();

fn get_uptime_seconds() -> u64 {
    let start = START_TIME.get_or_init(SystemTime::now);
    SystemTime::now()
        .duration_since(*start)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// GET /health - 基础健康检查
pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let settings = state.service.settings();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        store_code: settings.store_code.clone(),
        terminal: settings.terminal,
    })
}

/// GET /health/detailed - 包含组件状态的详细健康检查
pub async fn detailed_health(State(state): State<ServerState>) -> Json<DetailedHealthResponse> {
    let db_start = std::time::Instant::now();
    let (database, pending) = match state.storage.unsent_deliveries() {
        Ok(records) => (
            CheckResult {
                status: "ok",
                latency_ms: Some(db_start.elapsed().as_millis() as u64),
                message: None,
            },
            Some(records.len()),
        ),
        Err(e) => (
            CheckResult {
                status: "error",
                latency_ms: None,
                message: Some(format!("Database error: {e}")),
            },
            None,
        ),
    };

    Json(DetailedHealthResponse {
        status: if database.status == "ok" { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: get_uptime_seconds(),
        checks: HealthChecks {
            database,
            resend: ResendCheck {
                state: state.coordinator.state(),
                active: state.coordinator.is_active(),
                pending,
            },
        },
    })
}
