use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use strategies::EngineSnapshot;
use tracing::info;

use super::{ApiResponse, MessageResponse};
use crate::state::{AppState, StartOutcome};

fn unknown_engine(name: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("引擎 {} 不存在", name))
}

/// 获取所有引擎状态
pub async fn list_engines(State(state): State<AppState>) -> Json<ApiResponse<Vec<EngineSnapshot>>> {
    Json(ApiResponse::success(state.engines.snapshots()))
}

/// 获取单个引擎状态
pub async fn get_engine(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<EngineSnapshot>>, (StatusCode, String)> {
    let engine = state.engines.get(&name).ok_or_else(|| unknown_engine(&name))?;
    Ok(Json(ApiResponse::success(engine.snapshot())))
}

/// 启动引擎 (后台运行，立即返回)
pub async fn start_engine(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, (StatusCode, String)> {
    let message = match state.engines.spawn_start(&name) {
        Some(StartOutcome::Spawned) => {
            info!("API 请求启动引擎: {}", name);
            format!("引擎 {} 启动中", name)
        }
        Some(StartOutcome::AlreadyActive(current)) => format!("引擎 {} 当前状态为 {}，忽略启动", name, current),
        None => return Err(unknown_engine(&name)),
    };

    Ok(Json(ApiResponse::message(message)))
}

/// 停止引擎 (当前套利对处理完后退出)
pub async fn stop_engine(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, (StatusCode, String)> {
    if !state.engines.stop(&name) {
        return Err(unknown_engine(&name));
    }

    info!("API 请求停止引擎: {}", name);
    Ok(Json(ApiResponse::message(format!("引擎 {} 停止中", name))))
}
