use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use services::TradeRecordRow;

use super::ApiResponse;
use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 500;

#[derive(Serialize)]
pub struct TradeResponse {
    pub id: i64,
    pub strategy: String,
    pub pair: String,
    pub profit: String,
    pub profit_display: Decimal,
    pub token_symbol: String,
    pub tx_hash: String,
    pub created_at: String,
}

impl From<TradeRecordRow> for TradeResponse {
    fn from(row: TradeRecordRow) -> Self {
        Self {
            id: row.id,
            strategy: row.strategy,
            pair: row.pair,
            profit: row.profit,
            profit_display: row.profit_display,
            token_symbol: row.token_symbol,
            tx_hash: row.tx_hash,
            created_at: utils::utc_to_shanghai_str(row.created_at),
        }
    }
}

#[derive(Deserialize)]
pub struct TradeListQuery {
    pub limit: Option<u32>,
}

/// 获取最近的成交记录
pub async fn list_trades(
    State(state): State<AppState>,
    Query(query): Query<TradeListQuery>,
) -> Result<Json<ApiResponse<Vec<TradeResponse>>>, (StatusCode, String)> {
    let database = state
        .database
        .as_ref()
        .ok_or_else(|| (StatusCode::SERVICE_UNAVAILABLE, "未配置数据库".to_string()))?;

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    match database.list_trade_records(limit).await {
        Ok(rows) => Ok(Json(ApiResponse::success(rows.into_iter().map(TradeResponse::from).collect()))),
        Err(e) => Ok(Json(ApiResponse::error(format!("查询成交记录失败: {}", e)))),
    }
}
