use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::handlers;
use crate::state::AppState;

/// 创建 API 路由
pub fn create_router(state: AppState) -> Router {
    // CORS 配置
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // 健康检查
        .route("/health", get(handlers::health_check))
        // 引擎控制
        .route("/api/engines", get(handlers::list_engines))
        .route("/api/engines/:name", get(handlers::get_engine))
        .route("/api/engines/:name/start", post(handlers::start_engine))
        .route("/api/engines/:name/stop", post(handlers::stop_engine))
        // 交易记录
        .route("/api/trades", get(handlers::list_trades))
        .layer(cors)
        .with_state(state)
}

/// 启动服务器，`shutdown` 完成后优雅退出
pub async fn start_server(
    app: Router,
    host: &str,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API 服务器启动: http://{}", addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    Ok(())
}
