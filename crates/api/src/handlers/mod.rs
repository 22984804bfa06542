mod engine;
mod health;
mod trade;

pub use engine::*;
pub use health::*;
pub use trade::*;

use serde::Serialize;

/// 统一响应包装 {success, data, error}
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl ApiResponse<MessageResponse> {
    pub fn message(message: impl Into<String>) -> Self {
        Self::success(MessageResponse {
            message: message.into(),
        })
    }
}
