use thiserror::Error;

use crate::db::StorageError;

/// 服务启动 / 运行期错误
///
/// HTTP 请求错误走 `shared::error::AppError`，这里只覆盖进程级故障。
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("存储初始化失败: {0}")]
    Storage(#[from] StorageError),

    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("内部服务器错误: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
