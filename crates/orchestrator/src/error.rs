//! 编排层错误

use etl::ETLError;
use ml::MLError;
use thiserror::Error;

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("ETL 错误: {0}")]
    Etl(#[from] ETLError),

    #[error("模型错误: {0}")]
    Ml(#[from] MLError),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("配置文件解析错误: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("后台任务失败: {0}")]
    Join(#[from] tokio::task::JoinError),
}
