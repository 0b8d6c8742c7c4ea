//! 核心类型定义

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type MLResult<T> = Result<T, MLError>;

#[derive(Debug, Error)]
pub enum MLError {
    #[error("数据预处理错误: {0}")]
    Preprocessing(String),

    #[error("模型训练错误: {0}")]
    Training(String),

    #[error("模型预测错误: {0}")]
    Prediction(String),

    #[error("数据维度不匹配: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("无效的配置: {0}")]
    InvalidConfig(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(String),
}

/// 模型配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub n_trees: usize,
    /// `None` 表示不限深度
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// 测试集比例
    pub test_ratio: f64,
    /// 随机种子（划分与自助采样共用）
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            test_ratio: 0.2,
            seed: 42,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> MLResult<()> {
        if self.n_trees == 0 {
            return Err(MLError::InvalidConfig("n_trees 必须大于 0".to_string()));
        }
        if self.min_samples_split < 2 {
            return Err(MLError::InvalidConfig(
                "min_samples_split 至少为 2".to_string(),
            ));
        }
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(MLError::InvalidConfig(format!(
                "test_ratio 必须在 (0, 1) 之间: {}",
                self.test_ratio
            )));
        }
        Ok(())
    }
}

/// 评估指标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// 均方误差
    pub mse: f64,
    /// 均方根误差
    pub rmse: f64,
    /// 平均绝对误差
    pub mae: f64,
    /// R² 分数
    pub r2_score: f64,
}

impl Metrics {
    pub fn new(mse: f64, rmse: f64, mae: f64, r2_score: f64) -> Self {
        Self {
            mse,
            rmse,
            mae,
            r2_score,
        }
    }
}

/// 单个特征的重要性
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// 训练报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub target: String,
    pub n_train: usize,
    pub n_test: usize,
    pub test_metrics: Metrics,
    /// 按重要性降序
    pub feature_importances: Vec<FeatureImportance>,
    pub config: ModelConfig,
    pub training_duration_secs: f64,
}
