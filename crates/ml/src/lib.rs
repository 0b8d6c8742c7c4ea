//! # Engagement ML
//!
//! 视频互动量（点赞数）回归建模。
//!
//! ## 主要模块
//!
//! - `preprocessing`: 特征表构建、独热编码、训练/测试划分
//! - `models`: 随机森林回归与可复用的训练产物
//! - `evaluation`: 回归评估指标
//! - `training`: 训练与评估流程

pub mod preprocessing;
pub mod models;
pub mod evaluation;
pub mod training;
pub mod types;

pub use models::traditional::RandomForestRegressor;
pub use models::trained::TrainedModel;
pub use models::Model;
pub use preprocessing::{encode_with, CategoricalColumn, FeatureTable, NumericColumn, OneHotEncoder};
pub use training::train_and_evaluate;
pub use types::{FeatureImportance, MLError, MLResult, Metrics, ModelConfig, TrainingReport};
