//! 流水线配置：TOML 文件 < 环境变量 < 命令行参数

use crate::error::OrchestratorResult;
use etl::{DatasetPaths, MalformedFieldPolicy, SentimentConfig, YouTubeConfig};
use ml::ModelConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_KEY_ENV: &str = "YOUTUBE_API_KEY";
pub const SENTIMENT_TOKEN_ENV: &str = "HF_API_TOKEN";

/// 清洗配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub malformed_fields: MalformedFieldPolicy,
}

/// 调度与重试配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// 每个阶段失败后的重试次数
    pub retries: u32,
    pub retry_delay_secs: u64,
    /// `run --every` 未指定时的运行间隔
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            retries: 1,
            retry_delay_secs: 300,
            interval_secs: 86_400,
        }
    }
}

impl ScheduleConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub base_dir: PathBuf,
    pub youtube: YouTubeConfig,
    pub sentiment: SentimentConfig,
    pub cleaning: CleaningConfig,
    pub model: ModelConfig,
    pub schedule: ScheduleConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            youtube: YouTubeConfig::default(),
            sentiment: SentimentConfig::default(),
            cleaning: CleaningConfig::default(),
            model: ModelConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> OrchestratorResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> OrchestratorResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// 用环境变量补全密钥，已配置的值不会被覆盖
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.youtube.api_key.is_none() {
            self.youtube.api_key = lookup(API_KEY_ENV).filter(|v| !v.is_empty());
        }
        if self.sentiment.api_token.is_none() {
            self.sentiment.api_token = lookup(SENTIMENT_TOKEN_ENV).filter(|v| !v.is_empty());
        }
    }

    pub fn paths(&self) -> DatasetPaths {
        DatasetPaths::rooted_at(&self.base_dir)
    }
}
