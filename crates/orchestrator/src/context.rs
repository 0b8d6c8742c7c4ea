//! 进程级上下文：配置与注入的外部依赖

use crate::config::PipelineConfig;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::signals::{CompletionSink, LogSink};
use etl::{
    DatasetPaths, LexiconClassifier, RateLimitedPlatform, RemoteClassifier, SentimentClassifier,
    VideoPlatform, YouTubeClient,
};
use std::sync::Arc;

pub struct PipelineContext {
    pub config: PipelineConfig,
    pub paths: DatasetPaths,
    platform: Option<Arc<dyn VideoPlatform>>,
    pub classifier: Arc<dyn SentimentClassifier>,
    pub sink: Arc<dyn CompletionSink>,
}

impl PipelineContext {
    pub fn new(
        config: PipelineConfig,
        platform: Option<Arc<dyn VideoPlatform>>,
        classifier: Arc<dyn SentimentClassifier>,
        sink: Arc<dyn CompletionSink>,
    ) -> Self {
        Self {
            paths: config.paths(),
            config,
            platform,
            classifier,
            sink,
        }
    }

    /// 按配置构建真实依赖：限流的 YouTube 客户端、远程或词典分类器、日志信号
    pub fn from_config(config: PipelineConfig) -> OrchestratorResult<Self> {
        let platform: Option<Arc<dyn VideoPlatform>> = match config.youtube.api_key {
            Some(_) => {
                let client = YouTubeClient::from_config(&config.youtube)?;
                Some(Arc::new(RateLimitedPlatform::new(
                    client,
                    config.youtube.requests_per_minute,
                )))
            }
            None => None,
        };

        let classifier: Arc<dyn SentimentClassifier> =
            match RemoteClassifier::from_config(&config.sentiment)? {
                Some(remote) => Arc::new(remote),
                None => Arc::new(LexiconClassifier::new()),
            };
        tracing::debug!("Using sentiment classifier {}", classifier.name());

        Ok(Self::new(config, platform, classifier, Arc::new(LogSink)))
    }

    /// 采集阶段需要的平台客户端
    pub fn platform(&self) -> OrchestratorResult<&dyn VideoPlatform> {
        self.platform.as_deref().ok_or_else(|| {
            OrchestratorError::Config(format!(
                "缺少 YouTube API key，请使用 --api-key 或环境变量 {}",
                crate::config::API_KEY_ENV
            ))
        })
    }
}
