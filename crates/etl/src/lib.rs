//! # ETL - Extract, Transform, Load
//!
//! YouTube 频道数据的采集、清洗与可视化
//!
//! ## 功能
//!
//! - 分页采集播放列表视频、元数据与热门评论
//! - 清洗计数、时长、发布时间并派生特征
//! - 评论情感打分与数据增强
//! - CSV 持久化（原子写入）
//! - 探索性图表

pub mod types;
pub mod literal;
pub mod duration;
pub mod storage;
pub mod scraper;
pub mod sentiment;
pub mod collector;
pub mod cleaning;
pub mod enrichment;
pub mod plots;

pub use cleaning::{Cleaner, CleaningSummary};
pub use collector::{CollectionSummary, Collector};
pub use enrichment::{DataEnricher, EnrichmentSummary};
pub use plots::Visualizer;
pub use scraper::{youtube::YouTubeClient, RateLimitedPlatform, VideoPlatform};
pub use sentiment::{LexiconClassifier, RemoteClassifier, SentimentClassifier};
pub use types::{
    Classification, CommentBundle, DatasetPaths, ETLError, ETLResult, EngagementSample,
    MalformedFieldPolicy, RawCommentBundle, RawVideo, SentimentConfig, SentimentLabel, Video,
    YouTubeConfig,
};
