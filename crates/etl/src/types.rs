//! 核心类型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type ETLResult<T> = Result<T, ETLError>;

#[derive(Debug, Error)]
pub enum ETLError {
    #[error("HTTP 请求失败: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("JSON 解析失败: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("CSV 读写失败: {0}")]
    Csv(#[from] csv::Error),

    #[error("数据源错误: {0}")]
    DataSource(String),

    #[error("无效的播放列表 ID: {0:?}")]
    InvalidPlaylist(String),

    #[error("视频 {video_id} 的字段 {field} 无法解析: {value:?}")]
    MalformedField {
        video_id: String,
        field: &'static str,
        value: String,
    },

    #[error("情感分类失败: {0}")]
    Classifier(String),

    #[error("绘图失败: {0}")]
    Plot(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 原始视频记录（采集阶段输出，所有值保持 API 返回的字符串形式）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawVideo {
    pub video_id: String,
    #[serde(rename = "channelTitle")]
    pub channel_title: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// 列表字面量，例如 `['a', 'b']`
    pub tags: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
    #[serde(rename = "viewCount")]
    pub view_count: Option<String>,
    #[serde(rename = "likeCount")]
    pub like_count: Option<String>,
    #[serde(rename = "favoriteCount")]
    pub favorite_count: Option<String>,
    #[serde(rename = "commentCount")]
    pub comment_count: Option<String>,
    pub duration: Option<String>,
    pub definition: Option<String>,
    pub caption: Option<String>,
}

/// 原始评论包
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCommentBundle {
    pub video_id: String,
    /// 列表字面量，最多 10 条顶层评论
    pub comments: Option<String>,
}

/// 预处理后的视频记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub video_id: String,
    #[serde(rename = "channelTitle")]
    pub channel_title: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(rename = "viewCount")]
    pub view_count: Option<u64>,
    #[serde(rename = "likeCount")]
    pub like_count: Option<u64>,
    #[serde(rename = "favoriteCount")]
    pub favorite_count: Option<u64>,
    /// 平台报告的评论数
    #[serde(rename = "commentCount")]
    pub comment_count: Option<u64>,
    pub duration: Option<String>,
    pub definition: Option<String>,
    pub caption: Option<String>,
    #[serde(rename = "publishDayName")]
    pub publish_day_name: Option<String>,
    #[serde(rename = "durationSecs")]
    pub duration_secs: Option<u64>,
    #[serde(rename = "tagCount")]
    pub tag_count: usize,
}

/// 预处理后的评论包
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentBundle {
    pub video_id: String,
    pub comments: Vec<String>,
}

impl CommentBundle {
    /// 采样得到的评论数，与平台报告的 `commentCount` 相互独立
    pub fn extracted_comment_count(&self) -> usize {
        self.comments.len()
    }
}

/// 预处理评论包在 CSV 中的行格式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CommentBundleRow {
    pub video_id: String,
    pub comments: Option<String>,
    #[serde(rename = "extractedCommentCount")]
    pub extracted_comment_count: usize,
}

/// 单条文本的分类结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: SentimentLabel,
    pub score: f64,
}

/// 二分类情感标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
}

impl SentimentLabel {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_uppercase().as_str() {
            "POSITIVE" | "POS" | "LABEL_1" => Some(SentimentLabel::Positive),
            "NEGATIVE" | "NEG" | "LABEL_0" => Some(SentimentLabel::Negative),
            _ => None,
        }
    }
}

/// 训练样本（连接、情感打分、缺失过滤之后）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementSample {
    pub video_id: String,
    pub view_count: u64,
    pub duration_secs: u64,
    pub tag_count: usize,
    pub sentiment_score: f64,
    pub weekday: Option<String>,
    /// 目标值
    pub like_count: u64,
}

/// 字段无法解析时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedFieldPolicy {
    /// 整个运行失败
    #[default]
    Fail,
    /// 字段标记为缺失，保留该行
    MarkMissing,
}

/// 数据集路径配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetPaths {
    pub base_dir: PathBuf,
    pub raw_videos: PathBuf,
    pub raw_comments: PathBuf,
    pub pp_videos: PathBuf,
    pub pp_comments: PathBuf,
    pub plots_dir: PathBuf,
    pub model: PathBuf,
    pub report: PathBuf,
    pub fingerprints: PathBuf,
}

impl DatasetPaths {
    /// 以 `base_dir` 为根的默认布局
    pub fn rooted_at(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let data = base_dir.join("data");
        Self {
            raw_videos: data.join("video_data.csv"),
            raw_comments: data.join("comment_data.csv"),
            pp_videos: data.join("pp_video_data.csv"),
            pp_comments: data.join("pp_comment_data.csv"),
            plots_dir: base_dir.join("plots"),
            model: base_dir.join("models").join("like_count_forest.bin"),
            report: base_dir.join("models").join("like_count_report.json"),
            fingerprints: data.join(".fingerprints.json"),
            base_dir,
        }
    }

    /// 采集阶段的输出
    pub fn raw(&self) -> [&Path; 2] {
        [&self.raw_videos, &self.raw_comments]
    }

    /// 清洗阶段的输出
    pub fn preprocessed(&self) -> [&Path; 2] {
        [&self.pp_videos, &self.pp_comments]
    }
}

impl Default for DatasetPaths {
    fn default() -> Self {
        Self::rooted_at(".")
    }
}

/// YouTube 数据 API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YouTubeConfig {
    pub api_base_url: String,
    pub api_key: Option<String>,
    /// 频道上传列表 ID
    pub playlist_id: String,
    pub page_size: usize,
    pub max_comments: usize,
    pub requests_per_minute: u32,
    pub request_timeout_secs: u64,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            api_key: None,
            playlist_id: "UUoOae5nYA7VqaXzerajD0lg".to_string(),
            page_size: 50,
            max_comments: 10,
            requests_per_minute: 600,
            request_timeout_secs: 30,
        }
    }
}

/// 情感分类器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    /// 远程推理端点，为空时使用本地词典分类器
    pub endpoint: Option<String>,
    pub api_token: Option<String>,
    /// 每条评论截断的字符数
    pub max_chars: usize,
    pub request_timeout_secs: u64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_token: None,
            max_chars: 512,
            request_timeout_secs: 60,
        }
    }
}
