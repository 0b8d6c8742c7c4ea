//! 视频平台数据 API 接入

pub mod youtube;

use crate::types::ETLResult;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;

/// 播放列表的一页
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaylistPage {
    pub video_ids: Vec<String>,
    /// 续页游标，`None` 表示最后一页
    pub next_page_token: Option<String>,
}

/// 视频平台数据 API 接口
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    /// 平台名称，用于日志
    fn name(&self) -> &str;

    /// 拉取播放列表的一页视频 ID
    async fn list_playlist_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
        page_size: usize,
    ) -> ETLResult<PlaylistPage>;

    /// 一次请求拉取一批（最多 50 个）视频的元数据
    async fn fetch_videos(&self, video_ids: &[String]) -> ETLResult<Vec<youtube::VideoResource>>;

    /// 拉取视频的顶层评论文本
    async fn fetch_top_comments(&self, video_id: &str, max: usize) -> ETLResult<Vec<String>>;
}

type DirectLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// 限流包装器
pub struct RateLimitedPlatform<P: VideoPlatform> {
    platform: P,
    rate_limiter: Arc<DirectLimiter>,
}

impl<P: VideoPlatform> RateLimitedPlatform<P> {
    pub fn new(platform: P, requests_per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(requests_per_minute).unwrap_or(nonzero!(60u32));
        let quota = Quota::per_minute(per_minute);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Self {
            platform,
            rate_limiter,
        }
    }

    async fn wait_for_permit(&self) {
        self.rate_limiter.until_ready().await;
    }
}

#[async_trait]
impl<P: VideoPlatform> VideoPlatform for RateLimitedPlatform<P> {
    fn name(&self) -> &str {
        self.platform.name()
    }

    async fn list_playlist_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
        page_size: usize,
    ) -> ETLResult<PlaylistPage> {
        self.wait_for_permit().await;
        self.platform
            .list_playlist_page(playlist_id, page_token, page_size)
            .await
    }

    async fn fetch_videos(&self, video_ids: &[String]) -> ETLResult<Vec<youtube::VideoResource>> {
        self.wait_for_permit().await;
        self.platform.fetch_videos(video_ids).await
    }

    async fn fetch_top_comments(&self, video_id: &str, max: usize) -> ETLResult<Vec<String>> {
        self.wait_for_permit().await;
        self.platform.fetch_top_comments(video_id, max).await
    }
}

/// 通用 HTTP 客户端配置
pub fn create_http_client(timeout_secs: u64) -> ETLResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("yt-analytics/0.1")
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(Into::into)
}
