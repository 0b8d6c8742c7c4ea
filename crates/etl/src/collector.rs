//! 采集阶段：分页获取视频 ID，批量拉取元数据和评论，写出原始数据集

use crate::literal;
use crate::scraper::VideoPlatform;
use crate::storage;
use crate::types::{DatasetPaths, ETLError, ETLResult, RawCommentBundle, RawVideo, YouTubeConfig};
use std::collections::HashSet;

/// 每批元数据请求的最大 ID 数（API 上限）
pub const DETAILS_BATCH_SIZE: usize = 50;

/// 采集结果统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionSummary {
    pub video_ids: usize,
    pub videos: usize,
    pub comment_bundles: usize,
    /// 评论获取失败（已记为空列表）的视频数
    pub comment_failures: usize,
}

/// 按游标分页获取播放列表中的全部视频 ID，任何错误都是致命的
pub async fn collect_video_ids(
    platform: &dyn VideoPlatform,
    playlist_id: &str,
    page_size: usize,
) -> ETLResult<Vec<String>> {
    let playlist_id = playlist_id.trim();
    if playlist_id.is_empty() || playlist_id.contains(char::is_whitespace) {
        return Err(ETLError::InvalidPlaylist(playlist_id.to_string()));
    }

    let mut video_ids = Vec::new();
    let mut page_token: Option<String> = None;
    let mut seen_tokens = HashSet::new();
    let mut pages = 0usize;

    loop {
        let page = platform
            .list_playlist_page(playlist_id, page_token.as_deref(), page_size)
            .await?;
        pages += 1;

        tracing::debug!("Playlist page {} returned {} ids", pages, page.video_ids.len());
        video_ids.extend(page.video_ids);

        match page.next_page_token {
            Some(token) => {
                if !seen_tokens.insert(token.clone()) {
                    return Err(ETLError::DataSource(format!(
                        "播放列表 {} 重复返回分页游标 {:?}",
                        playlist_id, token
                    )));
                }
                page_token = Some(token);
            }
            None => break,
        }
    }

    tracing::info!(
        "Retrieved {} video ids from {} in {} pages",
        video_ids.len(),
        platform.name(),
        pages
    );
    Ok(video_ids)
}

/// 每 50 个 ID 一次请求拉取元数据，缺失字段保持为空
pub async fn collect_video_details(
    platform: &dyn VideoPlatform,
    video_ids: &[String],
) -> ETLResult<Vec<RawVideo>> {
    let mut videos = Vec::with_capacity(video_ids.len());

    for chunk in video_ids.chunks(DETAILS_BATCH_SIZE) {
        let resources = platform.fetch_videos(chunk).await?;
        if resources.len() < chunk.len() {
            tracing::warn!(
                "Requested {} videos, platform returned {}",
                chunk.len(),
                resources.len()
            );
        }
        videos.extend(resources.into_iter().map(RawVideo::from));
    }

    tracing::info!("Fetched details for {} videos", videos.len());
    Ok(videos)
}

/// 逐个拉取每个视频的评论；单个视频失败记为空列表，不影响其他视频
///
/// 输出顺序与 `video_ids` 一致。
pub async fn collect_comments(
    platform: &dyn VideoPlatform,
    video_ids: &[String],
    max_comments: usize,
) -> (Vec<RawCommentBundle>, usize) {
    let mut bundles = Vec::with_capacity(video_ids.len());
    let mut failures = 0usize;

    for video_id in video_ids {
        let comments = match platform.fetch_top_comments(video_id, max_comments).await {
            Ok(mut comments) => {
                comments.truncate(max_comments);
                comments
            }
            Err(e) => {
                tracing::warn!(
                    "Comments disabled or unavailable for video {}: {}",
                    video_id,
                    e
                );
                failures += 1;
                Vec::new()
            }
        };

        bundles.push(RawCommentBundle {
            video_id: video_id.clone(),
            comments: Some(literal::format_list(&comments)),
        });
    }

    (bundles, failures)
}

/// 采集器
pub struct Collector<'a> {
    platform: &'a dyn VideoPlatform,
    config: &'a YouTubeConfig,
    paths: &'a DatasetPaths,
}

impl<'a> Collector<'a> {
    pub fn new(
        platform: &'a dyn VideoPlatform,
        config: &'a YouTubeConfig,
        paths: &'a DatasetPaths,
    ) -> Self {
        Self {
            platform,
            config,
            paths,
        }
    }

    /// 完整的采集流程，成功后写出原始视频和原始评论数据集
    pub async fn run(&self) -> ETLResult<CollectionSummary> {
        tracing::info!("Getting video ids for playlist {}", self.config.playlist_id);
        let video_ids =
            collect_video_ids(self.platform, &self.config.playlist_id, self.config.page_size)
                .await?;

        tracing::info!("Getting video details");
        let videos = collect_video_details(self.platform, &video_ids).await?;

        tracing::info!("Getting comments");
        let (bundles, comment_failures) =
            collect_comments(self.platform, &video_ids, self.config.max_comments).await;

        storage::write_raw_videos(&self.paths.raw_videos, &videos)?;
        storage::write_raw_comments(&self.paths.raw_comments, &bundles)?;

        Ok(CollectionSummary {
            video_ids: video_ids.len(),
            videos: videos.len(),
            comment_bundles: bundles.len(),
            comment_failures,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::scraper::youtube::{VideoContentDetails, VideoResource, VideoSnippet, VideoStatistics};
    use crate::scraper::PlaylistPage;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// 内存中的假平台
    #[derive(Default)]
    pub(crate) struct FakePlatform {
        pub pages: HashMap<Option<String>, PlaylistPage>,
        pub videos: HashMap<String, VideoResource>,
        pub comments: HashMap<String, Vec<String>>,
        pub detail_requests: Mutex<Vec<usize>>,
    }

    impl FakePlatform {
        /// 单页播放列表，每个视频都有完整元数据和两条评论
        pub(crate) fn with_videos(ids: &[&str]) -> Self {
            let mut platform = FakePlatform::default();
            platform.pages.insert(
                None,
                PlaylistPage {
                    video_ids: ids.iter().map(|s| s.to_string()).collect(),
                    next_page_token: None,
                },
            );
            for (i, id) in ids.iter().enumerate() {
                platform.videos.insert(id.to_string(), sample_resource(id, i as u64));
                platform.comments.insert(
                    id.to_string(),
                    vec![format!("great video {}", id), "thanks!".to_string()],
                );
            }
            platform
        }
    }

    pub(crate) fn sample_resource(id: &str, n: u64) -> VideoResource {
        VideoResource {
            id: id.to_string(),
            snippet: Some(VideoSnippet {
                channel_title: Some("Channel".to_string()),
                title: Some(format!("Video {}", id)),
                description: Some("desc".to_string()),
                tags: Some(vec!["rust".to_string(), "data".to_string()]),
                published_at: Some(format!("2024-03-{:02}T10:00:00Z", 4 + n % 7)),
            }),
            content_details: Some(VideoContentDetails {
                duration: Some("PT5M30S".to_string()),
                definition: Some("hd".to_string()),
                caption: Some("false".to_string()),
            }),
            statistics: Some(VideoStatistics {
                view_count: Some((1000 * (n + 1)).to_string()),
                like_count: Some((50 * (n + 1)).to_string()),
                favorite_count: Some("0".to_string()),
                comment_count: Some("2".to_string()),
            }),
        }
    }

    #[async_trait]
    impl VideoPlatform for FakePlatform {
        fn name(&self) -> &str {
            "fake"
        }

        async fn list_playlist_page(
            &self,
            _playlist_id: &str,
            page_token: Option<&str>,
            _page_size: usize,
        ) -> ETLResult<PlaylistPage> {
            self.pages
                .get(&page_token.map(str::to_string))
                .cloned()
                .ok_or_else(|| ETLError::DataSource("unknown page".to_string()))
        }

        async fn fetch_videos(&self, video_ids: &[String]) -> ETLResult<Vec<VideoResource>> {
            self.detail_requests.lock().unwrap().push(video_ids.len());
            Ok(video_ids
                .iter()
                .filter_map(|id| self.videos.get(id).cloned())
                .collect())
        }

        async fn fetch_top_comments(&self, video_id: &str, _max: usize) -> ETLResult<Vec<String>> {
            self.comments
                .get(video_id)
                .cloned()
                .ok_or_else(|| ETLError::DataSource("commentsDisabled".to_string()))
        }
    }

    #[tokio::test]
    async fn test_pagination_follows_cursor() {
        let mut platform = FakePlatform::default();
        platform.pages.insert(
            None,
            PlaylistPage {
                video_ids: vec!["a".into(), "b".into()],
                next_page_token: Some("p2".into()),
            },
        );
        platform.pages.insert(
            Some("p2".into()),
            PlaylistPage {
                video_ids: vec!["c".into()],
                next_page_token: None,
            },
        );

        let ids = collect_video_ids(&platform, "UU123", 50).await.unwrap();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_repeated_page_token_is_fatal() {
        let mut platform = FakePlatform::default();
        platform.pages.insert(
            None,
            PlaylistPage {
                video_ids: vec!["a".into()],
                next_page_token: Some("p2".into()),
            },
        );
        platform.pages.insert(
            Some("p2".into()),
            PlaylistPage {
                video_ids: vec!["b".into()],
                next_page_token: Some("p2".into()),
            },
        );

        assert!(matches!(
            collect_video_ids(&platform, "UU123", 50).await,
            Err(ETLError::DataSource(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_playlist_is_fatal() {
        let platform = FakePlatform::default();
        assert!(matches!(
            collect_video_ids(&platform, "  ", 50).await,
            Err(ETLError::InvalidPlaylist(_))
        ));
        // 未知页同样终止运行
        assert!(collect_video_ids(&platform, "UU123", 50).await.is_err());
    }

    #[tokio::test]
    async fn test_details_are_batched_by_fifty() {
        let ids: Vec<String> = (0..120).map(|i| format!("v{}", i)).collect();
        let mut platform = FakePlatform::default();
        for (i, id) in ids.iter().enumerate() {
            platform.videos.insert(id.clone(), sample_resource(id, i as u64));
        }

        let videos = collect_video_details(&platform, &ids).await.unwrap();

        assert_eq!(videos.len(), 120);
        assert_eq!(*platform.detail_requests.lock().unwrap(), vec![50, 50, 20]);
    }

    #[tokio::test]
    async fn test_comment_failure_records_empty_list() {
        let mut platform = FakePlatform::with_videos(&["a", "b"]);
        platform.comments.remove("b");
        platform
            .comments
            .insert("a".into(), (0..15).map(|i| format!("c{}", i)).collect());

        let ids = vec!["a".to_string(), "b".to_string()];
        let (bundles, failures) = collect_comments(&platform, &ids, 10).await;

        assert_eq!(failures, 1);
        assert_eq!(bundles.len(), 2);
        let first = literal::parse_list(bundles[0].comments.as_deref().unwrap()).unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(bundles[1].comments.as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_three_videos_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DatasetPaths::rooted_at(dir.path());
        let config = YouTubeConfig::default();
        let platform = FakePlatform::with_videos(&["a", "b", "c"]);

        let summary = Collector::new(&platform, &config, &paths).run().await.unwrap();

        assert_eq!(summary.videos, 3);
        assert_eq!(summary.comment_bundles, 3);
        assert_eq!(summary.comment_failures, 0);

        let videos = storage::read_raw_videos(&paths.raw_videos).unwrap();
        let bundles = storage::read_raw_comments(&paths.raw_comments).unwrap();
        assert_eq!(videos.len(), 3);
        assert_eq!(bundles.len(), 3);
        assert!(bundles.iter().all(|b| {
            literal::parse_list(b.comments.as_deref().unwrap()).unwrap().len() == 2
        }));
    }

    #[tokio::test]
    async fn test_empty_playlist_writes_headers() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DatasetPaths::rooted_at(dir.path());
        let config = YouTubeConfig::default();
        let platform = FakePlatform::with_videos(&[]);

        let summary = Collector::new(&platform, &config, &paths).run().await.unwrap();
        assert_eq!(summary.videos, 0);

        let videos = std::fs::read_to_string(&paths.raw_videos).unwrap();
        let comments = std::fs::read_to_string(&paths.raw_comments).unwrap();
        assert!(videos.starts_with("video_id,channelTitle,"));
        assert_eq!(comments.trim_end(), "video_id,comments");
        assert!(storage::read_raw_videos(&paths.raw_videos).unwrap().is_empty());
    }
}
