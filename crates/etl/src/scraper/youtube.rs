//! YouTube Data API v3 客户端

use super::{create_http_client, PlaylistPage, VideoPlatform};
use crate::literal;
use crate::types::{ETLError, ETLResult, RawVideo, YouTubeConfig};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    content_details: PlaylistItemContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemContentDetails {
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoResource>,
}

/// 视频资源，缺失的分组或字段都反序列化为 `None`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResource {
    pub id: String,
    #[serde(default)]
    pub snippet: Option<VideoSnippet>,
    #[serde(default)]
    pub content_details: Option<VideoContentDetails>,
    #[serde(default)]
    pub statistics: Option<VideoStatistics>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub channel_title: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoContentDetails {
    pub duration: Option<String>,
    pub definition: Option<String>,
    pub caption: Option<String>,
}

/// 统计值在 API 中以字符串返回
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    pub view_count: Option<String>,
    pub like_count: Option<String>,
    pub favorite_count: Option<String>,
    pub comment_count: Option<String>,
}

impl From<VideoResource> for RawVideo {
    fn from(video: VideoResource) -> Self {
        let snippet = video.snippet.unwrap_or_default();
        let details = video.content_details.unwrap_or_default();
        let stats = video.statistics.unwrap_or_default();

        RawVideo {
            video_id: video.id,
            channel_title: snippet.channel_title,
            title: snippet.title,
            description: snippet.description,
            tags: snippet.tags.map(|tags| literal::format_list(&tags)),
            published_at: snippet.published_at,
            view_count: stats.view_count,
            like_count: stats.like_count,
            favorite_count: stats.favorite_count,
            comment_count: stats.comment_count,
            duration: details.duration,
            definition: details.definition,
            caption: details.caption,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommentThreadsResponse {
    #[serde(default)]
    items: Vec<CommentThread>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThread {
    snippet: CommentThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadSnippet {
    top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    text_original: String,
}

pub struct YouTubeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl YouTubeClient {
    pub fn new(base_url: String, api_key: String, timeout_secs: u64) -> ETLResult<Self> {
        Ok(Self {
            client: create_http_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &YouTubeConfig) -> ETLResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ETLError::DataSource("YouTube API key is not configured".to_string()))?;

        Self::new(
            config.api_base_url.clone(),
            api_key,
            config.request_timeout_secs,
        )
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        resource: &str,
        query: &[(&str, &str)],
    ) -> ETLResult<T> {
        let url = format!("{}/{}", self.base_url, resource);
        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}

#[async_trait]
impl VideoPlatform for YouTubeClient {
    fn name(&self) -> &str {
        "YouTube"
    }

    async fn list_playlist_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
        page_size: usize,
    ) -> ETLResult<PlaylistPage> {
        let max_results = page_size.to_string();
        let mut query = vec![
            ("part", "contentDetails"),
            ("playlistId", playlist_id),
            ("maxResults", max_results.as_str()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response: PlaylistItemsResponse = self.get("playlistItems", &query).await?;

        Ok(PlaylistPage {
            video_ids: response
                .items
                .into_iter()
                .map(|item| item.content_details.video_id)
                .collect(),
            next_page_token: response.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn fetch_videos(&self, video_ids: &[String]) -> ETLResult<Vec<VideoResource>> {
        let ids = video_ids.join(",");
        let query = [
            ("part", "snippet,contentDetails,statistics"),
            ("id", ids.as_str()),
        ];

        let response: VideoListResponse = self.get("videos", &query).await?;
        Ok(response.items)
    }

    async fn fetch_top_comments(&self, video_id: &str, max: usize) -> ETLResult<Vec<String>> {
        let max_results = max.to_string();
        let query = [
            ("part", "snippet"),
            ("videoId", video_id),
            ("maxResults", max_results.as_str()),
            ("textFormat", "plainText"),
        ];

        let response: CommentThreadsResponse = self.get("commentThreads", &query).await?;
        Ok(response
            .items
            .into_iter()
            .take(max)
            .map(|thread| thread.snippet.top_level_comment.snippet.text_original)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_resource_with_missing_sections() {
        let json = r#"{
            "items": [
                {
                    "id": "abc",
                    "snippet": {"title": "Hello", "tags": ["a", "b"], "publishedAt": "2024-03-04T10:00:00Z"},
                    "statistics": {"viewCount": "100"}
                },
                {"id": "def"}
            ]
        }"#;

        let response: VideoListResponse = serde_json::from_str(json).unwrap();
        let raw: Vec<RawVideo> = response.items.into_iter().map(RawVideo::from).collect();

        assert_eq!(raw[0].title.as_deref(), Some("Hello"));
        assert_eq!(raw[0].tags.as_deref(), Some("['a', 'b']"));
        assert_eq!(raw[0].view_count.as_deref(), Some("100"));
        assert_eq!(raw[0].like_count, None);
        assert_eq!(raw[0].duration, None);
        assert_eq!(raw[1], RawVideo { video_id: "def".to_string(), ..Default::default() });
    }

    #[test]
    fn test_playlist_page_decoding() {
        let json = r#"{
            "items": [
                {"contentDetails": {"videoId": "v1"}},
                {"contentDetails": {"videoId": "v2"}}
            ],
            "nextPageToken": "CAIQAA"
        }"#;

        let response: PlaylistItemsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.items.len(), 2);
        assert_eq!(response.next_page_token.as_deref(), Some("CAIQAA"));
    }

    #[test]
    fn test_comment_thread_decoding() {
        let json = r#"{
            "items": [
                {"snippet": {"topLevelComment": {"snippet": {"textOriginal": "first!"}}}}
            ]
        }"#;

        let response: CommentThreadsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.items[0].snippet.top_level_comment.snippet.text_original, "first!");
    }
}
