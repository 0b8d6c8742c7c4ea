//! 数据增强：视频与评论连接、情感打分、缺失过滤

use crate::sentiment::{sentiment_ratio, SentimentClassifier};
use crate::types::{CommentBundle, EngagementSample, Video};
use std::collections::HashMap;

/// 连接后的视频（尚未过滤缺失值）
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredVideo {
    pub video: Video,
    pub sentiment_score: f64,
}

/// 增强统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentSummary {
    pub videos: usize,
    pub joined: usize,
    /// 因缺少点赞/播放/时长被丢弃的行
    pub dropped_missing: usize,
    pub samples: usize,
}

/// 数据增强器
pub struct DataEnricher<'a> {
    classifier: &'a dyn SentimentClassifier,
    max_chars: usize,
}

impl<'a> DataEnricher<'a> {
    pub fn new(classifier: &'a dyn SentimentClassifier, max_chars: usize) -> Self {
        Self {
            classifier,
            max_chars,
        }
    }

    /// 按 `video_id` 内连接，没有评论包的视频被丢弃
    ///
    /// 评论包中同一视频出现多次时取第一条。
    pub async fn join_with_sentiment(
        &self,
        videos: &[Video],
        bundles: &[CommentBundle],
    ) -> Vec<ScoredVideo> {
        let mut index: HashMap<&str, &CommentBundle> = HashMap::new();
        for bundle in bundles {
            index.entry(bundle.video_id.as_str()).or_insert(bundle);
        }

        let mut joined = Vec::new();
        for video in videos {
            let Some(bundle) = index.get(video.video_id.as_str()) else {
                tracing::debug!("Video {} has no comment bundle, dropped by join", video.video_id);
                continue;
            };

            let sentiment_score =
                sentiment_ratio(self.classifier, &bundle.comments, self.max_chars).await;

            joined.push(ScoredVideo {
                video: video.clone(),
                sentiment_score,
            });
        }

        joined
    }

    /// 连接、打分并丢弃缺少点赞/播放/时长的行
    pub async fn build_samples(
        &self,
        videos: &[Video],
        bundles: &[CommentBundle],
    ) -> (Vec<EngagementSample>, EnrichmentSummary) {
        tracing::info!(
            "Enriching {} videos with {} comment bundles",
            videos.len(),
            bundles.len()
        );

        let joined = self.join_with_sentiment(videos, bundles).await;
        let joined_count = joined.len();

        let samples: Vec<EngagementSample> = joined.into_iter().filter_map(to_sample).collect();

        let summary = EnrichmentSummary {
            videos: videos.len(),
            joined: joined_count,
            dropped_missing: joined_count - samples.len(),
            samples: samples.len(),
        };

        if summary.dropped_missing > 0 {
            tracing::info!(
                "Dropped {} rows missing likeCount, viewCount or durationSecs",
                summary.dropped_missing
            );
        }

        (samples, summary)
    }
}

fn to_sample(scored: ScoredVideo) -> Option<EngagementSample> {
    let video = scored.video;
    Some(EngagementSample {
        view_count: video.view_count?,
        duration_secs: video.duration_secs?,
        like_count: video.like_count?,
        tag_count: video.tag_count,
        sentiment_score: scored.sentiment_score,
        weekday: video.publish_day_name,
        video_id: video.video_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::{LexiconClassifier, NEUTRAL_SCORE};

    fn video(id: &str, likes: Option<u64>) -> Video {
        Video {
            video_id: id.to_string(),
            view_count: Some(1000),
            like_count: likes,
            duration_secs: Some(330),
            tag_count: 2,
            publish_day_name: Some("Monday".to_string()),
            ..Default::default()
        }
    }

    fn bundle(id: &str, comments: &[&str]) -> CommentBundle {
        CommentBundle {
            video_id: id.to_string(),
            comments: comments.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_inner_join_and_missing_filter() {
        let classifier = LexiconClassifier::new();
        let enricher = DataEnricher::new(&classifier, 512);

        let videos = vec![video("a", Some(10)), video("b", None), video("c", Some(5))];
        let bundles = vec![bundle("a", &["love it", "awful"]), bundle("b", &["great"])];

        let (samples, summary) = enricher.build_samples(&videos, &bundles).await;

        assert_eq!(summary.joined, 2);
        assert_eq!(summary.dropped_missing, 1);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].video_id, "a");
        assert!((samples[0].sentiment_score - 0.5).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_empty_comments_survive_join() {
        let classifier = LexiconClassifier::new();
        let enricher = DataEnricher::new(&classifier, 512);

        let (samples, _) = enricher
            .build_samples(&[video("a", Some(10))], &[bundle("a", &[])])
            .await;

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].sentiment_score, NEUTRAL_SCORE);
        assert_eq!(samples[0].weekday.as_deref(), Some("Monday"));
    }
}
