//! 清洗阶段：类型规范化与简单派生特征

use crate::duration;
use crate::literal;
use crate::storage;
use crate::types::{
    CommentBundle, DatasetPaths, ETLError, ETLResult, MalformedFieldPolicy, RawCommentBundle,
    RawVideo, Video,
};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc, Weekday};

/// 清洗结果统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleaningSummary {
    pub videos: usize,
    pub comment_bundles: usize,
    /// 被标记为缺失的计数字段个数
    pub missing_counts: usize,
}

/// 将计数字段解析为非负整数；无法解析时为缺失（而不是 0）
pub fn parse_count(value: Option<&str>) -> Option<u64> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(n) = value.parse::<u64>() {
        return Some(n);
    }

    // 接受 "12.0" 这类整数值浮点
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
            Some(f as u64)
        }
        _ => None,
    }
}

/// 解析发布时间，统一为 UTC
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// 与区域设置无关的星期名称
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// 按周一到周日排列的星期名称
pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// 标签数：列表字面量的长度；非列表的非空字符串视为单个标签
pub fn tag_count(tags: Option<&str>) -> usize {
    match tags.map(str::trim) {
        None | Some("") => 0,
        Some(raw) => match literal::parse_list(raw) {
            Some(list) => list.len(),
            None => 1,
        },
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn malformed(
    policy: MalformedFieldPolicy,
    video_id: &str,
    field: &'static str,
    value: &str,
) -> ETLResult<()> {
    match policy {
        MalformedFieldPolicy::Fail => Err(ETLError::MalformedField {
            video_id: video_id.to_string(),
            field,
            value: value.to_string(),
        }),
        MalformedFieldPolicy::MarkMissing => {
            tracing::warn!(
                "Video {} has malformed {} {:?}, marking missing",
                video_id,
                field,
                value
            );
            Ok(())
        }
    }
}

/// 清洗单条视频记录
pub fn clean_video(raw: &RawVideo, policy: MalformedFieldPolicy) -> ETLResult<Video> {
    let counts = [
        ("viewCount", &raw.view_count),
        ("likeCount", &raw.like_count),
        ("favoriteCount", &raw.favorite_count),
        ("commentCount", &raw.comment_count),
    ];
    let mut parsed = [None; 4];
    for (slot, (field, value)) in parsed.iter_mut().zip(counts) {
        *slot = parse_count(value.as_deref());
        if slot.is_none() {
            if let Some(v) = non_empty(value) {
                tracing::warn!("Video {} has non-numeric {} {:?}", raw.video_id, field, v);
            }
        }
    }
    let [view_count, like_count, favorite_count, comment_count] = parsed;

    let published_at = match non_empty(&raw.published_at) {
        Some(value) => {
            let parsed = parse_timestamp(value);
            if parsed.is_none() {
                malformed(policy, &raw.video_id, "publishedAt", value)?;
            }
            parsed
        }
        None => None,
    };

    let duration_secs = match non_empty(&raw.duration) {
        Some(value) => {
            let parsed = duration::parse_iso8601(value);
            if parsed.is_none() {
                malformed(policy, &raw.video_id, "duration", value)?;
            }
            parsed
        }
        None => None,
    };

    Ok(Video {
        video_id: raw.video_id.clone(),
        channel_title: raw.channel_title.clone(),
        title: raw.title.clone(),
        description: raw.description.clone(),
        tags: raw.tags.clone(),
        published_at,
        view_count,
        like_count,
        favorite_count,
        comment_count,
        duration: raw.duration.clone(),
        definition: raw.definition.clone(),
        caption: raw.caption.clone(),
        publish_day_name: published_at.map(|dt| weekday_name(dt.weekday()).to_string()),
        duration_secs,
        tag_count: tag_count(raw.tags.as_deref()),
    })
}

/// 清洗全部视频，输出行数与输入相同
pub fn clean_videos(raw: &[RawVideo], policy: MalformedFieldPolicy) -> ETLResult<Vec<Video>> {
    raw.iter().map(|video| clean_video(video, policy)).collect()
}

/// 解析评论列表，格式错误时为空列表
pub fn clean_comments(raw: &[RawCommentBundle]) -> Vec<CommentBundle> {
    raw.iter()
        .map(|bundle| CommentBundle {
            video_id: bundle.video_id.clone(),
            comments: bundle
                .comments
                .as_deref()
                .map(literal::parse_list_or_empty)
                .unwrap_or_default(),
        })
        .collect()
}

/// 清洗器
pub struct Cleaner<'a> {
    paths: &'a DatasetPaths,
    policy: MalformedFieldPolicy,
}

impl<'a> Cleaner<'a> {
    pub fn new(paths: &'a DatasetPaths, policy: MalformedFieldPolicy) -> Self {
        Self { paths, policy }
    }

    pub fn run(&self) -> ETLResult<CleaningSummary> {
        tracing::info!("Began preprocessing videos");
        let raw_videos = storage::read_raw_videos(&self.paths.raw_videos)?;
        let videos = clean_videos(&raw_videos, self.policy)?;

        let missing_counts = videos
            .iter()
            .map(|v| {
                [v.view_count, v.like_count, v.favorite_count, v.comment_count]
                    .iter()
                    .filter(|c| c.is_none())
                    .count()
            })
            .sum();

        tracing::info!("Began preprocessing comments");
        let raw_comments = storage::read_raw_comments(&self.paths.raw_comments)?;
        let bundles = clean_comments(&raw_comments);

        storage::write_videos(&self.paths.pp_videos, &videos)?;
        storage::write_comment_bundles(&self.paths.pp_comments, &bundles)?;

        tracing::info!(
            "Preprocessed {} videos and {} comment bundles",
            videos.len(),
            bundles.len()
        );
        Ok(CleaningSummary {
            videos: videos.len(),
            comment_bundles: bundles.len(),
            missing_counts,
        })
    }
}
