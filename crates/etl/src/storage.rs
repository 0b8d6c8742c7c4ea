//! 数据集存储
//!
//! 所有数据集都是带表头的逗号分隔文件。写入先落到同目录的临时文件，
//! 再原子地重命名到目标路径，下游永远不会读到写了一半的文件。

use crate::literal;
use crate::types::{
    CommentBundle, CommentBundleRow, ETLError, ETLResult, RawCommentBundle, RawVideo, Video,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// 数据集的行类型，表头与 serde 序列化出的字段名一致
pub trait CsvRecord: Serialize {
    const HEADER: &'static [&'static str];
}

const VIDEO_COLUMNS: [&str; 13] = [
    "video_id",
    "channelTitle",
    "title",
    "description",
    "tags",
    "publishedAt",
    "viewCount",
    "likeCount",
    "favoriteCount",
    "commentCount",
    "duration",
    "definition",
    "caption",
];

const CLEAN_VIDEO_COLUMNS: [&str; 16] = [
    "video_id",
    "channelTitle",
    "title",
    "description",
    "tags",
    "publishedAt",
    "viewCount",
    "likeCount",
    "favoriteCount",
    "commentCount",
    "duration",
    "definition",
    "caption",
    "publishDayName",
    "durationSecs",
    "tagCount",
];

impl CsvRecord for RawVideo {
    const HEADER: &'static [&'static str] = &VIDEO_COLUMNS;
}

impl CsvRecord for Video {
    const HEADER: &'static [&'static str] = &CLEAN_VIDEO_COLUMNS;
}

impl CsvRecord for RawCommentBundle {
    const HEADER: &'static [&'static str] = &["video_id", "comments"];
}

impl CsvRecord for CommentBundleRow {
    const HEADER: &'static [&'static str] = &["video_id", "comments", "extractedCommentCount"];
}

/// 读取整个 CSV 数据集
pub fn read_csv<T: DeserializeOwned>(path: &Path) -> ETLResult<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| ETLError::DataSource(format!("{}: {}", path.display(), e)))?;

    let rows = reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()?;

    tracing::debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// 原子地写入 CSV 数据集，没有行时也写出表头
pub fn write_csv<T: CsvRecord>(path: &Path, rows: &[T]) -> ETLResult<()> {
    write_atomic(path, |file| {
        let mut writer = csv::Writer::from_writer(file);
        if rows.is_empty() {
            writer.write_record(T::HEADER)?;
        }
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    })?;

    tracing::info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// 原子地写入任意字节
pub fn write_bytes(path: &Path, bytes: &[u8]) -> ETLResult<()> {
    write_atomic(path, |file| {
        file.write_all(bytes)?;
        Ok(())
    })
}

/// 写入同目录临时文件，刷盘后重命名到 `path`
pub fn write_atomic<F>(path: &Path, write: F) -> ETLResult<()>
where
    F: FnOnce(&mut NamedTempFile) -> ETLResult<()>,
{
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut file = NamedTempFile::new_in(parent)?;
    write(&mut file)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| ETLError::Io(e.error))?;
    Ok(())
}

pub fn read_raw_videos(path: &Path) -> ETLResult<Vec<RawVideo>> {
    read_csv(path)
}

pub fn write_raw_videos(path: &Path, videos: &[RawVideo]) -> ETLResult<()> {
    write_csv(path, videos)
}

pub fn read_raw_comments(path: &Path) -> ETLResult<Vec<RawCommentBundle>> {
    read_csv(path)
}

pub fn write_raw_comments(path: &Path, bundles: &[RawCommentBundle]) -> ETLResult<()> {
    write_csv(path, bundles)
}

pub fn read_videos(path: &Path) -> ETLResult<Vec<Video>> {
    read_csv(path)
}

pub fn write_videos(path: &Path, videos: &[Video]) -> ETLResult<()> {
    write_csv(path, videos)
}

/// 读取预处理评论包，评论字段解析失败时视为空列表
pub fn read_comment_bundles(path: &Path) -> ETLResult<Vec<CommentBundle>> {
    let rows: Vec<CommentBundleRow> = read_csv(path)?;
    Ok(rows
        .into_iter()
        .map(|row| CommentBundle {
            video_id: row.video_id,
            comments: row
                .comments
                .as_deref()
                .map(literal::parse_list_or_empty)
                .unwrap_or_default(),
        })
        .collect())
}

pub fn write_comment_bundles(path: &Path, bundles: &[CommentBundle]) -> ETLResult<()> {
    let rows: Vec<CommentBundleRow> = bundles
        .iter()
        .map(|bundle| CommentBundleRow {
            video_id: bundle.video_id.clone(),
            comments: Some(literal::format_list(&bundle.comments)),
            extracted_comment_count: bundle.extracted_comment_count(),
        })
        .collect();
    write_csv(path, &rows)
}
