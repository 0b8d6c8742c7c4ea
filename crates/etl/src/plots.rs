//! 探索性图表
//!
//! 数据准备都是纯函数，渲染只负责把准备好的数据画到 PNG 上。

use crate::cleaning::WEEKDAYS;
use crate::storage;
use crate::types::{DatasetPaths, ETLError, ETLResult, Video};
use plotters::coord::Shift;
use plotters::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

pub const TOP_N: usize = 9;
pub const DURATION_BINS: usize = 30;
const MAX_CLOUD_WORDS: usize = 120;

/// 英文停用词
pub const STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

fn plot_err<E: std::fmt::Display>(e: E) -> ETLError {
    ETLError::Plot(e.to_string())
}

/// 按播放量排序取前 n 个（标题, 播放量），缺少播放量的视频不参与
pub fn top_by_views(videos: &[Video], n: usize, descending: bool) -> Vec<(String, u64)> {
    let mut ranked: Vec<(String, u64)> = videos
        .iter()
        .filter_map(|v| {
            let views = v.view_count?;
            let title = v.title.clone().unwrap_or_else(|| v.video_id.clone());
            Some((title, views))
        })
        .collect();

    if descending {
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
    } else {
        ranked.sort_by(|a, b| a.1.cmp(&b.1));
    }
    ranked.truncate(n);
    ranked
}

/// 各频道的播放量分布
pub fn views_by_channel(videos: &[Video]) -> BTreeMap<String, Vec<f64>> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for video in videos {
        if let Some(views) = video.view_count {
            let channel = video.channel_title.clone().unwrap_or_else(|| "unknown".to_string());
            groups.entry(channel).or_default().push(views as f64);
        }
    }
    groups
}

/// 取两个字段都存在的 (x, y) 点
pub fn scatter_points(
    videos: &[Video],
    x: impl Fn(&Video) -> Option<u64>,
    y: impl Fn(&Video) -> Option<u64>,
) -> Vec<(f64, f64)> {
    videos
        .iter()
        .filter_map(|v| Some((x(v)? as f64, y(v)? as f64)))
        .collect()
}

/// 等宽分箱：(下界, 上界, 计数)
pub fn histogram(values: &[f64], bins: usize) -> Vec<(f64, f64, usize)> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let width = if max > min { (max - min) / bins as f64 } else { 1.0 };

    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, c)| (min + i as f64 * width, min + (i + 1) as f64 * width, c))
        .collect()
}

/// 标题词频（去除停用词，忽略大小写比较），按频次降序、词典序升序
pub fn title_word_frequencies(videos: &[Video]) -> Vec<(String, usize)> {
    let stopwords: HashSet<&str> = STOPWORDS.iter().copied().collect();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for title in videos.iter().filter_map(|v| v.title.as_deref()) {
        for word in title.split_whitespace() {
            let word = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'');
            if word.is_empty() || stopwords.contains(word.to_lowercase().as_str()) {
                continue;
            }
            *counts.entry(word.to_string()).or_default() += 1;
        }
    }

    let mut freqs: Vec<(String, usize)> = counts.into_iter().collect();
    freqs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    freqs
}

/// 按周一到周日统计发布数
pub fn weekday_counts(videos: &[Video]) -> Vec<(&'static str, usize)> {
    WEEKDAYS
        .iter()
        .map(|&day| {
            let count = videos
                .iter()
                .filter(|v| v.publish_day_name.as_deref() == Some(day))
                .count();
            (day, count)
        })
        .collect()
}

fn format_thousands(value: f64) -> String {
    if value.abs() >= 1000.0 {
        format!("{}K", (value / 1000.0) as i64)
    } else {
        format!("{}", value as i64)
    }
}

fn draw_bar_chart(
    path: &Path,
    caption: &str,
    labels: &[String],
    values: &[f64],
    y_desc: &str,
) -> ETLResult<()> {
    let root = BitMapBackend::new(path, (1280, 900)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let max = values.iter().cloned().fold(0.0, f64::max).max(1.0);
    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(260)
        .y_label_area_size(90)
        .build_cartesian_2d((0..labels.len()).into_segmented(), 0f64..max * 1.1)
        .map_err(plot_err)?;

    let label_formatter = |x: &SegmentValue<usize>| match x {
        SegmentValue::CenterOf(i) => labels
            .get(*i)
            .map(|l| l.chars().take(40).collect::<String>())
            .unwrap_or_default(),
        _ => String::new(),
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&label_formatter)
        .x_label_style(
            ("sans-serif", 14)
                .into_font()
                .transform(FontTransform::Rotate90),
        )
        .y_desc(y_desc)
        .y_label_formatter(&|y: &f64| format_thousands(*y))
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style(BLUE.mix(0.7).filled())
                .margin(12)
                .data(values.iter().enumerate().map(|(i, v)| (i, *v))),
        )
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

fn draw_channel_boxplot(path: &Path, groups: &BTreeMap<String, Vec<f64>>) -> ETLResult<()> {
    let root = BitMapBackend::new(path, (1280, 800)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let channels: Vec<&String> = groups.keys().collect();
    let max = groups
        .values()
        .flat_map(|v| v.iter().cloned())
        .fold(0.0, f64::max)
        .max(1.0) as f32;

    let mut chart = ChartBuilder::on(&root)
        .caption("View count distribution by channel", ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d((0..channels.len()).into_segmented(), 0f32..max * 1.1)
        .map_err(plot_err)?;

    let label_formatter = |x: &SegmentValue<usize>| match x {
        SegmentValue::CenterOf(i) => channels.get(*i).map(|c| c.to_string()).unwrap_or_default(),
        _ => String::new(),
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(channels.len())
        .x_label_formatter(&label_formatter)
        .y_desc("viewCount")
        .y_label_formatter(&|y: &f32| format_thousands(*y as f64))
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(groups.values().enumerate().map(|(i, values)| {
            let quartiles = Quartiles::new(values);
            Boxplot::new_vertical(SegmentValue::CenterOf(i), &quartiles)
                .width(40)
                .style(BLUE)
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

fn draw_scatter_panel(
    area: &DrawingArea<BitMapBackend, Shift>,
    caption: &str,
    x_desc: &str,
    points: &[(f64, f64)],
) -> ETLResult<()> {
    let max_x = points.iter().map(|p| p.0).fold(0.0, f64::max).max(1.0);
    let max_y = points.iter().map(|p| p.1).fold(0.0, f64::max).max(1.0);

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(0f64..max_x * 1.05, 0f64..max_y * 1.05)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc("viewCount")
        .x_label_formatter(&|x: &f64| format_thousands(*x))
        .y_label_formatter(&|y: &f64| format_thousands(*y))
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 4, BLUE.mix(0.6).filled())),
        )
        .map_err(plot_err)?;
    Ok(())
}

fn draw_scatter_plots(
    path: &Path,
    comments: &[(f64, f64)],
    likes: &[(f64, f64)],
) -> ETLResult<()> {
    let root = BitMapBackend::new(path, (1200, 500)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let (left, right) = root.split_horizontally(600);
    draw_scatter_panel(&left, "commentCount vs viewCount", "commentCount", comments)?;
    draw_scatter_panel(&right, "likeCount vs viewCount", "likeCount", likes)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

fn draw_histogram(path: &Path, bins: &[(f64, f64, usize)]) -> ETLResult<()> {
    let root = BitMapBackend::new(path, (1000, 700)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let x_min = bins.first().map(|b| b.0).unwrap_or(0.0);
    let x_max = bins.last().map(|b| b.1).unwrap_or(1.0);
    let y_max = bins.iter().map(|b| b.2).max().unwrap_or(1).max(1) as f64;

    let mut chart = ChartBuilder::on(&root)
        .caption("Duration distribution", ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, 0f64..y_max * 1.1)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("durationSecs")
        .y_desc("Count")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(bins.iter().map(|&(lo, hi, count)| {
            Rectangle::new([(lo, 0.0), (hi, count as f64)], BLUE.mix(0.7).filled())
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

const CLOUD_PALETTE: [RGBColor; 6] = [
    RGBColor(68, 1, 84),
    RGBColor(59, 82, 139),
    RGBColor(33, 145, 140),
    RGBColor(94, 201, 98),
    RGBColor(253, 231, 37),
    RGBColor(144, 215, 67),
];

/// 词云：按词频缩放字号，逐行排布
fn draw_word_cloud(path: &Path, freqs: &[(String, usize)]) -> ETLResult<()> {
    const WIDTH: u32 = 2000;
    const HEIGHT: u32 = 1000;

    let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&BLACK).map_err(plot_err)?;

    let max_freq = freqs.first().map(|f| f.1).unwrap_or(1).max(1) as f64;
    let mut rng = StdRng::seed_from_u64(1);

    let (mut x, mut y, mut row_height) = (20i32, 20i32, 0i32);
    for (word, freq) in freqs.iter().take(MAX_CLOUD_WORDS) {
        let size = 18.0 + 110.0 * (*freq as f64 / max_freq).sqrt();
        let word_width = (word.chars().count() as f64 * size * 0.6) as i32 + 24;

        if x + word_width > WIDTH as i32 {
            x = 20;
            y += row_height;
            row_height = 0;
        }
        if y + size as i32 > HEIGHT as i32 {
            break;
        }

        let color = CLOUD_PALETTE[rng.gen_range(0..CLOUD_PALETTE.len())];
        root.draw(&Text::new(
            word.clone(),
            (x, y),
            ("sans-serif", size).into_font().color(&color),
        ))
        .map_err(plot_err)?;

        x += word_width;
        row_height = row_height.max(size as i32 + 10);
    }

    root.present().map_err(plot_err)?;
    Ok(())
}

/// 可视化器
pub struct Visualizer<'a> {
    paths: &'a DatasetPaths,
}

impl<'a> Visualizer<'a> {
    pub fn new(paths: &'a DatasetPaths) -> Self {
        Self { paths }
    }

    /// 读取预处理视频表并生成全部图表，返回写出的文件
    pub fn run(&self) -> ETLResult<Vec<PathBuf>> {
        tracing::info!("Saving plots to {}", self.paths.plots_dir.display());
        std::fs::create_dir_all(&self.paths.plots_dir)?;

        let videos = storage::read_videos(&self.paths.pp_videos)?;
        let mut written = Vec::new();

        let mut emit = |name: &str, result: Option<ETLResult<()>>| -> ETLResult<()> {
            match result {
                Some(r) => {
                    r?;
                    written.push(self.paths.plots_dir.join(name));
                }
                None => tracing::warn!("No data for {}, skipped", name),
            }
            Ok(())
        };

        for (name, descending) in [
            ("top_9_videos_descending.png", true),
            ("top_9_videos_ascending.png", false),
        ] {
            let top = top_by_views(&videos, TOP_N, descending);
            let result = (!top.is_empty()).then(|| {
                let labels: Vec<String> = top.iter().map(|t| t.0.clone()).collect();
                let values: Vec<f64> = top.iter().map(|t| t.1 as f64).collect();
                let caption = if descending {
                    "Top 9 videos by views"
                } else {
                    "Bottom 9 videos by views"
                };
                self.tmp_draw(name, |p| draw_bar_chart(p, caption, &labels, &values, "viewCount"))
            });
            emit(name, result)?;
        }

        let name = "channel_view_distribution.png";
        let groups = views_by_channel(&videos);
        let result =
            (!groups.is_empty()).then(|| self.tmp_draw(name, |p| draw_channel_boxplot(p, &groups)));
        emit(name, result)?;

        let name = "scatter_plots_comment_like_vs_viewCount.png";
        let comments = scatter_points(&videos, |v| v.comment_count, |v| v.view_count);
        let likes = scatter_points(&videos, |v| v.like_count, |v| v.view_count);
        let result = (!comments.is_empty() || !likes.is_empty())
            .then(|| self.tmp_draw(name, |p| draw_scatter_plots(p, &comments, &likes)));
        emit(name, result)?;

        let name = "histogram_durationSecs.png";
        let durations: Vec<f64> = videos
            .iter()
            .filter_map(|v| v.duration_secs.map(|d| d as f64))
            .collect();
        let bins = histogram(&durations, DURATION_BINS);
        let result = (!bins.is_empty()).then(|| self.tmp_draw(name, |p| draw_histogram(p, &bins)));
        emit(name, result)?;

        let name = "wordcloud_video_titles.png";
        let freqs = title_word_frequencies(&videos);
        let result = (!freqs.is_empty()).then(|| self.tmp_draw(name, |p| draw_word_cloud(p, &freqs)));
        emit(name, result)?;

        let name = "day_of_week_distribution.png";
        let days = weekday_counts(&videos);
        let result = days.iter().any(|d| d.1 > 0).then(|| {
            let labels: Vec<String> = days.iter().map(|d| d.0.to_string()).collect();
            let values: Vec<f64> = days.iter().map(|d| d.1 as f64).collect();
            self.tmp_draw(name, |p| {
                draw_bar_chart(p, "Videos published per weekday", &labels, &values, "Count")
            })
        });
        emit(name, result)?;

        tracing::info!("Saved {} plots", written.len());
        Ok(written)
    }

    /// 先渲染到同目录临时路径，再重命名为最终文件名
    fn tmp_draw(&self, name: &str, draw: impl FnOnce(&Path) -> ETLResult<()>) -> ETLResult<()> {
        let target = self.paths.plots_dir.join(name);
        let tmp = self.paths.plots_dir.join(format!(".{}.tmp.png", name.trim_end_matches(".png")));
        if let Err(e) = draw(&tmp) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        std::fs::rename(&tmp, &target)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str, title: &str, views: Option<u64>, day: &str) -> Video {
        Video {
            video_id: id.to_string(),
            title: Some(title.to_string()),
            channel_title: Some("Chan".to_string()),
            view_count: views,
            like_count: views.map(|v| v / 10),
            duration_secs: Some(60),
            publish_day_name: Some(day.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_top_and_bottom_by_views() {
        let videos: Vec<Video> = (0..12)
            .map(|i| video(&format!("v{}", i), &format!("t{}", i), Some(i * 100), "Monday"))
            .chain(std::iter::once(video("x", "no views", None, "Monday")))
            .collect();

        let top = top_by_views(&videos, TOP_N, true);
        assert_eq!(top.len(), 9);
        assert_eq!(top[0], ("t11".to_string(), 1100));

        let bottom = top_by_views(&videos, TOP_N, false);
        assert_eq!(bottom[0], ("t0".to_string(), 0));
    }

    #[test]
    fn test_histogram_bins() {
        let values: Vec<f64> = (0..=100).map(|v| v as f64).collect();
        let bins = histogram(&values, 10);
        assert_eq!(bins.len(), 10);
        assert_eq!(bins.iter().map(|b| b.2).sum::<usize>(), 101);
        assert_eq!(bins[9].2, 11);

        let single = histogram(&[5.0, 5.0], 30);
        assert_eq!(single[0].2, 2);
    }

    #[test]
    fn test_word_frequencies_remove_stopwords() {
        let videos = vec![
            video("a", "The Rust Book", Some(1), "Monday"),
            video("b", "Rust in the wild", Some(1), "Monday"),
        ];
        let freqs = title_word_frequencies(&videos);

        assert_eq!(freqs[0], ("Rust".to_string(), 2));
        assert!(freqs.iter().all(|(w, _)| w != "The" && w != "the" && w != "in"));
    }

    #[test]
    fn test_weekday_counts_in_calendar_order() {
        let videos = vec![
            video("a", "x", Some(1), "Friday"),
            video("b", "y", Some(1), "Monday"),
            video("c", "z", Some(1), "Friday"),
        ];
        let counts = weekday_counts(&videos);

        assert_eq!(counts[0], ("Monday", 1));
        assert_eq!(counts[4], ("Friday", 2));
        assert_eq!(counts.iter().map(|c| c.1).sum::<usize>(), 3);
    }

    #[test]
    fn test_channel_groups_skip_missing_views() {
        let videos = vec![
            video("a", "x", Some(10), "Monday"),
            video("b", "y", None, "Monday"),
        ];
        let groups = views_by_channel(&videos);
        assert_eq!(groups["Chan"], vec![10.0]);
    }
}
