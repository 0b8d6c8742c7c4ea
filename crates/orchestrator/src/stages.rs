//! 各阶段入口：采集、清洗、建模、绘图

use crate::context::PipelineContext;
use crate::error::OrchestratorResult;
use crate::signals::Stage;
use etl::{
    storage, Cleaner, CleaningSummary, CollectionSummary, Collector, DataEnricher,
    EngagementSample, Visualizer,
};
use ml::{CategoricalColumn, FeatureTable, NumericColumn, TrainingReport};
use std::path::{Path, PathBuf};

pub const TARGET_COLUMN: &str = "likeCount";

fn owned(paths: [&Path; 2]) -> Vec<PathBuf> {
    paths.iter().map(|p| p.to_path_buf()).collect()
}

/// 采集原始视频与评论
pub async fn collect(ctx: &PipelineContext) -> OrchestratorResult<CollectionSummary> {
    let platform = ctx.platform()?;
    let summary = Collector::new(platform, &ctx.config.youtube, &ctx.paths)
        .run()
        .await?;

    tracing::info!(
        "Collected {} videos, {} comment bundles ({} without comments)",
        summary.videos,
        summary.comment_bundles,
        summary.comment_failures
    );
    ctx.sink
        .stage_completed(Stage::Collect, &owned(ctx.paths.raw()))
        .await;
    Ok(summary)
}

/// 清洗原始数据集
pub async fn clean(ctx: &PipelineContext) -> OrchestratorResult<CleaningSummary> {
    let summary = Cleaner::new(&ctx.paths, ctx.config.cleaning.malformed_fields).run()?;
    ctx.sink
        .stage_completed(Stage::Clean, &owned(ctx.paths.preprocessed()))
        .await;
    Ok(summary)
}

/// 特征列：`viewCount, durationSecs, tagCount, sentiment_score` 加星期独热列
pub fn feature_table(samples: &[EngagementSample]) -> OrchestratorResult<FeatureTable> {
    let (numeric, categorical) = feature_columns(samples);
    let target = samples.iter().map(|s| s.like_count as f64).collect();

    Ok(FeatureTable::build(numeric, categorical, TARGET_COLUMN, target)?)
}

/// 训练和推理共用的原始特征列
pub fn feature_columns(
    samples: &[EngagementSample],
) -> (Vec<NumericColumn>, Vec<CategoricalColumn>) {
    let numeric = vec![
        NumericColumn::new("viewCount", samples.iter().map(|s| s.view_count as f64).collect()),
        NumericColumn::new(
            "durationSecs",
            samples.iter().map(|s| s.duration_secs as f64).collect(),
        ),
        NumericColumn::new("tagCount", samples.iter().map(|s| s.tag_count as f64).collect()),
        NumericColumn::new(
            "sentiment_score",
            samples.iter().map(|s| s.sentiment_score).collect(),
        ),
    ];
    let categorical = vec![CategoricalColumn::new(
        "publishDayName",
        samples.iter().map(|s| s.weekday.clone()).collect(),
    )];
    (numeric, categorical)
}

/// 增强、训练、评估，并原子写出模型与报告
pub async fn model(ctx: &PipelineContext) -> OrchestratorResult<TrainingReport> {
    let videos = storage::read_videos(&ctx.paths.pp_videos)?;
    let bundles = storage::read_comment_bundles(&ctx.paths.pp_comments)?;

    let enricher = DataEnricher::new(ctx.classifier.as_ref(), ctx.config.sentiment.max_chars);
    let (samples, _) = enricher.build_samples(&videos, &bundles).await;

    let table = feature_table(&samples)?;
    let (trained, report) = ml::train_and_evaluate(&table, &ctx.config.model).await?;

    trained.save(&ctx.paths.model)?;
    storage::write_bytes(&ctx.paths.report, &serde_json::to_vec_pretty(&report)?)?;

    tracing::info!("Mean Squared Error: {:.3}", report.test_metrics.mse);
    tracing::info!("R^2 Score: {:.4}", report.test_metrics.r2_score);
    for item in &report.feature_importances {
        tracing::info!("  {:<28} {:.4}", item.feature, item.importance);
    }

    ctx.sink
        .stage_completed(
            Stage::Model,
            &[ctx.paths.model.clone(), ctx.paths.report.clone()],
        )
        .await;
    Ok(report)
}

/// 在阻塞线程池上渲染全部图表
pub async fn plot(ctx: &PipelineContext) -> OrchestratorResult<Vec<PathBuf>> {
    let paths = ctx.paths.clone();
    let written = tokio::task::spawn_blocking(move || Visualizer::new(&paths).run()).await??;

    ctx.sink.stage_completed(Stage::Plot, &written).await;
    Ok(written)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::signals::{ChannelSink, StageCompletion};
    use async_trait::async_trait;
    use etl::scraper::youtube::{
        VideoContentDetails, VideoResource, VideoSnippet, VideoStatistics,
    };
    use etl::scraper::PlaylistPage;
    use etl::{ETLError, ETLResult, LexiconClassifier, VideoPlatform};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    /// 单页播放列表的假平台，点赞数与播放量成正比
    pub(crate) struct FakePlatform {
        pub ids: Vec<String>,
    }

    impl FakePlatform {
        pub(crate) fn new(n: usize) -> Self {
            Self {
                ids: (0..n).map(|i| format!("vid{:03}", i)).collect(),
            }
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
            _page_token: Option<&str>,
            _page_size: usize,
        ) -> ETLResult<PlaylistPage> {
            Ok(PlaylistPage {
                video_ids: self.ids.clone(),
                next_page_token: None,
            })
        }

        async fn fetch_videos(&self, video_ids: &[String]) -> ETLResult<Vec<VideoResource>> {
            Ok(video_ids
                .iter()
                .map(|id| {
                    let n: u64 = id[3..].parse().unwrap_or(0);
                    VideoResource {
                        id: id.clone(),
                        snippet: Some(VideoSnippet {
                            channel_title: Some("Channel".to_string()),
                            title: Some(format!("Episode {}", n)),
                            description: None,
                            tags: Some(vec!["a".to_string(); (n % 4) as usize]),
                            published_at: Some(format!("2024-01-{:02}T12:00:00Z", 1 + n % 28)),
                        }),
                        content_details: Some(VideoContentDetails {
                            duration: Some(format!("PT{}M{}S", 1 + n % 20, n % 60)),
                            definition: Some("hd".to_string()),
                            caption: Some("false".to_string()),
                        }),
                        statistics: Some(VideoStatistics {
                            view_count: Some((1000 * (n + 1)).to_string()),
                            like_count: Some((40 * (n + 1)).to_string()),
                            favorite_count: Some("0".to_string()),
                            comment_count: Some("2".to_string()),
                        }),
                    }
                })
                .collect())
        }

        async fn fetch_top_comments(&self, video_id: &str, _max: usize) -> ETLResult<Vec<String>> {
            if video_id.ends_with('7') {
                return Err(ETLError::DataSource("commentsDisabled".to_string()));
            }
            Ok(vec!["love this".to_string(), "boring".to_string()])
        }
    }

    pub(crate) fn context(
        dir: &Path,
        n_videos: usize,
    ) -> (PipelineContext, mpsc::Receiver<StageCompletion>) {
        let mut config = PipelineConfig {
            base_dir: dir.to_path_buf(),
            ..PipelineConfig::default()
        };
        config.model.n_trees = 10;
        config.schedule.retry_delay_secs = 0;

        let (sink, rx) = ChannelSink::channel(16);
        let ctx = PipelineContext::new(
            config,
            Some(Arc::new(FakePlatform::new(n_videos))),
            Arc::new(LexiconClassifier::new()),
            Arc::new(sink),
        );
        (ctx, rx)
    }

    #[tokio::test]
    async fn test_collect_clean_model() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, mut rx) = context(dir.path(), 30);

        let collected = collect(&ctx).await.unwrap();
        assert_eq!(collected.videos, 30);
        assert_eq!(collected.comment_failures, 3);

        let cleaned = clean(&ctx).await.unwrap();
        assert_eq!(cleaned.videos, 30);

        let report = model(&ctx).await.unwrap();
        assert_eq!(report.n_train + report.n_test, 30);
        assert_eq!(report.n_test, 6);
        assert!(ctx.paths.model.exists());

        let saved: TrainingReport =
            serde_json::from_slice(&std::fs::read(&ctx.paths.report).unwrap()).unwrap();
        assert_eq!(saved.test_metrics, report.test_metrics);
        assert!(saved
            .feature_importances
            .iter()
            .any(|f| f.feature.starts_with("publishDayName_")));

        let stages: Vec<Stage> = [rx.recv().await, rx.recv().await, rx.recv().await]
            .into_iter()
            .map(|c| c.unwrap().stage)
            .collect();
        assert_eq!(stages, vec![Stage::Collect, Stage::Clean, Stage::Model]);
    }

    #[tokio::test]
    async fn test_saved_model_predicts_new_rows() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _rx) = context(dir.path(), 20);

        collect(&ctx).await.unwrap();
        clean(&ctx).await.unwrap();
        model(&ctx).await.unwrap();

        let trained = ml::TrainedModel::load(&ctx.paths.model).unwrap();
        assert_eq!(trained.target_name, TARGET_COLUMN);
        assert_eq!(
            trained.numeric_names,
            vec!["viewCount", "durationSecs", "tagCount", "sentiment_score"]
        );

        let samples = vec![EngagementSample {
            video_id: "new".to_string(),
            view_count: 5000,
            duration_secs: 240,
            tag_count: 2,
            sentiment_score: 0.5,
            weekday: Some("Caturday".to_string()),
            like_count: 0,
        }];
        let (numeric, categorical) = feature_columns(&samples);
        let predictions = trained.predict(&numeric, &categorical).await.unwrap();

        assert_eq!(predictions.len(), 1);
        assert!(predictions[0].is_finite());
    }

    #[tokio::test]
    async fn test_model_with_single_sample_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _rx) = context(dir.path(), 1);

        collect(&ctx).await.unwrap();
        clean(&ctx).await.unwrap();
        assert!(model(&ctx).await.is_err());
    }

    #[test]
    fn test_feature_columns() {
        let samples = vec![EngagementSample {
            video_id: "a".to_string(),
            view_count: 100,
            duration_secs: 60,
            tag_count: 3,
            sentiment_score: 0.75,
            weekday: Some("Friday".to_string()),
            like_count: 9,
        }];
        let table = feature_table(&samples).unwrap();

        assert_eq!(
            table.feature_names,
            vec![
                "viewCount",
                "durationSecs",
                "tagCount",
                "sentiment_score",
                "publishDayName_Friday"
            ]
        );
        assert_eq!(table.x.row(0).to_vec(), vec![100.0, 60.0, 3.0, 0.75, 1.0]);
        assert_eq!(table.y.to_vec(), vec![9.0]);
    }
}
