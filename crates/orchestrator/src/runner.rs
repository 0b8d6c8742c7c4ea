//! 按数据集变化触发的完整运行与定时调度

use crate::context::PipelineContext;
use crate::error::OrchestratorResult;
use crate::fingerprint::DatasetFingerprints;
use crate::retry::with_retry;
use crate::signals::Stage;
use crate::stages;
use etl::{CleaningSummary, CollectionSummary};
use ml::TrainingReport;
use std::path::PathBuf;
use std::time::Duration;

/// 一次运行中各阶段的结果，未触发的阶段为 `None`
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub collected: Option<CollectionSummary>,
    pub cleaned: Option<CleaningSummary>,
    pub report: Option<TrainingReport>,
    pub plots: Option<Vec<PathBuf>>,
}

/// 采集 → 原始数据变化时清洗 → 预处理数据变化时并发建模与绘图
///
/// 指纹只在下游阶段成功后更新，失败的阶段下次运行会再次触发。
pub async fn run_once(ctx: &PipelineContext, force: bool) -> OrchestratorResult<RunOutcome> {
    let schedule = &ctx.config.schedule;
    let retry_delay = schedule.retry_delay();
    let mut fingerprints = DatasetFingerprints::load(&ctx.paths.fingerprints)?;
    let mut outcome = RunOutcome::default();

    outcome.collected = Some(
        with_retry(Stage::Collect, schedule.retries, retry_delay, || {
            stages::collect(ctx)
        })
        .await?,
    );

    if force || fingerprints.changed(&ctx.paths.raw())? {
        outcome.cleaned = Some(
            with_retry(Stage::Clean, schedule.retries, retry_delay, || {
                stages::clean(ctx)
            })
            .await?,
        );
        fingerprints.record(&ctx.paths.raw())?;
        fingerprints.save(&ctx.paths.fingerprints)?;
    } else {
        tracing::info!("Raw datasets unchanged, skipping clean");
    }

    if force || fingerprints.changed(&ctx.paths.preprocessed())? {
        let (report, plots) = tokio::join!(
            with_retry(Stage::Model, schedule.retries, retry_delay, || {
                stages::model(ctx)
            }),
            with_retry(Stage::Plot, schedule.retries, retry_delay, || {
                stages::plot(ctx)
            }),
        );
        outcome.report = Some(report?);
        outcome.plots = Some(plots?);
        fingerprints.record(&ctx.paths.preprocessed())?;
        fingerprints.save(&ctx.paths.fingerprints)?;
    } else {
        tracing::info!("Preprocessed datasets unchanged, skipping model and plots");
    }

    Ok(outcome)
}

/// 每隔 `interval` 运行一次，直到收到 Ctrl-C
///
/// 单次运行失败只记录日志，不终止调度。
pub async fn run_every(
    ctx: &PipelineContext,
    force: bool,
    interval: Duration,
) -> OrchestratorResult<()> {
    loop {
        if let Err(e) = run_once(ctx, force).await {
            tracing::error!("Pipeline run failed: {}", e);
        }

        tracing::info!("Next run in {:?}", interval);
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, stopping scheduler");
                return Ok(());
            }
        }
    }
}
