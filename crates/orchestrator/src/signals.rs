//! 阶段完成信号

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Collect,
    Clean,
    Model,
    Plot,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Collect => write!(f, "collect"),
            Stage::Clean => write!(f, "clean"),
            Stage::Model => write!(f, "model"),
            Stage::Plot => write!(f, "plot"),
        }
    }
}

/// 一个阶段成功完成及其写出的文件
#[derive(Debug, Clone, PartialEq)]
pub struct StageCompletion {
    pub stage: Stage,
    pub outputs: Vec<PathBuf>,
}

/// 阶段完成的接收方
#[async_trait]
pub trait CompletionSink: Send + Sync {
    async fn stage_completed(&self, stage: Stage, outputs: &[PathBuf]);
}

/// 只写日志
pub struct LogSink;

#[async_trait]
impl CompletionSink for LogSink {
    async fn stage_completed(&self, stage: Stage, outputs: &[PathBuf]) {
        tracing::info!("Stage {} completed, {} outputs", stage, outputs.len());
        for output in outputs {
            tracing::debug!("  {}", output.display());
        }
    }
}

/// 通过 tokio 通道转发给其他任务
pub struct ChannelSink {
    tx: mpsc::Sender<StageCompletion>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<StageCompletion>) -> Self {
        Self { tx }
    }

    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<StageCompletion>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl CompletionSink for ChannelSink {
    async fn stage_completed(&self, stage: Stage, outputs: &[PathBuf]) {
        let completion = StageCompletion {
            stage,
            outputs: outputs.to_vec(),
        };
        if self.tx.send(completion).await.is_err() {
            tracing::warn!("Completion receiver dropped, {} signal lost", stage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_forwards() {
        let (sink, mut rx) = ChannelSink::channel(4);
        sink.stage_completed(Stage::Clean, &[PathBuf::from("data/pp_video_data.csv")])
            .await;

        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.stage, Stage::Clean);
        assert_eq!(completion.outputs, vec![PathBuf::from("data/pp_video_data.csv")]);
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_not_an_error() {
        let (sink, rx) = ChannelSink::channel(1);
        drop(rx);
        sink.stage_completed(Stage::Plot, &[]).await;
    }
}
