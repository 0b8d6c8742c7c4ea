//! # Orchestrator
//!
//! 配置加载、阶段入口、数据集变化触发、重试与完成信号。

pub mod config;
pub mod context;
pub mod error;
pub mod fingerprint;
pub mod retry;
pub mod runner;
pub mod signals;
pub mod stages;

pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use error::{OrchestratorError, OrchestratorResult};
pub use runner::{run_every, run_once, RunOutcome};
pub use signals::{ChannelSink, CompletionSink, LogSink, Stage, StageCompletion};
