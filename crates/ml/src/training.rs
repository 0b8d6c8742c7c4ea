//! 训练与评估流程：划分、训练、测试集评估、特征重要性

use crate::evaluation::Evaluator;
use crate::models::traditional::RandomForestRegressor;
use crate::models::trained::TrainedModel;
use crate::models::Model;
use crate::preprocessing::{train_test_split, FeatureTable};
use crate::types::{FeatureImportance, MLResult, ModelConfig, TrainingReport};
use std::time::Instant;

/// 在特征表上训练随机森林，并在留出的测试集上评估
///
/// 返回的训练产物带有特征布局和编码器，可以直接用于推理。
pub async fn train_and_evaluate(
    table: &FeatureTable,
    config: &ModelConfig,
) -> MLResult<(TrainedModel, TrainingReport)> {
    config.validate()?;

    let split = train_test_split(&table.x, &table.y, config.test_ratio, config.seed)?;
    tracing::info!(
        "Training {} on {} samples, testing on {}",
        table.target_name,
        split.y_train.len(),
        split.y_test.len()
    );

    let started = Instant::now();
    let mut model = RandomForestRegressor::from_config(config);
    model.train(&split.x_train, &split.y_train).await?;
    let training_duration_secs = started.elapsed().as_secs_f64();

    let predictions = model.predict(&split.x_test).await?;
    let test_metrics = Evaluator::evaluate(&split.y_test, &predictions)?;

    tracing::info!(
        "Test MSE {:.3}, R² {:.4}",
        test_metrics.mse,
        test_metrics.r2_score
    );

    let feature_importances = ranked_importances(&table.feature_names, model.feature_importances());

    let report = TrainingReport {
        target: table.target_name.clone(),
        n_train: split.y_train.len(),
        n_test: split.y_test.len(),
        test_metrics,
        feature_importances,
        config: config.clone(),
        training_duration_secs,
    };

    Ok((TrainedModel::new(table, model)?, report))
}

/// 按重要性降序，相同时按特征名排序
pub fn ranked_importances(names: &[String], importances: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = names
        .iter()
        .zip(importances)
        .map(|(feature, &importance)| FeatureImportance {
            feature: feature.clone(),
            importance,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.importance
            .total_cmp(&a.importance)
            .then_with(|| a.feature.cmp(&b.feature))
    });
    ranked
}
