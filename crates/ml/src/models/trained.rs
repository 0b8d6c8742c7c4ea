//! 可复用的训练产物：特征布局、已拟合的独热编码器与随机森林

use crate::models::traditional::RandomForestRegressor;
use crate::models::{load_bincode, save_bincode, Model};
use crate::preprocessing::{
    encode_with, CategoricalColumn, FeatureTable, NumericColumn, OneHotEncoder,
};
use crate::types::{MLError, MLResult};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 训练产物
///
/// 推理时按保存的列顺序和类别编码重建输入行，训练时没见过的类别编码为全零。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    pub target_name: String,
    pub feature_names: Vec<String>,
    pub numeric_names: Vec<String>,
    pub encoders: Vec<OneHotEncoder>,
    pub forest: RandomForestRegressor,
}

impl TrainedModel {
    pub fn new(table: &FeatureTable, forest: RandomForestRegressor) -> MLResult<Self> {
        if forest.n_features() != table.feature_names.len() {
            return Err(MLError::DimensionMismatch {
                expected: table.feature_names.len(),
                actual: forest.n_features(),
            });
        }

        Ok(Self {
            target_name: table.target_name.clone(),
            feature_names: table.feature_names.clone(),
            numeric_names: table.numeric_names(),
            encoders: table.encoders.clone(),
            forest,
        })
    }

    /// 对原始列编码后预测
    pub async fn predict(
        &self,
        numeric: &[NumericColumn],
        categorical: &[CategoricalColumn],
    ) -> MLResult<Array1<f64>> {
        let x = encode_with(&self.numeric_names, &self.encoders, numeric, categorical)?;
        self.forest.predict(&x).await
    }

    pub fn save(&self, path: &Path) -> MLResult<()> {
        save_bincode(self, path)?;
        tracing::info!("Saved trained model to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> MLResult<Self> {
        load_bincode(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> FeatureTable {
        let n = 12;
        let views: Vec<f64> = (0..n).map(|i| 100.0 * (i + 1) as f64).collect();
        let likes: Vec<f64> = views.iter().map(|v| v / 10.0).collect();
        FeatureTable::build(
            vec![NumericColumn::new("viewCount", views)],
            vec![CategoricalColumn::new(
                "publishDayName",
                vec![Some("Monday".to_string()); n],
            )],
            "likeCount",
            likes,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_load_and_predict_unseen_weekday() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("like_count_forest.bin");

        let table = table();
        let mut forest = RandomForestRegressor::new(5, None, 2, 42);
        forest.train(&table.x, &table.y).await.unwrap();
        TrainedModel::new(&table, forest).unwrap().save(&path).unwrap();

        let loaded = TrainedModel::load(&path).unwrap();
        assert_eq!(loaded.feature_names, vec!["viewCount", "publishDayName_Monday"]);
        assert_eq!(loaded.encoders, table.encoders);

        let predictions = loaded
            .predict(
                &[NumericColumn::new("viewCount", vec![550.0])],
                &[CategoricalColumn::new(
                    "publishDayName",
                    vec![Some("Friday".to_string())],
                )],
            )
            .await
            .unwrap();
        assert_eq!(predictions.len(), 1);
        assert!(predictions[0].is_finite());
        assert!(predictions[0] > 0.0);
    }

    #[tokio::test]
    async fn test_rejects_forest_of_other_width() {
        let table = table();
        let x = ndarray::Array2::<f64>::zeros((4, 3));
        let y = Array1::from(vec![1.0, 2.0, 3.0, 4.0]);
        let mut forest = RandomForestRegressor::new(2, None, 2, 42);
        forest.train(&x, &y).await.unwrap();

        assert!(matches!(
            TrainedModel::new(&table, forest),
            Err(MLError::DimensionMismatch { .. })
        ));
    }
}
