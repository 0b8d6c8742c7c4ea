//! 模型评估模块

use crate::types::{MLError, MLResult, Metrics};
use ndarray::Array1;

/// 模型评估器
pub struct Evaluator;

impl Evaluator {
    /// 计算评估指标
    pub fn evaluate(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> MLResult<Metrics> {
        if y_true.len() != y_pred.len() {
            return Err(MLError::DimensionMismatch {
                expected: y_true.len(),
                actual: y_pred.len(),
            });
        }

        let mse = Self::mean_squared_error(y_true, y_pred);
        let rmse = mse.sqrt();
        let mae = Self::mean_absolute_error(y_true, y_pred);
        let r2 = Self::r2_score(y_true, y_pred);

        Ok(Metrics::new(mse, rmse, mae, r2))
    }

    /// 均方误差 (MSE)
    pub fn mean_squared_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
        let diff = y_true - y_pred;
        diff.mapv(|x| x * x).mean().unwrap_or(0.0)
    }

    /// 平均绝对误差 (MAE)
    pub fn mean_absolute_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
        let diff = y_true - y_pred;
        diff.mapv(|x| x.abs()).mean().unwrap_or(0.0)
    }

    /// R² 分数
    ///
    /// 真实值为常数时：完全命中记 1，否则记 0。
    pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
        let y_mean = y_true.mean().unwrap_or(0.0);

        let ss_res: f64 = (y_true - y_pred).mapv(|x| x * x).sum();
        let ss_tot: f64 = y_true.mapv(|x| (x - y_mean).powi(2)).sum();

        if ss_tot == 0.0 {
            return if ss_res == 0.0 { 1.0 } else { 0.0 };
        }

        1.0 - (ss_res / ss_tot)
    }
}
