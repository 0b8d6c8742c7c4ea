//! 数据预处理和特征工程模块

use crate::types::{MLError, MLResult};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// 独热编码器
///
/// 类别按字典序排列；未见过的类别或缺失值编码为全零行。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub column: String,
    pub categories: Vec<String>,
}

impl OneHotEncoder {
    /// 从一列取值拟合编码器
    pub fn fit(column: &str, values: &[Option<String>]) -> Self {
        let mut categories: Vec<String> = values.iter().flatten().cloned().collect();
        categories.sort();
        categories.dedup();

        Self {
            column: column.to_string(),
            categories,
        }
    }

    /// 输出列名，形如 `publishDayName_Friday`
    pub fn feature_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{}_{}", self.column, c))
            .collect()
    }

    pub fn transform(&self, values: &[Option<String>]) -> Array2<f64> {
        let mut encoded = Array2::<f64>::zeros((values.len(), self.categories.len()));

        for (row, value) in values.iter().enumerate() {
            let Some(value) = value else { continue };
            if let Ok(idx) = self.categories.binary_search(value) {
                encoded[[row, idx]] = 1.0;
            }
        }

        encoded
    }
}

/// 数值特征列
#[derive(Debug, Clone)]
pub struct NumericColumn {
    pub name: String,
    pub values: Vec<f64>,
}

impl NumericColumn {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// 类别特征列
#[derive(Debug, Clone)]
pub struct CategoricalColumn {
    pub name: String,
    pub values: Vec<Option<String>>,
}

impl CategoricalColumn {
    pub fn new(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// 特征矩阵与目标列
#[derive(Debug, Clone)]
pub struct FeatureTable {
    pub feature_names: Vec<String>,
    pub target_name: String,
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    pub encoders: Vec<OneHotEncoder>,
}

impl FeatureTable {
    /// 数值列原样放入，类别列在样本集上拟合独热编码后追加在后面
    pub fn build(
        numeric: Vec<NumericColumn>,
        categorical: Vec<CategoricalColumn>,
        target_name: &str,
        target: Vec<f64>,
    ) -> MLResult<Self> {
        let n_samples = target.len();
        check_columns(n_samples, &numeric, &categorical)?;

        let encoders: Vec<OneHotEncoder> = categorical
            .iter()
            .map(|c| OneHotEncoder::fit(&c.name, &c.values))
            .collect();

        let mut feature_names: Vec<String> = numeric.iter().map(|c| c.name.clone()).collect();
        for encoder in &encoders {
            feature_names.extend(encoder.feature_names());
        }

        let x = assemble(n_samples, feature_names.len(), &numeric, &categorical, &encoders);

        Ok(Self {
            feature_names,
            target_name: target_name.to_string(),
            x,
            y: Array1::from(target),
            encoders,
        })
    }

    /// 数值列名，即独热列之前的部分
    pub fn numeric_names(&self) -> Vec<String> {
        let encoded: usize = self.encoders.iter().map(|e| e.categories.len()).sum();
        let n_numeric = self.feature_names.len() - encoded;
        self.feature_names[..n_numeric].to_vec()
    }
}

/// 用已拟合的编码器构造特征矩阵，列名和顺序必须与训练时一致
pub fn encode_with(
    numeric_names: &[String],
    encoders: &[OneHotEncoder],
    numeric: &[NumericColumn],
    categorical: &[CategoricalColumn],
) -> MLResult<Array2<f64>> {
    let given: Vec<&str> = numeric.iter().map(|c| c.name.as_str()).collect();
    if given != numeric_names {
        return Err(MLError::Preprocessing(format!(
            "数值列不匹配: 期望 {:?}，实际 {:?}",
            numeric_names, given
        )));
    }
    let given: Vec<&str> = categorical.iter().map(|c| c.name.as_str()).collect();
    let expected: Vec<&str> = encoders.iter().map(|e| e.column.as_str()).collect();
    if given != expected {
        return Err(MLError::Preprocessing(format!(
            "类别列不匹配: 期望 {:?}，实际 {:?}",
            expected, given
        )));
    }

    let n_samples = numeric
        .first()
        .map(|c| c.values.len())
        .or_else(|| categorical.first().map(|c| c.values.len()))
        .unwrap_or(0);
    check_columns(n_samples, numeric, categorical)?;

    let width = numeric.len() + encoders.iter().map(|e| e.categories.len()).sum::<usize>();
    Ok(assemble(n_samples, width, numeric, categorical, encoders))
}

fn check_columns(
    n_samples: usize,
    numeric: &[NumericColumn],
    categorical: &[CategoricalColumn],
) -> MLResult<()> {
    for column in numeric {
        if column.values.len() != n_samples {
            return Err(MLError::DimensionMismatch {
                expected: n_samples,
                actual: column.values.len(),
            });
        }
        if let Some(bad) = column.values.iter().find(|v| !v.is_finite()) {
            return Err(MLError::Preprocessing(format!(
                "列 {} 含有非有限值 {}",
                column.name, bad
            )));
        }
    }
    for column in categorical {
        if column.values.len() != n_samples {
            return Err(MLError::DimensionMismatch {
                expected: n_samples,
                actual: column.values.len(),
            });
        }
    }
    Ok(())
}

fn assemble(
    n_samples: usize,
    width: usize,
    numeric: &[NumericColumn],
    categorical: &[CategoricalColumn],
    encoders: &[OneHotEncoder],
) -> Array2<f64> {
    let mut x = Array2::<f64>::zeros((n_samples, width));
    for (j, column) in numeric.iter().enumerate() {
        x.column_mut(j).assign(&Array1::from(column.values.clone()));
    }

    let mut offset = numeric.len();
    for (encoder, column) in encoders.iter().zip(categorical) {
        let width = encoder.categories.len();
        let encoded = encoder.transform(&column.values);
        x.slice_mut(ndarray::s![.., offset..offset + width])
            .assign(&encoded);
        offset += width;
    }
    x
}

/// 训练/测试划分
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub y_train: Array1<f64>,
    pub x_test: Array2<f64>,
    pub y_test: Array1<f64>,
}

/// 打乱后划分，测试集大小为 `ceil(n * test_ratio)`，两边都至少保留一个样本
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_ratio: f64,
    seed: u64,
) -> MLResult<TrainTestSplit> {
    let n_samples = x.nrows();
    if n_samples != y.len() {
        return Err(MLError::DimensionMismatch {
            expected: n_samples,
            actual: y.len(),
        });
    }
    if n_samples < 2 {
        return Err(MLError::Preprocessing(format!(
            "样本数不足，无法划分训练集和测试集: {}",
            n_samples
        )));
    }

    let n_test = ((n_samples as f64 * test_ratio).ceil() as usize).clamp(1, n_samples - 1);

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);

    Ok(TrainTestSplit {
        x_train: x.select(Axis(0), train_idx),
        y_train: y.select(Axis(0), train_idx),
        x_test: x.select(Axis(0), test_idx),
        y_test: y.select(Axis(0), test_idx),
    })
}
