//! 随机森林回归

use crate::models::{load_bincode, save_bincode, Model};
use crate::types::{MLError, MLResult, ModelConfig};
use async_trait::async_trait;
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 随机森林回归模型
///
/// 每棵树在自助采样上生长，分割考虑全部特征；同一种子下结果可复现。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    n_trees: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    seed: u64,
    n_features: usize,
    trees: Vec<DecisionTree>,
    feature_importances: Vec<f64>,
}

impl RandomForestRegressor {
    pub fn new(
        n_trees: usize,
        max_depth: Option<usize>,
        min_samples_split: usize,
        seed: u64,
    ) -> Self {
        Self {
            n_trees,
            max_depth,
            min_samples_split,
            seed,
            n_features: 0,
            trees: Vec::new(),
            feature_importances: Vec::new(),
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(
            config.n_trees,
            config.max_depth,
            config.min_samples_split,
            config.seed,
        )
    }

    /// 自助采样：有放回地抽取 n 个样本下标
    fn bootstrap_indices(n_samples: usize, rng: &mut impl Rng) -> Vec<usize> {
        (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
    }

    /// 平均不纯度减少，归一化后和为 1（没有任何分割时全为 0）
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// 训练时的特征列数
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    fn aggregate_importances(&mut self) {
        let mut totals = vec![0.0; self.n_features];
        let mut contributing = 0usize;

        for tree in &self.trees {
            let sum: f64 = tree.importances.iter().sum();
            if sum <= 0.0 {
                continue;
            }
            contributing += 1;
            for (total, value) in totals.iter_mut().zip(&tree.importances) {
                *total += value / sum;
            }
        }

        if contributing > 0 {
            let sum: f64 = totals.iter().sum();
            for total in totals.iter_mut() {
                *total /= sum;
            }
        }
        self.feature_importances = totals;
    }
}

#[async_trait]
impl Model for RandomForestRegressor {
    async fn train(&mut self, x_train: &Array2<f64>, y_train: &Array1<f64>) -> MLResult<()> {
        if x_train.nrows() != y_train.len() {
            return Err(MLError::DimensionMismatch {
                expected: x_train.nrows(),
                actual: y_train.len(),
            });
        }
        if x_train.nrows() == 0 {
            return Err(MLError::Training("训练集为空".to_string()));
        }
        if self.n_trees == 0 {
            return Err(MLError::InvalidConfig("n_trees 必须大于 0".to_string()));
        }

        self.trees.clear();
        self.n_features = x_train.ncols();
        let mut rng = StdRng::seed_from_u64(self.seed);

        for _ in 0..self.n_trees {
            let indices = Self::bootstrap_indices(x_train.nrows(), &mut rng);

            let mut tree = DecisionTree::new(self.max_depth, self.min_samples_split);
            tree.fit(x_train, y_train, indices)?;
            self.trees.push(tree);
        }

        self.aggregate_importances();
        tracing::debug!(
            "Trained random forest with {} trees on {} samples",
            self.trees.len(),
            x_train.nrows()
        );
        Ok(())
    }

    async fn predict(&self, x: &Array2<f64>) -> MLResult<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(MLError::Prediction("模型未训练".to_string()));
        }
        if x.ncols() != self.n_features {
            return Err(MLError::DimensionMismatch {
                expected: self.n_features,
                actual: x.ncols(),
            });
        }

        let mut predictions = Array1::<f64>::zeros(x.nrows());

        // 对每棵树的预测求平均
        for tree in &self.trees {
            predictions = predictions + tree.predict(x)?;
        }

        Ok(predictions / self.trees.len() as f64)
    }

    async fn save(&self, path: &Path) -> MLResult<()> {
        save_bincode(self, path)
    }

    async fn load(path: &Path) -> MLResult<Self> {
        load_bincode(path)
    }
}

/// 决策树节点
#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Internal {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

struct Split {
    feature_idx: usize,
    threshold: f64,
    /// 父节点平方误差和减去两个子节点平方误差和
    gain: f64,
}

/// 决策树回归模型（方差减少分割）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    max_depth: Option<usize>,
    min_samples_split: usize,
    root: Option<TreeNode>,
    importances: Vec<f64>,
}

impl DecisionTree {
    pub fn new(max_depth: Option<usize>, min_samples_split: usize) -> Self {
        Self {
            max_depth,
            min_samples_split,
            root: None,
            importances: Vec::new(),
        }
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>, indices: Vec<usize>) -> MLResult<()> {
        if indices.is_empty() {
            return Err(MLError::Training("样本为空".to_string()));
        }
        let mut importances = vec![0.0; x.ncols()];
        self.root = Some(self.build_tree(x, y, indices, 0, &mut importances));
        self.importances = importances;
        Ok(())
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: Vec<usize>,
        depth: usize,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = indices.len();
        let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / n_samples as f64;

        let depth_reached = self.max_depth.is_some_and(|max| depth >= max);
        let first = y[indices[0]];
        let pure = indices.iter().all(|&i| y[i] == first);

        // 停止条件
        if depth_reached || pure || n_samples < self.min_samples_split {
            return TreeNode::Leaf { value: mean };
        }

        let Some(split) = Self::find_best_split(x, y, &indices, mean) else {
            return TreeNode::Leaf { value: mean };
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[[i, split.feature_idx]] <= split.threshold);

        if left_indices.is_empty() || right_indices.is_empty() {
            return TreeNode::Leaf { value: mean };
        }

        importances[split.feature_idx] += split.gain;

        let left = Box::new(self.build_tree(x, y, left_indices, depth + 1, importances));
        let right = Box::new(self.build_tree(x, y, right_indices, depth + 1, importances));

        TreeNode::Internal {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            left,
            right,
        }
    }

    /// 按特征排序后用前缀和一次扫描所有候选阈值，阈值取相邻不同取值的中点
    fn find_best_split(
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        mean: f64,
    ) -> Option<Split> {
        let n_samples = indices.len();

        // 以节点均值为中心，减少大数值下的精度损失
        let total_sum: f64 = indices.iter().map(|&i| y[i] - mean).sum();
        let total_sq: f64 = indices.iter().map(|&i| (y[i] - mean).powi(2)).sum();
        let parent_sse = total_sq - total_sum * total_sum / n_samples as f64;

        let mut best: Option<Split> = None;
        let mut best_child_sse = parent_sse;
        let mut order = indices.to_vec();

        for feature_idx in 0..x.ncols() {
            order.sort_by(|&a, &b| x[[a, feature_idx]].total_cmp(&x[[b, feature_idx]]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;

            for k in 0..n_samples - 1 {
                let d = y[order[k]] - mean;
                left_sum += d;
                left_sq += d * d;

                let value = x[[order[k], feature_idx]];
                let next = x[[order[k + 1], feature_idx]];
                if value == next {
                    continue;
                }

                let n_left = (k + 1) as f64;
                let n_right = (n_samples - k - 1) as f64;
                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;

                let child_sse = (left_sq - left_sum * left_sum / n_left)
                    + (right_sq - right_sum * right_sum / n_right);

                if child_sse < best_child_sse {
                    let mut threshold = value + (next - value) / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best_child_sse = child_sse;
                    best = Some(Split {
                        feature_idx,
                        threshold,
                        gain: parent_sse - child_sse,
                    });
                }
            }
        }

        best.filter(|split| split.gain > 0.0)
    }

    fn predict(&self, x: &Array2<f64>) -> MLResult<Array1<f64>> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| MLError::Prediction("模型未训练".to_string()))?;

        Ok(x
            .rows()
            .into_iter()
            .map(|row| Self::predict_single(&row, root))
            .collect())
    }

    fn predict_single(x: &ArrayView1<f64>, node: &TreeNode) -> f64 {
        match node {
            TreeNode::Leaf { value } => *value,
            TreeNode::Internal {
                feature_idx,
                threshold,
                left,
                right,
            } => {
                if x[*feature_idx] <= *threshold {
                    Self::predict_single(x, left)
                } else {
                    Self::predict_single(x, right)
                }
            }
        }
    }
}
