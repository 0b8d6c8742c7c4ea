//! 回归模型模块

pub mod traditional;
pub mod trained;

use crate::types::{MLError, MLResult};
use async_trait::async_trait;
use ndarray::{Array1, Array2};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// 模型训练接口
#[async_trait]
pub trait Model: Send + Sync {
    /// 训练模型
    async fn train(&mut self, x_train: &Array2<f64>, y_train: &Array1<f64>) -> MLResult<()>;

    /// 预测
    async fn predict(&self, x: &Array2<f64>) -> MLResult<Array1<f64>>;

    /// 保存模型
    async fn save(&self, path: &Path) -> MLResult<()>;

    /// 加载模型
    async fn load(path: &Path) -> MLResult<Self>
    where
        Self: Sized;
}

/// bincode 序列化后原子写入（同目录临时文件 + 重命名）
pub(crate) fn save_bincode<T: Serialize>(value: &T, path: &Path) -> MLResult<()> {
    let serialized =
        bincode::serialize(value).map_err(|e| MLError::Serialization(e.to_string()))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&serialized)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| MLError::Io(e.error))?;
    Ok(())
}

pub(crate) fn load_bincode<T: DeserializeOwned>(path: &Path) -> MLResult<T> {
    let data = std::fs::read(path)?;
    bincode::deserialize(&data).map_err(|e| MLError::Serialization(e.to_string()))
}
