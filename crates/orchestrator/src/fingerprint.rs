//! 数据集指纹：记录下游阶段上次消费时各文件的 SHA-256

use crate::error::OrchestratorResult;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetFingerprints {
    entries: BTreeMap<String, String>,
}

/// 文件内容的十六进制 SHA-256，文件不存在时为 `None`
pub fn hash_file(path: &Path) -> OrchestratorResult<Option<String>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(hex::encode(Sha256::digest(&bytes)))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl DatasetFingerprints {
    /// 读取状态文件，不存在时视为从未运行
    pub fn load(path: &Path) -> OrchestratorResult<Self> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> OrchestratorResult<()> {
        let json = serde_json::to_vec_pretty(self)?;
        etl::storage::write_bytes(path, &json)?;
        Ok(())
    }

    /// 任一文件的当前内容与上次记录不同
    pub fn changed(&self, paths: &[&Path]) -> OrchestratorResult<bool> {
        for path in paths {
            let current = hash_file(path)?;
            if current.as_deref() != self.entries.get(&key(path)).map(String::as_str) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// 记录文件当前的指纹
    pub fn record(&mut self, paths: &[&Path]) -> OrchestratorResult<()> {
        for path in paths {
            match hash_file(path)? {
                Some(hash) => {
                    self.entries.insert(key(path), hash);
                }
                None => {
                    self.entries.remove(&key(path));
                }
            }
        }
        Ok(())
    }
}
