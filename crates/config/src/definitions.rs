//! 套利对定义 (每轮重新加载，支持不停机修改)

use anyhow::{Context, Result};
use async_trait::async_trait;
use models::{PairDefinition, TriangleDefinition};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_retry() -> usize {
    5
}

/// 某个策略的定义列表与试探次数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionSet<D> {
    /// 网格搜索的试探次数 (RETRY)
    #[serde(default = "default_retry")]
    pub retry: usize,
    #[serde(default = "Vec::new")]
    pub pairs: Vec<D>,
}

impl<D> Default for DefinitionSet<D> {
    fn default() -> Self {
        Self {
            retry: default_retry(),
            pairs: Vec::new(),
        }
    }
}

impl<D> DefinitionSet<D> {
    pub fn new(retry: usize, pairs: Vec<D>) -> Self {
        Self { retry, pairs }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// 定义文件的完整内容
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageDefinitions {
    #[serde(default)]
    pub pair: DefinitionSet<PairDefinition>,
    #[serde(default)]
    pub triangle: DefinitionSet<TriangleDefinition>,
}

impl ArbitrageDefinitions {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Invalid arbitrage definition JSON")
    }
}

/// 配置来源
#[async_trait]
pub trait DefinitionSource: Send + Sync {
    async fn load(&self) -> Result<ArbitrageDefinitions>;
}

/// JSON 文件来源，每次调用都重新读取
#[derive(Debug, Clone)]
pub struct JsonDefinitionFile {
    path: PathBuf,
}

impl JsonDefinitionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DefinitionSource for JsonDefinitionFile {
    async fn load(&self) -> Result<ArbitrageDefinitions> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        ArbitrageDefinitions::from_json(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }
}

/// 内存来源，可在运行中替换
#[derive(Debug, Default)]
pub struct StaticDefinitions {
    inner: RwLock<ArbitrageDefinitions>,
}

impl StaticDefinitions {
    pub fn new(definitions: ArbitrageDefinitions) -> Self {
        Self {
            inner: RwLock::new(definitions),
        }
    }

    pub fn replace(&self, definitions: ArbitrageDefinitions) {
        *self.inner.write() = definitions;
    }
}

#[async_trait]
impl DefinitionSource for StaticDefinitions {
    async fn load(&self) -> Result<ArbitrageDefinitions> {
        Ok(self.inner.read().clone())
    }
}
