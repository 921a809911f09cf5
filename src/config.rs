/// 定位模型配置
///
/// JSON 格式示例：
///
/// ```json
/// {
///   "k": 33,
///   "metric": "euclidean",
///   "layers": [{ "type": "kalman_filter", "Q": 0.04, "R": 4.0 }]
/// }
/// ```

use crate::algorithms::{
    KalmanFilterLayer, KnnLocalizer, LocalizerError, Metric, Pipeline, PreprocessingLayer,
    DEFAULT_K, DEFAULT_Q, DEFAULT_R,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("读取配置文件 {path} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("配置格式错误: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Model(#[from] LocalizerError),
}

/// 预处理层配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerConfig {
    KalmanFilter {
        #[serde(rename = "Q", default = "default_q")]
        q: f64,
        #[serde(rename = "R", default = "default_r")]
        r: f64,
    },
}

fn default_q() -> f64 {
    DEFAULT_Q
}

fn default_r() -> f64 {
    DEFAULT_R
}

fn default_metric() -> String {
    "euclidean".to_string()
}

impl LayerConfig {
    /// 构建对应的预处理层
    pub fn build(&self) -> Result<Box<dyn PreprocessingLayer>, LocalizerError> {
        match *self {
            LayerConfig::KalmanFilter { q, r } => Ok(Box::new(KalmanFilterLayer::new(q, r)?)),
        }
    }
}

/// kNN 定位模型配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalizerConfig {
    /// 近邻数
    pub k: usize,
    /// 距离度量名称
    #[serde(default = "default_metric")]
    pub metric: String,
    /// 预处理层（按顺序）
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        LocalizerConfig {
            k: DEFAULT_K,
            metric: default_metric(),
            layers: Vec::new(),
        }
    }
}

impl LocalizerConfig {
    /// 从 JSON 字符串解析
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// 从 JSON 文件读取
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// 校验参数并构建模型
    pub fn build(&self) -> Result<KnnLocalizer, ConfigError> {
        let metric: Metric = self.metric.parse()?;
        let layers = self
            .layers
            .iter()
            .map(LayerConfig::build)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(KnnLocalizer::new(self.k)?
            .with_metric(metric)
            .with_pipeline(Pipeline::from_layers(layers)))
    }
}
