/// 定位误差统计
///
/// 根据预测坐标与真实坐标计算每个样本的欧几里得误差，
/// 并汇总为均值、中位数、90 分位、最小、最大与 RMSE。

use crate::algorithms::distance::{rowwise, Metric};
use crate::algorithms::error::Result;
use chrono::{DateTime, Utc};
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 每个样本的定位误差：预测与真实坐标的欧几里得距离
pub fn residuals(pred: ArrayView2<f64>, truth: ArrayView2<f64>) -> Result<Array1<f64>> {
    rowwise(pred, truth, &Metric::Euclidean)
}

/// 误差汇总统计
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorStats {
    pub mean: f64,
    pub median: f64,
    pub p90: f64,
    pub min: f64,
    pub max: f64,
    pub rmse: f64,
    /// 参与统计的样本数
    pub count: usize,
}

impl ErrorStats {
    /// 从误差向量计算统计量，空输入返回 None
    ///
    /// 分位数使用相邻次序统计量之间的线性插值。
    pub fn from_errors(errors: ArrayView1<f64>) -> Option<Self> {
        if errors.is_empty() {
            return None;
        }

        let mut sorted = errors.to_vec();
        sorted.sort_unstable_by(|a, b| a.total_cmp(b));

        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let mean_sq = sorted.iter().map(|e| e * e).sum::<f64>() / n;

        Some(ErrorStats {
            mean,
            median: percentile(&sorted, 50.0),
            p90: percentile(&sorted, 90.0),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            rmse: mean_sq.sqrt(),
            count: sorted.len(),
        })
    }
}

impl fmt::Display for ErrorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mean={:.3} median={:.3} p90={:.3} min={:.3} max={:.3} rmse={:.3} (n={})",
            self.mean, self.median, self.p90, self.min, self.max, self.rmse, self.count
        )
    }
}

/// 在已排序数据上求分位数（q 取 0~100）
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = (q / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// 一次完整评估的报告
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// 使用的模型名称
    pub model: String,
    pub k: usize,
    pub metric: String,
    /// 预处理层名称（按顺序）
    pub layers: Vec<String>,
    pub train_samples: usize,
    pub test_samples: usize,
    /// 误差统计（测试集为空时为 None）
    pub stats: Option<ErrorStats>,
    /// 生成时间
    pub generated_at: DateTime<Utc>,
}

impl EvaluationReport {
    /// 根据预测结果与真实坐标生成报告
    pub fn new(
        model: impl Into<String>,
        k: usize,
        metric: impl Into<String>,
        layers: Vec<String>,
        train_samples: usize,
        pred: ArrayView2<f64>,
        truth: ArrayView2<f64>,
    ) -> Result<Self> {
        let errors = residuals(pred, truth)?;
        Ok(EvaluationReport {
            model: model.into(),
            k,
            metric: metric.into(),
            layers,
            train_samples,
            test_samples: errors.len(),
            stats: ErrorStats::from_errors(errors.view()),
            generated_at: Utc::now(),
        })
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} k={} metric={} layers=[{}] train={} test={}: ",
            self.generated_at.format("%Y-%m-%d %H:%M:%S"),
            self.model,
            self.k,
            self.metric,
            self.layers.join(","),
            self.train_samples,
            self.test_samples
        )?;
        match &self.stats {
            Some(stats) => write!(f, "{stats}"),
            None => write!(f, "no samples"),
        }
    }
}
