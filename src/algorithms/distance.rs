/// 距离度量
///
/// 提供两类矩阵距离计算：
/// - `rowwise`: 两个同行数矩阵逐行对应计算，返回长度 N 的向量
/// - `pairwise`: 任意两个矩阵两两计算，返回 N×M 距离矩阵
///
/// 内置欧几里得 (L2) 与曼哈顿 (L1) 度量，也支持调用方自定义的距离函数。

use crate::algorithms::error::{LocalizerError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Zip};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// 自定义距离函数：输入两个等长行向量，返回非负距离
pub type DistanceFn = Arc<dyn Fn(ArrayView1<f64>, ArrayView1<f64>) -> f64 + Send + Sync>;

/// 距离度量
#[derive(Clone, Default)]
pub enum Metric {
    /// 欧几里得距离 √Σ(aᵢ - bᵢ)²
    #[default]
    Euclidean,
    /// 曼哈顿距离 Σ|aᵢ - bᵢ|
    Manhattan,
    /// 调用方提供的距离函数
    Custom { name: String, func: DistanceFn },
}

impl Metric {
    /// 包装一个自定义距离函数
    pub fn custom<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(ArrayView1<f64>, ArrayView1<f64>) -> f64 + Send + Sync + 'static,
    {
        Metric::Custom {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// 度量名称
    pub fn name(&self) -> &str {
        match self {
            Metric::Euclidean => "euclidean",
            Metric::Manhattan => "manhattan",
            Metric::Custom { name, .. } => name,
        }
    }

    /// 计算两个行向量之间的距离
    pub fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match self {
            Metric::Euclidean => Zip::from(&a)
                .and(&b)
                .fold(0.0_f64, |acc, &x, &y| acc + (x - y) * (x - y))
                .sqrt(),
            Metric::Manhattan => Zip::from(&a)
                .and(&b)
                .fold(0.0_f64, |acc, &x, &y| acc + (x - y).abs()),
            Metric::Custom { func, .. } => func(a, b),
        }
    }
}

/// 按名称查找内置度量，支持别名 l2 / l1
impl FromStr for Metric {
    type Err = LocalizerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "euclidean" | "l2" => Ok(Metric::Euclidean),
            "manhattan" | "l1" => Ok(Metric::Manhattan),
            _ => Err(LocalizerError::UnknownMetric(s.to_string())),
        }
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Custom { name, .. } => write!(f, "Custom({name})"),
            other => write!(f, "{}", other.name()),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 逐行距离：第 i 个元素为 `a` 第 i 行与 `b` 第 i 行的距离
///
/// # 错误
/// - 行数或列数不一致时返回 `ShapeMismatch`
pub fn rowwise(a: ArrayView2<f64>, b: ArrayView2<f64>, metric: &Metric) -> Result<Array1<f64>> {
    if a.nrows() != b.nrows() {
        return Err(LocalizerError::shape("rowwise 行数", a.nrows(), b.nrows()));
    }
    check_columns("rowwise 列数", &a, &b)?;

    Ok(a.rows()
        .into_iter()
        .zip(b.rows())
        .map(|(ra, rb)| metric.distance(ra, rb))
        .collect())
}

/// 两两距离：返回 N×M 矩阵，(i, j) 为 `a` 第 i 行与 `b` 第 j 行的距离
///
/// # 错误
/// - 列数不一致时返回 `ShapeMismatch`
pub fn pairwise(a: ArrayView2<f64>, b: ArrayView2<f64>, metric: &Metric) -> Result<Array2<f64>> {
    check_columns("pairwise 列数", &a, &b)?;

    if let Metric::Euclidean = metric {
        return Ok(pairwise_euclidean(a, b));
    }

    let mut out = Array2::zeros((a.nrows(), b.nrows()));
    for (i, ra) in a.rows().into_iter().enumerate() {
        for (j, rb) in b.rows().into_iter().enumerate() {
            out[[i, j]] = metric.distance(ra, rb);
        }
    }
    Ok(out)
}

/// 欧几里得两两距离，使用 |a|² + |b|² - 2a·b 展开，以矩阵乘法完成主要计算
fn pairwise_euclidean(a: ArrayView2<f64>, b: ArrayView2<f64>) -> Array2<f64> {
    let a_sq: Array1<f64> = a.rows().into_iter().map(|r| r.dot(&r)).collect();
    let b_sq: Array1<f64> = b.rows().into_iter().map(|r| r.dot(&r)).collect();

    let mut out = a.dot(&b.t());
    for ((i, j), v) in out.indexed_iter_mut() {
        // 近乎相同的向量在舍入下可能得到微小负数；NaN（缺失读数）原样保留
        let sq = a_sq[i] + b_sq[j] - 2.0 * *v;
        *v = if sq < 0.0 { 0.0 } else { sq.sqrt() };
    }
    out
}

fn check_columns(context: &'static str, a: &ArrayView2<f64>, b: &ArrayView2<f64>) -> Result<()> {
    if a.ncols() != b.ncols() {
        return Err(LocalizerError::shape(context, a.ncols(), b.ncols()));
    }
    Ok(())
}
