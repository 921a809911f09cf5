/// kNN 指纹定位
///
/// 训练时保存（预处理后的）指纹矩阵与坐标标签；预测时对每个查询行
/// 暴力计算到全部训练指纹的距离，取最近的 k 个，坐标按维度取平均。
///
/// 近邻选择是部分选择（不对全部距离排序）。选择时以 (距离, 训练行号)
/// 作为排序键，所以距离相同的近邻总是优先取行号较小者，结果可复现。

use crate::algorithms::distance::{pairwise, Metric};
use crate::algorithms::error::{LocalizerError, Result};
use crate::algorithms::layers::PreprocessingLayer;
use crate::algorithms::model::{Pipeline, RegressionModel};
use ndarray::{Array2, ArrayView1, ArrayView2};
use std::cmp::Ordering;

/// 原始实现的默认近邻数
pub const DEFAULT_K: usize = 5;

/// 训练后保存的数据
#[derive(Clone, Debug)]
struct TrainedState {
    x: Array2<f64>,
    y: Array2<f64>,
}

/// 每个查询行的近邻（按距离升序）
#[derive(Clone, Debug, PartialEq)]
pub struct Neighbors {
    /// M×k 训练行号
    pub indices: Array2<usize>,
    /// M×k 对应距离
    pub distances: Array2<f64>,
}

/// kNN 定位模型
#[derive(Debug)]
pub struct KnnLocalizer {
    k: usize,
    metric: Metric,
    pipeline: Pipeline,
    state: Option<TrainedState>,
}

impl KnnLocalizer {
    /// 创建模型，`k` 必须大于 0
    pub fn new(k: usize) -> Result<Self> {
        if k == 0 {
            return Err(LocalizerError::invalid("k", k, "近邻数必须大于 0"));
        }
        Ok(KnnLocalizer {
            k,
            metric: Metric::default(),
            pipeline: Pipeline::new(),
            state: None,
        })
    }

    /// 设置距离度量
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// 追加一个预处理层
    pub fn with_layer(mut self, layer: impl PreprocessingLayer + 'static) -> Self {
        self.pipeline.push(Box::new(layer));
        self
    }

    /// 替换整个预处理管线
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn metric(&self) -> &Metric {
        &self.metric
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// 训练样本数（未训练时为 0）
    pub fn n_train(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.x.nrows())
    }

    /// 查询每行的 k 个近邻
    ///
    /// 输入视为已经过预处理，不会再经过管线。
    pub fn kneighbors(&self, x: ArrayView2<f64>) -> Result<Neighbors> {
        let state = self.checked_state(&x)?;
        let dists = pairwise(x, state.x.view(), &self.metric)?;

        let mut indices = Array2::zeros((x.nrows(), self.k));
        let mut distances = Array2::zeros((x.nrows(), self.k));
        for (j, row) in dists.rows().into_iter().enumerate() {
            for (slot, (d, idx)) in nearest(row, self.k).into_iter().enumerate() {
                indices[[j, slot]] = idx;
                distances[[j, slot]] = d;
            }
        }
        Ok(Neighbors { indices, distances })
    }

    fn checked_state(&self, x: &ArrayView2<f64>) -> Result<&TrainedState> {
        let state = self.state.as_ref().ok_or(LocalizerError::NotFitted)?;
        if self.k > state.x.nrows() {
            return Err(LocalizerError::invalid(
                "k",
                self.k,
                "近邻数超过训练样本数",
            ));
        }
        if x.ncols() != state.x.ncols() {
            return Err(LocalizerError::shape(
                "查询特征列数",
                state.x.ncols(),
                x.ncols(),
            ));
        }
        Ok(state)
    }
}

impl RegressionModel for KnnLocalizer {
    fn name(&self) -> &str {
        "knn"
    }

    fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    fn pipeline_mut(&mut self) -> &mut Pipeline {
        &mut self.pipeline
    }

    fn validate_fit(&self, x: &ArrayView2<f64>, y: &ArrayView2<f64>) -> Result<()> {
        if x.nrows() != y.nrows() {
            return Err(LocalizerError::shape("fit 样本数 (X vs y)", x.nrows(), y.nrows()));
        }
        if x.nrows() == 0 {
            return Err(LocalizerError::invalid("X", "0 行", "训练集不能为空"));
        }
        Ok(())
    }

    fn validate_predict(&self, x: &ArrayView2<f64>) -> Result<()> {
        self.checked_state(x).map(|_| ())
    }

    fn fit_transformed(&mut self, x: Array2<f64>, y: Array2<f64>) -> Result<()> {
        self.validate_fit(&x.view(), &y.view())?;
        tracing::debug!(
            samples = x.nrows(),
            features = x.ncols(),
            targets = y.ncols(),
            "knn fitted"
        );
        self.state = Some(TrainedState { x, y });
        Ok(())
    }

    fn predict_transformed(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let state = self.checked_state(&x)?;
        tracing::debug!(
            queries = x.nrows(),
            k = self.k,
            metric = %self.metric,
            "knn predict"
        );

        let dists = pairwise(x, state.x.view(), &self.metric)?;
        let mut out = Array2::zeros((x.nrows(), state.y.ncols()));

        for (row, mut pred) in dists.rows().into_iter().zip(out.rows_mut()) {
            let mut idx: Vec<usize> = nearest(row, self.k).into_iter().map(|(_, i)| i).collect();
            // 按行号累加，使结果与近邻的距离次序无关
            idx.sort_unstable();
            for i in idx {
                pred += &state.y.row(i);
            }
            pred /= self.k as f64;
        }
        Ok(out)
    }
}

/// 选出距离最小的 k 个 (距离, 行号)，按升序返回
///
/// NaN 距离（缺失读数）排在所有有限距离之后，无论其符号位。
fn nearest(dists: ArrayView1<f64>, k: usize) -> Vec<(f64, usize)> {
    let mut candidates: Vec<(f64, usize)> = dists.iter().copied().zip(0..).collect();
    let rank = |d: f64| if d.is_nan() { f64::INFINITY } else { d };
    let by_key = |a: &(f64, usize), b: &(f64, usize)| -> Ordering {
        rank(a.0).total_cmp(&rank(b.0)).then(a.1.cmp(&b.1))
    };

    if k < candidates.len() {
        candidates.select_nth_unstable_by(k - 1, by_key);
        candidates.truncate(k);
    }
    candidates.sort_unstable_by(by_key);
    candidates
}
