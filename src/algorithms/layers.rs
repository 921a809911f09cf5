/// 预处理层
///
/// 预处理层在模型 fit / predict 之前对特征矩阵做变换，输出与输入形状相同。
/// `KalmanFilterLayer` 为每一列维护一个独立的 `ChannelFilter`，
/// 状态在多次 transform 调用之间延续（例如先训练集后测试集）。
/// 如果两次调用属于互不相关的数据流，需要先调用 `reset`。

use crate::algorithms::error::{LocalizerError, Result};
use crate::algorithms::kalman::ChannelFilter;
use ndarray::{Array2, ArrayD, ArrayView2, ArrayViewD, Ix2};
use std::fmt;

/// 默认过程噪声
pub const DEFAULT_Q: f64 = 0.04;
/// 默认测量噪声
pub const DEFAULT_R: f64 = 4.0;

/// 预处理层能力
pub trait PreprocessingLayer: fmt::Debug + Send {
    /// 层名称
    fn name(&self) -> &str;

    /// 从训练数据学习参数，默认不做任何事
    fn fit(&mut self, _x: ArrayView2<f64>, _y: Option<ArrayView2<f64>>) -> Result<()> {
        Ok(())
    }

    /// 变换特征矩阵，输出形状与输入一致
    fn transform(&mut self, x: ArrayView2<f64>) -> Result<Array2<f64>>;

    /// 清除层内部状态，默认不做任何事
    fn reset(&mut self) {}

    /// 任意维度输入的入口，非二维输入返回 `ShapeMismatch`
    fn transform_dyn(&mut self, x: ArrayViewD<f64>) -> Result<ArrayD<f64>> {
        let ndim = x.ndim();
        let matrix = x
            .into_dimensionality::<Ix2>()
            .map_err(|_| LocalizerError::shape("预处理层输入维度", 2, ndim))?;
        Ok(self.transform(matrix)?.into_dyn())
    }
}

/// 逐列卡尔曼滤波层
#[derive(Clone, Debug)]
pub struct KalmanFilterLayer {
    q: f64,
    r: f64,
    /// 每列一个滤波器，首次使用时创建
    filters: Option<Vec<ChannelFilter>>,
}

impl KalmanFilterLayer {
    /// 创建滤波层，`q` 与 `r` 必须为正
    pub fn new(q: f64, r: f64) -> Result<Self> {
        if q.is_nan() || q <= 0.0 || q.is_infinite() {
            return Err(LocalizerError::invalid("Q", q, "过程噪声必须为正"));
        }
        if r.is_nan() || r <= 0.0 || r.is_infinite() {
            return Err(LocalizerError::invalid("R", r, "测量噪声必须为正"));
        }
        Ok(KalmanFilterLayer { q, r, filters: None })
    }

    pub fn q(&self) -> f64 {
        self.q
    }

    pub fn r(&self) -> f64 {
        self.r
    }

    /// 已创建的通道滤波器（尚未使用时为 None）
    pub fn filters(&self) -> Option<&[ChannelFilter]> {
        self.filters.as_deref()
    }

    fn create_filters(&self, num_cols: usize) -> Result<Vec<ChannelFilter>> {
        (0..num_cols)
            .map(|_| ChannelFilter::new(self.q, self.r))
            .collect()
    }
}

impl Default for KalmanFilterLayer {
    fn default() -> Self {
        KalmanFilterLayer {
            q: DEFAULT_Q,
            r: DEFAULT_R,
            filters: None,
        }
    }
}

impl PreprocessingLayer for KalmanFilterLayer {
    fn name(&self) -> &str {
        "kalman_filter"
    }

    /// 重置并为 `x` 的每一列分配新的滤波器
    fn fit(&mut self, x: ArrayView2<f64>, _y: Option<ArrayView2<f64>>) -> Result<()> {
        self.filters = Some(self.create_filters(x.ncols())?);
        Ok(())
    }

    fn transform(&mut self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let filters = match self.filters.take() {
            Some(filters) => filters,
            None => {
                tracing::debug!(channels = x.ncols(), "creating channel filters");
                self.create_filters(x.ncols())?
            }
        };
        if filters.len() != x.ncols() {
            let expected = filters.len();
            self.filters = Some(filters);
            return Err(LocalizerError::shape("滤波层通道数", expected, x.ncols()));
        }
        let filters = self.filters.insert(filters);

        let mut out = Array2::zeros(x.raw_dim());
        for (col, filter) in filters.iter_mut().enumerate() {
            for (i, &z) in x.column(col).iter().enumerate() {
                out[[i, col]] = filter.update(z);
            }
        }
        Ok(out)
    }

    fn reset(&mut self) {
        self.filters = None;
    }
}
