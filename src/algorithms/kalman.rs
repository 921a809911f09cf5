/// 单通道卡尔曼滤波器
///
/// 对单个 RSSI 通道做递推平滑。NaN 表示该时刻没有读数：
/// 未初始化时保持未初始化，跟踪中时只做预测（方差增大，估计不动）。
///
/// 参考: https://www.wouterbulten.nl/posts/kalman-filters-explained-removing-noise-from-rssi-signals/

use crate::algorithms::error::{LocalizerError, Result};

/// 初始化时的先验方差（刻意取较大值）
pub const INITIAL_VARIANCE: f64 = 10.0;

/// 单通道卡尔曼滤波器
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelFilter {
    /// 过程噪声方差
    q: f64,
    /// 测量噪声方差
    r: f64,
    /// 当前估计值（None 表示未初始化）
    x: Option<f64>,
    /// 估计方差
    p: f64,
}

impl ChannelFilter {
    /// 创建新的滤波器
    ///
    /// `q`、`r` 必须非负且不为 NaN。`r` 可以为无穷大（完全不信任测量）。
    /// 两者都为正时才能保证初始化后 P > 0。
    pub fn new(q: f64, r: f64) -> Result<Self> {
        if q.is_nan() || q < 0.0 || q.is_infinite() {
            return Err(LocalizerError::invalid("Q", q, "过程噪声必须是非负有限数"));
        }
        if r.is_nan() || r < 0.0 {
            return Err(LocalizerError::invalid("R", r, "测量噪声不能为负"));
        }
        Ok(ChannelFilter {
            q,
            r,
            x: None,
            p: INITIAL_VARIANCE,
        })
    }

    /// 输入一个测量值，返回平滑后的估计
    pub fn update(&mut self, z: f64) -> f64 {
        let Some(x) = self.x else {
            if z.is_nan() {
                return f64::NAN;
            }
            tracing::trace!(value = z, "channel filter initialized");
            self.x = Some(z);
            self.p = INITIAL_VARIANCE;
            return z;
        };

        // 预测
        self.p += self.q;

        if z.is_nan() {
            return x;
        }

        // 更新；P 与 R 同时为 0 时完全信任测量
        let k = if self.p + self.r > 0.0 {
            self.p / (self.p + self.r)
        } else {
            1.0
        };
        let x = x + k * (z - x);
        self.p *= 1.0 - k;
        self.x = Some(x);
        x
    }

    /// 当前估计值（未初始化时为 None）
    pub fn estimate(&self) -> Option<f64> {
        self.x
    }

    /// 当前估计方差
    pub fn variance(&self) -> f64 {
        self.p
    }

    pub fn is_initialized(&self) -> bool {
        self.x.is_some()
    }

    /// 回到未初始化状态
    pub fn reset(&mut self) {
        self.x = None;
        self.p = INITIAL_VARIANCE;
    }
}
