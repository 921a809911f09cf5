//! RSSI 指纹 kNN 室内定位
//!
//! 从每条边（信标-接收器链路）的 RSSI 读数估计二维坐标：
//! 先用逐通道卡尔曼滤波平滑信号，再在带标注的指纹库上做 kNN 回归。
//!
//! ```
//! use knnloc::algorithms::{KnnLocalizer, LocalizerError, RegressionModel};
//! use ndarray::array;
//!
//! let x = array![[-50.0, -70.0], [-70.0, -50.0]];
//! let y = array![[0.0, 0.0], [500.0, 500.0]];
//!
//! let mut model = KnnLocalizer::new(1)?;
//! let pred = model.fit(x.view(), y.view())?.predict(array![[-52.0, -69.0]].view())?;
//! assert_eq!(pred, array![[0.0, 0.0]]);
//! # Ok::<(), LocalizerError>(())
//! ```

pub mod algorithms;
pub mod config;
pub mod dataset;
