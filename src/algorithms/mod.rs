/// 定位算法模块
///
/// 该模块提供基于 RSSI 指纹的 kNN 定位：
/// - 多种距离度量（欧几里得、曼哈顿、自定义）
/// - 单通道卡尔曼滤波与逐列滤波预处理层
/// - 带预处理管线的回归模型抽象
/// - 定位误差统计

pub mod error;
pub mod distance;
pub mod kalman;
pub mod layers;
pub mod model;
pub mod knn;
pub mod results;

pub use error::*;
pub use distance::*;
pub use kalman::*;
pub use layers::*;
pub use model::*;
pub use knn::*;
pub use results::*;
