/// 回归模型抽象
///
/// 模型持有一个有序的预处理管线。`fit` 与 `predict` 会先把输入依次
/// 交给管线中的每一层，再调用模型自己的训练 / 预测逻辑。

use crate::algorithms::error::Result;
use crate::algorithms::layers::PreprocessingLayer;
use ndarray::{Array2, ArrayView2};

/// 有序的预处理层列表
#[derive(Debug, Default)]
pub struct Pipeline {
    layers: Vec<Box<dyn PreprocessingLayer>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_layers(layers: Vec<Box<dyn PreprocessingLayer>>) -> Self {
        Pipeline { layers }
    }

    /// 在末尾追加一层
    pub fn push(&mut self, layer: Box<dyn PreprocessingLayer>) {
        self.layers.push(layer);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[Box<dyn PreprocessingLayer>] {
        &self.layers
    }

    /// 依次执行每一层的 transform
    pub fn apply(&mut self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let mut current = x.to_owned();
        for layer in &mut self.layers {
            current = layer.transform(current.view())?;
        }
        Ok(current)
    }

    /// 重置所有层
    pub fn reset(&mut self) {
        for layer in &mut self.layers {
            layer.reset();
        }
    }
}

/// 回归模型能力
///
/// 实现者只需提供 `pipeline_mut`、`fit_transformed` 与 `predict_transformed`，
/// 预处理由默认方法 `fit` / `predict` 统一完成。
///
/// 预处理层可能有状态，所以输入检查放在 `validate_fit` / `validate_predict`，
/// 在数据进入管线之前执行；检查失败时各层状态保持不变。
pub trait RegressionModel {
    /// 模型名称
    fn name(&self) -> &str;

    fn pipeline(&self) -> &Pipeline;

    fn pipeline_mut(&mut self) -> &mut Pipeline;

    /// 在预处理后的数据上训练
    fn fit_transformed(&mut self, x: Array2<f64>, y: Array2<f64>) -> Result<()>;

    /// 在预处理后的数据上预测
    fn predict_transformed(&self, x: ArrayView2<f64>) -> Result<Array2<f64>>;

    /// 训练输入检查，在预处理之前调用
    fn validate_fit(&self, _x: &ArrayView2<f64>, _y: &ArrayView2<f64>) -> Result<()> {
        Ok(())
    }

    /// 预测输入检查，在预处理之前调用
    fn validate_predict(&self, _x: &ArrayView2<f64>) -> Result<()> {
        Ok(())
    }

    /// 预处理后训练，返回自身以便链式调用
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<&mut Self>
    where
        Self: Sized,
    {
        self.validate_fit(&x, &y)?;
        let x = self.pipeline_mut().apply(x)?;
        self.fit_transformed(x, y.to_owned())?;
        Ok(self)
    }

    /// 预处理后预测
    ///
    /// 需要 `&mut self`：有状态的预处理层每次调用都会推进内部状态。
    fn predict(&mut self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.validate_predict(&x)?;
        let x = self.pipeline_mut().apply(x)?;
        self.predict_transformed(x.view())
    }

    /// 重置管线中所有层的状态
    fn reset_layers(&mut self) {
        self.pipeline_mut().reset();
    }
}
