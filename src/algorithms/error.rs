/// 错误类型定义
///
/// 核心（距离、滤波、模型）使用 `LocalizerError`。

use thiserror::Error;

/// 核心操作的 Result 别名
pub type Result<T> = std::result::Result<T, LocalizerError>;

/// 定位核心错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocalizerError {
    /// 输入形状不匹配（行数、列数或维度）
    #[error("形状不匹配: {context}: 期望 {expected}, 实际 {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: String,
        actual: String,
    },

    /// 注册表中不存在的距离度量
    #[error("未知的距离度量: '{0}'")]
    UnknownMetric(String),

    /// 参数非法（k、Q、R 等）
    #[error("参数非法: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    /// 在 fit 之前调用 predict
    #[error("模型尚未训练，请先调用 fit")]
    NotFitted,
}

impl LocalizerError {
    pub(crate) fn shape(
        context: &'static str,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        LocalizerError::ShapeMismatch {
            context,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub(crate) fn invalid(name: &'static str, value: impl ToString, reason: &'static str) -> Self {
        LocalizerError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }
}
