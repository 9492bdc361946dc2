//! 运行时错误.

use std::fmt;

use crate::Idx3d;

/// 流水线输入校验与几何解析的运行时错误.
///
/// 数值退化 (除零, 负 SER 等) 不在此列: 它们被折叠为 non-SER 状态而非错误.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// 序列时间点不足. 参数为实际时间点数 (TIC 拟合至少需要 3 个).
    TooFewTimepoints(usize),

    /// mask 的空间形状与序列单时间点不一致.
    ///
    /// 第一个参数是序列的空间形状, 第二个是 mask 的形状.
    ShapeMismatch(Idx3d, Idx3d),

    /// 时间标签个数与序列时间点数不一致.
    ///
    /// 第一个参数是时间标签个数, 第二个是序列时间点数.
    TimingMismatch(usize, usize),

    /// 相位下标超出序列范围.
    PhaseIndexOutOfRange {
        /// 越界的下标.
        index: usize,
        /// 序列时间点数.
        len: usize,
    },

    /// pre-contrast 与 early post-contrast 下标不允许相同.
    PreEqualsEarly(usize),

    /// 基线之后的时间标签全部相同, TIC 趋势无定义.
    DegenerateTimeAxis,

    /// ROI 盒完全落在参考网格之外.
    RoiOutsideGrid,

    /// ROI 体素范围为空或超出网格.
    DegenerateRoi,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::TooFewTimepoints(nt) => {
                write!(f, "sequence has {nt} timepoints, at least 3 are required")
            }
            Self::ShapeMismatch(vol, mask) => {
                write!(f, "mask shape {mask:?} does not match volume shape {vol:?}")
            }
            Self::TimingMismatch(labels, frames) => {
                write!(f, "{labels} time labels for {frames} frames")
            }
            Self::PhaseIndexOutOfRange { index, len } => {
                write!(f, "phase index {index} out of range for {len} timepoints")
            }
            Self::PreEqualsEarly(idx) => {
                write!(
                    f,
                    "pre contrast index cannot be the same as the early post contrast ({idx})"
                )
            }
            Self::DegenerateTimeAxis => {
                write!(f, "post-baseline time labels are all identical, TIC fit is undefined")
            }
            Self::RoiOutsideGrid => write!(f, "ROI box lies entirely outside the reference grid"),
            Self::DegenerateRoi => write!(f, "ROI voxel bounds are empty or exceed the grid"),
        }
    }
}

impl std::error::Error for PipelineError {}

/// 流水线运行时结果.
pub type PipelineResult<T> = Result<T, PipelineError>;
