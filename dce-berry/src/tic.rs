//! TIC: mask 区域的时间-增强曲线与若干派生标量.
//!
//! 曲线的纵轴是前景 mask 内逐体素增强百分比的平均值, 横轴是采集
//! 时刻 (分钟). 一次拟合排除第一行 (基线锚点恒为 0, 保留它会把
//! 斜率往下拉).

use ndarray::{Array1, ArrayView3, ArrayView4, Axis, Zip};

use crate::config::{AcquisitionTiming, PhaseIndices};
use crate::consts::EPSILON;
use crate::fitting::{linear_f64, LinearFit};
use crate::tables::{TicRow, TicTable};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// TIC 表与其一次拟合.
#[derive(Clone, Debug, PartialEq)]
pub struct TicCurve {
    /// 逐时间点的曲线表.
    pub table: TicTable,

    /// 去除基线锚点后的一次拟合.
    pub fit: LinearFit<f64>,
}

/// 三个增强派生标量, 均以百分比计.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnhancementSummary {
    /// Maximum Enhancement: 逐体素时间最大增强的 mask 平均.
    pub max_enhancement: f64,

    /// Delta Enhancement: late 相与 early 相增强差的 mask 平均.
    pub delta_enhancement: f64,

    /// First Pass Enhancement: early 相增强的 mask 平均.
    pub first_pass_enhancement: f64,
}

/// mask 区域在时间点 `t` 的平均增强百分比. mask 为空时为 NaN.
fn mean_enhancement(
    frame: ArrayView3<f64>,
    s0: ArrayView3<f64>,
    mask: ArrayView3<bool>,
) -> f64 {
    let mut acc = 0.0;
    let mut n = 0u64;
    Zip::from(&frame).and(&s0).and(&mask).for_each(|&v, &v0, &m| {
        if m {
            acc += 100.0 * (v - v0) / (v0 + EPSILON);
            n += 1;
        }
    });
    acc / n as f64
}

/// 计算 TIC 曲线表与其一次拟合.
///
/// `volume` 是 `[t, z, y, x]` 序列, `mask` 是前景 mask, `timing` 的时间
/// 标签个数必须与序列一致且至少为 3 (拟合去掉基线锚点后仍需两个点).
/// 第一行的拟合值为 `None`, 其余行为拟合直线在该时刻的取值.
pub fn time_intensity_curve(
    volume: ArrayView4<f64>,
    mask: ArrayView3<bool>,
    timing: &AcquisitionTiming,
    pre: usize,
) -> TicCurve {
    let nt = volume.len_of(Axis(0));
    assert!(nt >= 3, "TIC 拟合至少需要 3 个时间点");
    assert_eq!(timing.len(), nt, "时间标签个数必须与序列一致");
    assert!(pre < nt, "pre-contrast 下标必须落在序列范围内");
    assert_eq!(
        volume.index_axis(Axis(0), 0).dim(),
        mask.dim(),
        "mask 必须与单时间点同形状"
    );

    let s0 = volume.index_axis(Axis(0), pre);
    let means: Vec<f64> = (0..nt)
        .map(|t| mean_enhancement(volume.index_axis(Axis(0), t), s0, mask))
        .collect();

    let x = Array1::from_iter(timing.timepoints()[1..].iter().copied());
    let y = Array1::from_iter(means[1..].iter().copied());
    let fit = linear_f64(x.view(), y.view());

    let rows = timing
        .timepoints()
        .iter()
        .zip(means.iter())
        .enumerate()
        .map(|(i, (&tm, &mean))| TicRow {
            time_min: tm,
            mean_enhancement_pct: mean,
            fitted: (i > 0).then(|| fit.eval(tm)),
        })
        .collect();

    TicCurve {
        table: TicTable { rows },
        fit,
    }
}

/// 三个增强派生标量的 mask 平均. mask 为空时均为 NaN.
pub fn enhancement_summary(
    volume: ArrayView4<f64>,
    mask: ArrayView3<bool>,
    phases: PhaseIndices,
) -> EnhancementSummary {
    let nt = volume.len_of(Axis(0));
    assert!(
        phases.pre < nt && phases.early < nt && phases.late < nt,
        "相位下标必须落在序列范围内"
    );

    let s0 = volume.index_axis(Axis(0), phases.pre);
    let s_early = volume.index_axis(Axis(0), phases.early);
    let s_late = volume.index_axis(Axis(0), phases.late);

    let mut max_acc = 0.0;
    let mut delta_acc = 0.0;
    let mut first_acc = 0.0;
    let mut n = 0u64;

    Zip::indexed(&mask).for_each(|idx, &m| {
        if !m {
            return;
        }
        let v0 = s0[idx];
        let enhance = |v: f64| 100.0 * (v - v0) / (v0 + EPSILON);

        let peak = (0..nt)
            .map(|t| enhance(volume[(t, idx.0, idx.1, idx.2)]))
            .fold(f64::NEG_INFINITY, f64::max);
        max_acc += peak;
        delta_acc += enhance(s_late[idx]) - enhance(s_early[idx]);
        first_acc += enhance(s_early[idx]);
        n += 1;
    });

    let n = n as f64;
    EnhancementSummary {
        max_enhancement: max_acc / n,
        delta_enhancement: delta_acc / n,
        first_pass_enhancement: first_acc / n,
    }
}
