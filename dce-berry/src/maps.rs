//! Map Engine: 背景 mask, PE 图, SER 图与 SER 分级图的推导.
//!
//! 所有计算都在 ROI 裁剪后的子体上进行, 轴序 `(z, y, x)`; 完整网格
//! 视图由 [`scatter_into_template`] 回填. 纯函数, 相同输入必产生逐
//! 字节相同的输出.

use ndarray::{s, Array3, ArrayView3, ArrayView4, Axis, Zip};
use ordered_float::OrderedFloat;

use crate::config::{PhaseIndices, ThresholdConfig};
use crate::consts::EPSILON;
use crate::geometry::VoxelBounds;
use crate::Idx3d;

/// ROI 子体上的全部参数图.
#[derive(Clone, Debug, PartialEq)]
pub struct CroppedMaps {
    /// Peak Enhancement 图 (百分比). 前景 mask 之外为 0.
    pub pe: Array3<f64>,

    /// Signal Enhancement Ratio 图. 前景 mask 之外与退化值均为 0.
    pub ser: Array3<f64>,

    /// SER 分级图, 0 = non-SER.
    pub ser_class: Array3<u8>,

    /// 前景 mask: 输入分割经背景阈值与 PE 阈值过滤后的结果.
    pub base_mask: Array3<bool>,
}

/// 样本的 `q` 分位数 (线性插值, `q` 取 `[0, 100]`).
///
/// 空数组返回 0.
fn percentile(values: ArrayView3<f64>, q: f64) -> f64 {
    let mut sorted: Vec<OrderedFloat<f64>> = values.iter().map(|&v| OrderedFloat(v)).collect();
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.sort_unstable();

    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo].0 * (1.0 - frac) + sorted[hi].0 * frac
}

/// 在 ROI 子体上推导全部参数图.
///
/// `volume` 是 `[t, z, y, x]` 排布的序列子体, `mask` 与单时间点同形状.
/// 计算顺序:
///
/// 1. 背景阈值 = `background_threshold_pct / 100` 乘 pre-contrast 的
///    95 分位数, 低于它的体素移出前景;
/// 2. `PE = 100 · (S_early - S0) / (S0 + ε)`, 低于 PE 阈值的体素移出前景;
/// 3. `SER = (S_early - S0) / (S_late - S0 + ε)`, 负值或超过 SER 上限的
///    比值折叠为 0;
/// 4. 分级标签按配置区间得出, 前景之外恒为 0.
///
/// PE 与 SER 在前景之外也被显式清零, 因此输出图可以直接用作显示体.
pub fn compute_maps(
    volume: ArrayView4<f64>,
    mask: ArrayView3<bool>,
    phases: PhaseIndices,
    cfg: &ThresholdConfig,
) -> CroppedMaps {
    let nt = volume.len_of(Axis(0));
    assert!(
        phases.pre < nt && phases.early < nt && phases.late < nt,
        "相位下标必须落在序列范围内"
    );
    assert_eq!(
        volume.index_axis(Axis(0), 0).dim(),
        mask.dim(),
        "mask 必须与单时间点同形状"
    );

    let s0 = volume.index_axis(Axis(0), phases.pre);
    let s_early = volume.index_axis(Axis(0), phases.early);
    let s_late = volume.index_axis(Axis(0), phases.late);

    let background = cfg.background_threshold_pct / 100.0 * percentile(s0, 95.0);

    let mut base_mask = Array3::from_elem(mask.dim(), false);
    Zip::from(&mut base_mask)
        .and(&mask)
        .and(&s0)
        .for_each(|m, &seg, &v0| *m = seg && v0 >= background);

    let mut pe = Array3::zeros(mask.dim());
    Zip::from(&mut pe)
        .and(&s0)
        .and(&s_early)
        .for_each(|p, &v0, &ve| *p = 100.0 * (ve - v0) / (v0 + EPSILON));
    Zip::from(&mut base_mask)
        .and(&pe)
        .for_each(|m, &p| *m = *m && p >= cfg.peak_enhancement_threshold);
    Zip::from(&mut pe)
        .and(&base_mask)
        .for_each(|p, &m| {
            if !m {
                *p = 0.0;
            }
        });

    let mut ser = Array3::zeros(mask.dim());
    Zip::from(&mut ser)
        .and(&s0)
        .and(&s_early)
        .and(&s_late)
        .and(&base_mask)
        .for_each(|r, &v0, &ve, &vl, &m| {
            let ratio = (ve - v0) / (vl - v0 + EPSILON);
            *r = if m && ratio > 0.0 && ratio <= cfg.ser_upper_threshold {
                ratio
            } else {
                0.0
            };
        });

    let mut ser_class = Array3::from_elem(mask.dim(), 0u8);
    Zip::from(&mut ser_class)
        .and(&ser)
        .and(&base_mask)
        .for_each(|c, &r, &m| {
            if m {
                *c = cfg.binning.classify(r);
            }
        });

    CroppedMaps {
        pe,
        ser,
        ser_class,
        base_mask,
    }
}

/// 把 ROI 子体图回填到完整网格, ROI 之外填默认值.
///
/// `cropped` 的形状必须与 `bounds` 的范围一致.
pub fn scatter_into_template<A: Clone + Default>(
    cropped: ArrayView3<A>,
    bounds: &VoxelBounds,
    dims: Idx3d,
) -> Array3<A> {
    assert_eq!(cropped.dim(), bounds.extent(), "子体形状必须与 ROI 范围一致");
    assert!(bounds.fits(dims), "ROI 范围必须落在目标网格内");

    let mut full = Array3::from_elem(dims, A::default());
    full.slice_mut(s![
        bounds.min[0]..bounds.max[0],
        bounds.min[1]..bounds.max[1],
        bounds.min[2]..bounds.max[2]
    ])
    .assign(&cropped);
    full
}

/// 沿时间轴的最大强度投影 (MIP).
pub fn mip(volume: ArrayView4<f64>) -> Array3<f64> {
    assert!(volume.len_of(Axis(0)) > 0, "序列至少需要一个时间点");
    volume.fold_axis(Axis(0), f64::NEG_INFINITY, |&acc, &v| acc.max(v))
}

/// 两个时间点的逐体素差值图 `|S_minuend - S_subtrahend|`.
pub fn subtract_phases(
    volume: ArrayView4<f64>,
    minuend: usize,
    subtrahend: usize,
) -> Array3<f64> {
    let nt = volume.len_of(Axis(0));
    assert!(minuend < nt && subtrahend < nt, "相位下标必须落在序列范围内");

    let a = volume.index_axis(Axis(0), minuend);
    let b = volume.index_axis(Axis(0), subtrahend);
    Zip::from(&a).and(&b).map_collect(|&x, &y| (x - y).abs())
}
