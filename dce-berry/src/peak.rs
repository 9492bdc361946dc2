//! Peak 提取: 参数图的局部均值峰值.
//!
//! 先做 3x3x3 零填充均值滤波, 再在每条轴上以步长 3 从下标 1 开始
//! 子采样 (即取每个不重叠 3x3x3 邻域的中心), 峰值取子采样集合的最大值.
//! 这样报告的不是单个体素的极值, 而是最亮邻域的平均水平.

use ndarray::{s, Array3, ArrayView3};
use ordered_float::OrderedFloat;

use crate::consts::PEAK_NEIGHBOURHOOD;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 两个参数图的峰值.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Peaks {
    /// peak PE (百分比).
    pub pe: f64,

    /// peak SER.
    pub ser: f64,
}

/// 3x3x3 零填充均值滤波.
fn mean_filter_3d(map: ArrayView3<f64>) -> Array3<f64> {
    let (nz, ny, nx) = map.dim();
    let r = PEAK_NEIGHBOURHOOD as isize / 2;
    let count = (PEAK_NEIGHBOURHOOD * PEAK_NEIGHBOURHOOD * PEAK_NEIGHBOURHOOD) as f64;

    Array3::from_shape_fn((nz, ny, nx), |(z, y, x)| {
        let mut acc = 0.0;
        for dz in -r..=r {
            for dy in -r..=r {
                for dx in -r..=r {
                    let (pz, py, px) = (z as isize + dz, y as isize + dy, x as isize + dx);
                    if pz >= 0
                        && py >= 0
                        && px >= 0
                        && (pz as usize) < nz
                        && (py as usize) < ny
                        && (px as usize) < nx
                    {
                        acc += map[(pz as usize, py as usize, px as usize)];
                    }
                }
            }
        }
        acc / count
    })
}

/// 均值滤波后子采样集合的最大值.
///
/// 图太小而不含任何邻域中心 (某轴长度 < 2) 时返回 0.
pub fn peak_mean(map: ArrayView3<f64>) -> f64 {
    let filtered = mean_filter_3d(map);
    filtered
        .slice(s![1..;3, 1..;3, 1..;3])
        .iter()
        .map(|&v| OrderedFloat(v))
        .max()
        .map(|v| v.0)
        .unwrap_or(0.0)
}

/// 同时提取 PE 与 SER 图的峰值.
pub fn extract_peaks(pe: ArrayView3<f64>, ser: ArrayView3<f64>) -> Peaks {
    Peaks {
        pe: peak_mean(pe),
        ser: peak_mean(ser),
    }
}
