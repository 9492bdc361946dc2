//! ROI 几何解析: 世界坐标包围盒到体素索引范围的转换.
//!
//! 参考网格由宿主应用提供 (物理坐标到体素坐标的仿射变换 + 网格尺寸).
//! 本模块只做纯几何换算, 不触碰任何体数据.

use crate::error::{PipelineError, PipelineResult};
use crate::Idx3d;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 世界坐标系 (物理坐标, mm) 下的轴对齐包围盒.
///
/// 角点轴序与 [`WorldToVoxel`] 的输入约定一致.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorldBox {
    /// 最小角点.
    pub min: [f64; 3],

    /// 最大角点.
    pub max: [f64; 3],
}

/// 物理坐标到体素坐标的仿射变换 (4x4 齐次矩阵, 行优先).
///
/// 输出轴序约定为数组布局顺序 `(z, y, x)`, 由调用方负责构造与之一致的矩阵.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorldToVoxel([[f64; 4]; 4]);

impl WorldToVoxel {
    /// 由完整 4x4 齐次矩阵构造.
    #[inline]
    pub fn new(matrix: [[f64; 4]; 4]) -> WorldToVoxel {
        Self(matrix)
    }

    /// 纯缩放 + 平移的便捷构造: `voxel[a] = (world[a] - origin[a]) / spacing[a]`.
    ///
    /// `spacing` 与 `origin` 按输出轴序 `(z, y, x)` 给出, 分辨率不能为零.
    pub fn from_spacing_origin(spacing: [f64; 3], origin: [f64; 3]) -> WorldToVoxel {
        assert!(spacing.iter().all(|&s| s != 0.0), "体素分辨率不能为零");
        let mut m = [[0.0; 4]; 4];
        for a in 0..3 {
            m[a][a] = 1.0 / spacing[a];
            m[a][3] = -origin[a] / spacing[a];
        }
        m[3][3] = 1.0;
        Self(m)
    }

    /// 把一个世界坐标点变换到连续体素坐标.
    pub fn apply(&self, p: [f64; 3]) -> [f64; 3] {
        let h = [p[0], p[1], p[2], 1.0];
        let mut out = [0.0; 3];
        for (row, o) in self.0.iter().take(3).zip(out.iter_mut()) {
            *o = row.iter().zip(h.iter()).map(|(m, v)| m * v).sum();
        }
        out
    }
}

/// 体素索引范围, 上界开, 轴序 `(z, y, x)`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VoxelBounds {
    /// 各轴下界 (含).
    pub min: [usize; 3],

    /// 各轴上界 (不含).
    pub max: [usize; 3],
}

impl VoxelBounds {
    /// 覆盖整个网格的范围.
    #[inline]
    pub fn full((nz, ny, nx): Idx3d) -> VoxelBounds {
        Self {
            min: [0; 3],
            max: [nz, ny, nx],
        }
    }

    /// 各轴长度 `(dz, dy, dx)`.
    #[inline]
    pub fn extent(&self) -> Idx3d {
        (
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        )
    }

    /// 范围是否完全落在给定网格内且每轴非空.
    pub fn fits(&self, (nz, ny, nx): Idx3d) -> bool {
        let dims = [nz, ny, nx];
        (0..3).all(|a| self.min[a] < self.max[a] && self.max[a] <= dims[a])
    }
}

/// 把世界坐标包围盒解析为参考网格内的体素索引范围.
///
/// 两个角点分别做仿射变换并四舍五入, 逐坐标裁剪到 `[0, dim-1]`,
/// 取逐元素 min/max 后上界加一. 网格至少含一个体素时保证每轴
/// `min < max`; 包围盒完全落在网格外时返回 [`PipelineError::RoiOutsideGrid`],
/// 而不是静默退化为全体积计算.
pub fn resolve_voxel_bounds(
    world_box: &WorldBox,
    transform: &WorldToVoxel,
    dims: Idx3d,
) -> PipelineResult<VoxelBounds> {
    let dims = [dims.0, dims.1, dims.2];
    assert!(dims.iter().all(|&d| d > 0), "参考网格每轴至少要有一个体素");

    let corners = [
        transform.apply(world_box.min),
        transform.apply(world_box.max),
    ];
    let rounded = corners.map(|c| [c[0].round(), c[1].round(), c[2].round()]);

    // 两个角点在某一轴上同时落在网格外同一侧, 则 ROI 与网格不相交.
    for a in 0..3 {
        let (p, q) = (rounded[0][a], rounded[1][a]);
        let upper = (dims[a] - 1) as f64;
        if (p < 0.0 && q < 0.0) || (p > upper && q > upper) {
            return Err(PipelineError::RoiOutsideGrid);
        }
    }

    let mut lo = [0usize; 3];
    let mut hi = [0usize; 3];
    for a in 0..3 {
        let upper = (dims[a] - 1) as f64;
        let p = rounded[0][a].clamp(0.0, upper) as usize;
        let q = rounded[1][a].clamp(0.0, upper) as usize;
        lo[a] = p.min(q);
        hi[a] = p.max(q) + 1;
    }
    Ok(VoxelBounds { min: lo, max: hi })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> WorldToVoxel {
        WorldToVoxel::from_spacing_origin([1.0, 1.0, 1.0], [0.0, 0.0, 0.0])
    }

    #[test]
    fn test_resolve_inside_grid() {
        let b = WorldBox {
            min: [2.2, 3.4, 1.6],
            max: [5.1, 6.0, 4.0],
        };
        let vb = resolve_voxel_bounds(&b, &identity(), (10, 10, 10)).unwrap();
        assert_eq!(vb.min, [2, 3, 2]);
        assert_eq!(vb.max, [6, 7, 5]);
        assert!(vb.fits((10, 10, 10)));
        assert_eq!(vb.extent(), (4, 4, 3));
    }

    #[test]
    fn test_resolve_round_trip_property() {
        // 完全在网格内的盒子: 每轴 0 <= min < max <= dim.
        let b = WorldBox {
            min: [0.0, 0.0, 0.0],
            max: [9.0, 9.0, 9.0],
        };
        let vb = resolve_voxel_bounds(&b, &identity(), (10, 10, 10)).unwrap();
        assert_eq!(vb, VoxelBounds::full((10, 10, 10)));
    }

    #[test]
    fn test_resolve_clamps_partial_overlap() {
        let b = WorldBox {
            min: [-3.0, -1.0, 4.0],
            max: [2.0, 20.0, 30.0],
        };
        let vb = resolve_voxel_bounds(&b, &identity(), (8, 8, 8)).unwrap();
        assert_eq!(vb.min, [0, 0, 4]);
        assert_eq!(vb.max, [3, 8, 8]);
    }

    #[test]
    fn test_resolve_outside_grid_is_error() {
        let b = WorldBox {
            min: [-9.0, 0.0, 0.0],
            max: [-2.0, 5.0, 5.0],
        };
        let err = resolve_voxel_bounds(&b, &identity(), (8, 8, 8)).unwrap_err();
        assert_eq!(err, PipelineError::RoiOutsideGrid);

        let b = WorldBox {
            min: [0.0, 0.0, 30.0],
            max: [5.0, 5.0, 40.0],
        };
        assert!(resolve_voxel_bounds(&b, &identity(), (8, 8, 8)).is_err());
    }

    #[test]
    fn test_affine_spacing_origin() {
        let t = WorldToVoxel::from_spacing_origin([2.0, 0.5, 1.0], [10.0, -2.0, 0.0]);
        let v = t.apply([14.0, 0.0, 3.0]);
        assert_eq!(v, [2.0, 4.0, 3.0]);
    }

    #[test]
    fn test_degenerate_bounds_detection() {
        let vb = VoxelBounds {
            min: [0, 0, 0],
            max: [0, 4, 4],
        };
        assert!(!vb.fits((4, 4, 4)));
        let vb = VoxelBounds {
            min: [0, 0, 0],
            max: [5, 4, 4],
        };
        assert!(!vb.fits((4, 4, 4)));
    }
}
