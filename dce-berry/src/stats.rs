//! 统计聚合: 把几何统计端与 Map Engine 输出合成两张汇总表.
//!
//! 体积与直径的来源是一个由调用方注入的 [`GeometricStats`] 实现:
//! 宿主应用通常有自己的分割统计设施 (考虑体素各向异性, 斜切网格等),
//! 本 crate 自带的 [`VoxelGridStats`] 是规则网格上的参考实现.

use std::f64::consts::PI;

use ndarray::{ArrayView3, Zip};

use crate::config::ThresholdConfig;
use crate::consts::label;
use crate::peak::Peaks;
use crate::tables::{SerDistRow, SerDistributionTable, SummaryRow, SummaryTable};
use crate::tic::EnhancementSummary;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 椭球体积近似系数: 轴对齐包围盒体积乘 π/6.
const ELLIPSOID_SCALE: f64 = PI / 6.0;

/// 一个分割片段的几何统计量.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentStats {
    /// 体积 (cm3).
    pub volume_cm3: f64,

    /// 体素个数.
    pub voxel_count: u64,

    /// 定向包围盒三条轴的直径 (mm).
    pub obb_diameter_mm: [f64; 3],
}

impl SegmentStats {
    /// 空片段: 全零.
    pub fn empty() -> SegmentStats {
        Self {
            volume_cm3: 0.0,
            voxel_count: 0,
            obb_diameter_mm: [0.0; 3],
        }
    }

    /// 最长的 OBB 轴 (mm).
    #[inline]
    pub fn longest_axis_mm(&self) -> f64 {
        self.obb_diameter_mm
            .iter()
            .fold(0.0, |acc: f64, &d| acc.max(d))
    }
}

/// 分割几何统计端.
pub trait GeometricStats {
    /// 指示 mask 的统计量.
    fn indicator_stats(&self, indicator: ArrayView3<bool>) -> SegmentStats;

    /// 单个分级区间的统计量. 统计端无法提供该区间时返回 `None`.
    ///
    /// 默认实现从分级图派生指示 mask 后转交 [`Self::indicator_stats`].
    fn bin_stats(&self, bin_class: u8, ser_class: ArrayView3<u8>) -> Option<SegmentStats> {
        let indicator = ser_class.map(|&c| c == bin_class);
        Some(self.indicator_stats(indicator.view()))
    }
}

/// 规则网格上的参考统计端: 体素计数 + 轴对齐包围盒.
///
/// OBB 直径以轴对齐包围盒近似, 对斜长条形片段会偏大.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VoxelGridStats {
    /// 体素物理尺寸 (mm), 轴序 `(z, y, x)`.
    pub voxel_mm: [f64; 3],
}

impl GeometricStats for VoxelGridStats {
    fn indicator_stats(&self, indicator: ArrayView3<bool>) -> SegmentStats {
        let mut count = 0u64;
        let mut lo = [usize::MAX; 3];
        let mut hi = [0usize; 3];

        Zip::indexed(&indicator).for_each(|(z, y, x), &m| {
            if m {
                count += 1;
                let idx = [z, y, x];
                for a in 0..3 {
                    lo[a] = lo[a].min(idx[a]);
                    hi[a] = hi[a].max(idx[a]);
                }
            }
        });

        if count == 0 {
            return SegmentStats::empty();
        }

        let voxel_volume_mm3: f64 = self.voxel_mm.iter().product();
        let mut diameter = [0.0; 3];
        for a in 0..3 {
            diameter[a] = (hi[a] - lo[a] + 1) as f64 * self.voxel_mm[a];
        }
        SegmentStats {
            // 1 cm3 = 1000 mm3.
            volume_cm3: count as f64 * voxel_volume_mm3 / 1000.0,
            voxel_count: count,
            obb_diameter_mm: diameter,
        }
    }
}

/// 汇总表需要的标量输入.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScalarInputs {
    /// 参数图峰值.
    pub peaks: Peaks,

    /// 增强派生标量.
    pub enhancement: EnhancementSummary,

    /// early 相采集时刻 (分钟).
    pub early_phase_min: f64,

    /// late 相采集时刻 (分钟).
    pub late_phase_min: f64,

    /// bolus 注射时刻 (分钟).
    pub injection_min: f64,

    /// TIC 一次拟合的斜率.
    pub slope: f64,
}

/// 保留三位小数.
#[inline]
fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// 保留两位小数.
#[inline]
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// 占比百分数. 整体为空时返回 `None`.
#[inline]
fn pct_of(part: f64, whole: f64) -> Option<f64> {
    (whole != 0.0).then(|| round2(100.0 * part / whole))
}

/// 合成 Summary 表与 SER 分布表.
///
/// `mask` 是调用方给定的原始分割 (ROI Volume 行的口径), `ser_class`
/// 是同网格的分级图. ROI Volume 以最小外接椭球近似: mask 统计体积
/// 乘 π/6. FTV 是分级大于 FTV 阈值 bin 的体素, ETV 是任何非零分级
/// 的体素; 分布百分比以 ETV 为分母.
pub fn summarize(
    provider: &dyn GeometricStats,
    cfg: &ThresholdConfig,
    mask: ArrayView3<bool>,
    ser_class: ArrayView3<u8>,
    scalars: &ScalarInputs,
) -> (SummaryTable, SerDistributionTable) {
    let ftv_bin = cfg.binning.ftv_threshold_bin() as u8;
    let ftv_indicator = ser_class.map(|&c| c > ftv_bin);
    let etv_indicator = ser_class.map(|&c| label::is_ser(c));

    let roi = provider.indicator_stats(mask);
    let ftv = provider.indicator_stats(ftv_indicator.view());
    let etv = provider.indicator_stats(etv_indicator.view());

    let summary = SummaryTable {
        rows: vec![
            SummaryRow {
                parameter: "PE Threshold",
                value: cfg.peak_enhancement_threshold,
                units: "%",
            },
            SummaryRow {
                parameter: "SER Upper Threshold",
                value: cfg.ser_upper_threshold,
                units: "[]",
            },
            SummaryRow {
                parameter: "ROI longest axis",
                value: round3(roi.longest_axis_mm()),
                units: "mm",
            },
            SummaryRow {
                parameter: "ROI Volume",
                value: round3(roi.volume_cm3 * ELLIPSOID_SCALE),
                units: "cm3",
            },
            SummaryRow {
                parameter: "Bolus injection time",
                value: scalars.injection_min,
                units: "min",
            },
            SummaryRow {
                parameter: "Early Phase Time",
                value: scalars.early_phase_min,
                units: "min",
            },
            SummaryRow {
                parameter: "Late Phase Time",
                value: scalars.late_phase_min,
                units: "min",
            },
            SummaryRow {
                parameter: "Maximum Enhancement",
                value: round3(scalars.enhancement.max_enhancement),
                units: "%",
            },
            SummaryRow {
                parameter: "Delta Enhancement",
                value: round3(scalars.enhancement.delta_enhancement),
                units: "%",
            },
            SummaryRow {
                parameter: "First Pass Enhancement",
                value: round3(scalars.enhancement.first_pass_enhancement),
                units: "%",
            },
            SummaryRow {
                parameter: "Enhancement Slope",
                value: round3(scalars.slope),
                units: "[]",
            },
        ],
    };

    let mut rows: Vec<SerDistRow> = cfg
        .binning
        .legends()
        .into_iter()
        .enumerate()
        .map(|(i, legend)| {
            let stats = provider.bin_stats((i + 1) as u8, ser_class);
            SerDistRow {
                legend,
                volume_cm3: stats.map(|s| round3(s.volume_cm3)),
                distribution_pct: stats
                    .and_then(|s| pct_of(s.voxel_count as f64, etv.voxel_count as f64)),
            }
        })
        .collect();

    rows.push(SerDistRow {
        legend: "FTV (Functional Tumour Volume)".to_owned(),
        volume_cm3: Some(round3(ftv.volume_cm3)),
        distribution_pct: pct_of(ftv.voxel_count as f64, etv.voxel_count as f64),
    });
    rows.push(SerDistRow {
        legend: "ETV (Enhanced Tumour Volume)".to_owned(),
        volume_cm3: Some(round3(etv.volume_cm3)),
        distribution_pct: pct_of(etv.voxel_count as f64, etv.voxel_count as f64),
    });
    rows.push(SerDistRow {
        legend: "peak PE".to_owned(),
        volume_cm3: Some(round3(scalars.peaks.pe)),
        distribution_pct: None,
    });
    rows.push(SerDistRow {
        legend: "peak SER".to_owned(),
        volume_cm3: Some(round3(scalars.peaks.ser)),
        distribution_pct: None,
    });

    (summary, SerDistributionTable { rows })
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;

    use super::*;
    use crate::config::SerBinning;

    fn float_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn unit_grid() -> VoxelGridStats {
        VoxelGridStats {
            voxel_mm: [1.0, 1.0, 1.0],
        }
    }

    fn scalars() -> ScalarInputs {
        ScalarInputs {
            peaks: Peaks { pe: 81.5, ser: 2.2 },
            enhancement: EnhancementSummary {
                max_enhancement: 93.4,
                delta_enhancement: -4.1,
                first_pass_enhancement: 88.8,
            },
            early_phase_min: 1.5,
            late_phase_min: 7.0,
            injection_min: 0.5,
            slope: 1.25,
        }
    }

    #[test]
    fn test_voxel_grid_stats() {
        let mut ind = Array3::from_elem((10, 10, 10), false);
        // 2x3x4 的块.
        for z in 1..3 {
            for y in 2..5 {
                for x in 3..7 {
                    ind[(z, y, x)] = true;
                }
            }
        }
        let s = unit_grid().indicator_stats(ind.view());
        assert_eq!(s.voxel_count, 24);
        assert!(float_eq(s.volume_cm3, 0.024));
        assert_eq!(s.obb_diameter_mm, [2.0, 3.0, 4.0]);
        assert!(float_eq(s.longest_axis_mm(), 4.0));

        // 各向异性体素.
        let aniso = VoxelGridStats {
            voxel_mm: [2.0, 1.0, 0.5],
        };
        let s = aniso.indicator_stats(ind.view());
        assert!(float_eq(s.volume_cm3, 0.024));
        assert_eq!(s.obb_diameter_mm, [4.0, 3.0, 2.0]);
    }

    #[test]
    fn test_voxel_grid_stats_empty() {
        let ind = Array3::from_elem((4, 4, 4), false);
        let s = unit_grid().indicator_stats(ind.view());
        assert_eq!(s, SegmentStats::empty());
    }

    #[test]
    fn test_summary_rows_order_and_labels() {
        let mask = Array3::from_elem((6, 6, 6), true);
        let class = Array3::from_elem((6, 6, 6), 5u8);
        let cfg = ThresholdConfig::default();
        let (summary, _) = summarize(&unit_grid(), &cfg, mask.view(), class.view(), &scalars());

        let labels: Vec<&str> = summary.rows.iter().map(|r| r.parameter).collect();
        assert_eq!(
            labels,
            [
                "PE Threshold",
                "SER Upper Threshold",
                "ROI longest axis",
                "ROI Volume",
                "Bolus injection time",
                "Early Phase Time",
                "Late Phase Time",
                "Maximum Enhancement",
                "Delta Enhancement",
                "First Pass Enhancement",
                "Enhancement Slope"
            ]
        );
        assert!(float_eq(summary.rows[0].value, 70.0));
        assert_eq!(summary.rows[0].units, "%");
        assert!(float_eq(summary.rows[1].value, 3.0));

        // ROI: 216 体素 = 0.216 cm3, 椭球近似乘 π/6.
        assert!(float_eq(summary.rows[2].value, 6.0));
        assert!(float_eq(summary.rows[3].value, round3(0.216 * PI / 6.0)));
        assert!(float_eq(summary.rows[10].value, 1.25));
        assert_eq!(summary.rows[10].units, "[]");
    }

    #[test]
    fn test_distribution_rows() {
        // 分级 1 与分级 5 各一半.
        let mut class = Array3::from_elem((4, 4, 4), 1u8);
        for z in 0..2 {
            for y in 0..4 {
                for x in 0..4 {
                    class[(z, y, x)] = 5;
                }
            }
        }
        let mask = Array3::from_elem((4, 4, 4), true);
        let cfg = ThresholdConfig::default();
        let (_, dist) = summarize(&unit_grid(), &cfg, mask.view(), class.view(), &scalars());

        // 5 个区间 + FTV + ETV + 两个 peak 行.
        assert_eq!(dist.rows.len(), 9);
        assert_eq!(dist.rows[0].legend, "0.00 < SER ≤ 0.90");
        assert_eq!(dist.rows[0].distribution_pct, Some(50.0));
        assert_eq!(dist.rows[1].distribution_pct, Some(0.0));
        assert_eq!(dist.rows[4].distribution_pct, Some(50.0));

        let ftv = &dist.rows[5];
        assert_eq!(ftv.legend, "FTV (Functional Tumour Volume)");
        // 预定义方案 FTV bin 为 0: 全部 64 体素都计入.
        assert_eq!(ftv.volume_cm3, Some(0.064));
        assert_eq!(ftv.distribution_pct, Some(100.0));

        let etv = &dist.rows[6];
        assert_eq!(etv.legend, "ETV (Enhanced Tumour Volume)");
        assert_eq!(etv.distribution_pct, Some(100.0));

        assert_eq!(dist.rows[7].legend, "peak PE");
        assert_eq!(dist.rows[7].volume_cm3, Some(81.5));
        assert_eq!(dist.rows[7].distribution_pct, None);
        assert_eq!(dist.rows[8].legend, "peak SER");
        assert_eq!(dist.rows[8].volume_cm3, Some(2.2));
    }

    #[test]
    fn test_empty_etv_has_no_percentages() {
        let class = Array3::from_elem((4, 4, 4), 0u8);
        let mask = Array3::from_elem((4, 4, 4), true);
        let cfg = ThresholdConfig::default();
        let (_, dist) = summarize(&unit_grid(), &cfg, mask.view(), class.view(), &scalars());

        assert_eq!(dist.rows[0].distribution_pct, None);
        assert_eq!(dist.rows[5].distribution_pct, None);
        assert_eq!(dist.rows[6].distribution_pct, None);
        assert_eq!(dist.rows[6].volume_cm3, Some(0.0));
    }

    #[test]
    fn test_missing_bin_from_provider() {
        /// 只认分级 5 的统计端.
        struct OnlyBinFive(VoxelGridStats);

        impl GeometricStats for OnlyBinFive {
            fn indicator_stats(&self, indicator: ArrayView3<bool>) -> SegmentStats {
                self.0.indicator_stats(indicator)
            }

            fn bin_stats(&self, bin_class: u8, ser_class: ArrayView3<u8>) -> Option<SegmentStats> {
                (bin_class == 5).then(|| {
                    let ind = ser_class.map(|&c| c == bin_class);
                    self.0.indicator_stats(ind.view())
                })
            }
        }

        let class = Array3::from_elem((4, 4, 4), 5u8);
        let mask = Array3::from_elem((4, 4, 4), true);
        let cfg = ThresholdConfig::default();
        let provider = OnlyBinFive(unit_grid());
        let (_, dist) = summarize(&provider, &cfg, mask.view(), class.view(), &scalars());

        assert_eq!(dist.rows[0].volume_cm3, None);
        assert_eq!(dist.rows[0].distribution_pct, None);
        assert_eq!(dist.rows[4].volume_cm3, Some(0.064));
        assert_eq!(dist.rows[4].distribution_pct, Some(100.0));
    }

    #[test]
    fn test_single_threshold_ftv_excludes_first_bin() {
        // 单阈值方案: FTV bin = 1, 分级 1 不计入 FTV.
        let binning = SerBinning::single_threshold(1.0).unwrap();
        let cfg = ThresholdConfig::new(60.0, 70.0, 3.0, binning).unwrap();

        let mut class = Array3::from_elem((4, 4, 4), 1u8);
        class[(0, 0, 0)] = 3;
        let mask = Array3::from_elem((4, 4, 4), true);
        let (_, dist) = summarize(&unit_grid(), &cfg, mask.view(), class.view(), &scalars());

        // 3 个区间 + 4 个派生行.
        assert_eq!(dist.rows.len(), 7);
        let ftv = &dist.rows[3];
        assert_eq!(ftv.volume_cm3, Some(0.001));
        let etv = &dist.rows[4];
        assert_eq!(etv.volume_cm3, Some(0.064));
    }
}
