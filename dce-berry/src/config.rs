//! 阈值, 分级与时序配置.
//!
//! 这些对象由调用方在每次 `process` 之前显式提供, 不存在任何全局或
//! 实例级的环境状态, 以便在不同配置下做确定性测试.

use itertools::izip;
use once_cell::sync::Lazy;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_BACKGROUND_THRESHOLD_PCT, DEFAULT_PE_THRESHOLD, SER_DELTA_FACTOR, SER_UPPER_THRESHOLD,
};

/// 文献预定义的 SER 区间端点 (Arasu 2011, Partridge 2010 等).
static PREDEFINED_EDGES: Lazy<Vec<f64>> =
    Lazy::new(|| vec![0.0, 0.90, 1.0, 1.30, 1.75, SER_UPPER_THRESHOLD]);

/// 单个 SER 区间, 语义为半开区间 `(lower, upper]`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SerBin {
    /// 下界 (不含).
    pub lower: f64,

    /// 上界 (含).
    pub upper: f64,
}

/// SER 分级方案: 有序相邻区间序列与 FTV 阈值 bin.
///
/// 区间相邻且严格递增; 分级值 `i + 1` 对应第 `i` 个区间, 0 恒为 non-SER.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SerBinning {
    bins: Vec<SerBin>,
    ftv_threshold_bin: usize,
}

impl SerBinning {
    /// 由严格递增的区间端点构造.
    ///
    /// 端点少于 2 个, 非严格递增, 或 `ftv_threshold_bin` 不小于区间个数时
    /// 返回 `None`.
    pub fn from_edges(edges: &[f64], ftv_threshold_bin: usize) -> Option<SerBinning> {
        if edges.len() < 2 || edges.windows(2).any(|w| w[0] >= w[1]) {
            return None;
        }
        let bins: Vec<SerBin> = izip!(&edges[..edges.len() - 1], &edges[1..])
            .map(|(&lower, &upper)| SerBin { lower, upper })
            .collect();
        if ftv_threshold_bin >= bins.len() {
            return None;
        }
        Some(Self {
            bins,
            ftv_threshold_bin,
        })
    }

    /// 文献预定义的五段区间方案, FTV 阈值 bin 为 0 (任何分级都计入 FTV).
    pub fn predefined() -> SerBinning {
        Self::from_edges(&PREDEFINED_EDGES, 0).unwrap()
    }

    /// 单阈值方案: `(0, thr]`, `(thr, 1.1·thr]`, `(1.1·thr, 上限]`,
    /// FTV 阈值 bin 为 1.
    ///
    /// `thr` 为零时退化为单个 `(0, 上限]` 区间. `thr` 为负或
    /// `1.1·thr` 达到 SER 上限时返回 `None`.
    pub fn single_threshold(threshold: f64) -> Option<SerBinning> {
        if threshold == 0.0 {
            return Self::from_edges(&[0.0, SER_UPPER_THRESHOLD], 0);
        }
        let upper_delta = (1.0 + SER_DELTA_FACTOR) * threshold;
        if threshold < 0.0 || upper_delta >= SER_UPPER_THRESHOLD {
            return None;
        }
        Self::from_edges(&[0.0, threshold, upper_delta, SER_UPPER_THRESHOLD], 1)
    }

    /// 无区间方案: 任何正 SER 都归为分级 1.
    pub fn unbinned() -> SerBinning {
        Self {
            bins: vec![],
            ftv_threshold_bin: 0,
        }
    }

    /// 区间列表.
    #[inline]
    pub fn bins(&self) -> &[SerBin] {
        &self.bins
    }

    /// 区间个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// 是否没有配置任何区间.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// FTV 阈值 bin. 分级值大于它的体素属于 FTV.
    #[inline]
    pub fn ftv_threshold_bin(&self) -> usize {
        self.ftv_threshold_bin
    }

    /// SER 值到分级标签 (0 = non-SER).
    pub fn classify(&self, ser: f64) -> u8 {
        if self.bins.is_empty() {
            return (ser > 0.0) as u8;
        }
        for (i, bin) in self.bins.iter().enumerate() {
            if bin.lower < ser && ser <= bin.upper {
                return (i + 1) as u8;
            }
        }
        0
    }

    /// 每个区间的图例文本, 与下游显示端保持一致.
    pub fn legends(&self) -> Vec<String> {
        self.bins
            .iter()
            .map(|b| format!("{:.2} < SER ≤ {:.2}", b.lower, b.upper))
            .collect()
    }
}

/// Map Engine 的全部标量阈值配置.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThresholdConfig {
    /// 背景阈值, 以 pre-contrast 95 分位数的百分比计 (`[0, 100]`).
    pub background_threshold_pct: f64,

    /// PE 阈值 (百分比, 非负). 低于它的体素被移出前景 mask.
    pub peak_enhancement_threshold: f64,

    /// SER 上限. 超过它的 SER 一律归为 non-SER.
    pub ser_upper_threshold: f64,

    /// SER 分级方案.
    pub binning: SerBinning,
}

impl ThresholdConfig {
    /// 构造并校验配置.
    ///
    /// 背景阈值必须落在 `[0, 100]`, PE 阈值非负, SER 上限必须不小于所有
    /// 区间上界; 否则返回 `None`.
    pub fn new(
        background_threshold_pct: f64,
        peak_enhancement_threshold: f64,
        ser_upper_threshold: f64,
        binning: SerBinning,
    ) -> Option<ThresholdConfig> {
        let bounded = (0.0..=100.0).contains(&background_threshold_pct)
            && peak_enhancement_threshold >= 0.0;
        let upper_ok = binning.bins().iter().all(|b| ser_upper_threshold >= b.upper);
        if bounded && upper_ok {
            Some(Self {
                background_threshold_pct,
                peak_enhancement_threshold,
                ser_upper_threshold,
                binning,
            })
        } else {
            None
        }
    }
}

impl Default for ThresholdConfig {
    /// 默认: 背景阈值 60%, PE 阈值 70%, SER 上限 3.0, 预定义分级方案.
    fn default() -> Self {
        Self {
            background_threshold_pct: DEFAULT_BACKGROUND_THRESHOLD_PCT,
            peak_enhancement_threshold: DEFAULT_PE_THRESHOLD,
            ser_upper_threshold: SER_UPPER_THRESHOLD,
            binning: SerBinning::predefined(),
        }
    }
}

/// 三个关键相位在序列中的下标.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhaseIndices {
    /// pre-contrast (基线) 下标.
    pub pre: usize,

    /// early post-contrast 下标.
    pub early: usize,

    /// late post-contrast 下标.
    pub late: usize,
}

impl PhaseIndices {
    /// 长度为 `nt` 的序列的常用默认: pre = 0, early = min(3, nt-1),
    /// late = nt-1.
    ///
    /// `nt` 必须至少为 2.
    pub fn default_for(nt: usize) -> PhaseIndices {
        assert!(nt >= 2, "序列至少需要 2 个时间点");
        Self {
            pre: 0,
            early: if nt > 3 { 3 } else { 1 },
            late: nt - 1,
        }
    }
}

/// 采集时序: 每个时间点的物理时间与 bolus 注射时刻, 均以分钟计.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AcquisitionTiming {
    timepoints_min: Vec<f64>,
    injection_min: f64,
}

impl AcquisitionTiming {
    /// 由分钟计的时间标签与注射时刻构造.
    pub fn new(timepoints_min: Vec<f64>, injection_min: f64) -> AcquisitionTiming {
        Self {
            timepoints_min,
            injection_min,
        }
    }

    /// 没有 DICOM 时序元数据时的均匀回退: 每帧间隔 1 分钟, 注射时刻为 0.
    pub fn uniform(nt: usize) -> AcquisitionTiming {
        Self {
            timepoints_min: (0..nt).map(|i| i as f64).collect(),
            injection_min: 0.0,
        }
    }

    /// 时间点个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.timepoints_min.len()
    }

    /// 是否没有任何时间点.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.timepoints_min.is_empty()
    }

    /// 时间标签 (分钟).
    #[inline]
    pub fn timepoints(&self) -> &[f64] {
        &self.timepoints_min
    }

    /// bolus 注射时刻 (分钟, 相对采集起点).
    #[inline]
    pub fn injection_min(&self) -> f64 {
        self.injection_min
    }
}
