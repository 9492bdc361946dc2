//! Pipeline Orchestrator: 输入校验, ROI 裁剪, 各阶段调度与输出装配.
//!
//! 一次 [`process`] 调用独占其全部中间量, 不存在跨调用共享的可变状态;
//! 相同输入与配置必产生相同输出.

use ndarray::{s, Array3, Array4, Axis};

use crate::config::{AcquisitionTiming, PhaseIndices, ThresholdConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::fitting::LinearFit;
use crate::geometry::VoxelBounds;
use crate::maps::{compute_maps, mip, scatter_into_template};
use crate::peak::{extract_peaks, Peaks};
use crate::stats::{summarize, GeometricStats, ScalarInputs};
use crate::tables::{SerDistributionTable, SummaryTable, TicTable};
use crate::tic::{enhancement_summary, time_intensity_curve};
use crate::Idx3d;

/// 交互确认端. 流水线遇到可疑但不致命的输入时向它征求意见.
pub trait ConfirmProvider {
    /// 向用户展示 `prompt`, 返回是否继续.
    fn confirm(&self, prompt: &str) -> bool;
}

/// 无人值守场景的确认端: 一律继续.
#[derive(Copy, Clone, Debug, Default)]
pub struct AlwaysConfirm;

impl ConfirmProvider for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// 一次完整计算的全部输入.
#[derive(Clone, Debug, PartialEq)]
pub struct PerfusionInput {
    /// `[t, z, y, x]` 排布的 4D 强度序列.
    pub volume: Array4<f64>,

    /// 与单时间点同形状的二值分割 mask.
    pub mask: Array3<bool>,

    /// 感兴趣区域的体素范围, 见 [`crate::geometry::resolve_voxel_bounds`].
    pub roi: VoxelBounds,

    /// 三个关键相位的下标.
    pub phases: PhaseIndices,

    /// 采集时序.
    pub timing: AcquisitionTiming,
}

/// 一次完整计算的全部输出. 体数据均为完整网格, ROI 之外填默认值.
#[derive(Clone, Debug, PartialEq)]
pub struct PerfusionOutput {
    /// PE 图 (百分比).
    pub pe: Array3<f64>,

    /// SER 图.
    pub ser: Array3<f64>,

    /// SER 分级图.
    pub ser_class: Array3<u8>,

    /// 前景 mask (阈值过滤后).
    pub base_mask: Array3<bool>,

    /// 沿时间轴的最大强度投影.
    pub mip: Array3<f64>,

    /// 参数图峰值.
    pub peaks: Peaks,

    /// TIC 曲线表.
    pub tic: TicTable,

    /// TIC 一次拟合.
    pub fit: LinearFit<f64>,

    /// Summary 表.
    pub summary: SummaryTable,

    /// SER 分布表.
    pub ser_distribution: SerDistributionTable,
}

/// 校验相位下标并处理 `early == late` 的交互确认.
///
/// 返回 `Ok(false)` 表示用户拒绝继续.
fn validate_phases(
    phases: PhaseIndices,
    nt: usize,
    confirm: &dyn ConfirmProvider,
) -> PipelineResult<bool> {
    for index in [phases.pre, phases.early, phases.late] {
        if index >= nt {
            return Err(PipelineError::PhaseIndexOutOfRange { index, len: nt });
        }
    }
    if phases.pre == phases.early {
        return Err(PipelineError::PreEqualsEarly(phases.pre));
    }
    if phases.early == phases.late {
        log::warn!(
            "early and late post contrast phases are both frame {}",
            phases.early
        );
        return Ok(
            confirm.confirm("Early and Late Post Contrast indices are the same. Shall we continue?")
        );
    }
    Ok(true)
}

/// 执行完整的半定量灌注计算.
///
/// 校验顺序: 时间点个数, mask 形状, 时间标签个数与退化时间轴, 相位下标,
/// ROI 范围.
/// `early == late` 不是错误而是可疑输入, 通过 `confirm` 征求用户意见,
/// 拒绝时返回 `Ok(None)`. ROI 内分割为空时回退为把整个 ROI 盒当作分割,
/// 与下游显示端的约定一致.
pub fn process(
    input: &PerfusionInput,
    cfg: &ThresholdConfig,
    stats: &dyn GeometricStats,
    confirm: &dyn ConfirmProvider,
) -> PipelineResult<Option<PerfusionOutput>> {
    let nt = input.volume.len_of(Axis(0));
    if nt < 3 {
        return Err(PipelineError::TooFewTimepoints(nt));
    }

    let dims: Idx3d = input.volume.index_axis(Axis(0), 0).dim();
    if dims != input.mask.dim() {
        return Err(PipelineError::ShapeMismatch(dims, input.mask.dim()));
    }
    if input.timing.len() != nt {
        return Err(PipelineError::TimingMismatch(input.timing.len(), nt));
    }
    // 基线之后至少要有两个互异的时刻, 否则一次拟合无定义.
    let post_baseline = &input.timing.timepoints()[1..];
    if post_baseline.windows(2).all(|w| w[0] == w[1]) {
        return Err(PipelineError::DegenerateTimeAxis);
    }
    if !validate_phases(input.phases, nt, confirm)? {
        log::info!("user declined to continue, aborting");
        return Ok(None);
    }
    if !input.roi.fits(dims) {
        return Err(PipelineError::DegenerateRoi);
    }

    let roi = &input.roi;
    let cropped_volume = input.volume.slice(s![
        ..,
        roi.min[0]..roi.max[0],
        roi.min[1]..roi.max[1],
        roi.min[2]..roi.max[2]
    ]);
    let mut cropped_mask = input
        .mask
        .slice(s![
            roi.min[0]..roi.max[0],
            roi.min[1]..roi.max[1],
            roi.min[2]..roi.max[2]
        ])
        .to_owned();

    let empty_segmentation = cropped_mask.iter().all(|&m| !m);
    if empty_segmentation {
        log::warn!("segmentation is empty inside the ROI box, using the whole box instead");
        cropped_mask.fill(true);
    }

    log::debug!(
        "processing ROI extent {:?} of grid {:?}, {} timepoints",
        roi.extent(),
        dims,
        nt
    );

    let maps = compute_maps(cropped_volume, cropped_mask.view(), input.phases, cfg);
    let peaks = extract_peaks(maps.pe.view(), maps.ser.view());

    let curve = time_intensity_curve(
        cropped_volume,
        maps.base_mask.view(),
        &input.timing,
        input.phases.pre,
    );
    let enhancement = enhancement_summary(cropped_volume, maps.base_mask.view(), input.phases);

    // ROI 几何统计以完整的用户分割为准, 不随 ROI 盒裁剪;
    // 只有空分割回退时才退化为 ROI 盒本身.
    let full_mask = if empty_segmentation {
        scatter_into_template(cropped_mask.view(), roi, dims)
    } else {
        input.mask.clone()
    };
    let full_class = scatter_into_template(maps.ser_class.view(), roi, dims);

    let scalars = ScalarInputs {
        peaks,
        enhancement,
        early_phase_min: input.timing.timepoints()[input.phases.early],
        late_phase_min: input.timing.timepoints()[input.phases.late],
        injection_min: input.timing.injection_min(),
        slope: curve.fit.slope,
    };
    let (summary, ser_distribution) =
        summarize(stats, cfg, full_mask.view(), full_class.view(), &scalars);

    Ok(Some(PerfusionOutput {
        pe: scatter_into_template(maps.pe.view(), roi, dims),
        ser: scatter_into_template(maps.ser.view(), roi, dims),
        ser_class: full_class,
        base_mask: scatter_into_template(maps.base_mask.view(), roi, dims),
        mip: mip(input.volume.view()),
        peaks,
        tic: curve.table,
        fit: curve.fit,
        summary,
        ser_distribution,
    }))
}
