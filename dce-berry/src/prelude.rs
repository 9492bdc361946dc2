//! 🫐欢迎光临🫐
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx3d;

pub use crate::config::{AcquisitionTiming, PhaseIndices, SerBin, SerBinning, ThresholdConfig};
pub use crate::error::{PipelineError, PipelineResult};

pub use crate::consts::label::{is_non_ser, is_ser, NON_SER};
pub use crate::consts::{EPSILON, SER_UPPER_THRESHOLD};

pub use crate::geometry::{resolve_voxel_bounds, VoxelBounds, WorldBox, WorldToVoxel};

pub use crate::fitting::{linear_f64, LinearFit};
pub use crate::maps::{compute_maps, mip, scatter_into_template, subtract_phases, CroppedMaps};
pub use crate::peak::{extract_peaks, peak_mean, Peaks};
pub use crate::tic::{enhancement_summary, time_intensity_curve, EnhancementSummary, TicCurve};

pub use crate::stats::{GeometricStats, ScalarInputs, SegmentStats, VoxelGridStats};
pub use crate::tables::{
    SerDistRow, SerDistributionTable, SummaryRow, SummaryTable, TicRow, TicTable,
};

pub use crate::pipeline::{
    process, AlwaysConfirm, ConfirmProvider, PerfusionInput, PerfusionOutput,
};
