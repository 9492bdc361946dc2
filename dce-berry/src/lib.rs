#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 面向时间分辨 (4D) 动态对比增强序列的半定量灌注参数计算.
//!
//! 输入是一个 `[t, z, y, x]` 排布的 4D 强度序列, 一个与单时间点同形状的二值
//! 分割 mask, 以及 ROI 几何与阈值配置; 输出是 PE / SER 参数图, SER 分级图,
//! TIC 曲线 (带一次拟合) 和两张统计汇总表. 本 crate 不负责任何文件 I/O,
//! 配准或渲染, 这些由宿主应用完成.
//!
//! # 注意
//!
//! 1. 数值退化 (除零, 负 SER, 超上限比值) 一律折叠到 non-SER (0) 状态,
//!   不视为错误. 这与参考文献 (Arasu 2011, Partridge 2010) 的约定一致.
//! 2. 整条流水线是单线程同步批处理: 一次 `process` 调用独占其全部中间量,
//!   不存在跨调用共享的可变状态.
//!
//! # 开发计划
//!
//! ### ROI 几何解析 ✅
//!
//! 世界坐标包围盒到体素索引范围的转换, 含边界裁剪与 "ROI 完全在网格外"
//! 的显式校验.
//!
//! 实现位于 `dce-berry/src/geometry.rs`.
//!
//! ### Map Engine ✅
//!
//! 背景 mask, PE 图, SER 图与 SER 分级图的推导. 纯函数, 相同输入必产生
//! 逐字节相同的输出.
//!
//! 实现位于 `dce-berry/src/maps.rs`.
//!
//! ### Peak 提取 ✅
//!
//! 3x3x3 邻域均值滤波后取不重叠邻域中心的最大值, 报告 peak PE 与 peak SER.
//!
//! 实现位于 `dce-berry/src/peak.rs`.
//!
//! ### TIC 曲线与最小二乘一次拟合的纯 Rust 实现 ✅
//!
//! mask 区域逐时间点平均增强曲线, 以及去除基线锚点后的一次直线拟合.
//!
//! 实现位于 `dce-berry/src/{tic.rs, fitting}`.
//!
//! ### 统计聚合 ✅
//!
//! 将外部几何统计端 (体积, 体素数, OBB 直径) 与 Map Engine 输出合成
//! Summary 表和 SER 分布表, 含 FTV/ETV 派生体积.
//!
//! 实现位于 `dce-berry/src/{stats.rs, tables.rs}`.
//!
//! ### Pipeline Orchestrator ✅
//!
//! 输入校验, 空 mask 的 ROI 盒回退, `early == late` 的交互确认,
//! 以及全部输出的装配.
//!
//! 实现位于 `dce-berry/src/pipeline.rs`.
//!
//! ### 完善代码文档 ✅
//!
//! 给每个 public API 提供文档, 并视情况给 private API 提供文档.

/// 三维索引 (z, y, x), 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

mod config;
mod error;
mod tables;

pub mod consts;
pub mod fitting;
pub mod geometry;
pub mod maps;
pub mod peak;
pub mod pipeline;
pub mod stats;
pub mod tic;

pub mod prelude;

pub use config::{AcquisitionTiming, PhaseIndices, SerBin, SerBinning, ThresholdConfig};
pub use error::{PipelineError, PipelineResult};
pub use tables::{
    SerDistRow, SerDistributionTable, SummaryRow, SummaryTable, TicRow, TicTable,
    SER_DISTRIBUTION_COLUMNS, SUMMARY_COLUMNS, TIC_COLUMNS,
};
