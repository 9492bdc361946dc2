//! 输出表结构.
//!
//! 列名与行标签是下游显示端的对接契约, 不要轻易改动.

#[cfg(feature = "serde")]
use serde::Serialize;

/// TIC 表的列名.
pub const TIC_COLUMNS: [&str; 3] = ["Timepoint [min]", "PE (%)", "Linear Fit"];

/// Summary 表的列名.
pub const SUMMARY_COLUMNS: [&str; 3] = ["Parameter", "Value", "Units"];

/// SER 分布表的列名.
pub const SER_DISTRIBUTION_COLUMNS: [&str; 3] = ["SER Range", "Volume (cm3)", "Distribution (%)"];

/// TIC 表的一行: 一个采集时间点.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TicRow {
    /// 采集时刻 (分钟).
    pub time_min: f64,

    /// mask 区域的平均增强 (百分比). mask 为空时为 NaN.
    pub mean_enhancement_pct: f64,

    /// 拟合直线在该时刻的值. 基线锚点 (第一行) 不参与拟合, 为 `None`.
    pub fitted: Option<f64>,
}

/// TIC 表.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TicTable {
    /// 按时间点顺序的各行.
    pub rows: Vec<TicRow>,
}

impl TicTable {
    /// 列名.
    #[inline]
    pub fn columns(&self) -> [&'static str; 3] {
        TIC_COLUMNS
    }
}

/// Summary 表的一行: 一个标量参数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SummaryRow {
    /// 参数名.
    pub parameter: &'static str,

    /// 参数值.
    pub value: f64,

    /// 单位. 无量纲时为 `"[]"`.
    pub units: &'static str,
}

/// Summary 表.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SummaryTable {
    /// 固定顺序的各行.
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    /// 列名.
    #[inline]
    pub fn columns(&self) -> [&'static str; 3] {
        SUMMARY_COLUMNS
    }
}

/// SER 分布表的一行: 一个区间或一个派生体积.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SerDistRow {
    /// 行标签: 区间图例或派生量名称.
    pub legend: String,

    /// 体积 (cm3). 区间缺失 (统计端无法提供) 时为 `None`.
    pub volume_cm3: Option<f64>,

    /// 占 ETV 的百分比. ETV 为空或区间缺失时为 `None`.
    pub distribution_pct: Option<f64>,
}

/// SER 分布表: 每个区间一行, 之后是 FTV / ETV / peak 行.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SerDistributionTable {
    /// 各行.
    pub rows: Vec<SerDistRow>,
}

impl SerDistributionTable {
    /// 列名.
    #[inline]
    pub fn columns(&self) -> [&'static str; 3] {
        SER_DISTRIBUTION_COLUMNS
    }
}
