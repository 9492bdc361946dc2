//! 通用常量.

/// 除零保护项. 所有比值分母都加上它.
pub const EPSILON: f64 = 1.0e-6;

/// SER 上限 (默认). 超过该值的 SER 一律视为 non-SER (连同负值一起),
/// 与 FTV-DCEMRI 和 Aegis 的约定保持一致.
pub const SER_UPPER_THRESHOLD: f64 = 3.0;

/// 单阈值分级模式下, 第二个区间上界的扩张因子:
/// `threshold < SER ≤ threshold * (1 + SER_DELTA_FACTOR)`.
pub const SER_DELTA_FACTOR: f64 = 0.1;

/// 背景阈值默认值, 以 pre-contrast 图像 95 分位数的百分比计.
pub const DEFAULT_BACKGROUND_THRESHOLD_PCT: f64 = 60.0;

/// PE 阈值默认值 (百分比).
pub const DEFAULT_PE_THRESHOLD: f64 = 70.0;

/// Peak 提取的邻域边长 (3x3x3).
pub const PEAK_NEIGHBOURHOOD: usize = 3;

/// SER 分级标签.
pub mod label {
    /// 分级图中的 non-SER (无信号) 标签.
    pub const NON_SER: u8 = 0;

    /// 体素是否为 non-SER?
    #[inline]
    pub const fn is_non_ser(v: u8) -> bool {
        matches!(v, NON_SER)
    }

    /// 体素是否落在某个 SER 区间内?
    #[inline]
    pub const fn is_ser(v: u8) -> bool {
        !is_non_ser(v)
    }
}
