//! 曲线拟合.
//!
//! 给定一系列点 `(x, y)`, 该模块可以按最小二乘拟合出一条一次直线.
//! TIC 的线性趋势估计建立在它之上.

use ndarray::ArrayView1;

mod linear;

pub use linear::LinearFit;

/// 基于最小二乘法拟合一次直线 `y = m·x + n`.
///
/// `x` 是自变量数组, `y` 是对应函数值, 两者必须一一对应且至少包含两个点,
/// 且 `x` 不能全部相同.
pub fn linear_f64<'a>(x: ArrayView1<'a, f64>, y: ArrayView1<'a, f64>) -> LinearFit<f64> {
    linear::LinearImp::<f64>::new(x, y).fit()
}

/// 基于最小二乘法拟合一次直线 `y = m·x + n`.
///
/// `x` 是自变量数组, `y` 是对应函数值, 两者必须一一对应且至少包含两个点,
/// 且 `x` 不能全部相同.
pub fn linear_f32<'a>(x: ArrayView1<'a, f32>, y: ArrayView1<'a, f32>) -> LinearFit<f32> {
    linear::LinearImp::<f32>::new(x, y).fit()
}
