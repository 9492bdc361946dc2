//! 一次直线的最小二乘拟合.

use ndarray::ArrayView1;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 拟合结果 `y = slope·x + intercept`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinearFit<T: num::Float> {
    /// 斜率.
    pub slope: T,

    /// 截距.
    pub intercept: T,
}

macro_rules! impl_linear_fit {
    ($fp: ty) => {
        impl LinearFit<$fp> {
            /// 求直线在 `x` 处的取值.
            #[inline]
            pub fn eval(&self, x: $fp) -> $fp {
                self.slope * x + self.intercept
            }
        }
    };
}

impl_linear_fit!(f32);
impl_linear_fit!(f64);

pub(crate) struct LinearImp<'a, T: num::Float> {
    x: ArrayView1<'a, T>,
    y: ArrayView1<'a, T>,
}

macro_rules! impl_linear_imp {
    ($fp: ty) => {
        impl<'a> LinearImp<'a, $fp> {
            pub fn new(x: ArrayView1<'a, $fp>, y: ArrayView1<'a, $fp>) -> Self {
                assert_eq!(x.len(), y.len(), "x 值和 y 值必须一一对应");
                assert!(x.len() >= 2, "至少需要拟合两个点");

                Self { x, y }
            }

            /// 正规方程的闭式解. 一次直线不需要构造 Vandermonde 矩阵.
            pub fn fit(&self) -> LinearFit<$fp> {
                let n = self.x.len() as $fp;
                let sx = self.x.sum();
                let sy = self.y.sum();
                let sxx = self.x.iter().map(|&v| v * v).sum::<$fp>();
                let sxy = self
                    .x
                    .iter()
                    .zip(self.y.iter())
                    .map(|(&a, &b)| a * b)
                    .sum::<$fp>();

                let denom = n * sxx - sx * sx;
                assert!(denom != 0.0, "自变量 x 不能全部相同");

                let slope = (n * sxy - sx * sy) / denom;
                let intercept = (sy - slope * sx) / n;

                LinearFit { slope, intercept }
            }
        }
    };
}

impl_linear_imp!(f32);
impl_linear_imp!(f64);
