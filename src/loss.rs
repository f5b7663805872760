//! Smooth data-fit terms exposed as gradient strategies

use ndarray::prelude::*;
use ndarray::{NdFloat, Zip};

use crate::error::StrategyError;
use crate::prox::GradientStrategy;

/// $`f(x) = \frac12 \|x - C\|_F^2`$, options are the center $`C`$
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredDistance;

impl SquaredDistance {
    fn check<S>(x: &ArrayView2<'_, S>, center: &Array2<S>) -> Result<(), StrategyError> {
        if x.dim() != center.dim() {
            return Err(format!(
                "center is {:?} but the iterate is {:?}",
                center.dim(),
                x.dim()
            )
            .into());
        }
        Ok(())
    }

    pub fn value<S: NdFloat>(&self, x: ArrayView2<'_, S>, center: &Array2<S>) -> Result<S, StrategyError> {
        Self::check(&x, center)?;
        let half = S::one() / (S::one() + S::one());
        Ok(half
            * Zip::from(&x).and(center).fold(S::zero(), |acc, &a, &c| {
                let d = a - c;
                acc + d * d
            }))
    }
}

impl<S: NdFloat> GradientStrategy<S, Array2<S>> for SquaredDistance {
    fn gradient(&self, x: ArrayView2<'_, S>, center: &Array2<S>) -> Result<Array2<S>, StrategyError> {
        Self::check(&x, center)?;
        Ok(&x - center)
    }
}

/// Problem data $`(A, B)`$ for [`LeastSquares`]
#[derive(Debug, Clone)]
pub struct Design<S> {
    pub a: Array2<S>,
    pub b: Array2<S>,
}

impl<S> Design<S> {
    pub fn new(a: Array2<S>, b: Array2<S>) -> Self {
        Design { a, b }
    }
}

/// $`f(x) = \frac12 \|A x - B\|_F^2`$ with gradient $`A^T(Ax - B)`$
///
/// The iterate is $`n \times k`$ for an $`m \times n`$ matrix $`A`$ and an
/// $`m \times k`$ right hand side $`B`$.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeastSquares;

impl LeastSquares {
    fn check<S>(x: &ArrayView2<'_, S>, data: &Design<S>) -> Result<(), StrategyError> {
        let (m, n) = data.a.dim();
        if x.nrows() != n || data.b.dim() != (m, x.ncols()) {
            return Err(format!(
                "A is {}x{} and B is {:?}, incompatible with a {:?} iterate",
                m,
                n,
                data.b.dim(),
                x.dim()
            )
            .into());
        }
        Ok(())
    }

    pub fn value<S: NdFloat>(&self, x: ArrayView2<'_, S>, data: &Design<S>) -> Result<S, StrategyError> {
        Self::check(&x, data)?;
        let half = S::one() / (S::one() + S::one());
        let r = data.a.dot(&x) - &data.b;
        Ok(half * r.fold(S::zero(), |acc, &v| acc + v * v))
    }
}

impl<S: NdFloat> GradientStrategy<S, Design<S>> for LeastSquares {
    fn gradient(&self, x: ArrayView2<'_, S>, data: &Design<S>) -> Result<Array2<S>, StrategyError> {
        Self::check(&x, data)?;
        let r = data.a.dot(&x) - &data.b;
        Ok(data.a.t().dot(&r))
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn squared_distance_gradient() {
        let C = array![[1., 2.], [3., 4.]];
        let x = array![[0., 2.], [5., 4.]];
        let g = SquaredDistance.gradient(x.view(), &C).unwrap();
        assert_eq!(g, array![[-1., 0.], [2., 0.]]);
        assert_abs_diff_eq!(SquaredDistance.value(x.view(), &C).unwrap(), 2.5);
    }

    #[test]
    fn squared_distance_shape_error() {
        let C = array![[1., 2.]];
        assert!(SquaredDistance.gradient(array![[1.], [2.]].view(), &C).is_err());
        assert!(SquaredDistance.value(array![[1.], [2.]].view(), &C).is_err());
    }

    #[test]
    fn least_squares_gradient() {
        let A = array![[10., 0.], [0., 20.]];
        let B = array![[50.], [100.]];
        let data = Design::new(A, B);
        let x = array![[19.], [4.]];
        let g = LeastSquares.gradient(x.view(), &data).unwrap();
        assert_abs_diff_eq!(g, array![[1400.], [-400.]]);
        assert_abs_diff_eq!(LeastSquares.value(x.view(), &data).unwrap(), 0.5 * (140f64.powi(2) + 20f64.powi(2)));
    }

    #[test]
    fn least_squares_shape_error() {
        let data = Design::new(Array2::<f64>::eye(3), Array2::zeros((3, 1)));
        assert!(LeastSquares.gradient(Array2::<f64>::zeros((2, 1)).view(), &data).is_err());
        assert!(LeastSquares.gradient(Array2::<f64>::zeros((3, 2)).view(), &data).is_err());
        assert!(LeastSquares.value(Array2::<f64>::zeros((2, 1)).view(), &data).is_err());
        assert!(LeastSquares.value(Array2::<f64>::zeros((3, 2)).view(), &data).is_err());
    }
}
