//! Proximal operators of common regularizers and constraints

use ndarray::prelude::*;
use ndarray::NdFloat;

use super::ProximalStrategy;
use crate::error::StrategyError;

/// Regularization strength $`\lambda \geq 0`$, the options payload of the
/// penalized operators below.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penalty<S> {
    pub lambda: S,
}

impl<S> Penalty<S> {
    pub fn new(lambda: S) -> Self {
        Penalty { lambda }
    }
}

fn check_lambda<S: NdFloat>(opts: &Penalty<S>) -> Result<S, StrategyError> {
    if opts.lambda >= S::zero() && opts.lambda.is_finite() {
        Ok(opts.lambda)
    } else {
        Err(format!("lambda must be non-negative and finite, got {}", opts.lambda).into())
    }
}

/// $`h(x) = 0`$, the proximal operator is the identity.
///
/// Accepts any options payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct Zero;

impl<S, P> ProximalStrategy<S, P> for Zero
where
    S: NdFloat,
    P: ?Sized,
{
    fn prox(&self, v: ArrayView2<'_, S>, _step: S, _opts: &P) -> Result<Array2<S>, StrategyError> {
        Ok(v.to_owned())
    }
}

/// $`h(x) = \lambda \|x\|_1`$ (entrywise), prox is soft thresholding
///
/// ```math
/// \mathrm{prox}_{t h}(v)_{ij} = \mathrm{sign}(v_{ij}) \max(|v_{ij}| - \lambda t, 0)
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct L1;

impl L1 {
    pub fn value<S: NdFloat>(&self, x: ArrayView2<'_, S>, opts: &Penalty<S>) -> S {
        opts.lambda * x.fold(S::zero(), |acc, &v| acc + v.abs())
    }
}

impl<S: NdFloat> ProximalStrategy<S, Penalty<S>> for L1 {
    fn prox(&self, v: ArrayView2<'_, S>, step: S, opts: &Penalty<S>) -> Result<Array2<S>, StrategyError> {
        let thresh = check_lambda(opts)? * step;
        Ok(v.mapv(|vi| vi.signum() * (vi.abs() - thresh).max(S::zero())))
    }
}

/// $`h(x) = \frac{\lambda}{2} \|x\|_F^2`$, prox is a uniform shrink by $`1/(1 + \lambda t)`$
#[derive(Debug, Clone, Copy, Default)]
pub struct Ridge;

impl Ridge {
    pub fn value<S: NdFloat>(&self, x: ArrayView2<'_, S>, opts: &Penalty<S>) -> S {
        let half = S::one() / (S::one() + S::one());
        half * opts.lambda * x.fold(S::zero(), |acc, &v| acc + v * v)
    }
}

impl<S: NdFloat> ProximalStrategy<S, Penalty<S>> for Ridge {
    fn prox(&self, v: ArrayView2<'_, S>, step: S, opts: &Penalty<S>) -> Result<Array2<S>, StrategyError> {
        let scale = S::one() / (S::one() + check_lambda(opts)? * step);
        Ok(v.mapv(|vi| vi * scale))
    }
}

/// $`h(x) = \lambda \sum_r \|x_{r,:}\|_2`$, the group lasso with one group per row
///
/// Each row is shrunk towards zero by $`\lambda t`$ in Euclidean norm and
/// vanishes when its norm is below that.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowGroupL2;

impl RowGroupL2 {
    pub fn value<S: NdFloat>(&self, x: ArrayView2<'_, S>, opts: &Penalty<S>) -> S {
        opts.lambda
            * x.outer_iter()
                .map(|row| row.fold(S::zero(), |acc, &v| acc + v * v).sqrt())
                .fold(S::zero(), |acc, n| acc + n)
    }
}

impl<S: NdFloat> ProximalStrategy<S, Penalty<S>> for RowGroupL2 {
    fn prox(&self, v: ArrayView2<'_, S>, step: S, opts: &Penalty<S>) -> Result<Array2<S>, StrategyError> {
        let thresh = check_lambda(opts)? * step;
        let mut out = v.to_owned();
        for mut row in out.rows_mut() {
            let norm = row.fold(S::zero(), |acc, &r| acc + r * r).sqrt();
            let factor = if norm > thresh {
                S::one() - thresh / norm
            } else {
                S::zero()
            };
            row.mapv_inplace(|r| r * factor);
        }
        Ok(out)
    }
}

/// Indicator of the non-negative orthant, prox is the projection $`\max(v, 0)`$
///
/// Accepts any options payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonNegative;

impl<S, P> ProximalStrategy<S, P> for NonNegative
where
    S: NdFloat,
    P: ?Sized,
{
    fn prox(&self, v: ArrayView2<'_, S>, _step: S, _opts: &P) -> Result<Array2<S>, StrategyError> {
        Ok(v.mapv(|vi| vi.max(S::zero())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn zero_is_identity() {
        let v = array![[1., -2.], [0.5, 3.]];
        let x = Zero.prox(v.view(), 0.7, &()).unwrap();
        assert_eq!(x, v);
    }

    #[test]
    fn l1_soft_thresholds() {
        let v = array![[3., -0.5], [-2., 1.]];
        let x = L1.prox(v.view(), 0.5, &Penalty::new(2.)).unwrap();
        assert_abs_diff_eq!(x, array![[2., 0.], [-1., 0.]]);
        assert_abs_diff_eq!(L1.value(v.view(), &Penalty::new(2.)), 13.);
    }

    #[test]
    fn l1_rejects_negative_lambda() {
        let v = array![[1.]];
        assert!(L1.prox(v.view(), 1., &Penalty::new(-1.)).is_err());
        assert!(RowGroupL2.prox(v.view(), 1., &Penalty::new(f64::NAN)).is_err());
    }

    #[test]
    fn ridge_shrinks_uniformly() {
        let v = array![[3., -6.]];
        let x = Ridge.prox(v.view(), 0.5, &Penalty::new(4.)).unwrap();
        assert_abs_diff_eq!(x, array![[1., -2.]]);
        assert_abs_diff_eq!(Ridge.value(v.view(), &Penalty::new(4.)), 90.);
    }

    #[test]
    fn row_group_shrinks_rows() {
        let v = array![[3., 4.], [0.3, 0.4], [0., 0.]];
        let x = RowGroupL2.prox(v.view(), 1., &Penalty::new(1.)).unwrap();
        assert_abs_diff_eq!(x, array![[2.4, 3.2], [0., 0.], [0., 0.]], epsilon = 1e-12);
        assert_abs_diff_eq!(RowGroupL2.value(v.view(), &Penalty::new(2.)), 11., epsilon = 1e-12);
    }

    #[test]
    fn nonnegative_projects() {
        let v = array![[-1., 2.], [0., -0.25]];
        let x = NonNegative.prox(v.view(), 1., &Penalty::new(0.)).unwrap();
        assert_eq!(x, array![[0., 2.], [0., 0.]]);
    }
}
