//! Minimization for Composite Functions consisting of
//! smooth _f_ and non-smooth prox-friendly _h_
//!
//! This includes common objective functions such as the LASSO
//! as well as smooth constrained methods, as a projection is
//! the proximal operator of a constraint set.
//!
//! The smooth part enters through a [`GradientStrategy`] and the
//! non-smooth part through a [`ProximalStrategy`]. Each strategy receives
//! an options payload chosen by the caller (problem data, regularization
//! strength, ...) which the solver forwards untouched.

mod apg;
pub use apg::*;

mod operators;
pub use operators::*;

use ndarray::prelude::*;

use crate::error::StrategyError;

/// Gradient of the smooth term, $`\nabla f(x)`$
pub trait GradientStrategy<S, L: ?Sized> {
    /// Evaluate $`\nabla f`$ at `x`. The result must have the shape of `x`.
    fn gradient(&self, x: ArrayView2<'_, S>, opts: &L) -> Result<Array2<S>, StrategyError>;
}

/// Proximal operator of the non-smooth term
///
/// ```math
/// \mathrm{prox}_{t h}(v) = \mathrm{arg}\!\min_z h(z) + \frac{1}{2t} \|z - v\|_F^2
/// ```
pub trait ProximalStrategy<S, P: ?Sized> {
    /// Evaluate $`\mathrm{prox}_{t h}`$ at `v`. The result must have the shape of `v`.
    fn prox(&self, v: ArrayView2<'_, S>, step: S, opts: &P) -> Result<Array2<S>, StrategyError>;
}

impl<S, L, F> GradientStrategy<S, L> for F
where
    L: ?Sized,
    F: Fn(ArrayView2<'_, S>, &L) -> Array2<S>,
{
    fn gradient(&self, x: ArrayView2<'_, S>, opts: &L) -> Result<Array2<S>, StrategyError> {
        Ok(self(x, opts))
    }
}

impl<S, P, F> ProximalStrategy<S, P> for F
where
    P: ?Sized,
    F: Fn(ArrayView2<'_, S>, S, &P) -> Array2<S>,
{
    fn prox(&self, v: ArrayView2<'_, S>, step: S, opts: &P) -> Result<Array2<S>, StrategyError> {
        Ok(self(v, step, opts))
    }
}

/// Pin down the signature of a gradient closure
///
/// Closures handed straight to a generic strategy parameter do not get
/// their argument types inferred, this does it for them.
pub fn gradient_fn<S, L, F>(f: F) -> F
where
    L: ?Sized,
    F: Fn(ArrayView2<'_, S>, &L) -> Array2<S>,
{
    f
}

/// Pin down the signature of a proximal closure, see [`gradient_fn`]
pub fn prox_fn<S, P, F>(f: F) -> F
where
    P: ?Sized,
    F: Fn(ArrayView2<'_, S>, S, &P) -> Array2<S>,
{
    f
}

/// Do nothing progress hook (never cancels)
pub fn nop<S>(_progress: &Progress<'_, S>) -> bool {
    false
}
