//! Accelerated Proximal Gradient with adaptive step size and restart

use log::{debug, info, trace};
use ndarray::prelude::*;
use ndarray::{NdFloat, Zip};
use num_traits::Float;

use super::{GradientStrategy, ProximalStrategy};
use crate::error::{ApgError, Result};

/// Step size rule for [`apg`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepSize<S> {
    /// Barzilai-Borwein estimate, kept within `[beta * t, alpha * t]`
    /// of the previous step at every iteration.
    Adaptive,
    /// Constant step, e.g. $`1/L`$ for an $`L`$-smooth _f_.
    Fixed(S),
}

/// Tuning parameters for [`apg`]
#[derive(Debug, Clone)]
pub struct ApgParams<S> {
    /// Iteration budget, one proximal evaluation per iteration.
    pub max_iter: usize,
    /// Stop once $`\|y_k - x_k\|_F^2 < \epsilon`$.
    pub eps: S,
    /// Step growth bound, `alpha > 1`.
    pub alpha: S,
    /// Step shrink bound, `0 < beta < 1`.
    pub beta: S,
    /// Use FISTA momentum. Without it this is plain proximal gradient.
    pub accel: bool,
    pub step: StepSize<S>,
    /// Iterations between progress reports and cancellation checks.
    pub report_every: usize,
}

impl Default for ApgParams<f64> {
    fn default() -> Self {
        ApgParams {
            max_iter: 1000,
            eps: 1e-6,
            alpha: 1.01,
            beta: 0.5,
            accel: true,
            step: StepSize::Adaptive,
            report_every: 100,
        }
    }
}

impl Default for ApgParams<f32> {
    fn default() -> Self {
        ApgParams {
            max_iter: 1000,
            eps: 1e-5,
            alpha: 1.01,
            beta: 0.5,
            accel: true,
            step: StepSize::Adaptive,
            report_every: 100,
        }
    }
}

impl<S: NdFloat> ApgParams<S> {
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    #[must_use]
    pub fn with_eps(mut self, eps: S) -> Self {
        self.eps = eps;
        self
    }

    #[must_use]
    pub fn with_bounds(mut self, alpha: S, beta: S) -> Self {
        self.alpha = alpha;
        self.beta = beta;
        self
    }

    #[must_use]
    pub fn with_accel(mut self, accel: bool) -> Self {
        self.accel = accel;
        self
    }

    #[must_use]
    pub fn with_step(mut self, step: StepSize<S>) -> Self {
        self.step = step;
        self
    }

    #[must_use]
    pub fn with_report_every(mut self, report_every: usize) -> Self {
        self.report_every = report_every;
        self
    }

    /// Check every parameter against its admissible range.
    pub fn validate(&self) -> Result<()> {
        let invalid = |name, reason| Err(ApgError::InvalidParameter { name, reason });
        if self.max_iter == 0 {
            return invalid("max_iter", "must be positive");
        }
        if !(self.eps > S::zero()) {
            return invalid("eps", "must be positive");
        }
        if !(self.alpha > S::one()) || !self.alpha.is_finite() {
            return invalid("alpha", "must be finite and greater than one");
        }
        if !(self.beta > S::zero() && self.beta < S::one()) {
            return invalid("beta", "must lie strictly between zero and one");
        }
        if self.report_every == 0 {
            return invalid("report_every", "must be positive");
        }
        if let StepSize::Fixed(t) = self.step {
            if !(t > S::zero()) || !t.is_finite() {
                return invalid("step", "fixed step must be positive and finite");
            }
        }
        Ok(())
    }
}

/// Snapshot handed to the progress hook of [`apg`]
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a, S> {
    pub iteration: usize,
    /// Step size for the next iteration.
    pub step: S,
    /// Step size used by this iteration.
    pub prev_step: S,
    pub theta: S,
    /// Whether this iteration was discarded by the restart test.
    pub restarted: bool,
    /// $`\|y - x\|_F^2`$ as seen by the stopping test.
    pub residual: S,
    pub x: ArrayView2<'a, S>,
}

/// Why [`apg`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The stopping test fired.
    Converged,
    /// The iteration budget ran out.
    MaxIterations,
    /// The progress hook asked to stop.
    Cancelled,
}

/// Output of [`apg`]
#[derive(Debug, Clone)]
pub struct ApgSolution<S> {
    pub x: Array2<S>,
    /// Number of proximal evaluations performed.
    pub iterations: usize,
    /// Final step size.
    pub step: S,
    /// Number of momentum restarts.
    pub restarts: usize,
    pub termination: Termination,
}

impl<S> ApgSolution<S> {
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

/// Accelerated Proximal Gradient
///
/// Minimizes $`f(x) + h(x)`$ over matrices, where _f_ is smooth and _h_ has
/// an inexpensive proximal operator, using FISTA momentum with gradient
/// based adaptive restart and a Barzilai-Borwein step size.
///
/// Algorithm
/// ---------
/// ```math
/// \begin{aligned}
/// x_k &= \mathrm{prox}_{t_k h}(y_{k-1} - t_k \nabla f(y_{k-1})) \\
/// \theta_k &= \frac{2}{1 + \sqrt{1 + 4 / \theta_{k-1}^2}} \\
/// y_k &= x_k + (1 - \theta_k)(x_k - x_{k-1}) \\
/// \hat t_k &= \frac{\frac12 \|y_k - y_{k-1}\|_F^2}{|\langle y_k - y_{k-1}, \nabla f(y_{k-1}) - \nabla f(y_k) \rangle|} \\
/// t_{k+1} &= \min(\alpha t_k, \max(\hat t_k, \beta t_k))
/// \end{aligned}
/// ```
/// where $`\theta_0 := 1`$. If $`\langle \nabla f(y_{k-1}), x_k - x_{k-1} \rangle > 0`$
/// the step is discarded, $`x_k := x_{k-1}`$, and momentum restarts with
/// $`\theta_k := 1`$. The initial step comes from a Barzilai-Borwein trial
/// along $`-\nabla f(x_0)`$.
///
/// Whenever the step estimate is undefined the rule falls back to:
/// - $`\nabla f(x_0) = 0`$: unit initial step;
/// - a zero or non-finite initial estimate: the trial length $`1/\|\nabla f(x_0)\|_F`$;
/// - $`y_k = y_{k-1}`$: shrink, $`t_{k+1} = \beta t_k`$;
/// - $`y_k \ne y_{k-1}`$ with zero curvature: grow, $`t_{k+1} = \alpha t_k`$.
///
/// Parameters
/// ----------
/// - __grad_f:__    gradient strategy for _f_
/// - __prox_h:__    proximal strategy for _h_
/// - __loss_opts:__ options forwarded to every `grad_f` call
/// - __prox_opts:__ options forwarded to every `prox_h` call
/// - __x0:__        initial guess, its shape is kept throughout
/// - __params:__    see [`ApgParams`]
/// - __callback:__  user-defined hook evaluated every `params.report_every`
///                   iterations. If it returns true, the function returns
///                   early with [`Termination::Cancelled`].
///
/// Errors
/// ------
/// Invalid parameters, strategy failures, strategy output of the wrong
/// shape or with non-finite entries, and a step size that degenerates to
/// zero are reported as [`ApgError`].
pub fn apg<S, G, P, L, Q>(
    grad_f: &G,
    prox_h: &P,
    loss_opts: &L,
    prox_opts: &Q,
    x0: ArrayView2<'_, S>,
    params: &ApgParams<S>,
    mut callback: impl FnMut(&Progress<'_, S>) -> bool,
) -> Result<ApgSolution<S>>
where
    S: NdFloat,
    G: GradientStrategy<S, L> + ?Sized,
    P: ProximalStrategy<S, Q> + ?Sized,
    L: ?Sized,
    Q: ?Sized,
{
    params.validate()?;

    let dim = x0.dim();
    let two = S::one() + S::one();
    let four = two * two;

    let mut x = x0.to_owned();
    let mut y = x0.to_owned();
    let mut grad = eval_gradient(grad_f, y.view(), loss_opts, dim, 0)?;

    let mut t = match params.step {
        StepSize::Fixed(t) => t,
        StepSize::Adaptive => initial_step(grad_f, loss_opts, &x, &grad)?,
    };
    debug!("apg: {}x{} problem, initial step {:e}", dim.0, dim.1, t);

    let mut theta = S::one();
    let mut restarts = 0;

    for iter in 1..=params.max_iter {
        let oldx = x.clone();
        let oldy = y.clone();

        x = eval_prox(prox_h, (&y - &(&grad * t)).view(), t, prox_opts, dim, iter)?;

        let residual = sq_dist(&y, &x);
        if residual < params.eps {
            debug!("apg: converged after {} iterations", iter);
            return Ok(ApgSolution {
                x,
                iterations: iter,
                step: t,
                restarts,
                termination: Termination::Converged,
            });
        }

        theta = if params.accel {
            two / (S::one() + Float::sqrt(S::one() + four / (theta * theta)))
        } else {
            S::one()
        };

        // gradient based restart
        let restarted = inner(&grad, &(&x - &oldx)) > S::zero();
        if restarted {
            trace!("apg: restart at iteration {}", iter);
            x.assign(&oldx);
            theta = S::one();
            restarts += 1;
        }

        y = &x + &((&x - &oldx) * (S::one() - theta));

        let oldg = grad;
        grad = eval_gradient(grad_f, y.view(), loss_opts, dim, iter)?;

        let prev_step = t;
        if let StepSize::Adaptive = params.step {
            t = adapt_step(t, &y, &oldy, &oldg, &grad, params);
            if !(t > S::zero()) || !t.is_finite() {
                return Err(ApgError::DegenerateStep { iteration: iter });
            }
        }

        if iter % params.report_every == 0 {
            info!("apg: iteration {}, step {:e}", iter, t);
            let progress = Progress {
                iteration: iter,
                step: t,
                prev_step,
                theta,
                restarted,
                residual,
                x: x.view(),
            };
            if callback(&progress) {
                info!("apg: cancelled at iteration {}", iter);
                return Ok(ApgSolution {
                    x,
                    iterations: iter,
                    step: t,
                    restarts,
                    termination: Termination::Cancelled,
                });
            }
        }
    }

    debug!("apg: no convergence within {} iterations", params.max_iter);
    Ok(ApgSolution {
        x,
        iterations: params.max_iter,
        step: t,
        restarts,
        termination: Termination::MaxIterations,
    })
}

/// Barzilai-Borwein step from a trial step of length `1/‖grad‖` along `-grad`
fn initial_step<S, G, L>(grad_f: &G, loss_opts: &L, x: &Array2<S>, grad: &Array2<S>) -> Result<S>
where
    S: NdFloat,
    G: GradientStrategy<S, L> + ?Sized,
    L: ?Sized,
{
    let gnorm = fro_norm(grad);
    if gnorm == S::zero() {
        debug!("apg: zero gradient at x0, using a unit step");
        return Ok(S::one());
    }
    let seed = S::one() / gnorm;
    if !(seed > S::zero()) || !seed.is_finite() {
        return Err(ApgError::DegenerateStep { iteration: 0 });
    }

    let x_hat = x - &(grad * seed);
    let g_hat = eval_gradient(grad_f, x_hat.view(), loss_opts, x.dim(), 0)?;
    let dg = grad - &g_hat;
    let t = (inner(&(x - &x_hat), &dg) / sq_norm(&dg)).abs();

    if t > S::zero() && t.is_finite() {
        Ok(t)
    } else {
        debug!("apg: no curvature along the trial step, using step {:e}", seed);
        Ok(seed)
    }
}

/// Spectral step clamped to `[beta * t, alpha * t]`
fn adapt_step<S: NdFloat>(
    t: S,
    y: &Array2<S>,
    oldy: &Array2<S>,
    oldg: &Array2<S>,
    grad: &Array2<S>,
    params: &ApgParams<S>,
) -> S {
    let dy = y - oldy;
    let dy_sq = sq_norm(&dy);
    if dy_sq == S::zero() {
        trace!("apg: momentum point did not move, shrinking step");
        return params.beta * t;
    }
    let curvature = inner(&dy, &(oldg - grad)).abs();
    if curvature == S::zero() {
        trace!("apg: flat curvature, growing step");
        return params.alpha * t;
    }
    let half = S::one() / (S::one() + S::one());
    let t_hat = half * dy_sq / curvature;
    (params.alpha * t).min(t_hat.max(params.beta * t))
}

fn eval_gradient<S, G, L>(
    grad_f: &G,
    x: ArrayView2<'_, S>,
    opts: &L,
    dim: (usize, usize),
    iteration: usize,
) -> Result<Array2<S>>
where
    S: NdFloat,
    G: GradientStrategy<S, L> + ?Sized,
    L: ?Sized,
{
    let g = grad_f.gradient(x, opts).map_err(ApgError::Gradient)?;
    checked(g, "gradient", dim, iteration)
}

fn eval_prox<S, P, Q>(
    prox_h: &P,
    v: ArrayView2<'_, S>,
    t: S,
    opts: &Q,
    dim: (usize, usize),
    iteration: usize,
) -> Result<Array2<S>>
where
    S: NdFloat,
    P: ProximalStrategy<S, Q> + ?Sized,
    Q: ?Sized,
{
    let x = prox_h.prox(v, t, opts).map_err(ApgError::Prox)?;
    checked(x, "proximal operator", dim, iteration)
}

fn checked<S: NdFloat>(
    m: Array2<S>,
    stage: &'static str,
    expected: (usize, usize),
    iteration: usize,
) -> Result<Array2<S>> {
    if m.dim() != expected {
        return Err(ApgError::ShapeMismatch {
            stage,
            expected,
            found: m.dim(),
        });
    }
    if !m.iter().all(|v| v.is_finite()) {
        return Err(ApgError::NonFinite { stage, iteration });
    }
    Ok(m)
}

fn inner<S: NdFloat>(a: &Array2<S>, b: &Array2<S>) -> S {
    Zip::from(a).and(b).fold(S::zero(), |acc, &a, &b| acc + a * b)
}

fn sq_norm<S: NdFloat>(a: &Array2<S>) -> S {
    a.fold(S::zero(), |acc, &v| acc + v * v)
}

/// Frobenius norm, scaled by the largest entry so the squares cannot overflow
fn fro_norm<S: NdFloat>(a: &Array2<S>) -> S {
    let scale = a.fold(S::zero(), |m, &v| m.max(v.abs()));
    if scale == S::zero() || !scale.is_finite() {
        return scale;
    }
    scale
        * a.fold(S::zero(), |acc, &v| {
            let r = v / scale;
            acc + r * r
        })
        .sqrt()
}

fn sq_dist<S: NdFloat>(a: &Array2<S>, b: &Array2<S>) -> S {
    Zip::from(a).and(b).fold(S::zero(), |acc, &a, &b| {
        let d = a - b;
        acc + d * d
    })
}


#[allow(non_snake_case)]
#[cfg(all(rustc_nightly, test))]
mod benches {
    use super::*;
    use crate::loss::{Design, LeastSquares};
    use crate::prox::{nop, Penalty, L1};
    use test::Bencher;

    #[bench]
    fn lasso_64x16(b: &mut Bencher) {
        let A = Array2::from_shape_fn((64, 16), |(i, j)| ((i * 7 + j * 13) % 11) as f64 - 5.);
        let B = Array2::from_shape_fn((64, 3), |(i, j)| ((i + j) % 5) as f64);
        let data = Design::new(A, B);
        let params = ApgParams::default().with_eps(1e-10);
        let x0 = Array2::<f64>::zeros((16, 3));
        b.iter(|| apg(&LeastSquares, &L1, &data, &Penalty::new(0.5), x0.view(), &params, nop));
    }
}
