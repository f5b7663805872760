//! The `ndarray-apg` crate minimizes composite objectives
//! $`f(x) + h(x)`$ over an `ndarray` matrix, where _f_ is smooth and
//! _h_ is possibly non-smooth but has a cheap proximal operator.
//!
//! The solver, [`prox::apg`], is an accelerated proximal gradient method
//! (FISTA momentum) with gradient based adaptive restart and a
//! Barzilai-Borwein step size, so no Lipschitz constant is needed.
//! _f_ and _h_ are supplied as strategies:
//! - [`prox::GradientStrategy`] evaluates $`\nabla f`$
//! - [`prox::ProximalStrategy`] evaluates $`\mathrm{prox}_{t h}`$
//!
//! together with an options payload for each, e.g. the problem data and the
//! regularization strength. Plain closures work as strategies, and common
//! choices ship with the crate: least squares in [`loss`], the lasso, ridge,
//! group lasso and non-negativity in [`prox`].
//!
//! ```
//! use ndarray::array;
//! use ndarray_apg::loss::{Design, LeastSquares};
//! use ndarray_apg::prox::{apg, nop, ApgParams, Penalty, L1};
//!
//! let data = Design::new(array![[2., 0.], [0., 1.]], array![[4.], [0.1]]);
//! let x0 = ndarray::Array2::<f64>::zeros((2, 1));
//! let params = ApgParams::default().with_eps(1e-20);
//! let sol = apg(&LeastSquares, &L1, &data, &Penalty::new(0.5), x0.view(), &params, nop).unwrap();
//! assert!(sol.converged());
//! assert!((sol.x[[0, 0]] - 1.875).abs() < 1e-8);
//! assert_eq!(sol.x[[1, 0]], 0.);
//! ```
//!
//! Progress is reported through the `log` facade, at `info` level on every
//! checkpoint of the solver and `debug`/`trace` for its internal decisions.

#![cfg_attr(all(rustc_nightly, test), feature(test))]
#[cfg(all(rustc_nightly, test))]
extern crate test;

pub mod error;
pub mod loss;
pub mod prox;

pub use error::{ApgError, Result, StrategyError};
