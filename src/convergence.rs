//! Convergence configuration for the iterative solvers.
//!
//! Every solve call receives an immutable configuration value constructed by
//! the caller; nothing here is global. The named constructors reproduce the
//! tolerance sets that circulate in practice: a tight `lead` setting for
//! semi-infinite boundaries and two loose settings for coupling finite
//! systems.

use nalgebra::{DMatrix, RealField};
use num_complex::Complex;
use serde::Deserialize;

/// What the Dyson solver does when the iteration budget runs out.
///
/// `Error` surfaces a [`GreensFunctionError::Convergence`](crate::GreensFunctionError::Convergence).
/// `BestEffort` hands back the final iterate regardless; it exists for
/// compatibility testing against solvers with unchecked iteration and should
/// not be reached for in production sweeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonConvergencePolicy {
    /// Exceeding `max_iterations` is an observable failure
    Error,
    /// Return the last iterate unconditionally
    BestEffort,
}

impl Default for NonConvergencePolicy {
    fn default() -> Self {
        Self::Error
    }
}

/// Configuration of the mixing fixed-point iteration in
/// [`solve_dyson`](crate::greens_functions::solve_dyson)
#[derive(Clone, Debug, Deserialize)]
pub struct DysonConfig<T: RealField> {
    /// Fixed regularizing broadening added to the real energy. This is not
    /// the physical broadening of the downstream spectral calculation, it
    /// only keeps the resolvent finite at eigenvalues.
    pub eps: T,
    /// Infinity-norm tolerance on the fixed-point residual `|G_new - G_old|`
    pub max_error: T,
    /// Iteration budget
    pub max_iterations: usize,
    /// Linear mixing factor in `(0, 1]`. Unity iterates undamped, which is
    /// unstable for spectra near a critical energy; smaller values trade
    /// speed for stability.
    pub mixing: T,
    /// Optional seed Green's function; the zero matrix is used when absent
    #[serde(skip)]
    pub initial_guess: Option<DMatrix<Complex<T>>>,
    /// Behaviour on an exhausted iteration budget
    #[serde(default)]
    pub policy: NonConvergencePolicy,
}

impl<T: RealField + Copy> DysonConfig<T> {
    /// Tight tolerances for semi-infinite lead boundaries
    #[numeric_literals::replace_float_literals(T::from_f64(literal).unwrap())]
    pub fn lead() -> Self {
        Self {
            eps: 0.001,
            max_error: 0.00001,
            max_iterations: 1000,
            mixing: 0.8,
            initial_guess: None,
            policy: NonConvergencePolicy::Error,
        }
    }

    /// Loose tolerances for coupling to finite systems
    #[numeric_literals::replace_float_literals(T::from_f64(literal).unwrap())]
    pub fn fast() -> Self {
        Self {
            eps: 0.001,
            max_error: 1.0,
            max_iterations: 10,
            mixing: 1.0,
            initial_guess: None,
            policy: NonConvergencePolicy::Error,
        }
    }

    /// The loose tolerance set with a hundred-iteration budget
    #[numeric_literals::replace_float_literals(T::from_f64(literal).unwrap())]
    pub fn hundred() -> Self {
        Self {
            eps: 0.001,
            max_error: 1.0,
            max_iterations: 100,
            mixing: 1.0,
            initial_guess: None,
            policy: NonConvergencePolicy::Error,
        }
    }

    /// Replaces the seed Green's function
    pub fn with_initial_guess(mut self, guess: DMatrix<Complex<T>>) -> Self {
        self.initial_guess = Some(guess);
        self
    }
}

/// Termination rule of the renormalization-decimation iteration
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecimationTermination<T> {
    /// Run exactly this many doubling steps. Deterministic cost, useful
    /// inside vectorized sweeps.
    FixedIterations(usize),
    /// Iterate until both renormalized coupling norms fall below `error`,
    /// i.e. until decimation has exhausted all remaining long-range coupling
    Converged {
        /// Infinity-norm threshold on the renormalized couplings
        error: T,
        /// Iteration budget; geometric convergence means a handful of tens
        /// suffices whenever the energy carries a finite broadening
        max_iterations: usize,
    },
}

/// Configuration of the renormalization-decimation solver
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Decimation<T> {
    /// Physical broadening `δ > 0` entering the complex energy
    pub delta: T,
    /// Termination rule
    pub termination: DecimationTermination<T>,
}

impl<T: RealField + Copy> Decimation<T> {
    /// The conventional configuration: the coupling tolerance is tied to
    /// `delta / 100` so decimation does not over-converge below the energy
    /// resolution set by the broadening.
    #[numeric_literals::replace_float_literals(T::from_f64(literal).unwrap())]
    pub fn for_broadening(delta: T) -> Self {
        Self {
            delta,
            termination: DecimationTermination::Converged {
                error: delta / 100.0,
                max_iterations: 100,
            },
        }
    }

    /// A deterministic-cost configuration running exactly `count` doubling steps
    pub fn with_fixed_iterations(delta: T, count: usize) -> Self {
        Self {
            delta,
            termination: DecimationTermination::FixedIterations(count),
        }
    }
}
