//! Mixing fixed-point solver for the Dyson equation of a semi-infinite chain.
//!
//! The surface Green's function of a semi-infinite periodic chain satisfies
//! `G = (zI - intra - inter G inter^H)^-1`: eliminating every cell below the
//! surface leaves the surface cell dressed by the self-energy of an identical
//! semi-infinite chain. Iterating that relation with linear mixing converges
//! linearly; prefer [`renormalize`](super::renormalize) when only the
//! bulk/surface functions of a clean chain are needed.

use crate::{
    block::{complex_energy, energy_matrix, invert, max_modulus},
    convergence::{DysonConfig, NonConvergencePolicy},
    error::GreensFunctionError,
    Chain,
};
use nalgebra::{DMatrix, RealField};
use num_complex::Complex;

/// Solves the Dyson equation of the semi-infinite chain at a real `energy`.
///
/// The energy is regularized by `config.eps`; the returned matrix is the
/// surface Green's function at `z = energy + i eps`, self-consistent to
/// `config.max_error` in the infinity norm of the fixed-point residual.
/// Exhausting `config.max_iterations` is an error unless the config opts
/// into [`NonConvergencePolicy::BestEffort`].
#[tracing::instrument(name = "Dyson solver", level = "trace", skip(chain, config))]
pub fn solve_dyson<T: RealField + Copy>(
    chain: &Chain<T>,
    energy: T,
    config: &DysonConfig<T>,
) -> Result<DMatrix<Complex<T>>, GreensFunctionError> {
    if config.mixing <= T::zero() || config.mixing > T::one() {
        return Err(GreensFunctionError::UnsupportedConfiguration(format!(
            "mixing factor must lie in (0, 1], got {:?}",
            config.mixing
        )));
    }
    let b = chain.dim();
    let mut green = match &config.initial_guess {
        Some(guess) => {
            if guess.shape() != (b, b) {
                return Err(GreensFunctionError::DimensionMismatch(format!(
                    "initial guess is {}x{} but the chain blocks are {}x{}",
                    guess.nrows(),
                    guess.ncols(),
                    b,
                    b
                )));
            }
            guess.clone()
        }
        None => DMatrix::zeros(b, b),
    };

    let e = energy_matrix(complex_energy(energy, config.eps), b);
    let inter_dagger = chain.inter().adjoint();
    let mixing = Complex::from(config.mixing);
    let retained = Complex::from(T::one() - config.mixing);

    let mut residual = None;
    for iteration in 0..config.max_iterations {
        let self_energy = chain.inter() * &green * &inter_dagger;
        let updated = invert(&e - chain.intra() - self_energy)?;
        let deviation = max_modulus(&(&updated - &green));
        if deviation < config.max_error {
            tracing::trace!("converged in {} iterations", iteration + 1);
            return Ok(updated);
        }
        residual = Some(deviation);
        green = updated * mixing + &green * retained;
    }

    match config.policy {
        NonConvergencePolicy::Error => Err(GreensFunctionError::Convergence {
            iterations: config.max_iterations,
            residual: residual
                .and_then(nalgebra::try_convert)
                .unwrap_or(f64::NAN),
        }),
        NonConvergencePolicy::BestEffort => {
            tracing::warn!(
                "iteration budget of {} exhausted, returning the final iterate",
                config.max_iterations
            );
            Ok(green)
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{
        convergence::{DysonConfig, NonConvergencePolicy},
        error::GreensFunctionError,
        Chain,
    };
    use nalgebra::DMatrix;
    use num_complex::Complex;

    fn monatomic_chain(hopping: f64) -> Chain<f64> {
        Chain::from_dense(
            DMatrix::from_element(1, 1, Complex::from(0_f64)),
            DMatrix::from_element(1, 1, Complex::from(hopping)),
        )
        .unwrap()
    }

    #[test]
    fn surface_green_function_matches_the_closed_form_off_band() {
        // For the 1D monatomic chain with unit hopping the surface Green's
        // function is g = (z - sqrt(z^2 - 4)) / 2; at E = 3 this is
        // (3 - sqrt(5)) / 2 up to broadening corrections.
        let chain = monatomic_chain(1.0);
        let green = super::solve_dyson(&chain, 3.0, &DysonConfig::lead()).unwrap();
        let expected = (3.0 - 5_f64.sqrt()) / 2.0;
        approx::assert_relative_eq!(green[(0, 0)].re, expected, epsilon = 1e-3);
    }

    #[test]
    fn exhausting_the_iteration_budget_is_an_observable_error() {
        let chain = monatomic_chain(1.0);
        let config = DysonConfig {
            max_iterations: 2,
            ..DysonConfig::lead()
        };
        let result = super::solve_dyson(&chain, 3.0, &config);
        assert!(matches!(
            result,
            Err(GreensFunctionError::Convergence { iterations: 2, .. })
        ));
    }

    #[test]
    fn best_effort_policy_hands_back_the_final_iterate() {
        let chain = monatomic_chain(1.0);
        let config = DysonConfig {
            max_iterations: 2,
            policy: NonConvergencePolicy::BestEffort,
            ..DysonConfig::lead()
        };
        assert!(super::solve_dyson(&chain, 3.0, &config).is_ok());
    }

    #[test]
    fn a_converged_seed_is_a_fixed_point() {
        let chain = monatomic_chain(1.0);
        let cold = super::solve_dyson(&chain, 3.0, &DysonConfig::lead()).unwrap();
        let warm_config = DysonConfig::lead().with_initial_guess(cold.clone());
        let warm = super::solve_dyson(&chain, 3.0, &warm_config).unwrap();
        approx::assert_relative_eq!(warm[(0, 0)].re, cold[(0, 0)].re, epsilon = 1e-5);
        approx::assert_relative_eq!(warm[(0, 0)].im, cold[(0, 0)].im, epsilon = 1e-5);
    }

    #[test]
    fn a_mixing_factor_outside_the_unit_interval_is_rejected() {
        let chain = monatomic_chain(1.0);
        let config = DysonConfig {
            mixing: 1.5,
            ..DysonConfig::lead()
        };
        assert!(matches!(
            super::solve_dyson(&chain, 3.0, &config),
            Err(GreensFunctionError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn a_missized_initial_guess_is_rejected() {
        let chain = monatomic_chain(1.0);
        let config = DysonConfig::lead().with_initial_guess(DMatrix::zeros(2, 2));
        assert!(matches!(
            super::solve_dyson(&chain, 3.0, &config),
            Err(GreensFunctionError::DimensionMismatch(_))
        ));
    }
}
