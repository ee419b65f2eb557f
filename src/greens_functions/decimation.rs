//! Renormalization-decimation solver for bulk and surface Green's functions.
//!
//! The algorithm of Lopez Sancho et al. (J. Phys. F: Met. Phys. 15 (1985)
//! 851-858): each step eliminates every second cell of the chain, doubling
//! the effective hopping range. The renormalized couplings shrink
//! geometrically whenever the complex energy sits off the real spectrum, so
//! the iteration reaches a fixed tolerance in O(log(1/error)) steps where the
//! linear-mixing Dyson iteration needs O(1/error).

use crate::{
    block::{complex_energy, energy_matrix, invert, max_modulus},
    convergence::{Decimation, DecimationTermination},
    error::GreensFunctionError,
    Chain,
};
use nalgebra::{DMatrix, RealField};
use num_complex::Complex;

/// The pair of Green's functions produced by decimation
#[derive(Clone, Debug)]
pub struct Renormalized<T: RealField> {
    /// Green's function of the doubly-infinite periodic chain
    pub bulk: DMatrix<Complex<T>>,
    /// Green's function of the semi-infinite chain at its open boundary
    pub surface: DMatrix<Complex<T>>,
}

/// Decimation state: the renormalized couplings and onsite blocks.
///
/// `(alpha, beta)` are the effective forward/backward hoppings after `n`
/// doubling steps, `epsilon` the renormalized bulk onsite block and
/// `epsilon_s` its surface counterpart, which only accumulates the forward
/// branch.
struct RenormalizedChain<T: RealField> {
    alpha: DMatrix<Complex<T>>,
    beta: DMatrix<Complex<T>>,
    epsilon: DMatrix<Complex<T>>,
    epsilon_s: DMatrix<Complex<T>>,
}

impl<T: RealField + Copy> RenormalizedChain<T> {
    fn seed(chain: &Chain<T>) -> Self {
        Self {
            alpha: chain.inter().clone(),
            beta: chain.inter().adjoint(),
            epsilon: chain.intra().clone(),
            epsilon_s: chain.intra().clone(),
        }
    }

    /// One doubling step at complex energy matrix `e`
    fn decimate(&mut self, e: &DMatrix<Complex<T>>) -> Result<(), GreensFunctionError> {
        let g = invert(e - &self.epsilon)?;
        let forward = &self.alpha * &g * &self.beta;
        let backward = &self.beta * &g * &self.alpha;
        self.epsilon_s += &forward;
        self.epsilon += forward + backward;
        self.alpha = &self.alpha * &g * &self.alpha;
        self.beta = &self.beta * &g * &self.beta;
        Ok(())
    }

    /// Largest residual coupling, the quantity decimation drives to zero
    fn coupling_norm(&self) -> T {
        max_modulus(&self.alpha).max(max_modulus(&self.beta))
    }
}

/// Computes the bulk and surface Green's functions of the chain at
/// `z = energy + i delta` by renormalization-decimation.
///
/// With [`DecimationTermination::Converged`] the iteration stops once both
/// renormalized coupling norms fall below the tolerance, surfacing a
/// [`GreensFunctionError::Convergence`] when the budget runs out first; with
/// [`DecimationTermination::FixedIterations`] it runs a deterministic number
/// of doubling steps.
#[tracing::instrument(name = "Renormalization", level = "trace", skip(chain, config))]
pub fn renormalize<T: RealField + Copy>(
    chain: &Chain<T>,
    energy: T,
    config: &Decimation<T>,
) -> Result<Renormalized<T>, GreensFunctionError> {
    if config.delta <= T::zero() {
        return Err(GreensFunctionError::UnsupportedConfiguration(format!(
            "broadening must be strictly positive, got {:?}",
            config.delta
        )));
    }
    let e = energy_matrix(complex_energy(energy, config.delta), chain.dim());
    let mut state = RenormalizedChain::seed(chain);

    match config.termination {
        DecimationTermination::FixedIterations(count) => {
            for _ in 0..count {
                state.decimate(&e)?;
            }
        }
        DecimationTermination::Converged {
            error,
            max_iterations,
        } => {
            let mut iterations = 0;
            loop {
                state.decimate(&e)?;
                iterations += 1;
                if state.coupling_norm() < error {
                    tracing::trace!("decimation converged in {iterations} iterations");
                    break;
                }
                if iterations >= max_iterations {
                    return Err(GreensFunctionError::Convergence {
                        iterations,
                        residual: nalgebra::try_convert(state.coupling_norm())
                            .unwrap_or(f64::NAN),
                    });
                }
            }
        }
    }

    Ok(Renormalized {
        bulk: invert(&e - &state.epsilon)?,
        surface: invert(&e - &state.epsilon_s)?,
    })
}

#[cfg(test)]
mod test {
    use crate::{block::energy_matrix, convergence::Decimation, Chain};
    use nalgebra::DMatrix;
    use num_complex::Complex;

    fn monatomic_chain() -> Chain<f64> {
        Chain::from_dense(
            DMatrix::from_element(1, 1, Complex::from(0_f64)),
            DMatrix::from_element(1, 1, Complex::from(1_f64)),
        )
        .unwrap()
    }

    #[test]
    fn band_centre_surface_function_is_minus_i() {
        // Semicircular band: g_surface(E) = (E - i sqrt(4 - E^2)) / 2, which
        // at the band centre is -i; the bulk function is -i / 2.
        let config = Decimation {
            termination: crate::convergence::DecimationTermination::Converged {
                error: 1e-4,
                max_iterations: 50,
            },
            ..Decimation::for_broadening(0.01)
        };
        let greens = super::renormalize(&monatomic_chain(), 0.0, &config).unwrap();
        approx::assert_relative_eq!(greens.surface[(0, 0)].im, -1.0, epsilon = 1e-2);
        approx::assert_relative_eq!(greens.surface[(0, 0)].re, 0.0, epsilon = 1e-2);
        approx::assert_relative_eq!(greens.bulk[(0, 0)].im, -0.5, epsilon = 1e-2);
    }

    #[test]
    fn agrees_with_the_dyson_solver_off_band() {
        let chain = monatomic_chain();
        let dyson_config = crate::convergence::DysonConfig::lead();
        let fixed_point = crate::greens_functions::solve_dyson(&chain, 3.0, &dyson_config).unwrap();
        // Match the Dyson solver's regularizing broadening so both iterate at
        // the same complex energy
        let decimated = super::renormalize(&chain, 3.0, &Decimation::for_broadening(0.001)).unwrap();
        let agreement = 10.0 * 1e-5_f64.max(0.001 / 100.0);
        approx::assert_relative_eq!(
            decimated.surface[(0, 0)].re,
            fixed_point[(0, 0)].re,
            epsilon = agreement
        );
        approx::assert_relative_eq!(
            decimated.surface[(0, 0)].im,
            fixed_point[(0, 0)].im,
            epsilon = agreement
        );
    }

    #[test]
    fn bulk_function_solves_the_two_sided_dyson_equation() {
        // G_bulk must equal (zI - intra - Sigma_left - Sigma_right)^-1 with
        // the self-energies built from the two surface functions.
        let chain = monatomic_chain();
        let config = Decimation::for_broadening(0.01);
        let energy = 0.7;
        let forward = super::renormalize(&chain, energy, &config).unwrap();
        let backward = super::renormalize(&chain.reversed(), energy, &config).unwrap();

        let sigma_right = chain.inter() * &forward.surface * chain.inter().adjoint();
        let sigma_left = chain.inter().adjoint() * &backward.surface * chain.inter();
        let e = energy_matrix(Complex::new(energy, 0.01), 1);
        let embedded = (e - chain.intra() - sigma_right - sigma_left)
            .try_inverse()
            .unwrap();

        approx::assert_relative_eq!(
            embedded[(0, 0)].re,
            forward.bulk[(0, 0)].re,
            epsilon = 1e-3
        );
        approx::assert_relative_eq!(
            embedded[(0, 0)].im,
            forward.bulk[(0, 0)].im,
            epsilon = 1e-3
        );
    }

    #[test]
    fn fixed_iteration_counts_are_deterministic() {
        let chain = monatomic_chain();
        let config = Decimation::with_fixed_iterations(0.01, 25);
        let first = super::renormalize(&chain, 0.3, &config).unwrap();
        let second = super::renormalize(&chain, 0.3, &config).unwrap();
        assert_eq!(first.bulk, second.bulk);
        assert_eq!(first.surface, second.surface);
    }

    #[test]
    fn a_nonpositive_broadening_is_rejected() {
        let config = Decimation::for_broadening(0.0);
        assert!(super::renormalize(&monatomic_chain(), 0.0, &config).is_err());
    }
}
