//! k-integrated Green's functions and self-energies of periodic lattices.
//!
//! The onsite Green's function of a periodic lattice is the Brillouin-zone
//! average of the k-resolved resolvent. Three routes are provided: direct
//! summation of `(zI - H(k))^-1` on a uniform mesh, per-k decimation of the
//! effective chain along the first axis, and adaptive quadrature of the same
//! per-k solve. The self-energy of a single cell embedded in the pristine
//! lattice follows from the general Dyson relation `Sigma = zI - intra -
//! G^-1`.

use crate::{
    block::{complex_energy, energy_matrix, invert},
    convergence::Decimation,
    error::GreensFunctionError,
    greens_functions::kspace::green_kchain,
    integrate::{AdaptiveSimpson, MatrixIntegrator},
    model::HamiltonianModel,
    parallel::Scheduler,
};
use itertools::iproduct;
use nalgebra::{DMatrix, RealField};
use num_complex::Complex;

/// How the Brillouin-zone average is carried out
#[derive(Clone, Copy, Debug)]
pub enum BlochMode<T> {
    /// Direct summation of `(zI - H(k))^-1` on a uniform `nk`-per-axis mesh.
    /// No decimation is involved, so any fully periodic model of
    /// dimensionality 1 to 3 is accepted.
    Full {
        /// Mesh points per reciprocal axis
        nk: usize,
    },
    /// Uniform transverse mesh with per-k decimation of the effective chain;
    /// 1D and 2D models only
    Renormalization {
        /// Transverse mesh points
        nk: usize,
    },
    /// Adaptive quadrature over the transverse wavevector with per-k
    /// decimation; 1D and 2D models only
    Adaptive {
        /// Elementwise quadrature tolerance
        tolerance: T,
    },
}

/// The k-averaged Green's function and the matching cell self-energy
#[derive(Clone, Debug)]
pub struct BlochSelfEnergy<T: RealField> {
    /// Brillouin-zone averaged Green's function of one cell
    pub green: DMatrix<Complex<T>>,
    /// `zI - intra - G^-1`, the embedding self-energy of the eliminated
    /// lattice remainder
    pub self_energy: DMatrix<Complex<T>>,
}

/// k-integrated self-energy using the reference adaptive integrator
pub fn bloch_self_energy<T, H>(
    h: &H,
    energy: T,
    delta: T,
    mode: BlochMode<T>,
    scheduler: &Scheduler,
) -> Result<BlochSelfEnergy<T>, GreensFunctionError>
where
    T: RealField + Copy + Send + Sync,
    H: HamiltonianModel<T> + Sync,
{
    bloch_self_energy_with_integrator(h, energy, delta, mode, scheduler, &AdaptiveSimpson::default())
}

/// k-integrated self-energy with an injected quadrature strategy
#[tracing::instrument(name = "Bloch self-energy", level = "trace", skip(h, scheduler, integrator))]
pub fn bloch_self_energy_with_integrator<T, H, I>(
    h: &H,
    energy: T,
    delta: T,
    mode: BlochMode<T>,
    scheduler: &Scheduler,
    integrator: &I,
) -> Result<BlochSelfEnergy<T>, GreensFunctionError>
where
    T: RealField + Copy + Send + Sync,
    H: HamiltonianModel<T> + Sync,
    I: MatrixIntegrator<T>,
{
    // Multicell models couple beyond nearest neighbours and cannot be
    // decimated along a single axis
    let mode = if h.is_multicell() {
        match mode {
            BlochMode::Full { nk } => BlochMode::Full { nk },
            BlochMode::Renormalization { nk } => {
                tracing::warn!(
                    "a multicell model cannot be decimated, switching to direct k-mesh summation"
                );
                BlochMode::Full { nk }
            }
            BlochMode::Adaptive { .. } => {
                return Err(GreensFunctionError::UnsupportedConfiguration(
                    "adaptive quadrature decimates per k and needs a non-multicell model".into(),
                ))
            }
        }
    } else {
        mode
    };

    let dimensionality = h.dimensionality();
    let decimation = Decimation::for_broadening(delta);
    let green = match mode {
        BlochMode::Full { nk } => {
            if !(1..=3).contains(&dimensionality) {
                return Err(GreensFunctionError::UnsupportedConfiguration(format!(
                    "direct summation covers dimensionalities 1 to 3, got {dimensionality}"
                )));
            }
            mesh_summed_green(h, energy, delta, nk, scheduler)?
        }
        BlochMode::Renormalization { nk } => match dimensionality {
            1 => crate::greens_functions::renormalize(&h.kchain(T::zero()), energy, &decimation)?
                .bulk,
            2 => {
                let points = uniform_mesh(nk)?;
                let resolvents = scheduler.map(&points, |&k| {
                    green_kchain(h, k, energy, &decimation, None).map(|greens| greens.bulk)
                });
                average(resolvents, h.intra().dim())?
            }
            _ => {
                return Err(GreensFunctionError::UnsupportedConfiguration(format!(
                    "per-k decimation covers dimensionalities 1 and 2, got {dimensionality}"
                )))
            }
        },
        BlochMode::Adaptive { tolerance } => match dimensionality {
            1 => crate::greens_functions::renormalize(&h.kchain(T::zero()), energy, &decimation)?
                .bulk,
            2 => {
                let integrand = |k: T| {
                    green_kchain(h, k, energy, &decimation, None).map(|greens| greens.bulk)
                };
                integrator.integrate_matrix(&integrand, (T::zero(), T::one()), tolerance)?
            }
            _ => {
                return Err(GreensFunctionError::UnsupportedConfiguration(format!(
                    "adaptive quadrature covers dimensionalities 1 and 2, got {dimensionality}"
                )))
            }
        },
    };

    let intra = h.intra().to_dense();
    let e = energy_matrix(complex_energy(energy, delta), intra.nrows());
    let self_energy = e - &intra - invert(green.clone())?;
    Ok(BlochSelfEnergy { green, self_energy })
}

/// Fractional mesh `{0, 1/nk, .., (nk-1)/nk}` over one reciprocal axis
fn uniform_mesh<T: RealField + Copy>(nk: usize) -> Result<Vec<T>, GreensFunctionError> {
    if nk == 0 {
        return Err(GreensFunctionError::UnsupportedConfiguration(
            "the k-mesh needs at least one point".into(),
        ));
    }
    let step = T::one() / nalgebra::convert(nk as f64);
    Ok((0..nk)
        .map(|i| nalgebra::convert::<f64, T>(i as f64) * step)
        .collect())
}

/// Direct mesh summation of the resolvent over the full Brillouin zone
fn mesh_summed_green<T, H>(
    h: &H,
    energy: T,
    delta: T,
    nk: usize,
    scheduler: &Scheduler,
) -> Result<DMatrix<Complex<T>>, GreensFunctionError>
where
    T: RealField + Copy + Send + Sync,
    H: HamiltonianModel<T> + Sync,
{
    let axis = uniform_mesh::<T>(nk)?;
    let zero = T::zero();
    let points: Vec<[T; 3]> = match h.dimensionality() {
        1 => axis.iter().map(|&k| [k, zero, zero]).collect(),
        2 => iproduct!(axis.iter(), axis.iter())
            .map(|(&kx, &ky)| [kx, ky, zero])
            .collect(),
        _ => iproduct!(axis.iter(), axis.iter(), axis.iter())
            .map(|(&kx, &ky, &kz)| [kx, ky, kz])
            .collect(),
    };
    let b = h.intra().dim();
    let e = energy_matrix(complex_energy(energy, delta), b);
    let resolvents = scheduler.map(&points, |&k| invert(&e - h.hk(k)));
    average(resolvents, b)
}

/// Averages the per-k resolvents, propagating the first per-point failure
fn average<T: RealField + Copy>(
    resolvents: Vec<Result<DMatrix<Complex<T>>, GreensFunctionError>>,
    b: usize,
) -> Result<DMatrix<Complex<T>>, GreensFunctionError> {
    let count = resolvents.len();
    let mut summed: DMatrix<Complex<T>> = DMatrix::zeros(b, b);
    for resolvent in resolvents {
        summed += resolvent?;
    }
    Ok(summed.unscale(nalgebra::convert(count as f64)))
}

#[cfg(test)]
mod test {
    use super::{bloch_self_energy, BlochMode};
    use crate::{
        block::Block,
        greens_functions::GreenEvaluator,
        model::{HamiltonianModel, SquareLattice},
        parallel::Scheduler,
        Chain,
    };
    use nalgebra::DMatrix;
    use num_complex::Complex;

    fn monatomic_square_lattice() -> SquareLattice<f64> {
        let zero = DMatrix::from_element(1, 1, Complex::from(0_f64));
        let hop = DMatrix::from_element(1, 1, Complex::from(1_f64));
        SquareLattice::new(zero.clone(), hop.clone(), hop, zero.clone(), zero).unwrap()
    }

    /// A 1D chain pretending its couplings reach further than one cell
    struct Multicell(crate::model::PeriodicChain<f64>);

    impl HamiltonianModel<f64> for Multicell {
        fn dimensionality(&self) -> usize {
            self.0.dimensionality()
        }
        fn intra(&self) -> Block<f64> {
            self.0.intra()
        }
        fn hk(&self, k: [f64; 3]) -> DMatrix<Complex<f64>> {
            self.0.hk(k)
        }
        fn kchain(&self, k: f64) -> Chain<f64> {
            self.0.kchain(k)
        }
        fn is_multicell(&self) -> bool {
            true
        }
    }

    #[test]
    fn all_three_modes_agree_off_band() {
        // Square-lattice band is [-4, 4]; at E = 5 every k-resolvent is
        // smooth and the uniform sums converge spectrally.
        let lattice = monatomic_square_lattice();
        let full = bloch_self_energy(
            &lattice,
            5.0,
            0.01,
            BlochMode::Full { nk: 32 },
            &Scheduler::Sequential,
        )
        .unwrap();
        let decimated = bloch_self_energy(
            &lattice,
            5.0,
            0.01,
            BlochMode::Renormalization { nk: 32 },
            &Scheduler::Rayon,
        )
        .unwrap();
        let adaptive = bloch_self_energy(
            &lattice,
            5.0,
            0.01,
            BlochMode::Adaptive { tolerance: 1e-7 },
            &Scheduler::Sequential,
        )
        .unwrap();

        approx::assert_relative_eq!(
            full.green[(0, 0)].re,
            decimated.green[(0, 0)].re,
            epsilon = 1e-4
        );
        approx::assert_relative_eq!(
            full.green[(0, 0)].im,
            decimated.green[(0, 0)].im,
            epsilon = 1e-4
        );
        approx::assert_relative_eq!(
            full.green[(0, 0)].re,
            adaptive.green[(0, 0)].re,
            epsilon = 1e-4
        );
        approx::assert_relative_eq!(
            full.self_energy[(0, 0)].re,
            decimated.self_energy[(0, 0)].re,
            epsilon = 1e-4
        );
    }

    #[test]
    fn one_dimensional_full_mode_matches_decimation() {
        let chain = crate::model::PeriodicChain::new(
            Chain::from_dense(
                DMatrix::from_element(1, 1, Complex::from(0_f64)),
                DMatrix::from_element(1, 1, Complex::from(1_f64)),
            )
            .unwrap(),
        );
        let full = bloch_self_energy(
            &chain,
            3.0,
            0.01,
            BlochMode::Full { nk: 64 },
            &Scheduler::Sequential,
        )
        .unwrap();
        let decimated = bloch_self_energy(
            &chain,
            3.0,
            0.01,
            BlochMode::Renormalization { nk: 1 },
            &Scheduler::Sequential,
        )
        .unwrap();
        approx::assert_relative_eq!(
            full.green[(0, 0)].re,
            decimated.green[(0, 0)].re,
            epsilon = 1e-4
        );
        approx::assert_relative_eq!(
            full.green[(0, 0)].im,
            decimated.green[(0, 0)].im,
            epsilon = 1e-4
        );
    }

    #[test]
    fn the_eigendecomposition_evaluator_matches_direct_summation() {
        let lattice = monatomic_square_lattice();
        let nk = 24;
        let full = bloch_self_energy(
            &lattice,
            4.8,
            0.02,
            BlochMode::Full { nk },
            &Scheduler::Sequential,
        )
        .unwrap();
        let evaluator = GreenEvaluator::new(&lattice, nk).unwrap();
        let (green, self_energy) = evaluator.evaluate(4.8, 0.02).unwrap();
        let green_deviation = (&green - &full.green).camax();
        let sigma_deviation = (&self_energy - &full.self_energy).camax();
        assert!(green_deviation < 1e-10);
        assert!(sigma_deviation < 1e-8);
    }

    #[test]
    fn a_multicell_model_falls_back_to_direct_summation() {
        let chain = Chain::from_dense(
            DMatrix::from_element(1, 1, Complex::from(0_f64)),
            DMatrix::from_element(1, 1, Complex::from(1_f64)),
        )
        .unwrap();
        let multicell = Multicell(crate::model::PeriodicChain::new(chain));
        let forced = bloch_self_energy(
            &multicell,
            3.0,
            0.01,
            BlochMode::Renormalization { nk: 64 },
            &Scheduler::Sequential,
        )
        .unwrap();
        let direct = bloch_self_energy(
            &multicell.0,
            3.0,
            0.01,
            BlochMode::Full { nk: 64 },
            &Scheduler::Sequential,
        )
        .unwrap();
        assert_eq!(forced.green, direct.green);

        assert!(matches!(
            bloch_self_energy(
                &multicell,
                3.0,
                0.01,
                BlochMode::Adaptive { tolerance: 1e-6 },
                &Scheduler::Sequential,
            ),
            Err(crate::error::GreensFunctionError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn unsupported_dimensionalities_are_fatal() {
        struct ThreeDimensional(SquareLattice<f64>);
        impl HamiltonianModel<f64> for ThreeDimensional {
            fn dimensionality(&self) -> usize {
                3
            }
            fn intra(&self) -> Block<f64> {
                self.0.intra()
            }
            fn hk(&self, k: [f64; 3]) -> DMatrix<Complex<f64>> {
                self.0.hk(k)
            }
            fn kchain(&self, k: f64) -> Chain<f64> {
                self.0.kchain(k)
            }
        }
        let model = ThreeDimensional(monatomic_square_lattice());
        for mode in [
            BlochMode::Renormalization { nk: 8 },
            BlochMode::Adaptive { tolerance: 1e-6 },
        ] {
            assert!(matches!(
                bloch_self_energy(&model, 5.0, 0.01, mode, &Scheduler::Sequential),
                Err(crate::error::GreensFunctionError::UnsupportedConfiguration(_))
            ));
        }
        // Direct summation accepts a 3D model
        assert!(
            bloch_self_energy(&model, 7.0, 0.01, BlochMode::Full { nk: 4 }, &Scheduler::Sequential)
                .is_ok()
        );
    }
}
