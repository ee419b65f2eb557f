//! Green's function of the junction between two semi-infinite lattices.
//!
//! The retained region is the pair of boundary cells, one from each side,
//! coupled through the averaged interface hopping. Each side's eliminated
//! semi-infinite half enters as a block-diagonal self-energy built from its
//! surface Green's function, and the 2b x 2b composite Dyson matrix is
//! inverted directly.

use crate::{
    block::{complex_energy, energy_matrix, invert},
    convergence::Decimation,
    error::GreensFunctionError,
    greens_functions::{
        decimation::{renormalize, Renormalized},
        kspace::SurfaceEvaluator,
    },
    model::HamiltonianModel,
    Chain,
};
use nalgebra::{DMatrix, RealField};
use num_complex::Complex;

/// Everything the interface solve produces: the two half-lattice Green's
/// function pairs and the coupled interface function
#[derive(Clone, Debug)]
pub struct InterfaceGreens<T: RealField> {
    /// Bulk function of the left half-lattice
    pub left_bulk: DMatrix<Complex<T>>,
    /// Surface function of the left half-lattice at the junction
    pub left_surface: DMatrix<Complex<T>>,
    /// Bulk function of the right half-lattice
    pub right_bulk: DMatrix<Complex<T>>,
    /// Surface function of the right half-lattice at the junction
    pub right_surface: DMatrix<Complex<T>>,
    /// `2b x 2b` Green's function of the coupled boundary-cell pair
    pub coupled: DMatrix<Complex<T>>,
}

/// Assembles and inverts the composite Dyson matrix of the two boundary
/// cells. `chain1` is the left half walked away from the junction (reversed
/// orientation), `chain2` the right half in the positive direction.
#[numeric_literals::replace_float_literals(T::from_f64(literal).unwrap())]
fn couple_boundary_cells<T: RealField + Copy>(
    chain1: &Chain<T>,
    surface1: &DMatrix<Complex<T>>,
    chain2: &Chain<T>,
    surface2: &DMatrix<Complex<T>>,
    energy: T,
    delta: T,
    dh1: Option<&DMatrix<Complex<T>>>,
    dh2: Option<&DMatrix<Complex<T>>>,
) -> Result<DMatrix<Complex<T>>, GreensFunctionError> {
    let b = chain1.dim();
    if chain2.dim() != b {
        return Err(GreensFunctionError::DimensionMismatch(format!(
            "interface halves disagree: left blocks are {}-dimensional, right blocks {}-dimensional",
            b,
            chain2.dim()
        )));
    }
    for perturbation in [dh1, dh2].into_iter().flatten() {
        if perturbation.shape() != (b, b) {
            return Err(GreensFunctionError::DimensionMismatch(format!(
                "onsite perturbation is {}x{} but the interface blocks are {}x{}",
                perturbation.nrows(),
                perturbation.ncols(),
                b,
                b
            )));
        }
    }

    // Averaged coupling bridging the two inequivalent hoppings at the seam
    let havg = (chain1.inter().adjoint() + chain2.inter()) * Complex::from(0.5);

    let mut onsite1 = chain1.intra().clone();
    if let Some(dh) = dh1 {
        onsite1 += dh;
    }
    let mut onsite2 = chain2.intra().clone();
    if let Some(dh) = dh2 {
        onsite2 += dh;
    }
    let sigma1 = chain1.inter() * surface1 * chain1.inter().adjoint();
    let sigma2 = chain2.inter() * surface2 * chain2.inter().adjoint();

    let mut dyson = energy_matrix(complex_energy(energy, delta), 2 * b);
    let mut top_left = dyson.slice_mut((0, 0), (b, b));
    top_left -= onsite1 + sigma1;
    let mut top_right = dyson.slice_mut((0, b), (b, b));
    top_right -= &havg;
    let mut bottom_left = dyson.slice_mut((b, 0), (b, b));
    bottom_left -= havg.adjoint();
    let mut bottom_right = dyson.slice_mut((b, b), (b, b));
    bottom_right -= onsite2 + sigma2;

    invert(dyson)
}

/// Green's function of the interface between the half-lattices of `h1` and
/// `h2` at transverse wavevector `k`
#[tracing::instrument(name = "Interface", level = "trace", skip(h1, h2, config))]
pub fn interface<T, H1, H2>(
    h1: &H1,
    h2: &H2,
    k: T,
    energy: T,
    config: &Decimation<T>,
) -> Result<InterfaceGreens<T>, GreensFunctionError>
where
    T: RealField + Copy,
    H1: HamiltonianModel<T>,
    H2: HamiltonianModel<T>,
{
    // The left half is walked away from the junction so that its surface
    // function sits at the boundary cell
    let chain1 = h1.kchain(k).reversed();
    let chain2 = h2.kchain(k);
    let greens1 = renormalize(&chain1, energy, config)?;
    let greens2 = renormalize(&chain2, energy, config)?;

    let coupled = couple_boundary_cells(
        &chain1,
        &greens1.surface,
        &chain2,
        &greens2.surface,
        energy,
        config.delta,
        None,
        None,
    )?;
    Ok(InterfaceGreens {
        left_bulk: greens1.bulk,
        left_surface: greens1.surface,
        right_bulk: greens2.bulk,
        right_surface: greens2.surface,
        coupled,
    })
}

/// Sweeps the interface Green's function over many energies with optional
/// per-side onsite perturbations applied at the boundary cells.
///
/// The k-chains are captured once; only the energy-dependent surface
/// functions and the composite inversion are recomputed per energy.
#[tracing::instrument(
    name = "Interface sweep",
    level = "trace",
    skip(h1, h2, energies, config, dh1, dh2)
)]
pub fn interface_multienergy<T, H1, H2>(
    h1: &H1,
    h2: &H2,
    k: T,
    energies: &[T],
    config: &Decimation<T>,
    dh1: Option<&DMatrix<Complex<T>>>,
    dh2: Option<&DMatrix<Complex<T>>>,
) -> Result<Vec<InterfaceGreens<T>>, GreensFunctionError>
where
    T: RealField + Copy,
    H1: HamiltonianModel<T>,
    H2: HamiltonianModel<T>,
{
    let left = SurfaceEvaluator::new(h1, k, *config, true);
    let right = SurfaceEvaluator::new(h2, k, *config, false);
    let mut swept = Vec::with_capacity(energies.len());
    for &energy in energies {
        let greens1 = left.evaluate(energy)?;
        let greens2 = right.evaluate(energy)?;
        let coupled = couple_boundary_cells(
            left.chain(),
            &greens1.surface,
            right.chain(),
            &greens2.surface,
            energy,
            config.delta,
            dh1,
            dh2,
        )?;
        swept.push(InterfaceGreens {
            left_bulk: greens1.bulk,
            left_surface: greens1.surface,
            right_bulk: greens2.bulk,
            right_surface: greens2.surface,
            coupled,
        });
    }
    Ok(swept)
}

/// Sweeps the surface and bulk Green's functions of a single half-lattice
/// over many energies, with an optional onsite perturbation at the surface
/// cell
pub fn surface_multienergy<T, H>(
    h: &H,
    k: T,
    energies: &[T],
    config: &Decimation<T>,
    perturbation: Option<&DMatrix<Complex<T>>>,
) -> Result<Vec<Renormalized<T>>, GreensFunctionError>
where
    T: RealField + Copy,
    H: HamiltonianModel<T>,
{
    let mut evaluator = SurfaceEvaluator::new(h, k, *config, true);
    if let Some(dh) = perturbation {
        evaluator = evaluator.with_perturbation(dh.clone())?;
    }
    energies
        .iter()
        .map(|&energy| evaluator.evaluate(energy))
        .collect()
}

#[cfg(test)]
mod test {
    use crate::{
        convergence::Decimation,
        model::{HamiltonianModel, PeriodicChain},
        Chain,
    };
    use nalgebra::DMatrix;
    use num_complex::Complex;

    fn monatomic_model() -> PeriodicChain<f64> {
        PeriodicChain::new(
            Chain::from_dense(
                DMatrix::from_element(1, 1, Complex::from(0_f64)),
                DMatrix::from_element(1, 1, Complex::from(1_f64)),
            )
            .unwrap(),
        )
    }

    #[test]
    fn a_homostructure_interface_reduces_to_the_bulk_function() {
        // Joining a lattice to itself re-creates the pristine chain: the
        // boundary-cell diagonal of the coupled function is the bulk
        // function.
        let h = monatomic_model();
        let config = Decimation::for_broadening(0.01);
        for energy in [-1.1, 0.0, 0.6, 3.0] {
            let greens = super::interface(&h, &h, 0.0, energy, &config).unwrap();
            let bulk = crate::greens_functions::renormalize(&h.kchain(0.0), energy, &config)
                .unwrap()
                .bulk;
            approx::assert_relative_eq!(
                greens.coupled[(0, 0)].re,
                bulk[(0, 0)].re,
                epsilon = 1e-3
            );
            approx::assert_relative_eq!(
                greens.coupled[(0, 0)].im,
                bulk[(0, 0)].im,
                epsilon = 1e-3
            );
            approx::assert_relative_eq!(
                greens.coupled[(1, 1)].re,
                bulk[(0, 0)].re,
                epsilon = 1e-3
            );
        }
    }

    #[test]
    fn the_multienergy_sweep_matches_per_energy_solves() {
        let h = monatomic_model();
        let config = Decimation::for_broadening(0.01);
        let energies = [-0.7, 0.2, 2.6];
        let swept =
            super::interface_multienergy(&h, &h, 0.0, &energies, &config, None, None).unwrap();
        for (&energy, result) in energies.iter().zip(swept.iter()) {
            let direct = super::interface(&h, &h, 0.0, energy, &config).unwrap();
            let deviation = (&result.coupled - &direct.coupled).camax();
            assert!(deviation < 1e-12);
        }
    }

    #[test]
    fn onsite_perturbations_shift_the_interface_poles() {
        let h = monatomic_model();
        let config = Decimation::for_broadening(0.01);
        let dh = DMatrix::from_element(1, 1, Complex::from(0.4));
        let unperturbed =
            super::interface_multienergy(&h, &h, 0.0, &[0.5], &config, None, None).unwrap();
        let perturbed =
            super::interface_multienergy(&h, &h, 0.0, &[0.5], &config, Some(&dh), None).unwrap();
        let deviation = (&unperturbed[0].coupled - &perturbed[0].coupled).camax();
        assert!(deviation > 1e-3);
    }
}
