// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Self-energy assembly
//!
//! Combines the Green's function primitives with coupling blocks into the
//! composite objects downstream spectral routines consume: lead
//! self-energies, embedded central regions, heterostructure and two-lead
//! interface Green's functions, k-integrated self-energies of 2D/3D
//! lattices and supercell self-energies.

/// k-integrated self-energies of higher-dimensional lattices
pub mod bloch;

/// Two-lead interface Green's functions
pub mod interface;

/// Supercell self-energies from tiled lattice units
pub mod supercell;

use crate::{
    block::{complex_energy, energy_matrix, invert},
    convergence::Decimation,
    error::GreensFunctionError,
    greens_functions::renormalize,
    model::Heterostructure,
    Chain,
};
use nalgebra::{DMatrix, RealField};
use num_complex::Complex;

pub use bloch::{bloch_self_energy, BlochMode, BlochSelfEnergy};
pub use interface::{interface, interface_multienergy, surface_multienergy, InterfaceGreens};
pub use supercell::{supercell_self_energy, SupercellSelfEnergy};

/// Which side of a retained region a lead attaches to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// The lead extends towards negative cell indices
    Left,
    /// The lead extends towards positive cell indices
    Right,
}

/// The self-energy a semi-infinite lead induces on the cell it couples to:
/// `V g_s V^H` for a right-attached lead, `V^H g_s V` for a left-attached
/// one, with `g_s` the lead's surface Green's function and `V` the coupling
/// block in the positive direction.
pub fn lead_self_energy<T: RealField + Copy>(
    coupling: &DMatrix<Complex<T>>,
    surface: &DMatrix<Complex<T>>,
    side: Side,
) -> Result<DMatrix<Complex<T>>, GreensFunctionError> {
    if coupling.shape() != surface.shape() || coupling.nrows() != coupling.ncols() {
        return Err(GreensFunctionError::DimensionMismatch(format!(
            "coupling block is {}x{}, surface function is {}x{}",
            coupling.nrows(),
            coupling.ncols(),
            surface.nrows(),
            surface.ncols()
        )));
    }
    Ok(match side {
        Side::Right => coupling * surface * coupling.adjoint(),
        Side::Left => coupling.adjoint() * surface * coupling,
    })
}

/// Green's function of a central cell dressed by two lead self-energies:
/// `(zI - intra - Sigma_L - Sigma_R)^-1`
pub fn embed_central<T: RealField + Copy>(
    intra: &DMatrix<Complex<T>>,
    sigma_left: &DMatrix<Complex<T>>,
    sigma_right: &DMatrix<Complex<T>>,
    energy: T,
    delta: T,
) -> Result<DMatrix<Complex<T>>, GreensFunctionError> {
    let b = intra.nrows();
    if sigma_left.shape() != (b, b) || sigma_right.shape() != (b, b) {
        return Err(GreensFunctionError::DimensionMismatch(format!(
            "self-energies are {}x{} and {}x{} but the central block is {}x{}",
            sigma_left.nrows(),
            sigma_left.ncols(),
            sigma_right.nrows(),
            sigma_right.ncols(),
            b,
            b
        )));
    }
    let e = energy_matrix(complex_energy(energy, delta), b);
    invert(e - intra - sigma_left - sigma_right)
}

/// Green's function of the central cell of a two-lead heterostructure.
///
/// The left lead's surface function is solved on the reversed chain so that
/// its open boundary faces the centre; both self-energies then dress the
/// central onsite block through the usual embedding.
#[tracing::instrument(name = "Heterostructure", level = "trace", skip(hetero, config))]
pub fn heterostructure_green<T, H>(
    hetero: &H,
    energy: T,
    config: &Decimation<T>,
) -> Result<DMatrix<Complex<T>>, GreensFunctionError>
where
    T: RealField + Copy,
    H: Heterostructure<T>,
{
    let left_chain =
        Chain::from_dense(hetero.left_intra().clone(), hetero.left_inter().clone())?.reversed();
    let right_chain = Chain::from_dense(hetero.right_intra().clone(), hetero.right_inter().clone())?;
    if left_chain.dim() != right_chain.dim() {
        return Err(GreensFunctionError::DimensionMismatch(format!(
            "left lead blocks are {}-dimensional, right lead blocks {}-dimensional",
            left_chain.dim(),
            right_chain.dim()
        )));
    }
    let left_surface = renormalize(&left_chain, energy, config)?.surface;
    let right_surface = renormalize(&right_chain, energy, config)?.surface;
    let sigma_left = lead_self_energy(hetero.left_inter(), &left_surface, Side::Left)?;
    let sigma_right = lead_self_energy(hetero.right_inter(), &right_surface, Side::Right)?;
    embed_central(
        hetero.central_intra(),
        &sigma_left,
        &sigma_right,
        energy,
        config.delta,
    )
}

/// Surface Green's functions of finite leads of 1..=n cells stacked against
/// a semi-infinite right lead.
///
/// `surface` is the right lead's surface function. Entry `i` of the result
/// is the Green's function of the cell bridging a finite stack of `i` cells
/// on the left and the semi-infinite lead on the right; as `i` grows it
/// approaches the bulk function.
pub fn surface_cells<T: RealField + Copy>(
    chain: &Chain<T>,
    surface: &DMatrix<Complex<T>>,
    energy: T,
    delta: T,
    cells: usize,
) -> Result<Vec<DMatrix<Complex<T>>>, GreensFunctionError> {
    let b = chain.dim();
    if surface.shape() != (b, b) {
        return Err(GreensFunctionError::DimensionMismatch(format!(
            "surface function is {}x{} but the chain blocks are {}x{}",
            surface.nrows(),
            surface.ncols(),
            b,
            b
        )));
    }
    let e = energy_matrix(complex_energy(energy, delta), b);
    let sigma_right = lead_self_energy(chain.inter(), surface, Side::Right)?;

    let mut finite_stack: DMatrix<Complex<T>> = DMatrix::zeros(b, b);
    let mut embedded = Vec::with_capacity(cells);
    for _ in 0..cells {
        let sigma_left = lead_self_energy(chain.inter(), &finite_stack, Side::Left)?;
        embedded.push(invert(
            &e - chain.intra() - &sigma_left - &sigma_right,
        )?);
        finite_stack = invert(&e - chain.intra() - &sigma_left)?;
    }
    Ok(embedded)
}

#[cfg(test)]
mod test {
    use super::Side;
    use crate::{
        convergence::Decimation,
        greens_functions::renormalize,
        model::Junction,
        Chain,
    };
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
    fn homojunction_centre_recovers_the_bulk_function() {
        let chain = monatomic_chain();
        let junction =
            Junction::new(chain.clone(), chain.clone(), chain.intra().clone()).unwrap();
        let config = Decimation::for_broadening(0.01);
        for energy in [-1.3, 0.0, 0.8, 2.9] {
            let central = super::heterostructure_green(&junction, energy, &config).unwrap();
            let bulk = renormalize(&chain, energy, &config).unwrap().bulk;
            approx::assert_relative_eq!(central[(0, 0)].re, bulk[(0, 0)].re, epsilon = 1e-3);
            approx::assert_relative_eq!(central[(0, 0)].im, bulk[(0, 0)].im, epsilon = 1e-3);
        }
    }

    #[test]
    fn lead_self_energy_distinguishes_sides() {
        let coupling = DMatrix::from_row_slice(
            2,
            2,
            &[
                Complex::new(0.3, 0.1),
                Complex::new(0.0, 0.0),
                Complex::new(0.7, -0.2),
                Complex::new(0.1, 0.0),
            ],
        );
        let surface = DMatrix::from_row_slice(
            2,
            2,
            &[
                Complex::new(0.0, -0.4),
                Complex::new(0.1, 0.0),
                Complex::new(0.1, 0.0),
                Complex::new(0.0, -0.6),
            ],
        );
        let right = super::lead_self_energy(&coupling, &surface, Side::Right).unwrap();
        let left = super::lead_self_energy(&coupling, &surface, Side::Left).unwrap();
        let expected_right = &coupling * &surface * coupling.adjoint();
        let expected_left = coupling.adjoint() * &surface * &coupling;
        assert_eq!(right, expected_right);
        assert_eq!(left, expected_left);
    }

    #[test]
    fn the_first_surface_cell_is_the_surface_function_itself() {
        // With no finite stack the embedded cell sees only the semi-infinite
        // right lead: that is the defining equation of the surface function.
        let chain = monatomic_chain();
        let config = Decimation::for_broadening(0.01);
        let energy = 3.0;
        let greens = renormalize(&chain, energy, &config).unwrap();
        let cells =
            super::surface_cells(&chain, &greens.surface, energy, 0.01, 12).unwrap();
        approx::assert_relative_eq!(
            cells[0][(0, 0)].re,
            greens.surface[(0, 0)].re,
            epsilon = 1e-4
        );
        // Deep in the stack the embedded function approaches the bulk
        let bulk = greens.bulk[(0, 0)];
        let deep = cells[11][(0, 0)];
        approx::assert_relative_eq!(deep.re, bulk.re, epsilon = 1e-4);
        approx::assert_relative_eq!(deep.im, bulk.im, epsilon = 1e-4);
    }

    #[test]
    fn mismatched_junction_halves_are_rejected() {
        let chain = monatomic_chain();
        let wide = Chain::from_dense(
            DMatrix::zeros(2, 2),
            DMatrix::from_element(2, 2, Complex::from(1_f64)),
        )
        .unwrap();
        assert!(Junction::new(chain.clone(), wide, chain.intra().clone()).is_err());
    }
}
