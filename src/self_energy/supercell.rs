//! Self-energy of an `n1 x n2` supercell embedded in the pristine lattice.
//!
//! The supercell's cells are indexed in row-major order; cell `(i1, j1)`
//! couples to `(i2, j2)` through the translational coupling matching
//! `(i2 - i1, j2 - j1)`. Two block matrices are assembled from the same
//! index arithmetic: the open supercell Hamiltonian (no wrap) entering the
//! Dyson relation, and the periodic Bloch matrix (wrapped couplings pick up
//! supercell-level phases) whose k-averaged resolvent is the supercell
//! Green's function. The self-energy of the eliminated surrounding lattice
//! is then `Sigma = zI - H_super - G_super^-1`.

use crate::{
    block::{complex_energy, energy_matrix, invert},
    error::GreensFunctionError,
    model::{bloch_phase, TiledModel},
    parallel::Scheduler,
};
use itertools::iproduct;
use nalgebra::{DMatrix, RealField};
use num_complex::Complex;

/// The supercell Green's function and embedding self-energy
#[derive(Clone, Debug)]
pub struct SupercellSelfEnergy<T: RealField> {
    /// k-averaged Green's function of the supercell
    pub green: DMatrix<Complex<T>>,
    /// `zI - H_super - G_super^-1`
    pub self_energy: DMatrix<Complex<T>>,
}

/// Computes the supercell Green's function on a uniform `nk x nk` mesh over
/// the supercell Brillouin zone and the self-energy of the surrounding
/// lattice
#[tracing::instrument(name = "Supercell self-energy", level = "trace", skip(h, scheduler))]
pub fn supercell_self_energy<T, H>(
    h: &H,
    energy: T,
    delta: T,
    nk: usize,
    nsuper: (usize, usize),
    scheduler: &Scheduler,
) -> Result<SupercellSelfEnergy<T>, GreensFunctionError>
where
    T: RealField + Copy + Send + Sync,
    H: TiledModel<T> + Sync,
{
    let (n1, n2) = nsuper;
    if n1 == 0 || n2 == 0 {
        return Err(GreensFunctionError::UnsupportedConfiguration(format!(
            "supercell extent must be at least 1x1, got {n1}x{n2}"
        )));
    }
    if nk == 0 {
        return Err(GreensFunctionError::UnsupportedConfiguration(
            "the k-mesh needs at least one point".into(),
        ));
    }
    tracing::info!("supercell {}x{}", n1, n2);

    let intra = h.intra().to_dense();
    let b = intra.nrows();
    let cells: Vec<(usize, usize)> = iproduct!(0..n1, 0..n2).collect();
    let n = cells.len();

    // Every translational coupling of the square lattice and its reverse
    let couplings: Vec<((isize, isize), DMatrix<Complex<T>>)> = vec![
        ((1, 0), h.tx().clone()),
        ((-1, 0), h.tx().adjoint()),
        ((0, 1), h.ty().clone()),
        ((0, -1), h.ty().adjoint()),
        ((1, 1), h.txy().clone()),
        ((-1, -1), h.txy().adjoint()),
        ((1, -1), h.txmy().clone()),
        ((-1, 1), h.txmy().adjoint()),
    ];

    // Open supercell Hamiltonian: exact translation matches only, no wrap
    let mut open: DMatrix<Complex<T>> = DMatrix::zeros(n * b, n * b);
    for (a, &(x1, y1)) in cells.iter().enumerate() {
        open.slice_mut((a * b, a * b), (b, b)).copy_from(&intra);
        for (c, &(x2, y2)) in cells.iter().enumerate() {
            let translation = (x2 as isize - x1 as isize, y2 as isize - y1 as isize);
            if let Some((_, block)) = couplings.iter().find(|(t, _)| *t == translation) {
                open.slice_mut((a * b, c * b), (b, b)).copy_from(block);
            }
        }
    }

    // Periodic Bloch matrix at supercell wavevector k: couplings crossing
    // the supercell boundary wrap around and pick up the winding phase
    let bloch_matrix = |k: &(T, T)| -> DMatrix<Complex<T>> {
        let (kx, ky) = *k;
        let mut hamiltonian: DMatrix<Complex<T>> = DMatrix::zeros(n * b, n * b);
        for (a, &(x1, y1)) in cells.iter().enumerate() {
            let mut diagonal = hamiltonian.slice_mut((a * b, a * b), (b, b));
            diagonal += &intra;
            for (translation, block) in couplings.iter() {
                let target_x = x1 as isize + translation.0;
                let target_y = y1 as isize + translation.1;
                let wrapped_x = target_x.rem_euclid(n1 as isize) as usize;
                let wrapped_y = target_y.rem_euclid(n2 as isize) as usize;
                let c = wrapped_x * n2 + wrapped_y;
                let winding = nalgebra::convert::<f64, T>(target_x.div_euclid(n1 as isize) as f64)
                    * kx
                    + nalgebra::convert::<f64, T>(target_y.div_euclid(n2 as isize) as f64) * ky;
                let mut destination = hamiltonian.slice_mut((a * b, c * b), (b, b));
                destination += block * bloch_phase(winding);
            }
        }
        hamiltonian
    };

    let step = T::one() / nalgebra::convert(nk as f64);
    let points: Vec<(T, T)> = iproduct!(0..nk, 0..nk)
        .map(|(i, j)| {
            (
                nalgebra::convert::<f64, T>(i as f64) * step,
                nalgebra::convert::<f64, T>(j as f64) * step,
            )
        })
        .collect();

    let e = energy_matrix(complex_energy(energy, delta), n * b);
    let resolvents = scheduler.map(&points, |k| invert(&e - bloch_matrix(k)));
    let mut green: DMatrix<Complex<T>> = DMatrix::zeros(n * b, n * b);
    for resolvent in resolvents {
        green += resolvent?;
    }
    green = green.unscale(nalgebra::convert(points.len() as f64));

    let self_energy = &e - &open - invert(green.clone())?;
    Ok(SupercellSelfEnergy { green, self_energy })
}
