//! k-resolved effective-chain Green's functions for two-dimensional models.
//!
//! A 2D lattice at fixed transverse wavevector is a 1D chain whose onsite
//! and hopping blocks carry Bloch phases; everything the decimation solver
//! produces for a chain is therefore available per k. The evaluators here
//! exist for energy sweeps: they capture whatever is energy-independent
//! (the k-chain blocks, or a full eigendecomposition of the k-mesh) exactly
//! once and re-solve only the energy-dependent remainder per call.

use crate::{
    block::{complex_energy, energy_matrix, invert},
    convergence::Decimation,
    error::GreensFunctionError,
    greens_functions::decimation::{renormalize, Renormalized},
    model::HamiltonianModel,
    Chain,
};
use itertools::iproduct;
use nalgebra::{DMatrix, DVector, RealField};
use num_complex::Complex;

/// Bulk and surface Green's functions of the effective chain of `h` at
/// transverse wavevector `k`.
///
/// With a `surface_perturbation` the surface cell's onsite block becomes
/// `intra + dh` and the surface function is re-embedded against the
/// unperturbed semi-infinite bulk through its self-energy; the bulk function
/// is unaffected.
pub fn green_kchain<T, H>(
    h: &H,
    k: T,
    energy: T,
    config: &Decimation<T>,
    surface_perturbation: Option<&DMatrix<Complex<T>>>,
) -> Result<Renormalized<T>, GreensFunctionError>
where
    T: RealField + Copy,
    H: HamiltonianModel<T>,
{
    perturbed_surface(&h.kchain(k), energy, config, surface_perturbation)
}

pub(crate) fn perturbed_surface<T: RealField + Copy>(
    chain: &Chain<T>,
    energy: T,
    config: &Decimation<T>,
    perturbation: Option<&DMatrix<Complex<T>>>,
) -> Result<Renormalized<T>, GreensFunctionError> {
    let greens = renormalize(chain, energy, config)?;
    match perturbation {
        None => Ok(greens),
        Some(dh) => {
            let b = chain.dim();
            if dh.shape() != (b, b) {
                return Err(GreensFunctionError::DimensionMismatch(format!(
                    "surface perturbation is {}x{} but the chain blocks are {}x{}",
                    dh.nrows(),
                    dh.ncols(),
                    b,
                    b
                )));
            }
            let sigma = chain.inter() * &greens.surface * chain.inter().adjoint();
            let e = energy_matrix(complex_energy(energy, config.delta), b);
            let surface = invert(e - (chain.intra() + dh) - sigma)?;
            Ok(Renormalized {
                bulk: greens.bulk,
                surface,
            })
        }
    }
}

/// An energy sweep over one k-chain: the chain blocks are captured at
/// construction, only the Green's functions are recomputed per energy
#[derive(Clone, Debug)]
pub struct SurfaceEvaluator<T: RealField> {
    chain: Chain<T>,
    config: Decimation<T>,
    perturbation: Option<DMatrix<Complex<T>>>,
}

impl<T: RealField + Copy> SurfaceEvaluator<T> {
    /// Captures the effective chain of `h` at transverse wavevector `k`.
    /// `reverse` walks the chain in the negative direction, the orientation
    /// of a left-attached lead.
    pub fn new<H: HamiltonianModel<T>>(h: &H, k: T, config: Decimation<T>, reverse: bool) -> Self {
        let chain = if reverse {
            h.kchain(k).reversed()
        } else {
            h.kchain(k)
        };
        Self {
            chain,
            config,
            perturbation: None,
        }
    }

    /// Adds an onsite perturbation applied at the surface cell only
    pub fn with_perturbation(
        mut self,
        dh: DMatrix<Complex<T>>,
    ) -> Result<Self, GreensFunctionError> {
        let b = self.chain.dim();
        if dh.shape() != (b, b) {
            return Err(GreensFunctionError::DimensionMismatch(format!(
                "surface perturbation is {}x{} but the chain blocks are {}x{}",
                dh.nrows(),
                dh.ncols(),
                b,
                b
            )));
        }
        self.perturbation = Some(dh);
        Ok(self)
    }

    /// The captured chain descriptor
    pub fn chain(&self) -> &Chain<T> {
        &self.chain
    }

    /// Solves for the bulk and surface functions at one energy
    pub fn evaluate(&self, energy: T) -> Result<Renormalized<T>, GreensFunctionError> {
        perturbed_surface(&self.chain, energy, &self.config, self.perturbation.as_ref())
    }
}

/// An energy evaluator backed by a one-off eigendecomposition of the Bloch
/// Hamiltonian on a uniform k-mesh.
///
/// Construction diagonalises `nk x nk` Hermitian Bloch blocks; each
/// [`evaluate`](GreenEvaluator::evaluate) call then assembles
/// `G(z) = sum_k V_k (z - e_k)^-1 V_k^H / nk^2` from the cached spectra,
/// which is far cheaper than per-energy inversions when sweeping many
/// energies. The broadening should not resolve below the mesh's eigenvalue
/// spacing.
pub struct GreenEvaluator<T: RealField> {
    eigenvalues: Vec<DVector<T>>,
    eigenvectors: Vec<DMatrix<Complex<T>>>,
    intra: DMatrix<Complex<T>>,
}

impl<T: RealField + Copy> GreenEvaluator<T> {
    /// Diagonalises the model on a uniform `nk x nk` mesh over the Brillouin
    /// zone. Only two-dimensional models are supported.
    #[tracing::instrument(name = "Green evaluator", level = "trace", skip(h))]
    pub fn new<H: HamiltonianModel<T>>(h: &H, nk: usize) -> Result<Self, GreensFunctionError> {
        if h.dimensionality() != 2 {
            return Err(GreensFunctionError::UnsupportedConfiguration(format!(
                "the eigendecomposition evaluator covers 2D models, got dimensionality {}",
                h.dimensionality()
            )));
        }
        if nk == 0 {
            return Err(GreensFunctionError::UnsupportedConfiguration(
                "the k-mesh needs at least one point".into(),
            ));
        }
        let step = T::one() / nalgebra::convert(nk as f64);
        let mut eigenvalues = Vec::with_capacity(nk * nk);
        let mut eigenvectors = Vec::with_capacity(nk * nk);
        for (ik, jk) in iproduct!(0..nk, 0..nk) {
            let kx = nalgebra::convert::<f64, T>(ik as f64) * step;
            let ky = nalgebra::convert::<f64, T>(jk as f64) * step;
            let eigen = h.hk([kx, ky, T::zero()]).symmetric_eigen();
            eigenvalues.push(eigen.eigenvalues);
            eigenvectors.push(eigen.eigenvectors);
        }
        Ok(Self {
            eigenvalues,
            eigenvectors,
            intra: h.intra().to_dense(),
        })
    }

    /// Assembles the k-summed Green's function and the matching self-energy
    /// `zI - intra - G^-1` at one complex energy
    pub fn evaluate(
        &self,
        energy: T,
        delta: T,
    ) -> Result<(DMatrix<Complex<T>>, DMatrix<Complex<T>>), GreensFunctionError> {
        let b = self.intra.nrows();
        let z = complex_energy(energy, delta);
        let mut green: DMatrix<Complex<T>> = DMatrix::zeros(b, b);
        for (values, vectors) in self.eigenvalues.iter().zip(self.eigenvectors.iter()) {
            let resolvent = DVector::from_iterator(
                b,
                values
                    .iter()
                    .map(|&eigenvalue| Complex::from(T::one()) / (z - Complex::from(eigenvalue))),
            );
            green += vectors * DMatrix::from_diagonal(&resolvent) * vectors.adjoint();
        }
        green = green.unscale(nalgebra::convert(self.eigenvalues.len() as f64));
        let self_energy = energy_matrix(z, b) - &self.intra - invert(green.clone())?;
        Ok((green, self_energy))
    }
}
