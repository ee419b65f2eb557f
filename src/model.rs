//! Collaborator interfaces supplying Hamiltonian blocks to the solvers.
//!
//! The crate never constructs lattices itself: a [`HamiltonianModel`] hands
//! over per-k Bloch blocks and effective-chain descriptors, a
//! [`Heterostructure`] exposes the lead and central blocks of a junction.
//! [`PeriodicChain`] and [`SquareLattice`] are reference implementations
//! covering one- and two-dimensional tight-binding models; anything richer
//! lives with the caller.

use crate::{block::Block, error::GreensFunctionError, Chain};
use nalgebra::{DMatrix, RealField};
use num_complex::Complex;

/// `e^{2 pi i k}` for a fractional wavevector component `k`
pub(crate) fn bloch_phase<T: RealField + Copy>(k: T) -> Complex<T> {
    let angle = T::two_pi() * k;
    Complex::new(angle.cos(), angle.sin())
}

/// A tight-binding model able to produce its Bloch Hamiltonian at a
/// fractional wavevector and, for the k-resolved solvers, the descriptor of
/// an effective 1D chain along the first axis at fixed transverse k.
pub trait HamiltonianModel<T: RealField + Copy> {
    /// Number of periodic directions
    fn dimensionality(&self) -> usize;

    /// The onsite block of a single cell
    fn intra(&self) -> Block<T>;

    /// The Bloch Hamiltonian at fractional wavevector `k`; components beyond
    /// the model dimensionality are ignored
    fn hk(&self, k: [T; 3]) -> DMatrix<Complex<T>>;

    /// The effective chain along the first axis at fixed transverse
    /// wavevector `k`. One-dimensional models ignore `k`.
    fn kchain(&self, k: T) -> Chain<T>;

    /// Whether the model couples cells beyond nearest neighbours; such
    /// models cannot be decimated along a single axis
    fn is_multicell(&self) -> bool {
        false
    }

    /// Whether the model hands out sparse blocks
    fn is_sparse(&self) -> bool {
        false
    }
}

/// A model with the full set of 2D translational couplings, enough to tile
/// supercells
pub trait TiledModel<T: RealField + Copy>: HamiltonianModel<T> {
    /// Coupling along `(1, 0)`
    fn tx(&self) -> &DMatrix<Complex<T>>;
    /// Coupling along `(0, 1)`
    fn ty(&self) -> &DMatrix<Complex<T>>;
    /// Coupling along `(1, 1)`
    fn txy(&self) -> &DMatrix<Complex<T>>;
    /// Coupling along `(1, -1)`
    fn txmy(&self) -> &DMatrix<Complex<T>>;
}

/// Read-only view of a two-lead junction: a left and a right semi-infinite
/// lead plus the onsite block of the retained central cell. Both lead chains
/// are expressed in the common positive direction, cell `n` coupling to
/// `n + 1` towards the right.
pub trait Heterostructure<T: RealField + Copy> {
    /// Onsite block of the left lead
    fn left_intra(&self) -> &DMatrix<Complex<T>>;
    /// Hopping block of the left lead, positive direction
    fn left_inter(&self) -> &DMatrix<Complex<T>>;
    /// Onsite block of the right lead
    fn right_intra(&self) -> &DMatrix<Complex<T>>;
    /// Hopping block of the right lead, positive direction
    fn right_inter(&self) -> &DMatrix<Complex<T>>;
    /// Onsite block of the central cell both leads attach to
    fn central_intra(&self) -> &DMatrix<Complex<T>>;
}

/// A one-dimensional periodic chain model
#[derive(Clone, Debug)]
pub struct PeriodicChain<T: RealField> {
    chain: Chain<T>,
}

impl<T: RealField + Copy> PeriodicChain<T> {
    /// Wraps a chain descriptor as a 1D model
    pub fn new(chain: Chain<T>) -> Self {
        Self { chain }
    }
}

impl<T: RealField + Copy> HamiltonianModel<T> for PeriodicChain<T> {
    fn dimensionality(&self) -> usize {
        1
    }

    fn intra(&self) -> Block<T> {
        Block::Dense(self.chain.intra().clone())
    }

    fn hk(&self, k: [T; 3]) -> DMatrix<Complex<T>> {
        let phase = bloch_phase(k[0]);
        let forward = self.chain.inter() * phase;
        self.chain.intra() + &forward + forward.adjoint()
    }

    fn kchain(&self, _k: T) -> Chain<T> {
        self.chain.clone()
    }
}

/// A two-dimensional model on a square Bravais lattice with onsite block
/// `intra` and translational couplings along x, y and both diagonals
#[derive(Clone, Debug)]
pub struct SquareLattice<T: RealField> {
    intra: DMatrix<Complex<T>>,
    tx: DMatrix<Complex<T>>,
    ty: DMatrix<Complex<T>>,
    txy: DMatrix<Complex<T>>,
    txmy: DMatrix<Complex<T>>,
}

impl<T: RealField + Copy> SquareLattice<T> {
    /// Builds the model, validating that every coupling shares the onsite
    /// block's square dimension
    pub fn new(
        intra: DMatrix<Complex<T>>,
        tx: DMatrix<Complex<T>>,
        ty: DMatrix<Complex<T>>,
        txy: DMatrix<Complex<T>>,
        txmy: DMatrix<Complex<T>>,
    ) -> Result<Self, GreensFunctionError> {
        let b = intra.nrows();
        if intra.ncols() != b {
            return Err(GreensFunctionError::DimensionMismatch(format!(
                "onsite block must be square, got {}x{}",
                intra.nrows(),
                intra.ncols()
            )));
        }
        for coupling in [&tx, &ty, &txy, &txmy] {
            if coupling.shape() != (b, b) {
                return Err(GreensFunctionError::DimensionMismatch(format!(
                    "coupling block is {}x{} but the onsite block is {}x{}",
                    coupling.nrows(),
                    coupling.ncols(),
                    b,
                    b
                )));
            }
        }
        Ok(Self {
            intra,
            tx,
            ty,
            txy,
            txmy,
        })
    }

    /// Degrees of freedom per cell
    pub fn dim(&self) -> usize {
        self.intra.nrows()
    }
}

impl<T: RealField + Copy> HamiltonianModel<T> for SquareLattice<T> {
    fn dimensionality(&self) -> usize {
        2
    }

    fn intra(&self) -> Block<T> {
        Block::Dense(self.intra.clone())
    }

    fn hk(&self, k: [T; 3]) -> DMatrix<Complex<T>> {
        let mut hamiltonian = self.intra.clone();
        for (coupling, phase) in [
            (&self.tx, bloch_phase(k[0])),
            (&self.ty, bloch_phase(k[1])),
            (&self.txy, bloch_phase(k[0] + k[1])),
            (&self.txmy, bloch_phase(k[0] - k[1])),
        ] {
            let forward = coupling * phase;
            hamiltonian += forward.adjoint();
            hamiltonian += forward;
        }
        hamiltonian
    }

    /// Chain along x at fixed transverse wavevector: the transverse coupling
    /// folds into the onsite block, the diagonal couplings dress the hopping
    fn kchain(&self, k: T) -> Chain<T> {
        let transverse = &self.ty * bloch_phase(k);
        let onsite = &self.intra + &transverse + transverse.adjoint();
        let hopping = &self.tx + &self.txy * bloch_phase(k) + &self.txmy * bloch_phase(-k);
        Chain::from_dense(onsite, hopping).expect("couplings validated at construction")
    }
}

impl<T: RealField + Copy> TiledModel<T> for SquareLattice<T> {
    fn tx(&self) -> &DMatrix<Complex<T>> {
        &self.tx
    }
    fn ty(&self) -> &DMatrix<Complex<T>> {
        &self.ty
    }
    fn txy(&self) -> &DMatrix<Complex<T>> {
        &self.txy
    }
    fn txmy(&self) -> &DMatrix<Complex<T>> {
        &self.txmy
    }
}

/// A concrete two-lead junction implementing [`Heterostructure`]
#[derive(Clone, Debug)]
pub struct Junction<T: RealField> {
    left: Chain<T>,
    right: Chain<T>,
    central: DMatrix<Complex<T>>,
}

impl<T: RealField + Copy> Junction<T> {
    /// Builds a junction from its two lead chains and central onsite block
    pub fn new(
        left: Chain<T>,
        right: Chain<T>,
        central: DMatrix<Complex<T>>,
    ) -> Result<Self, GreensFunctionError> {
        if left.dim() != right.dim() || central.shape() != (left.dim(), left.dim()) {
            return Err(GreensFunctionError::DimensionMismatch(format!(
                "junction blocks disagree: left {}, right {}, central {}x{}",
                left.dim(),
                right.dim(),
                central.nrows(),
                central.ncols()
            )));
        }
        Ok(Self {
            left,
            right,
            central,
        })
    }
}

impl<T: RealField + Copy> Heterostructure<T> for Junction<T> {
    fn left_intra(&self) -> &DMatrix<Complex<T>> {
        self.left.intra()
    }
    fn left_inter(&self) -> &DMatrix<Complex<T>> {
        self.left.inter()
    }
    fn right_intra(&self) -> &DMatrix<Complex<T>> {
        self.right.intra()
    }
    fn right_inter(&self) -> &DMatrix<Complex<T>> {
        self.right.inter()
    }
    fn central_intra(&self) -> &DMatrix<Complex<T>> {
        &self.central
    }
}

#[cfg(test)]
mod test {
    use super::{HamiltonianModel, SquareLattice};
    use crate::model::bloch_phase;
    use nalgebra::DMatrix;
    use num_complex::Complex;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_lattice(b: usize, seed: u64) -> SquareLattice<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut random_block = |_| {
            DMatrix::from_fn(b, b, |_, _| {
                Complex::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
            })
        };
        let raw: DMatrix<Complex<f64>> = random_block(0);
        let intra = (&raw + raw.adjoint()) * Complex::from(0.5);
        SquareLattice::new(
            intra,
            random_block(1),
            random_block(2),
            random_block(3),
            random_block(4),
        )
        .unwrap()
    }

    #[test]
    fn bloch_hamiltonian_is_hermitian() {
        let lattice = random_lattice(3, 0x11);
        let hk = lattice.hk([0.13, 0.77, 0.0]);
        let deviation = (&hk - hk.adjoint()).camax();
        assert!(deviation < 1e-12);
    }

    #[test]
    fn the_kchain_recomposes_the_bloch_hamiltonian() {
        // hk(kx, ky) must equal ons(ky) + hop(ky) e^{2 pi i kx} + h.c.
        let lattice = random_lattice(2, 0x12);
        let (kx, ky) = (0.31, 0.64);
        let chain = lattice.kchain(ky);
        let forward = chain.inter() * bloch_phase(kx);
        let recomposed = chain.intra() + &forward + forward.adjoint();
        let deviation = (lattice.hk([kx, ky, 0.0]) - recomposed).camax();
        assert!(deviation < 1e-12);
    }
}
