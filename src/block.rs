// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Complex matrix blocks and the chain descriptor built from them.
//!
//! A [`Block`] is the unit of currency of the whole crate: a square complex
//! matrix spanning the degrees of freedom of one lattice cell, held either in
//! dense or CSR form. Solvers densify on entry, so the sparse arm exists to
//! accept caller-supplied operators without an up-front conversion at every
//! call site.

use crate::error::GreensFunctionError;
use nalgebra::{DMatrix, RealField};
use nalgebra_sparse::CsrMatrix;
use num_complex::Complex;

/// A square complex matrix block over the degrees of freedom of a unit cell
#[derive(Clone, Debug)]
pub enum Block<T: RealField> {
    /// Dense storage
    Dense(DMatrix<Complex<T>>),
    /// Compressed sparse row storage
    Sparse(CsrMatrix<Complex<T>>),
}

impl<T: RealField + Copy> Block<T> {
    /// Wraps a dense matrix, rejecting non-square input
    pub fn dense(matrix: DMatrix<Complex<T>>) -> Result<Self, GreensFunctionError> {
        if matrix.nrows() != matrix.ncols() {
            return Err(GreensFunctionError::DimensionMismatch(format!(
                "block must be square, got {}x{}",
                matrix.nrows(),
                matrix.ncols()
            )));
        }
        Ok(Self::Dense(matrix))
    }

    /// Wraps a CSR matrix, rejecting non-square input
    pub fn sparse(matrix: CsrMatrix<Complex<T>>) -> Result<Self, GreensFunctionError> {
        if matrix.nrows() != matrix.ncols() {
            return Err(GreensFunctionError::DimensionMismatch(format!(
                "block must be square, got {}x{}",
                matrix.nrows(),
                matrix.ncols()
            )));
        }
        Ok(Self::Sparse(matrix))
    }

    /// The linear dimension `b` of the block
    pub fn dim(&self) -> usize {
        match self {
            Self::Dense(m) => m.nrows(),
            Self::Sparse(m) => m.nrows(),
        }
    }

    /// Whether the block is held in CSR form
    pub fn is_sparse(&self) -> bool {
        matches!(self, Self::Sparse(_))
    }

    /// A dense copy of the block
    pub fn to_dense(&self) -> DMatrix<Complex<T>> {
        match self {
            Self::Dense(m) => m.clone(),
            Self::Sparse(m) => nalgebra_sparse::convert::serial::convert_csr_dense(m),
        }
    }

    /// The Hermitian conjugate of the block, in the representation it arrived in
    pub fn adjoint(&self) -> Self {
        match self {
            Self::Dense(m) => Self::Dense(m.adjoint()),
            Self::Sparse(m) => {
                let mut transposed = m.transpose();
                for value in transposed.values_mut() {
                    *value = value.conj();
                }
                Self::Sparse(transposed)
            }
        }
    }
}

impl<T: RealField + Copy> From<DMatrix<Complex<T>>> for Block<T> {
    fn from(matrix: DMatrix<Complex<T>>) -> Self {
        Self::Dense(matrix)
    }
}

/// A semi-infinite periodic chain of coupled blocks.
///
/// `intra` is the onsite block repeated at every cell, `inter` couples cell
/// `n` to cell `n + 1`. The onsite block of a physical Hamiltonian is
/// Hermitian; the hopping block need not be, but must share its dimension.
#[derive(Clone, Debug)]
pub struct Chain<T: RealField> {
    intra: DMatrix<Complex<T>>,
    inter: DMatrix<Complex<T>>,
}

impl<T: RealField + Copy> Chain<T> {
    /// Builds a chain descriptor, densifying sparse blocks on entry
    pub fn new(intra: &Block<T>, inter: &Block<T>) -> Result<Self, GreensFunctionError> {
        Self::from_dense(intra.to_dense(), inter.to_dense())
    }

    /// Builds a chain descriptor from dense blocks
    pub fn from_dense(
        intra: DMatrix<Complex<T>>,
        inter: DMatrix<Complex<T>>,
    ) -> Result<Self, GreensFunctionError> {
        if intra.nrows() != intra.ncols() {
            return Err(GreensFunctionError::DimensionMismatch(format!(
                "onsite block must be square, got {}x{}",
                intra.nrows(),
                intra.ncols()
            )));
        }
        if inter.shape() != intra.shape() {
            return Err(GreensFunctionError::DimensionMismatch(format!(
                "hopping block is {}x{} but the onsite block is {}x{}",
                inter.nrows(),
                inter.ncols(),
                intra.nrows(),
                intra.ncols()
            )));
        }
        Ok(Self { intra, inter })
    }

    /// The onsite block
    pub fn intra(&self) -> &DMatrix<Complex<T>> {
        &self.intra
    }

    /// The hopping block coupling cell `n` to cell `n + 1`
    pub fn inter(&self) -> &DMatrix<Complex<T>> {
        &self.inter
    }

    /// Degrees of freedom per cell
    pub fn dim(&self) -> usize {
        self.intra.nrows()
    }

    /// The same chain walked in the opposite direction: the hopping block is
    /// replaced by its Hermitian conjugate. This is the orientation of a
    /// left-attached lead.
    pub fn reversed(&self) -> Self {
        Self {
            intra: self.intra.clone(),
            inter: self.inter.adjoint(),
        }
    }
}

/// The complex energy `z = E + iδ` entering every resolvent in the crate
pub(crate) fn complex_energy<T: RealField + Copy>(energy: T, delta: T) -> Complex<T> {
    Complex::new(energy, delta)
}

/// `z·I` at dimension `n`
pub(crate) fn energy_matrix<T: RealField + Copy>(z: Complex<T>, n: usize) -> DMatrix<Complex<T>> {
    DMatrix::from_diagonal_element(n, n, z)
}

/// Largest elementwise modulus of a complex matrix
pub(crate) fn max_modulus<T: RealField + Copy>(matrix: &DMatrix<Complex<T>>) -> T {
    matrix.camax()
}

/// Inverts a dense complex matrix, surfacing numerical singularity as a
/// typed error rather than a panic
pub(crate) fn invert<T: RealField + Copy>(
    matrix: DMatrix<Complex<T>>,
) -> Result<DMatrix<Complex<T>>, GreensFunctionError> {
    matrix
        .try_inverse()
        .ok_or(GreensFunctionError::SingularMatrix)
}
