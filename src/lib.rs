// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Lattice Green's functions and self-energies for tight-binding models
//!
//! # Overview
//! A periodic or semi-infinite lattice model is described by an onsite block
//! and nearest-neighbour coupling blocks. This crate computes the Green's
//! functions of such models at a complex energy `E + i delta` and assembles
//! them into the self-energies which embed leads, interfaces,
//! heterostructures and supercells into a retained finite region.
//!
//! The two workhorses are the renormalization-decimation solver
//! ([`greens_functions::renormalize`]), which doubles the effective hopping
//! range each step and converges geometrically to the bulk and surface
//! Green's functions of a chain, and the block-tridiagonal inverter
//! ([`greens_functions::tridiagonal`]), which extracts single blocks of
//! `(zI - H)^-1` for banded Hamiltonians without a full dense inversion. The
//! [`self_energy`] module combines these with coupling blocks for the
//! composite geometries; k-integrated quantities of 2D and 3D lattices sum
//! over the Brillouin zone of a [`model::HamiltonianModel`] collaborator.
//!
//! # Usage
//! ```
//! use lattice_green::{Chain, Decimation, greens_functions::renormalize};
//! use nalgebra::DMatrix;
//! use num_complex::Complex;
//!
//! // A monatomic chain with unit hopping
//! let chain = Chain::from_dense(
//!     DMatrix::from_element(1, 1, Complex::from(0_f64)),
//!     DMatrix::from_element(1, 1, Complex::from(1_f64)),
//! )
//! .unwrap();
//! let greens = renormalize(&chain, 0.0, &Decimation::for_broadening(0.01)).unwrap();
//! // At the band centre the surface function is -i up to broadening
//! assert!((greens.surface[(0, 0)].im + 1.0).abs() < 0.02);
//! ```

#![warn(missing_docs)]

/// Complex matrix blocks and chain descriptors
pub mod block;

/// Immutable convergence configuration passed to each solve call
pub mod convergence;

/// Error taxonomy
mod error;

/// Green's function solvers: Dyson fixed point, renormalization-decimation,
/// block-tridiagonal inversion and k-resolved chains
pub mod greens_functions;

/// Matrix-valued quadrature over Brillouin-zone intervals
pub mod integrate;

/// Text codec for persisting complex matrices
pub mod io;

/// Collaborator traits supplying Hamiltonian blocks, and reference models
pub mod model;

/// Dispatch of independent spectral points over a worker pool
pub mod parallel;

/// Self-energies for leads, interfaces, heterostructures and supercells
pub mod self_energy;

/// File-backed solver configuration
pub mod settings;

pub use block::{Block, Chain};
pub use convergence::{Decimation, DecimationTermination, DysonConfig, NonConvergencePolicy};
pub use error::{CodecError, GreensFunctionError};
pub use model::{
    HamiltonianModel, Heterostructure, Junction, PeriodicChain, SquareLattice, TiledModel,
};
