// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Green's function solvers
//!
//! Algorithms computing Green's functions of periodic and semi-infinite
//! chains of coupled blocks:
//! - A mixing fixed-point solver for the Dyson equation of a semi-infinite
//!   chain -> robust, linearly convergent, accepts a warm-started seed
//! - A renormalization-decimation solver doubling the effective hopping
//!   range each step -> geometrically convergent, yields both the bulk and
//!   surface Green's functions and is the preferred route for leads
//! - Block-tridiagonal inversion extracting single blocks of `(zI - H)^-1`
//!   without a full dense inverse
//! - Per-k effective-chain solves for higher-dimensional lattices

/// The renormalization-decimation (doubling) solver
pub mod decimation;

/// The mixing fixed-point solver for the Dyson equation
pub mod dyson;

/// k-resolved effective-chain Green's functions for 2D lattices
pub mod kspace;

/// Extraction of single blocks of a block-tridiagonal inverse
pub mod tridiagonal;

pub use decimation::{renormalize, Renormalized};
pub use dyson::solve_dyson;
pub use kspace::{green_kchain, GreenEvaluator, SurfaceEvaluator};
pub use tridiagonal::{BlockInverter, BlockTridiagonal, DenseInverter, SweepInverter};
