//! Matrix-valued quadrature over a Brillouin-zone interval.
//!
//! The adaptive self-energy mode integrates k-resolved Green's functions
//! over `[0, 1)`. Quadrature is a collaborator concern behind the
//! [`MatrixIntegrator`] seam; [`AdaptiveSimpson`] is the portable reference
//! implementation, refining wherever the integrand develops structure (band
//! edges, van Hove points) and leaving smooth regions coarse.

use crate::{block::max_modulus, error::GreensFunctionError};
use nalgebra::{DMatrix, RealField};
use num_complex::Complex;

/// The integrand: a matrix-valued function of one fractional wavevector
/// component, fallible because each evaluation is itself a solve
pub type Integrand<'a, T> =
    dyn Fn(T) -> Result<DMatrix<Complex<T>>, GreensFunctionError> + 'a;

/// Quadrature strategy for matrix-valued integrands
pub trait MatrixIntegrator<T: RealField + Copy> {
    /// Integrates `f` over `interval` to the requested elementwise tolerance
    fn integrate_matrix(
        &self,
        f: &Integrand<'_, T>,
        interval: (T, T),
        tolerance: T,
    ) -> Result<DMatrix<Complex<T>>, GreensFunctionError>;
}

/// Adaptive Simpson quadrature with elementwise modulus error control
#[derive(Clone, Copy, Debug)]
pub struct AdaptiveSimpson {
    /// Maximum bisection depth before the panel is declared non-convergent
    pub max_depth: usize,
}

impl Default for AdaptiveSimpson {
    fn default() -> Self {
        Self { max_depth: 20 }
    }
}

/// Simpson's rule on one panel
fn simpson<T: RealField + Copy>(
    width: T,
    fa: &DMatrix<Complex<T>>,
    fm: &DMatrix<Complex<T>>,
    fb: &DMatrix<Complex<T>>,
) -> DMatrix<Complex<T>> {
    let four = Complex::from(T::from_f64(4.0).unwrap());
    let weight = Complex::from(width / T::from_f64(6.0).unwrap());
    (fa + fm * four + fb) * weight
}

impl AdaptiveSimpson {
    #[allow(clippy::too_many_arguments)]
    fn refine<T: RealField + Copy>(
        &self,
        f: &Integrand<'_, T>,
        a: T,
        b: T,
        fa: &DMatrix<Complex<T>>,
        fm: &DMatrix<Complex<T>>,
        fb: &DMatrix<Complex<T>>,
        whole: DMatrix<Complex<T>>,
        tolerance: T,
        depth: usize,
    ) -> Result<DMatrix<Complex<T>>, GreensFunctionError> {
        let two = T::from_f64(2.0).unwrap();
        let fifteen = T::from_f64(15.0).unwrap();
        let midpoint = (a + b) / two;
        let left_mid = f((a + midpoint) / two)?;
        let right_mid = f((midpoint + b) / two)?;
        let left = simpson(midpoint - a, fa, &left_mid, fm);
        let right = simpson(b - midpoint, fm, &right_mid, fb);
        let refined = &left + &right;
        let deviation = max_modulus(&(&refined - &whole));
        if deviation < fifteen * tolerance {
            // Richardson extrapolation of the two estimates
            let correction = (refined.clone() - whole).unscale(fifteen);
            return Ok(refined + correction);
        }
        if depth == 0 {
            return Err(GreensFunctionError::Convergence {
                iterations: self.max_depth,
                residual: nalgebra::try_convert(deviation).unwrap_or(f64::NAN),
            });
        }
        let half_tolerance = tolerance / two;
        let left = self.refine(
            f,
            a,
            midpoint,
            fa,
            &left_mid,
            fm,
            left,
            half_tolerance,
            depth - 1,
        )?;
        let right = self.refine(
            f,
            midpoint,
            b,
            fm,
            &right_mid,
            fb,
            right,
            half_tolerance,
            depth - 1,
        )?;
        Ok(left + right)
    }
}

impl<T: RealField + Copy> MatrixIntegrator<T> for AdaptiveSimpson {
    fn integrate_matrix(
        &self,
        f: &Integrand<'_, T>,
        interval: (T, T),
        tolerance: T,
    ) -> Result<DMatrix<Complex<T>>, GreensFunctionError> {
        if tolerance <= T::zero() {
            return Err(GreensFunctionError::UnsupportedConfiguration(format!(
                "quadrature tolerance must be strictly positive, got {:?}",
                tolerance
            )));
        }
        let (a, b) = interval;
        let two = T::from_f64(2.0).unwrap();
        let midpoint = (a + b) / two;
        let fa = f(a)?;
        let fm = f(midpoint)?;
        let fb = f(b)?;
        let whole = simpson(b - a, &fa, &fm, &fb);
        self.refine(f, a, b, &fa, &fm, &fb, whole, tolerance, self.max_depth)
    }
}
