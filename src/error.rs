use miette::Diagnostic;

/// Failures raised by the Green's function solvers and self-energy assembly.
///
/// Each variant is fatal to the single energy or k-point computation which
/// raised it. A caller sweeping over many spectral points decides whether to
/// skip the point, retry with a larger broadening, or abort the sweep.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum GreensFunctionError {
    /// A fixed-point or decimation iteration exhausted its iteration budget
    /// before meeting the requested tolerance
    #[error("failed to converge within {iterations} iterations (residual {residual:e})")]
    Convergence {
        /// Number of iterations performed before giving up
        iterations: usize,
        /// Infinity-norm of the final fixed-point residual
        residual: f64,
    },
    /// Block dimensions disagree between the onsite and hopping matrices, or
    /// between the two halves of an interface
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
    /// A mode was requested for a dimensionality it does not support
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),
    /// Matrix inversion met a numerically singular operator, usually a sign
    /// the broadening is too small for the working energy resolution
    #[error("matrix inversion failed: operator is numerically singular")]
    SingularMatrix,
}

/// Errors raised by the matrix-file codec
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum CodecError {
    /// Failure in the underlying reader or writer
    #[error("IO Failure: {0}")]
    IO(#[from] std::io::Error),
    /// A record line did not follow the `row col real imag` layout
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord {
        /// 1-indexed line number of the offending record
        line: usize,
        /// What was wrong with it
        reason: String,
    },
    /// The sparse header line was missing or unreadable
    #[error("missing or malformed `# dimension = <d>` header")]
    MalformedHeader,
}
