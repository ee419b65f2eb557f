//! Text codec for complex matrices.
//!
//! Two ancillary layouts for persisting a Green's function:
//! - dense: one `row col real imag` record per entry, 0-indexed, the
//!   dimension inferred on read as `max(row) + 1`
//! - sparse: a `# dimension = <d>` header followed by 1-indexed
//!   `row col real imag` records for the non-vanishing entries only, each
//!   annotated with a trailing comment

use crate::error::CodecError;
use nalgebra::{DMatrix, RealField};
use nalgebra_sparse::CooMatrix;
use num_complex::Complex;
use num_traits::Zero;
use std::io::{BufRead, Write};

fn to_f64<T: RealField + Copy>(value: T) -> f64 {
    nalgebra::try_convert(value).unwrap_or(f64::NAN)
}

/// Writes every entry of `matrix` as a 0-indexed `row col real imag` record
pub fn write_dense<T: RealField + Copy, W: Write>(
    writer: &mut W,
    matrix: &DMatrix<Complex<T>>,
) -> Result<(), CodecError> {
    for i in 0..matrix.nrows() {
        for j in 0..matrix.ncols() {
            let value = matrix[(i, j)];
            writeln!(
                writer,
                "{}  {}  {}  {}",
                i,
                j,
                to_f64(value.re),
                to_f64(value.im)
            )?;
        }
    }
    Ok(())
}

/// Reads a dense matrix written by [`write_dense`]; the dimension is
/// `max(row) + 1`
pub fn read_dense<T: RealField + Copy, R: BufRead>(
    reader: R,
) -> Result<DMatrix<Complex<T>>, CodecError> {
    let mut records = Vec::new();
    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(parse_record(&line, line_number + 1)?);
    }
    let dimension = records
        .iter()
        .map(|record| record.0 + 1)
        .max()
        .unwrap_or(0);
    let mut matrix = DMatrix::zeros(dimension, dimension);
    for (i, j, value) in records {
        if j >= dimension {
            return Err(CodecError::MalformedRecord {
                line: 0,
                reason: format!("column {} outside inferred dimension {}", j, dimension),
            });
        }
        matrix[(i, j)] = value;
    }
    Ok(matrix)
}

/// Writes the non-vanishing entries of `matrix` in the 1-indexed sparse
/// layout, eliminating explicit zeros
pub fn write_sparse<T: RealField + Copy, W: Write>(
    writer: &mut W,
    matrix: &DMatrix<Complex<T>>,
) -> Result<(), CodecError> {
    writeln!(writer, "# dimension = {}", matrix.nrows())?;
    for i in 0..matrix.nrows() {
        for j in 0..matrix.ncols() {
            let value = matrix[(i, j)];
            if value.is_zero() {
                continue;
            }
            writeln!(
                writer,
                "{}   {}   {:.8}   {:.8}     !!!  i  j   Real   Imag",
                i + 1,
                j + 1,
                to_f64(value.re),
                to_f64(value.im)
            )?;
        }
    }
    Ok(())
}

/// Reads a sparse matrix written by [`write_sparse`] into COO form
pub fn read_sparse<T: RealField + Copy, R: BufRead>(
    reader: R,
) -> Result<CooMatrix<Complex<T>>, CodecError> {
    let mut lines = reader.lines();
    let header = lines.next().ok_or(CodecError::MalformedHeader)??;
    let dimension: usize = header
        .strip_prefix('#')
        .and_then(|rest| rest.split('=').nth(1))
        .and_then(|value| value.trim().parse().ok())
        .ok_or(CodecError::MalformedHeader)?;

    let mut matrix = CooMatrix::new(dimension, dimension);
    for (line_number, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let (i, j, value) = parse_record(&line, line_number + 2)?;
        if i < 1 || j < 1 || i > dimension || j > dimension {
            return Err(CodecError::MalformedRecord {
                line: line_number + 2,
                reason: format!("entry ({}, {}) outside dimension {}", i, j, dimension),
            });
        }
        matrix.push(i - 1, j - 1, value);
    }
    Ok(matrix)
}

/// Parses the leading `row col real imag` tokens of one record, ignoring
/// any trailing annotation
fn parse_record<T: RealField + Copy>(
    line: &str,
    line_number: usize,
) -> Result<(usize, usize, Complex<T>), CodecError> {
    let mut tokens = line.split_whitespace();
    let mut next = |what: &str| {
        tokens.next().ok_or_else(|| CodecError::MalformedRecord {
            line: line_number,
            reason: format!("missing {} field", what),
        })
    };
    let row = next("row")?;
    let col = next("col")?;
    let real = next("real")?;
    let imag = next("imag")?;

    let parse_index = |token: &str, what: &str| {
        token
            .parse::<usize>()
            .map_err(|_| CodecError::MalformedRecord {
                line: line_number,
                reason: format!("{} index `{}` is not an integer", what, token),
            })
    };
    let parse_value = |token: &str, what: &str| {
        token
            .parse::<f64>()
            .map(nalgebra::convert::<f64, T>)
            .map_err(|_| CodecError::MalformedRecord {
                line: line_number,
                reason: format!("{} part `{}` is not a number", what, token),
            })
    };
    Ok((
        parse_index(row, "row")?,
        parse_index(col, "col")?,
        Complex::new(parse_value(real, "real")?, parse_value(imag, "imag")?),
    ))
}

#[cfg(test)]
mod test {
    use nalgebra::DMatrix;
    use nalgebra_sparse::convert::serial::convert_coo_dense;
    use num_complex::Complex;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::io::Cursor;

    fn random_green_function(b: usize, seed: u64) -> DMatrix<Complex<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        DMatrix::from_fn(b, b, |_, _| {
            Complex::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
        })
    }

    #[test]
    fn dense_round_trip_is_exact() {
        let matrix = random_green_function(5, 0x77);
        let mut buffer = Vec::new();
        super::write_dense(&mut buffer, &matrix).unwrap();
        let recovered: DMatrix<Complex<f64>> = super::read_dense(Cursor::new(buffer)).unwrap();
        assert_eq!(matrix, recovered);
    }

    #[test]
    fn sparse_round_trip_reproduces_nonzeros_to_output_precision() {
        let mut matrix = random_green_function(4, 0x78);
        matrix[(1, 2)] = Complex::from(0.0);
        matrix[(3, 0)] = Complex::from(0.0);
        let mut buffer = Vec::new();
        super::write_sparse(&mut buffer, &matrix).unwrap();

        let recovered = super::read_sparse::<f64, _>(Cursor::new(buffer)).unwrap();
        // The explicit zeros were eliminated on write
        assert_eq!(recovered.nnz(), 14);
        let dense = convert_coo_dense(&recovered);
        let deviation = (&dense - &matrix).camax();
        assert!(deviation < 1e-8);
    }

    #[test]
    fn the_sparse_header_carries_the_dimension_of_an_empty_matrix() {
        let matrix: DMatrix<Complex<f64>> = DMatrix::zeros(3, 3);
        let mut buffer = Vec::new();
        super::write_sparse(&mut buffer, &matrix).unwrap();
        let recovered = super::read_sparse::<f64, _>(Cursor::new(buffer)).unwrap();
        assert_eq!(recovered.nrows(), 3);
        assert_eq!(recovered.nnz(), 0);
    }

    #[test]
    fn a_missing_header_is_rejected() {
        let payload = "1   1   0.5   0.0";
        assert!(matches!(
            super::read_sparse::<f64, _>(Cursor::new(payload)),
            Err(crate::error::CodecError::MalformedHeader)
        ));
    }

    #[test]
    fn malformed_records_name_the_offending_line() {
        let payload = "0  0  0.5\n";
        let result = super::read_dense::<f64, _>(Cursor::new(payload));
        assert!(matches!(
            result,
            Err(crate::error::CodecError::MalformedRecord { line: 1, .. })
        ));
    }
}
