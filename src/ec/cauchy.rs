//! Cauchy Coding Matrix
//!
//! Builds the `m x k` Cauchy matrix over GF(2^w) that defines the coding
//! shards, improves it to reduce the number of ones in its bit-level
//! expansion, and expands it into the `(m*w) x (k*w)` bit-matrix.
//!
//! With `X = {0..m-1}` and `Y = {m..m+k-1}` the entries are
//! `C[i][j] = 1 / (x_i XOR y_j)`. Every square submatrix of a Cauchy matrix
//! is invertible, and scaling rows or columns by non-zero constants keeps it
//! that way, which is what lets any `m` erasures be recovered.

use crate::ec::bitmatrix::BitMatrix;
use crate::ec::galois::GaloisField;
use crate::error::{Error, Result};
use tracing::debug;

/// Builds Cauchy coding matrices for a fixed k, m, w
#[derive(Debug, Clone)]
pub struct CauchyMatrixBuilder {
    k: usize,
    m: usize,
    field: GaloisField,
}

impl CauchyMatrixBuilder {
    /// Create a builder
    ///
    /// # Arguments
    /// * `k` - Number of data shards (matrix columns)
    /// * `m` - Number of coding shards (matrix rows)
    /// * `w` - Field word size
    pub fn new(k: usize, m: usize, w: u32) -> Result<Self> {
        let field = GaloisField::new(w)?;
        if k == 0 || m == 0 {
            return Err(Error::MatrixConstruction(format!(
                "Cauchy matrix needs k > 0 and m > 0, got k={} m={}",
                k, m
            )));
        }
        if (k + m) as u64 > field.order() {
            return Err(Error::MatrixConstruction(format!(
                "k + m = {} exceeds the {} elements of GF(2^{})",
                k + m,
                field.order(),
                w
            )));
        }
        Ok(Self { k, m, field })
    }

    pub fn field(&self) -> &GaloisField {
        &self.field
    }

    /// The unimproved Cauchy matrix, row-major `m x k`
    pub fn original_matrix(&self) -> Result<Vec<u32>> {
        let mut matrix = Vec::with_capacity(self.m * self.k);
        for i in 0..self.m {
            for j in 0..self.k {
                let x = i as u32;
                let y = (self.m + j) as u32;
                matrix.push(self.field.div(1, x ^ y)?);
            }
        }
        Ok(matrix)
    }

    /// Cauchy matrix scaled to minimise its bit-matrix weight
    ///
    /// Columns are scaled so the first row is all ones (an identity block in
    /// the bit-matrix). Each later row is then divided by whichever of its
    /// own elements gives the lightest row, if any beats the unscaled row.
    pub fn coding_matrix(&self) -> Result<Vec<u32>> {
        let (k, m) = (self.k, self.m);
        let mut matrix = self.original_matrix()?;

        for j in 0..k {
            if matrix[j] != 1 {
                let scale = self.field.inverse(matrix[j])?;
                for i in 0..m {
                    matrix[i * k + j] = self.field.mul(matrix[i * k + j], scale);
                }
            }
        }

        for i in 1..m {
            let row = &matrix[i * k..(i + 1) * k];
            let mut best_weight = self.row_weight(row.iter().copied());
            let mut best_scale = None;

            for &candidate in row {
                if candidate == 1 {
                    continue;
                }
                let scale = self.field.inverse(candidate)?;
                let weight = self.row_weight(row.iter().map(|&e| self.field.mul(e, scale)));
                if weight < best_weight {
                    best_weight = weight;
                    best_scale = Some(scale);
                }
            }

            if let Some(scale) = best_scale {
                for e in &mut matrix[i * k..(i + 1) * k] {
                    *e = self.field.mul(*e, scale);
                }
            }
        }

        Ok(matrix)
    }

    /// Expand a row-major `m x k` field matrix into its `(m*w) x (k*w)` bit-matrix
    pub fn to_bitmatrix(&self, matrix: &[u32]) -> Result<BitMatrix> {
        if matrix.len() != self.m * self.k {
            return Err(Error::MatrixConstruction(format!(
                "expected {}x{} field matrix, got {} elements",
                self.m,
                self.k,
                matrix.len()
            )));
        }
        let w = self.field.w() as usize;
        let mut bits = BitMatrix::zeros(self.m * w, self.k * w);
        for i in 0..self.m {
            for j in 0..self.k {
                let block = self.field.element_bitmatrix(matrix[i * self.k + j]);
                let block = BitMatrix::from_bytes(w, w, block)?;
                bits.place(i * w, j * w, &block);
            }
        }
        Ok(bits)
    }

    /// Build the improved coding bit-matrix
    pub fn build(&self) -> Result<BitMatrix> {
        let matrix = self.coding_matrix()?;
        let bits = self.to_bitmatrix(&matrix)?;
        debug!(
            k = self.k,
            m = self.m,
            w = self.field.w(),
            ones = bits.weight(),
            "built Cauchy bitmatrix"
        );
        Ok(bits)
    }

    fn row_weight(&self, row: impl Iterator<Item = u32>) -> u32 {
        row.map(|e| self.field.bitmatrix_weight(e)).sum()
    }
}

/// Build the coding bit-matrix for `k` data shards, `m` coding shards, word size `w`
pub fn build(k: usize, m: usize, w: u32) -> Result<BitMatrix> {
    CauchyMatrixBuilder::new(k, m, w)?.build()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    /// Rank of a square field matrix by Gaussian elimination
    fn is_invertible(field: &GaloisField, mut rows: Vec<Vec<u32>>) -> bool {
        let n = rows.len();
        for col in 0..n {
            let Some(pivot) = (col..n).find(|&r| rows[r][col] != 0) else {
                return false;
            };
            rows.swap(col, pivot);
            let inv = field.inverse(rows[col][col]).unwrap();
            for r in 0..n {
                if r != col && rows[r][col] != 0 {
                    let factor = field.mul(rows[r][col], inv);
                    for c in 0..n {
                        let sub = field.mul(factor, rows[col][c]);
                        rows[r][c] ^= sub;
                    }
                }
            }
        }
        true
    }

    fn subsets(n: usize, size: usize) -> Vec<Vec<usize>> {
        (0u32..1 << n)
            .filter(|mask| mask.count_ones() as usize == size)
            .map(|mask| (0..n).filter(|&i| mask & (1 << i) != 0).collect())
            .collect()
    }

    #[test]
    fn test_builder_rejects_small_field() {
        assert_matches!(
            CauchyMatrixBuilder::new(3, 2, 2),
            Err(Error::MatrixConstruction(_))
        );
        assert!(CauchyMatrixBuilder::new(2, 2, 2).is_ok());
    }

    #[test]
    fn test_first_row_is_all_ones() {
        let builder = CauchyMatrixBuilder::new(6, 3, 4).unwrap();
        let matrix = builder.coding_matrix().unwrap();
        assert!(matrix[..6].iter().all(|&e| e == 1));
        assert!(matrix.iter().all(|&e| e != 0));
    }

    #[test]
    fn test_improvement_never_heavier() {
        for (k, m, w) in [(4, 2, 4), (6, 3, 4), (10, 4, 8), (5, 5, 4)] {
            let builder = CauchyMatrixBuilder::new(k, m, w).unwrap();
            let original = builder.to_bitmatrix(&builder.original_matrix().unwrap()).unwrap();
            let improved = builder.build().unwrap();
            assert!(
                improved.weight() <= original.weight(),
                "k={} m={} w={}",
                k,
                m,
                w
            );
        }
    }

    #[test]
    fn test_every_square_submatrix_invertible() {
        let (k, m, w) = (5, 3, 3);
        let builder = CauchyMatrixBuilder::new(k, m, w).unwrap();
        let matrix = builder.coding_matrix().unwrap();
        for size in 1..=m {
            for rows in subsets(m, size) {
                for cols in subsets(k, size) {
                    let sub: Vec<Vec<u32>> = rows
                        .iter()
                        .map(|&r| cols.iter().map(|&c| matrix[r * k + c]).collect())
                        .collect();
                    assert!(
                        is_invertible(builder.field(), sub),
                        "rows {:?} cols {:?}",
                        rows,
                        cols
                    );
                }
            }
        }
    }

    #[test]
    fn test_bitmatrix_dimensions_and_identity_row() {
        let (k, m, w) = (4, 2, 4);
        let bits = build(k, m, w).unwrap();
        assert_eq!(bits.rows(), m * w as usize);
        assert_eq!(bits.cols(), k * w as usize);
        assert_eq!(bits.as_bytes().len(), (w * w) as usize * k * m);
        // first coding shard is the plain XOR of the data shards
        for l in 0..w as usize {
            for j in 0..k {
                for x in 0..w as usize {
                    assert_eq!(bits.get(l, j * w as usize + x), l == x);
                }
            }
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        assert_eq!(build(7, 3, 4).unwrap(), build(7, 3, 4).unwrap());
    }

    #[test]
    fn test_large_word_size() {
        let bits = build(3, 2, 17).unwrap();
        assert_eq!(bits.rows(), 34);
        assert_eq!(bits.cols(), 51);
    }
}
