//! Binary Matrices
//!
//! Dense 0/1 matrices used for the bit-level expansion of the coding matrix,
//! plus the GF(2) linear algebra the decoder needs (inversion and products).
//!
//! Storage is one byte per bit, row-major, which is also the persisted form.
//! Row operations during scheduling and inversion go through [`BitRow`], a
//! packed `u64` representation.

use crate::error::{Error, Result};

// =============================================================================
// Packed Row
// =============================================================================

/// A packed row of bits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitRow {
    words: Vec<u64>,
    len: usize,
}

impl BitRow {
    /// All-zero row of `len` bits
    pub fn zeros(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }

    /// Pack a slice of 0/1 bytes
    pub fn from_bits(bits: &[u8]) -> Self {
        let mut row = Self::zeros(bits.len());
        for (i, &b) in bits.iter().enumerate() {
            if b != 0 {
                row.set(i);
            }
        }
        row
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, i: usize) -> bool {
        (self.words[i / 64] >> (i % 64)) & 1 != 0
    }

    #[inline]
    pub fn set(&mut self, i: usize) {
        self.words[i / 64] |= 1 << (i % 64);
    }

    #[inline]
    pub fn flip(&mut self, i: usize) {
        self.words[i / 64] ^= 1 << (i % 64);
    }

    /// In-place XOR with another row of the same length
    pub fn xor_assign(&mut self, other: &BitRow) {
        debug_assert_eq!(self.len, other.len);
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a ^= *b;
        }
    }

    /// Number of set bits
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Number of positions where `self` and `other` differ
    pub fn distance(&self, other: &BitRow) -> usize {
        self.words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| (a ^ b).count_ones() as usize)
            .sum()
    }

    /// Indices of set bits in ascending order
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(wi * 64 + bit)
            })
        })
    }

    /// Row with ones where `self` and `other` differ
    pub fn differing(&self, other: &BitRow) -> BitRow {
        let mut diff = self.clone();
        diff.xor_assign(other);
        diff
    }

    /// Unpack into 0/1 bytes
    pub fn to_bits(&self) -> Vec<u8> {
        (0..self.len).map(|i| self.get(i) as u8).collect()
    }
}

// =============================================================================
// Bit Matrix
// =============================================================================

/// Row-major binary matrix, one byte (0 or 1) per entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMatrix {
    rows: usize,
    cols: usize,
    bits: Vec<u8>,
}

impl BitMatrix {
    /// All-zero matrix
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            bits: vec![0; rows * cols],
        }
    }

    /// Identity matrix of size `n`
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.set(i, i, true);
        }
        m
    }

    /// Wrap persisted 0/1 bytes
    pub fn from_bytes(rows: usize, cols: usize, bits: Vec<u8>) -> Result<Self> {
        if bits.len() != rows * cols {
            return Err(Error::MatrixConstruction(format!(
                "bitmatrix of {}x{} needs {} entries, got {}",
                rows,
                cols,
                rows * cols,
                bits.len()
            )));
        }
        if let Some(pos) = bits.iter().position(|&b| b > 1) {
            return Err(Error::MatrixConstruction(format!(
                "bitmatrix entry {} is {:#04x}, expected 0 or 1",
                pos, bits[pos]
            )));
        }
        Ok(Self { rows, cols, bits })
    }

    /// Build from packed rows
    pub fn from_rows(cols: usize, rows: &[BitRow]) -> Self {
        let mut bits = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            debug_assert_eq!(row.len(), cols);
            bits.extend(row.to_bits());
        }
        Self {
            rows: rows.len(),
            cols,
            bits,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> bool {
        self.bits[r * self.cols + c] != 0
    }

    #[inline]
    pub fn set(&mut self, r: usize, c: usize, value: bool) {
        self.bits[r * self.cols + c] = value as u8;
    }

    /// Row `r` as 0/1 bytes
    pub fn row(&self, r: usize) -> &[u8] {
        &self.bits[r * self.cols..(r + 1) * self.cols]
    }

    /// Row `r` packed
    pub fn packed_row(&self, r: usize) -> BitRow {
        BitRow::from_bits(self.row(r))
    }

    /// All rows packed
    pub fn packed_rows(&self) -> Vec<BitRow> {
        (0..self.rows).map(|r| self.packed_row(r)).collect()
    }

    /// Raw 0/1 bytes, row-major
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// Total number of ones
    pub fn weight(&self) -> usize {
        self.bits.iter().filter(|&&b| b != 0).count()
    }

    /// Copy `block` into this matrix with its top-left corner at (`row`, `col`)
    pub fn place(&mut self, row: usize, col: usize, block: &BitMatrix) {
        for r in 0..block.rows {
            let dst = (row + r) * self.cols + col;
            self.bits[dst..dst + block.cols].copy_from_slice(block.row(r));
        }
    }

    /// Invert over GF(2) by Gauss-Jordan elimination
    ///
    /// Fails with `MatrixConstruction` when the matrix is not square or is
    /// singular.
    pub fn invert(&self) -> Result<BitMatrix> {
        if self.rows != self.cols {
            return Err(Error::MatrixConstruction(format!(
                "cannot invert non-square {}x{} bitmatrix",
                self.rows, self.cols
            )));
        }
        let n = self.rows;
        let mut work = self.packed_rows();
        let mut inv: Vec<BitRow> = (0..n)
            .map(|i| {
                let mut row = BitRow::zeros(n);
                row.set(i);
                row
            })
            .collect();

        for col in 0..n {
            let pivot = (col..n).find(|&r| work[r].get(col)).ok_or_else(|| {
                Error::MatrixConstruction(format!("bitmatrix is singular at column {}", col))
            })?;
            work.swap(col, pivot);
            inv.swap(col, pivot);

            let (pivot_work, pivot_inv) = (work[col].clone(), inv[col].clone());
            for r in 0..n {
                if r != col && work[r].get(col) {
                    work[r].xor_assign(&pivot_work);
                    inv[r].xor_assign(&pivot_inv);
                }
            }
        }

        Ok(BitMatrix::from_rows(n, &inv))
    }

    /// Product over GF(2)
    pub fn multiply(&self, rhs: &BitMatrix) -> Result<BitMatrix> {
        if self.cols != rhs.rows {
            return Err(Error::MatrixConstruction(format!(
                "cannot multiply {}x{} by {}x{}",
                self.rows, self.cols, rhs.rows, rhs.cols
            )));
        }
        let rhs_rows = rhs.packed_rows();
        let rows: Vec<BitRow> = (0..self.rows)
            .map(|r| {
                let mut acc = BitRow::zeros(rhs.cols);
                for c in self.packed_row(r).ones() {
                    acc.xor_assign(&rhs_rows[c]);
                }
                acc
            })
            .collect();
        Ok(BitMatrix::from_rows(rhs.cols, &rows))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_bitrow_ones_and_distance() {
        let mut a = BitRow::zeros(130);
        a.set(0);
        a.set(64);
        a.set(129);
        assert_eq!(a.ones().collect::<Vec<_>>(), vec![0, 64, 129]);
        assert_eq!(a.count_ones(), 3);

        let mut b = a.clone();
        b.flip(64);
        b.set(5);
        assert_eq!(a.distance(&b), 2);
        assert_eq!(a.differing(&b).ones().collect::<Vec<_>>(), vec![5, 64]);
    }

    #[test]
    fn test_from_bytes_validates() {
        assert!(BitMatrix::from_bytes(2, 2, vec![1, 0, 0, 1]).is_ok());
        assert_matches!(
            BitMatrix::from_bytes(2, 2, vec![1, 0, 0]),
            Err(Error::MatrixConstruction(_))
        );
        assert_matches!(
            BitMatrix::from_bytes(1, 2, vec![1, 2]),
            Err(Error::MatrixConstruction(_))
        );
    }

    #[test]
    fn test_invert_roundtrip() {
        // upper triangular with ones on the diagonal is always invertible
        let n = 9;
        let mut m = BitMatrix::zeros(n, n);
        for r in 0..n {
            for c in r..n {
                m.set(r, c, (r * 7 + c * 3) % 2 == 0 || r == c);
            }
        }
        // mix rows so the pivot search has to swap
        let mut shuffled = BitMatrix::zeros(n, n);
        for r in 0..n {
            let source = BitMatrix::from_bytes(1, n, m.row((r + 4) % n).to_vec()).unwrap();
            shuffled.place(r, 0, &source);
        }
        let inv = shuffled.invert().unwrap();
        assert_eq!(shuffled.multiply(&inv).unwrap(), BitMatrix::identity(n));
        assert_eq!(inv.multiply(&shuffled).unwrap(), BitMatrix::identity(n));
    }

    #[test]
    fn test_invert_singular() {
        let m = BitMatrix::from_bytes(2, 2, vec![1, 1, 1, 1]).unwrap();
        assert_matches!(m.invert(), Err(Error::MatrixConstruction(_)));
    }

    #[test]
    fn test_place_and_weight() {
        let mut m = BitMatrix::zeros(4, 4);
        m.place(2, 2, &BitMatrix::identity(2));
        assert!(m.get(2, 2));
        assert!(m.get(3, 3));
        assert!(!m.get(2, 3));
        assert_eq!(m.weight(), 2);
    }
}
