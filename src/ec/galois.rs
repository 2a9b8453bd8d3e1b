//! GF(2^w) Arithmetic
//!
//! Field arithmetic for word sizes 2..=32. Small fields (w <= 16) use
//! log/antilog tables that are built once per word size and shared by every
//! `GaloisField` handle; larger fields fall back to shift-and-reduce
//! polynomial multiplication.
//!
//! Elements are carried as `u32` regardless of `w`; callers must keep them
//! below `2^w`.

use crate::error::{Error, Result};
use once_cell::sync::{Lazy, OnceCell};

/// Smallest supported word size
pub const MIN_W: u32 = 2;

/// Largest supported word size
pub const MAX_W: u32 = 32;

/// Largest word size served from log/antilog tables
const MAX_TABLE_W: u32 = 16;

/// Primitive polynomials indexed by `w`, including the `x^w` term.
const PRIMITIVE_POLY: [u64; 33] = [
    0x0,
    0x3,
    0x7,
    0xB,
    0x13,
    0x25,
    0x43,
    0x89,
    0x11D,
    0x211,
    0x409,
    0x805,
    0x1053,
    0x201B,
    0x4443,
    0x8003,
    0x1100B,
    0x20009,
    0x40081,
    0x80027,
    0x100009,
    0x200005,
    0x400003,
    0x800021,
    0x1000087,
    0x2000009,
    0x4000047,
    0x8000027,
    0x10000009,
    0x20000005,
    0x40800007,
    0x80000009,
    0x1_0040_0007,
];

// =============================================================================
// Log/Antilog Tables
// =============================================================================

/// Log and antilog tables for one word size
struct LogTables {
    /// `log[a]` for every non-zero `a` (index 0 unused)
    log: Vec<u32>,
    /// `exp[i] = 2^i`, doubled in length so `log[a] + log[b]` never wraps
    exp: Vec<u32>,
}

impl LogTables {
    fn build(w: u32) -> Self {
        let size = 1usize << w;
        let cycle = size - 1;
        let poly = PRIMITIVE_POLY[w as usize];

        let mut log = vec![0u32; size];
        let mut exp = vec![0u32; cycle * 2];
        let mut x: u64 = 1;
        for i in 0..cycle {
            exp[i] = x as u32;
            log[x as usize] = i as u32;
            x <<= 1;
            if x & (1 << w) != 0 {
                x ^= poly;
            }
        }
        for i in cycle..cycle * 2 {
            exp[i] = exp[i - cycle];
        }

        Self { log, exp }
    }
}

/// Per-`w` tables, built on first use
static LOG_TABLES: Lazy<Vec<OnceCell<LogTables>>> =
    Lazy::new(|| (0..=MAX_TABLE_W).map(|_| OnceCell::new()).collect());

/// Carry-less multiply reduced by `poly`
fn poly_mul(a: u32, b: u32, w: u32, poly: u64) -> u32 {
    let top = 1u64 << w;
    let mut a = a as u64;
    let mut b = b;
    let mut product = 0u64;
    while b != 0 {
        if b & 1 != 0 {
            product ^= a;
        }
        b >>= 1;
        a <<= 1;
        if a & top != 0 {
            a ^= poly;
        }
    }
    product as u32
}

// =============================================================================
// Galois Field
// =============================================================================

/// Handle to GF(2^w) for a fixed `w`
#[derive(Clone, Copy)]
pub struct GaloisField {
    w: u32,
    poly: u64,
    tables: Option<&'static LogTables>,
}

impl std::fmt::Debug for GaloisField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GaloisField")
            .field("w", &self.w)
            .field("poly", &format_args!("{:#x}", self.poly))
            .field("tables", &self.tables.is_some())
            .finish()
    }
}

impl GaloisField {
    /// Open the field GF(2^w)
    ///
    /// # Arguments
    /// * `w` - Word size in bits, 2..=32
    pub fn new(w: u32) -> Result<Self> {
        if !(MIN_W..=MAX_W).contains(&w) {
            return Err(Error::InvalidParameters(format!(
                "word size w={} outside supported range {}..={}",
                w, MIN_W, MAX_W
            )));
        }

        let tables = if w <= MAX_TABLE_W {
            Some(LOG_TABLES[w as usize].get_or_init(|| LogTables::build(w)))
        } else {
            None
        };

        Ok(Self {
            w,
            poly: PRIMITIVE_POLY[w as usize],
            tables,
        })
    }

    /// Word size in bits
    pub fn w(&self) -> u32 {
        self.w
    }

    /// Number of elements in the field (`2^w`)
    pub fn order(&self) -> u64 {
        1u64 << self.w
    }

    /// Addition (and subtraction) is XOR
    #[inline]
    pub fn add(&self, a: u32, b: u32) -> u32 {
        a ^ b
    }

    /// Field multiplication
    #[inline]
    pub fn mul(&self, a: u32, b: u32) -> u32 {
        debug_assert!((a as u64) < self.order() && (b as u64) < self.order());
        if a == 0 || b == 0 {
            return 0;
        }
        match self.tables {
            Some(t) => t.exp[(t.log[a as usize] + t.log[b as usize]) as usize],
            None => poly_mul(a, b, self.w, self.poly),
        }
    }

    /// Multiply by the generator `x` (i.e. by 2)
    #[inline]
    pub fn mul_by_two(&self, a: u32) -> u32 {
        let shifted = (a as u64) << 1;
        if shifted & (1u64 << self.w) != 0 {
            (shifted ^ self.poly) as u32
        } else {
            shifted as u32
        }
    }

    /// Multiplicative inverse; zero has none
    pub fn inverse(&self, a: u32) -> Result<u32> {
        if a == 0 {
            return Err(Error::MatrixConstruction(format!(
                "zero has no inverse in GF(2^{})",
                self.w
            )));
        }
        match self.tables {
            Some(t) => {
                let cycle = (self.order() - 1) as u32;
                Ok(t.exp[(cycle - t.log[a as usize]) as usize])
            }
            None => Ok(self.pow(a, self.order() - 2)),
        }
    }

    /// Field division `a / b`
    pub fn div(&self, a: u32, b: u32) -> Result<u32> {
        Ok(self.mul(a, self.inverse(b)?))
    }

    /// Square-and-multiply exponentiation
    pub fn pow(&self, a: u32, mut exponent: u64) -> u32 {
        let mut base = a;
        let mut acc = 1u32;
        while exponent != 0 {
            if exponent & 1 != 0 {
                acc = self.mul(acc, base);
            }
            base = self.mul(base, base);
            exponent >>= 1;
        }
        acc
    }

    /// Binary matrix of multiplication by `e`
    ///
    /// Returns a row-major `w x w` matrix of 0/1 bytes. Column `x` holds the
    /// bits of `e * 2^x`, row `l` is output bit `l`, so multiplying the
    /// matrix by the bit vector of `v` yields the bits of `e * v`.
    pub fn element_bitmatrix(&self, e: u32) -> Vec<u8> {
        let w = self.w as usize;
        let mut bits = vec![0u8; w * w];
        let mut column = e;
        for x in 0..w {
            for l in 0..w {
                bits[l * w + x] = ((column >> l) & 1) as u8;
            }
            column = self.mul_by_two(column);
        }
        bits
    }

    /// Number of ones in `element_bitmatrix(e)`
    pub fn bitmatrix_weight(&self, e: u32) -> u32 {
        let mut column = e;
        let mut ones = 0;
        for _ in 0..self.w {
            ones += column.count_ones();
            column = self.mul_by_two(column);
        }
        ones
    }
}

// =============================================================================
// Tests
// =============================================================================
