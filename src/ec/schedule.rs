//! XOR Schedule Compiler
//!
//! Turns a bit-matrix into an ordered list of packet copies and XORs. Every
//! output bit row is the XOR of the input bits set in its matrix row; the
//! compiler orders rows cheapest-first and lets each row start from an
//! already computed output row when that needs fewer XORs than starting from
//! scratch.
//!
//! Encoding compiles the coding bit-matrix directly. Decoding first derives
//! a decoding bit-matrix that expresses every erased bit in terms of `k`
//! surviving shards, then compiles that with the same scheduler.

use crate::domain::ErasureSet;
use crate::ec::bitmatrix::{BitMatrix, BitRow};
use crate::error::{Error, Result};
use tracing::debug;

// =============================================================================
// Schedule Types
// =============================================================================

/// A packet within one of the schedule's input or output slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketRef {
    pub slot: usize,
    pub packet: usize,
}

/// Where an operation reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// A packet of an input shard
    Input(PacketRef),
    /// A packet of an output shard computed earlier in the schedule
    Output(PacketRef),
}

/// Operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Copy,
    Xor,
}

/// One schedule step: `dest = source` or `dest ^= source`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorOp {
    pub kind: OpKind,
    pub source: Source,
    pub dest: PacketRef,
}

/// Compiled schedule with the shard rows that feed and receive it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    w: usize,
    inputs: Vec<usize>,
    outputs: Vec<usize>,
    ops: Vec<XorOp>,
}

impl Schedule {
    /// Packets per shard
    pub fn w(&self) -> usize {
        self.w
    }

    /// Codec rows of the input slots, in slot order
    pub fn inputs(&self) -> &[usize] {
        &self.inputs
    }

    /// Codec rows of the output slots, in slot order
    pub fn outputs(&self) -> &[usize] {
        &self.outputs
    }

    pub fn ops(&self) -> &[XorOp] {
        &self.ops
    }

    /// Number of XOR steps (copies excluded)
    pub fn xor_count(&self) -> usize {
        self.ops.iter().filter(|op| op.kind == OpKind::Xor).count()
    }
}

// =============================================================================
// Schedule Compiler
// =============================================================================

/// Compiles bit-matrices into XOR schedules
pub struct ScheduleCompiler;

impl ScheduleCompiler {
    /// Compile `matrix` with input slots `inputs` and output slots `outputs`
    ///
    /// Column `c` of the matrix is packet `c % w` of input slot `c / w`; row
    /// `r` is packet `r % w` of output slot `r / w`.
    pub fn compile(
        matrix: &BitMatrix,
        w: usize,
        inputs: Vec<usize>,
        outputs: Vec<usize>,
    ) -> Result<Schedule> {
        if matrix.cols() != inputs.len() * w || matrix.rows() != outputs.len() * w {
            return Err(Error::MatrixConstruction(format!(
                "{}x{} bitmatrix does not match {} inputs and {} outputs of w={}",
                matrix.rows(),
                matrix.cols(),
                inputs.len(),
                outputs.len(),
                w
            )));
        }

        let rows = matrix.packed_rows();
        let n = rows.len();
        let packet = |bit: usize| PacketRef {
            slot: bit / w,
            packet: bit % w,
        };

        // cost[r]: ops needed to produce row r; from[r]: cheaper base row
        let mut cost: Vec<usize> = rows.iter().map(BitRow::count_ones).collect();
        let mut from: Vec<Option<usize>> = vec![None; n];
        let mut pending: Vec<usize> = (0..n).collect();
        let mut ops = Vec::new();

        while let Some(pos) = (0..pending.len()).min_by_key(|&i| (cost[pending[i]], pending[i])) {
            let row = pending.swap_remove(pos);
            let dest = packet(row);

            match from[row] {
                None => {
                    for (i, bit) in rows[row].ones().enumerate() {
                        ops.push(XorOp {
                            kind: if i == 0 { OpKind::Copy } else { OpKind::Xor },
                            source: Source::Input(packet(bit)),
                            dest,
                        });
                    }
                }
                Some(base) => {
                    ops.push(XorOp {
                        kind: OpKind::Copy,
                        source: Source::Output(packet(base)),
                        dest,
                    });
                    for bit in rows[row].differing(&rows[base]).ones() {
                        ops.push(XorOp {
                            kind: OpKind::Xor,
                            source: Source::Input(packet(bit)),
                            dest,
                        });
                    }
                }
            }

            for &other in &pending {
                let via = rows[other].distance(&rows[row]) + 1;
                if via < cost[other] {
                    cost[other] = via;
                    from[other] = Some(row);
                }
            }
        }

        Ok(Schedule {
            w,
            inputs,
            outputs,
            ops,
        })
    }

    /// Schedule computing all `m` coding shards from the `k` data shards
    pub fn compile_encoding(bitmatrix: &BitMatrix, k: usize, m: usize, w: usize) -> Result<Schedule> {
        let schedule = Self::compile(bitmatrix, w, (0..k).collect(), (k..k + m).collect())?;
        debug!(
            k,
            m,
            w,
            ops = schedule.ops().len(),
            xors = schedule.xor_count(),
            naive_xors = naive_xor_count(bitmatrix),
            "compiled encoding schedule"
        );
        Ok(schedule)
    }

    /// Schedule reconstructing the erased rows from `k` survivors
    ///
    /// Inputs are all surviving data shards followed by the lowest surviving
    /// coding shards, one per erased data shard. Outputs are the erased rows
    /// in ascending order.
    pub fn compile_decoding(
        bitmatrix: &BitMatrix,
        k: usize,
        m: usize,
        w: usize,
        erasures: &ErasureSet,
    ) -> Result<Schedule> {
        if erasures.len() > m {
            return Err(Error::TooManyErasures {
                erased: erasures.len(),
                tolerated: m,
            });
        }
        if let Some(&row) = erasures.rows().last() {
            if row >= k + m {
                return Err(Error::InvalidParameters(format!(
                    "erasure row {} out of range for {} shards",
                    row,
                    k + m
                )));
            }
        }

        let matrix = DecodingMatrix::derive(bitmatrix, k, m, w, erasures)?;
        let schedule = Self::compile(&matrix.bits, w, matrix.inputs, erasures.rows().to_vec())?;
        debug!(
            erased = erasures.len(),
            ops = schedule.ops().len(),
            xors = schedule.xor_count(),
            "compiled decoding schedule"
        );
        Ok(schedule)
    }
}

/// XOR count of evaluating every row independently
pub fn naive_xor_count(matrix: &BitMatrix) -> usize {
    (0..matrix.rows())
        .map(|r| matrix.packed_row(r).count_ones().saturating_sub(1))
        .sum()
}

// =============================================================================
// Decoding Matrix
// =============================================================================

/// Bit-matrix expressing erased rows in terms of surviving input slots
struct DecodingMatrix {
    inputs: Vec<usize>,
    bits: BitMatrix,
}

impl DecodingMatrix {
    fn derive(
        bitmatrix: &BitMatrix,
        k: usize,
        m: usize,
        w: usize,
        erasures: &ErasureSet,
    ) -> Result<Self> {
        let erased_data: Vec<usize> = erasures.rows().iter().copied().filter(|&r| r < k).collect();
        let erased_coding: Vec<usize> =
            erasures.rows().iter().copied().filter(|&r| r >= k).collect();
        let surviving_data: Vec<usize> = (0..k).filter(|&r| !erasures.contains(r)).collect();
        let helpers: Vec<usize> = (k..k + m)
            .filter(|&r| !erasures.contains(r))
            .take(erased_data.len())
            .collect();

        let mut inputs = surviving_data.clone();
        inputs.extend(&helpers);
        debug_assert_eq!(inputs.len(), k);

        // input slot holding data row d, if it survived
        let mut data_slot = vec![None; k];
        for (slot, &d) in surviving_data.iter().enumerate() {
            data_slot[d] = Some(slot);
        }
        let coding_bit = |coding_row: usize, l: usize, data_row: usize, x: usize| {
            bitmatrix.get((coding_row - k) * w + l, data_row * w + x)
        };

        let cols = k * w;
        let e = erased_data.len();

        // Erased data bits: for the helper coding shards P and erased data E,
        //   B[P,E] d_E = c_P + B[P,S] d_S
        // so d_E = B[P,E]^-1 (c_P + B[P,S] d_S).
        let decoded_data: Vec<BitRow> = if e == 0 {
            Vec::new()
        } else {
            let mut system = BitMatrix::zeros(e * w, e * w);
            let mut rhs: Vec<BitRow> = Vec::with_capacity(e * w);
            for (pi, &p) in helpers.iter().enumerate() {
                for l in 0..w {
                    let r = pi * w + l;
                    for (ei, &d) in erased_data.iter().enumerate() {
                        for x in 0..w {
                            system.set(r, ei * w + x, coding_bit(p, l, d, x));
                        }
                    }

                    let mut row = BitRow::zeros(cols);
                    row.set((surviving_data.len() + pi) * w + l);
                    for (slot, &d) in surviving_data.iter().enumerate() {
                        for x in 0..w {
                            if coding_bit(p, l, d, x) {
                                row.flip(slot * w + x);
                            }
                        }
                    }
                    rhs.push(row);
                }
            }

            let inverse = system.invert()?;
            let rhs = BitMatrix::from_rows(cols, &rhs);
            inverse.multiply(&rhs)?.packed_rows()
        };

        // Erased coding bits: c = B[c,S] d_S + B[c,E] d_E, with d_E from above
        let mut rows = decoded_data.clone();
        for &c in &erased_coding {
            for l in 0..w {
                let mut row = BitRow::zeros(cols);
                for d in 0..k {
                    for x in 0..w {
                        if !coding_bit(c, l, d, x) {
                            continue;
                        }
                        match data_slot[d] {
                            Some(slot) => row.flip(slot * w + x),
                            None => {
                                let ei = erased_data.iter().position(|&r| r == d).ok_or_else(
                                    || Error::MatrixConstruction(format!("data row {} unaccounted", d)),
                                )?;
                                row.xor_assign(&decoded_data[ei * w + x]);
                            }
                        }
                    }
                }
                rows.push(row);
            }
        }

        Ok(Self {
            inputs,
            bits: BitMatrix::from_rows(cols, &rows),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ec::cauchy;
    use assert_matches::assert_matches;

    /// Evaluate a schedule over single-bit packets
    fn run_bits(schedule: &Schedule, inputs: &[Vec<bool>]) -> Vec<Vec<bool>> {
        let w = schedule.w();
        let mut outputs = vec![vec![false; w]; schedule.outputs().len()];
        for op in schedule.ops() {
            let value = match op.source {
                Source::Input(p) => inputs[p.slot][p.packet],
                Source::Output(p) => outputs[p.slot][p.packet],
            };
            let dest = &mut outputs[op.dest.slot][op.dest.packet];
            match op.kind {
                OpKind::Copy => *dest = value,
                OpKind::Xor => *dest ^= value,
            }
        }
        outputs
    }

    fn mat_vec(matrix: &BitMatrix, bits: &[bool]) -> Vec<bool> {
        (0..matrix.rows())
            .map(|r| (0..matrix.cols()).fold(false, |acc, c| acc ^ (matrix.get(r, c) && bits[c])))
            .collect()
    }

    fn pattern(n: usize, seed: usize) -> Vec<bool> {
        (0..n).map(|i| (i * 7 + seed * 13 + i / 3) % 5 < 2).collect()
    }

    #[test]
    fn test_encoding_schedule_matches_matrix() {
        let (k, m, w) = (5, 3, 4);
        let bits = cauchy::build(k, m, w as u32).unwrap();
        let schedule = ScheduleCompiler::compile_encoding(&bits, k, m, w).unwrap();
        assert_eq!(schedule.inputs(), &[0, 1, 2, 3, 4]);
        assert_eq!(schedule.outputs(), &[5, 6, 7]);

        let data = pattern(k * w, 1);
        let inputs: Vec<Vec<bool>> = data.chunks(w).map(|c| c.to_vec()).collect();
        let expected = mat_vec(&bits, &data);
        let produced: Vec<bool> = run_bits(&schedule, &inputs).concat();
        assert_eq!(produced, expected);
    }

    #[test]
    fn test_smart_schedule_never_worse_than_naive() {
        for (k, m, w) in [(4, 2, 4), (6, 3, 4), (8, 4, 8), (10, 10, 5)] {
            let bits = cauchy::build(k, m, w as u32).unwrap();
            let schedule = ScheduleCompiler::compile_encoding(&bits, k, m, w).unwrap();
            assert!(schedule.xor_count() <= naive_xor_count(&bits));
        }
    }

    #[test]
    fn test_shared_rows_are_reused() {
        // two identical heavy rows: the second should be one copy
        let mut matrix = BitMatrix::zeros(2, 8);
        for c in 0..8 {
            matrix.set(0, c, true);
            matrix.set(1, c, true);
        }
        let schedule = ScheduleCompiler::compile(&matrix, 1, (0..8).collect(), vec![0, 1]).unwrap();
        assert_eq!(schedule.xor_count(), 7);
        assert_eq!(schedule.ops().len(), 9);
    }

    #[test]
    fn test_compile_rejects_shape_mismatch() {
        let matrix = BitMatrix::zeros(4, 4);
        assert_matches!(
            ScheduleCompiler::compile(&matrix, 2, vec![0], vec![1, 2]),
            Err(Error::MatrixConstruction(_))
        );
    }

    #[test]
    fn test_decoding_all_patterns() {
        let (k, m, w) = (4, 3, 4);
        let bits = cauchy::build(k, m, w as u32).unwrap();
        let data = pattern(k * w, 3);
        let coding = mat_vec(&bits, &data);
        let all: Vec<Vec<bool>> = data
            .chunks(w)
            .chain(coding.chunks(w))
            .map(|c| c.to_vec())
            .collect();

        for mask in 1u32..(1 << (k + m)) {
            if mask.count_ones() as usize > m {
                continue;
            }
            let erasures =
                ErasureSet::new((0..k + m).filter(|&r| mask & (1 << r) != 0), k + m).unwrap();
            let schedule = ScheduleCompiler::compile_decoding(&bits, k, m, w, &erasures).unwrap();
            let inputs: Vec<Vec<bool>> = schedule.inputs().iter().map(|&r| all[r].clone()).collect();
            let outputs = run_bits(&schedule, &inputs);
            for (slot, &row) in schedule.outputs().iter().enumerate() {
                assert_eq!(outputs[slot], all[row], "mask {:b} row {}", mask, row);
            }
        }
    }

    #[test]
    fn test_decoding_too_many_erasures() {
        let bits = cauchy::build(4, 2, 4).unwrap();
        let erasures = ErasureSet::new(vec![0, 1, 2], 6).unwrap();
        assert_matches!(
            ScheduleCompiler::compile_decoding(&bits, 4, 2, 4, &erasures),
            Err(Error::TooManyErasures { erased: 3, tolerated: 2 })
        );
    }

    #[test]
    fn test_decoding_only_coding_uses_data_inputs() {
        let bits = cauchy::build(4, 2, 4).unwrap();
        let erasures = ErasureSet::new(vec![5], 6).unwrap();
        let schedule = ScheduleCompiler::compile_decoding(&bits, 4, 2, 4, &erasures).unwrap();
        assert_eq!(schedule.inputs(), &[0, 1, 2, 3]);
        assert_eq!(schedule.outputs(), &[5]);
    }
}
