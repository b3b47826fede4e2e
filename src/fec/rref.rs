// Copyright (c) 2024, The QuicFuscate Project Authors.
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//     * Redistributions of source code must retain the above copyright
//       notice, this list of conditions and the following disclaimer.
//
//     * Redistributions in binary form must reproduce the above
//       copyright notice, this list of conditions and the following disclaimer
//       in the documentation and/or other materials provided with the
//       distribution.
//
//     * Neither the name of the copyright holder nor the names of its
//       contributors may be used to endorse or promote products derived from
//       this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT
// OWNER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE,
// DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY
// THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! Incremental reduced row-echelon form over GF(2^8).
//!
//! Rows are folded in one at a time. Between calls the matrix always holds
//! rows with distinct pivots, sorted by pivot column, each pivot equal to 1.
//! Zeroing the entries above the pivots is left to
//! [`RrefMatrix::reduce_to_identity`].

use super::gf_tables::FieldKernel;
use crate::error::{Error, Result};
use log::{debug, error, trace};

/// Returns the column of the first non-zero entry, or `None` for the zero row.
#[inline]
pub fn locate_pivot(row: &[u8]) -> Option<usize> {
    row.iter().position(|&v| v != 0)
}

/// Observer for the row operations applied to the coefficient matrix.
///
/// A decoder mirrors each call onto the payload attached to the row so that
/// coefficients and values stay in correspondence. All methods default to
/// no-ops; `()` is the observer for callers with no payloads.
pub trait Replay {
    /// The incoming row absorbed `scale * rows[resident]`.
    fn eliminate(&mut self, _resident: usize, _scale: u8) {}

    /// The incoming row was multiplied by `scale`.
    fn normalize(&mut self, _scale: u8) {}

    /// The incoming row was inserted at `index`.
    fn place(&mut self, _index: usize) {}

    /// The incoming row was rejected.
    fn discard(&mut self) {}

    /// `rows[target] ^= scale * rows[source]` during identity reduction.
    fn reduce(&mut self, _target: usize, _source: usize, _scale: u8) {}
}

impl Replay for () {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RrefMatrix {
    cols: usize,
    rows: Vec<Vec<u8>>,
}

impl RrefMatrix {
    /// Creates an empty matrix for rows of `cols` coefficients.
    pub fn new(cols: usize) -> Self {
        Self {
            cols,
            rows: Vec::with_capacity(cols),
        }
    }

    /// The `n x n` identity.
    pub fn identity(n: usize) -> Self {
        let rows = (0..n)
            .map(|i| {
                let mut row = vec![0u8; n];
                row[i] = 1;
                row
            })
            .collect();
        Self { cols: n, rows }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of independent rows held.
    pub fn rank(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True once there is one row per column.
    pub fn is_full(&self) -> bool {
        self.rows.len() == self.cols
    }

    pub fn rows(&self) -> &[Vec<u8>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[u8]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Pivot column of every row, in row order.
    pub fn pivots(&self) -> Vec<usize> {
        self.rows.iter().filter_map(|r| locate_pivot(r)).collect()
    }

    pub fn into_rows(self) -> Vec<Vec<u8>> {
        self.rows
    }

    /// Folds `row` into the matrix and returns the index it was stored at.
    ///
    /// Fails with [`Error::RedundantOrEmptyRow`] when the row adds no rank.
    /// On any error the matrix is left exactly as it was.
    pub fn insert_row<K>(&mut self, kernel: &K, row: Vec<u8>) -> Result<usize>
    where
        K: FieldKernel + ?Sized,
    {
        self.insert_row_with(kernel, row, &mut ())
    }

    /// [`insert_row`](Self::insert_row), reporting every row operation to `replay`.
    pub fn insert_row_with<K, R>(
        &mut self,
        kernel: &K,
        row: Vec<u8>,
        replay: &mut R,
    ) -> Result<usize>
    where
        K: FieldKernel + ?Sized,
        R: Replay + ?Sized,
    {
        let placed = self.fold_in(kernel, row, replay);
        if placed.is_err() {
            replay.discard();
        }
        placed
    }

    fn fold_in<K, R>(&mut self, kernel: &K, mut row: Vec<u8>, replay: &mut R) -> Result<usize>
    where
        K: FieldKernel + ?Sized,
        R: Replay + ?Sized,
    {
        if row.len() != self.cols {
            return Err(Error::RowLengthMismatch {
                expected: self.cols,
                actual: row.len(),
            });
        }
        let mut pivot = locate_pivot(&row).ok_or(Error::RedundantOrEmptyRow)?;

        // Only `row` is mutated below; resident rows are read-only, so an
        // early return leaves the matrix untouched.
        let mut index = 0;
        while index < self.rows.len() {
            let resident = &self.rows[index];
            let resident_pivot = match locate_pivot(resident) {
                Some(p) => p,
                None => {
                    error!(
                        "resident row {} of {}x{} matrix has no pivot",
                        index,
                        self.rows.len(),
                        self.cols
                    );
                    return Err(Error::CorruptMatrix {
                        row: index,
                        rows: self.rows.len(),
                        cols: self.cols,
                    });
                }
            };

            if pivot < resident_pivot {
                break;
            }
            if pivot == resident_pivot {
                // resident[pivot] == 1, so this zeroes row[pivot] exactly.
                let scale = row[pivot];
                kernel.mul_slice_xor(scale, resident, &mut row);
                replay.eliminate(index, scale);

                let start = pivot + 1;
                pivot = locate_pivot(&row[start..])
                    .map(|p| p + start)
                    .ok_or(Error::RedundantOrEmptyRow)?;
                trace!("pivot collision at row {}, moved to column {}", index, pivot);
            }
            // The new pivot is strictly right of this row's pivot either way.
            index += 1;
        }

        let scale = kernel.inv(row[pivot]);
        kernel.mul_slice_in_place(scale, &mut row);
        replay.normalize(scale);

        self.rows.insert(index, row);
        replay.place(index);
        debug!(
            "inserted row with pivot {} at {}, rank {}/{}",
            pivot,
            index,
            self.rows.len(),
            self.cols
        );
        Ok(index)
    }

    /// Eliminates every off-diagonal entry, leaving the identity.
    ///
    /// The matrix must be square with row `i` pivoting on column `i`; this
    /// is checked up front and the matrix is untouched if it does not hold.
    pub fn reduce_to_identity<K>(&mut self, kernel: &K) -> Result<()>
    where
        K: FieldKernel + ?Sized,
    {
        self.reduce_to_identity_with(kernel, &mut ())
    }

    /// [`reduce_to_identity`](Self::reduce_to_identity), reporting every row
    /// operation to `replay`.
    pub fn reduce_to_identity_with<K, R>(&mut self, kernel: &K, replay: &mut R) -> Result<()>
    where
        K: FieldKernel + ?Sized,
        R: Replay + ?Sized,
    {
        self.check_diagonal()?;

        let n = self.rows.len();
        for i in 0..n {
            // Clearing column j may dirty columns > j of row i; those are
            // cleared as j advances.
            for j in (i + 1)..n {
                let scale = self.rows[i][j];
                if scale == 0 {
                    continue;
                }
                let (head, tail) = self.rows.split_at_mut(j);
                kernel.mul_slice_xor(scale, &tail[0], &mut head[i]);
                replay.reduce(i, j, scale);
            }
        }
        debug!("reduced {}x{} matrix to identity", n, n);
        Ok(())
    }

    fn check_diagonal(&self) -> Result<()> {
        if self.rows.len() != self.cols {
            return Err(Error::NotSquare {
                rows: self.rows.len(),
                cols: self.cols,
            });
        }
        for (i, row) in self.rows.iter().enumerate() {
            match locate_pivot(row) {
                Some(p) if p != i => return Err(Error::PivotOutOfPlace { row: i, pivot: p }),
                Some(p) if row[p] == 1 => {}
                _ => {
                    error!(
                        "row {} of {}x{} matrix has no unit pivot",
                        i,
                        self.rows.len(),
                        self.cols
                    );
                    return Err(Error::CorruptMatrix {
                        row: i,
                        rows: self.rows.len(),
                        cols: self.cols,
                    });
                }
            }
        }
        Ok(())
    }

    /// Left-multiplies the matrix by `vector`: `vector^T * self`.
    pub fn transform<K>(&self, kernel: &K, vector: &[u8]) -> Result<Vec<u8>>
    where
        K: FieldKernel + ?Sized,
    {
        if vector.len() != self.rows.len() {
            return Err(Error::DimensionMismatch {
                vector: vector.len(),
                rows: self.rows.len(),
            });
        }
        let mut out = vec![0u8; self.cols];
        for (row, &v) in self.rows.iter().zip(vector) {
            kernel.mul_slice_xor(v, row, &mut out);
        }
        Ok(out)
    }
}

/// Left-multiplies `rows` by `vector`: `out[i] = XOR_j rows[j][i] * vector[j]`.
///
/// Works for any matrix, not only echelon ones. Applied to a reduced
/// coefficient matrix it recovers the source values; applied to a set of
/// source symbols it yields their coded combination.
pub fn transform<K, R>(kernel: &K, vector: &[u8], rows: &[R]) -> Result<Vec<u8>>
where
    K: FieldKernel + ?Sized,
    R: AsRef<[u8]>,
{
    if vector.len() != rows.len() {
        return Err(Error::DimensionMismatch {
            vector: vector.len(),
            rows: rows.len(),
        });
    }
    let cols = rows.first().map_or(0, |r| r.as_ref().len());
    let mut out = vec![0u8; cols];
    for (row, &v) in rows.iter().zip(vector) {
        let row = row.as_ref();
        if row.len() != cols {
            return Err(Error::RowLengthMismatch {
                expected: cols,
                actual: row.len(),
            });
        }
        kernel.mul_slice_xor(v, row, &mut out);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fec::gf_tables::{KernelKind, TableKernel};

    fn assert_rref(m: &RrefMatrix) {
        let pivots = m.pivots();
        assert_eq!(pivots.len(), m.rank(), "zero row in matrix");
        for w in pivots.windows(2) {
            assert!(w[0] < w[1], "pivots not strictly ascending: {pivots:?}");
        }
        for (row, &p) in m.rows().iter().zip(&pivots) {
            assert_eq!(row[p], 1);
        }
    }

    #[test]
    fn pivot_of_zero_row_is_none() {
        assert_eq!(locate_pivot(&[0, 0, 0]), None);
        assert_eq!(locate_pivot(&[]), None);
        assert_eq!(locate_pivot(&[0, 0, 7, 1]), Some(2));
        assert_eq!(locate_pivot(&[9]), Some(0));
    }

    #[test]
    fn insert_orders_rows_by_pivot() {
        let k = TableKernel;
        let mut m = RrefMatrix::new(4);
        assert_eq!(m.insert_row(&k, vec![0, 0, 3, 1]).unwrap(), 0);
        assert_eq!(m.insert_row(&k, vec![0, 5, 0, 0]).unwrap(), 0);
        assert_eq!(m.insert_row(&k, vec![0, 0, 0, 2]).unwrap(), 2);
        assert_eq!(m.pivots(), vec![1, 2, 3]);
        assert_rref(&m);
    }

    #[test]
    fn collision_pushes_pivot_right() {
        let k = TableKernel;
        let mut m = RrefMatrix::new(3);
        m.insert_row(&k, vec![1, 1, 0]).unwrap();
        // [1,0,1] ^ [1,1,0] = [0,1,1]
        assert_eq!(m.insert_row(&k, vec![1, 0, 1]).unwrap(), 1);
        assert_eq!(m.row(1).unwrap(), &[0, 1, 1]);
        assert_rref(&m);
    }

    #[test]
    fn normalizes_pivot_to_one() {
        let k = TableKernel;
        let mut m = RrefMatrix::new(2);
        m.insert_row(&k, vec![0, 0x53]).unwrap();
        assert_eq!(m.row(0).unwrap(), &[0, 1]);
        m.insert_row(&k, vec![7, 7]).unwrap();
        assert_eq!(m.row(0).unwrap(), &[1, 1]);
    }

    #[test]
    fn zero_row_is_redundant() {
        let mut m = RrefMatrix::new(3);
        let err = m.insert_row(&TableKernel, vec![0, 0, 0]).unwrap_err();
        assert!(matches!(err, Error::RedundantOrEmptyRow));
        assert!(err.is_recoverable());
        assert!(m.is_empty());
    }

    #[test]
    fn wrong_length_is_rejected() {
        let mut m = RrefMatrix::new(3);
        let err = m.insert_row(&TableKernel, vec![1, 0]).unwrap_err();
        assert!(matches!(
            err,
            Error::RowLengthMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn resident_zero_row_is_corruption() {
        let mut m = RrefMatrix {
            cols: 3,
            rows: vec![vec![0, 0, 0]],
        };
        let err = m.insert_row(&TableKernel, vec![0, 1, 0]).unwrap_err();
        assert!(matches!(
            err,
            Error::CorruptMatrix {
                row: 0,
                rows: 1,
                cols: 3
            }
        ));
        assert!(!err.is_recoverable());
        assert_eq!(m.rank(), 1);
    }

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl Replay for Recorder {
        fn eliminate(&mut self, resident: usize, scale: u8) {
            self.0.push(format!("eliminate {resident} {scale}"));
        }
        fn normalize(&mut self, scale: u8) {
            self.0.push(format!("normalize {scale}"));
        }
        fn place(&mut self, index: usize) {
            self.0.push(format!("place {index}"));
        }
        fn discard(&mut self) {
            self.0.push("discard".into());
        }
        fn reduce(&mut self, target: usize, source: usize, scale: u8) {
            self.0.push(format!("reduce {target} {source} {scale}"));
        }
    }

    #[test]
    fn replay_sees_every_operation() {
        let k = TableKernel;
        let mut m = RrefMatrix::new(2);
        let mut rec = Recorder::default();
        m.insert_row_with(&k, vec![1, 1], &mut rec).unwrap();
        m.insert_row_with(&k, vec![1, 2], &mut rec).unwrap();
        m.insert_row_with(&k, vec![3, 2], &mut rec).unwrap_err();
        m.reduce_to_identity_with(&k, &mut rec).unwrap();
        // [0,3] is scaled by the inverse of 3
        let normalize_second = format!("normalize {}", k.inv(3));
        assert_eq!(
            rec.0,
            vec![
                "normalize 1",
                "place 0",
                "eliminate 0 1",
                normalize_second.as_str(),
                "place 1",
                "eliminate 0 3",
                "eliminate 1 1",
                "discard",
                "reduce 0 1 1",
            ]
        );
        assert_eq!(m, RrefMatrix::identity(2));
    }

    #[test]
    fn reduce_rejects_non_square() {
        let k = TableKernel;
        let mut m = RrefMatrix::new(3);
        m.insert_row(&k, vec![1, 2, 3]).unwrap();
        let before = m.clone();
        assert!(matches!(
            m.reduce_to_identity(&k),
            Err(Error::NotSquare { rows: 1, cols: 3 })
        ));
        assert_eq!(m, before);
    }

    #[test]
    fn reduce_rejects_misplaced_pivot() {
        let mut m = RrefMatrix {
            cols: 2,
            rows: vec![vec![0, 1], vec![0, 1]],
        };
        assert!(matches!(
            m.reduce_to_identity(&TableKernel),
            Err(Error::PivotOutOfPlace { row: 0, pivot: 1 })
        ));
    }

    #[test]
    fn reduce_of_empty_matrix_is_noop() {
        let mut m = RrefMatrix::new(0);
        m.reduce_to_identity(&TableKernel).unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn transform_of_zero_rows() {
        let m = RrefMatrix::new(3);
        assert_eq!(m.transform(&TableKernel, &[]).unwrap(), vec![0, 0, 0]);
        assert!(matches!(
            m.transform(&TableKernel, &[1]),
            Err(Error::DimensionMismatch { vector: 1, rows: 0 })
        ));
        let none: [Vec<u8>; 0] = [];
        assert!(matches!(
            transform(&TableKernel, &[4], &none),
            Err(Error::DimensionMismatch { vector: 1, rows: 0 })
        ));
        assert!(transform(&TableKernel, &[], &none).unwrap().is_empty());
    }

    #[test]
    fn transform_rejects_ragged_rows() {
        let rows = vec![vec![1u8, 2], vec![3u8]];
        assert!(matches!(
            transform(&TableKernel, &[1, 1], &rows),
            Err(Error::RowLengthMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn every_kernel_builds_the_same_matrix() {
        let rows = [
            vec![0x10, 0x22, 0x00, 0x9c],
            vec![0x03, 0xa1, 0x55, 0x00],
            vec![0x00, 0x00, 0x77, 0x01],
            vec![0xfe, 0x01, 0x02, 0x03],
        ];
        let mut results = Vec::new();
        for kind in KernelKind::ALL {
            let kernel = kind.build();
            let mut m = RrefMatrix::new(4);
            for r in &rows {
                m.insert_row(&*kernel, r.clone()).unwrap();
            }
            assert_rref(&m);
            results.push(m);
        }
        assert_eq!(results[0], results[1]);
        assert_eq!(results[0], results[2]);
    }
}
