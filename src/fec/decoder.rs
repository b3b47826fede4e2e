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

//! Decoding session: one coefficient matrix plus the payloads riding on its rows.

use super::gf_tables::FieldKernel;
use super::rref::{Replay, RrefMatrix};
use crate::config::DecoderConfig;
use crate::error::{Error, Result};
use log::{debug, info};

/// A received combination of source symbols: `payload = sum(coefficients[i] * source[i])`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodedSymbol {
    pub coefficients: Vec<u8>,
    pub payload: Vec<u8>,
}

impl CodedSymbol {
    pub fn new(coefficients: Vec<u8>, payload: Vec<u8>) -> Self {
        Self {
            coefficients,
            payload,
        }
    }

    /// An uncoded source symbol: the unit row for `index`.
    pub fn systematic(index: usize, symbols: usize, payload: Vec<u8>) -> Self {
        let mut coefficients = vec![0u8; symbols];
        if let Some(c) = coefficients.get_mut(index) {
            *c = 1;
        }
        Self {
            coefficients,
            payload,
        }
    }
}

/// What a single [`Decoder::add_symbol`] call achieved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    /// Rank grew to `rank`.
    Innovative { rank: usize },
    /// Nothing new; the symbol was dropped.
    Redundant,
    /// Rank reached the symbol count; [`Decoder::decode`] will succeed.
    Complete,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecoderStats {
    pub received: u64,
    pub innovative: u64,
    pub redundant: u64,
}

/// Mirrors the coefficient row operations onto the payloads.
struct PayloadReplay<'a> {
    kernel: &'a dyn FieldKernel,
    payloads: &'a mut Vec<Vec<u8>>,
    pending: Option<Vec<u8>>,
}

impl Replay for PayloadReplay<'_> {
    fn eliminate(&mut self, resident: usize, scale: u8) {
        if let Some(pending) = self.pending.as_mut() {
            self.kernel
                .mul_slice_xor(scale, &self.payloads[resident], pending);
        }
    }

    fn normalize(&mut self, scale: u8) {
        if let Some(pending) = self.pending.as_mut() {
            self.kernel.mul_slice_in_place(scale, pending);
        }
    }

    fn place(&mut self, index: usize) {
        if let Some(pending) = self.pending.take() {
            self.payloads.insert(index, pending);
        }
    }

    fn discard(&mut self) {
        self.pending = None;
    }

    fn reduce(&mut self, target: usize, source: usize, scale: u8) {
        // Identity reduction only ever folds a later row into an earlier one.
        debug_assert!(target < source);
        let (head, tail) = self.payloads.split_at_mut(source);
        self.kernel.mul_slice_xor(scale, &tail[0], &mut head[target]);
    }
}

/// Recovers `symbols` source symbols of `symbol_len` bytes each from any
/// `symbols` linearly independent coded symbols.
pub struct Decoder {
    symbols: usize,
    symbol_len: usize,
    kernel: Box<dyn FieldKernel>,
    matrix: RrefMatrix,
    payloads: Vec<Vec<u8>>,
    reduced: bool,
    stats: DecoderStats,
}

impl Decoder {
    pub fn new(symbols: usize, symbol_len: usize, kernel: Box<dyn FieldKernel>) -> Self {
        debug!(
            "decoder for {} symbols of {} bytes using {} kernel",
            symbols,
            symbol_len,
            kernel.name()
        );
        Self {
            symbols,
            symbol_len,
            kernel,
            matrix: RrefMatrix::new(symbols),
            payloads: Vec::with_capacity(symbols),
            reduced: false,
            stats: DecoderStats::default(),
        }
    }

    pub fn from_config(config: &DecoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            config.symbols,
            config.symbol_len,
            config.kernel.build(),
        ))
    }

    pub fn symbols(&self) -> usize {
        self.symbols
    }

    pub fn symbol_len(&self) -> usize {
        self.symbol_len
    }

    pub fn rank(&self) -> usize {
        self.matrix.rank()
    }

    pub fn is_complete(&self) -> bool {
        self.matrix.rank() == self.symbols
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// The coefficient matrix as it currently stands.
    pub fn matrix(&self) -> &RrefMatrix {
        &self.matrix
    }

    /// Folds a received symbol into the session.
    ///
    /// Linearly dependent symbols are counted and dropped, not reported as
    /// errors. Malformed symbols are rejected before they touch any state.
    pub fn add_symbol(&mut self, symbol: CodedSymbol) -> Result<Progress> {
        if symbol.coefficients.len() != self.symbols {
            return Err(Error::RowLengthMismatch {
                expected: self.symbols,
                actual: symbol.coefficients.len(),
            });
        }
        if symbol.payload.len() != self.symbol_len {
            return Err(Error::PayloadLengthMismatch {
                expected: self.symbol_len,
                actual: symbol.payload.len(),
            });
        }
        self.stats.received += 1;

        if self.is_complete() {
            self.stats.redundant += 1;
            debug!("symbol received after completion, dropped");
            return Ok(Progress::Redundant);
        }

        let mut replay = PayloadReplay {
            kernel: &*self.kernel,
            payloads: &mut self.payloads,
            pending: Some(symbol.payload),
        };
        match self
            .matrix
            .insert_row_with(&*self.kernel, symbol.coefficients, &mut replay)
        {
            Ok(_) => {
                self.stats.innovative += 1;
                if self.is_complete() {
                    info!("rank {} reached, ready to decode", self.symbols);
                    Ok(Progress::Complete)
                } else {
                    Ok(Progress::Innovative {
                        rank: self.matrix.rank(),
                    })
                }
            }
            Err(Error::RedundantOrEmptyRow) => {
                self.stats.redundant += 1;
                debug!("redundant symbol dropped at rank {}", self.matrix.rank());
                Ok(Progress::Redundant)
            }
            Err(e) => Err(e),
        }
    }

    /// Returns the source symbols in index order.
    ///
    /// The first call reduces the matrix to the identity; later calls
    /// return the same symbols without further work.
    pub fn decode(&mut self) -> Result<Vec<Vec<u8>>> {
        if !self.is_complete() {
            return Err(Error::Incomplete {
                rank: self.matrix.rank(),
                needed: self.symbols,
            });
        }
        if !self.reduced {
            let mut replay = PayloadReplay {
                kernel: &*self.kernel,
                payloads: &mut self.payloads,
                pending: None,
            };
            self.matrix
                .reduce_to_identity_with(&*self.kernel, &mut replay)?;
            self.reduced = true;
        }
        Ok(self.payloads.clone())
    }
}
