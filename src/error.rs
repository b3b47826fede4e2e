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

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("row is empty or linearly dependent on the matrix")]
    RedundantOrEmptyRow,
    #[error("resident row {row} of {rows}x{cols} matrix violates the echelon invariants")]
    CorruptMatrix { row: usize, rows: usize, cols: usize },
    #[error("vector length {vector} must match matrix height {rows}")]
    DimensionMismatch { vector: usize, rows: usize },
    #[error("row has {actual} entries, matrix has {expected} columns")]
    RowLengthMismatch { expected: usize, actual: usize },
    #[error("payload has {actual} bytes, expected {expected}")]
    PayloadLengthMismatch { expected: usize, actual: usize },
    #[error("matrix is {rows}x{cols}, identity reduction needs a square matrix")]
    NotSquare { rows: usize, cols: usize },
    #[error("row {row} has its pivot in column {pivot}")]
    PivotOutOfPlace { row: usize, pivot: usize },
    #[error("rank {rank} of {needed} reached, not enough to decode")]
    Incomplete { rank: usize, needed: usize },
    #[error("invalid config: {0}")]
    Config(String),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// `RedundantOrEmptyRow` is ordinary control flow for a streaming
    /// decoder: drop the row and keep going. Everything else is a defect
    /// at the call site or inside the matrix.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::RedundantOrEmptyRow)
    }
}

impl From<&'static str> for Error {
    fn from(s: &'static str) -> Self {
        Error::Config(s.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
