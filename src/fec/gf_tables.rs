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

use serde::{Deserialize, Serialize};

// --- GF(2^8) Table Generation ---

const GF_ORDER: usize = 256;
const IRREDUCIBLE_POLY: u16 = 0x11D; // x^8 + x^4 + x^3 + x^2 + 1, generator 2

static LOG_TABLE: [u8; GF_ORDER] = build_log_table();
static EXP_TABLE: [u8; GF_ORDER * 2] = build_exp_table();
static MUL_TABLE: [[u8; GF_ORDER]; GF_ORDER] = build_mul_table();

/// `EXP_TABLE[i] = 2^i`, mirrored past 255 so `EXP_TABLE[log a + log b]`
/// never needs a modular reduction.
const fn build_exp_table() -> [u8; GF_ORDER * 2] {
    let mut table = [0u8; GF_ORDER * 2];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < 255 {
        table[i] = x as u8;
        table[i + 255] = x as u8;
        x <<= 1;
        if x >= 256 {
            x ^= IRREDUCIBLE_POLY;
        }
        i += 1;
    }
    table
}

/// `LOG_TABLE[2^i] = i`. `LOG_TABLE[0]` is unused.
const fn build_log_table() -> [u8; GF_ORDER] {
    let mut table = [0u8; GF_ORDER];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < 255 {
        table[x as usize] = i as u8;
        x <<= 1;
        if x >= 256 {
            x ^= IRREDUCIBLE_POLY;
        }
        i += 1;
    }
    table
}

const fn build_mul_table() -> [[u8; GF_ORDER]; GF_ORDER] {
    let exp = build_exp_table();
    let log = build_log_table();
    let mut table = [[0u8; GF_ORDER]; GF_ORDER];
    let mut a = 1;
    while a < GF_ORDER {
        let log_a = log[a] as usize;
        let mut b = 1;
        while b < GF_ORDER {
            table[a][b] = exp[log_a + log[b] as usize];
            b += 1;
        }
        a += 1;
    }
    table
}

#[inline(always)]
pub(crate) fn gf_mul_table(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    let log_a = LOG_TABLE[a as usize] as usize;
    let log_b = LOG_TABLE[b as usize] as usize;
    EXP_TABLE[log_a + log_b]
}

#[inline(always)]
fn gf_mul_shift(mut a: u8, mut b: u8) -> u8 {
    let mut res = 0u8;
    while b != 0 {
        if b & 1 != 0 {
            res ^= a;
        }
        let carry = a & 0x80;
        a <<= 1;
        if carry != 0 {
            a ^= IRREDUCIBLE_POLY as u8;
        }
        b >>= 1;
    }
    res
}

/// Computes the multiplicative inverse of `a` in GF(2^8).
///
/// Zero has no inverse and maps to zero.
#[inline(always)]
pub(crate) fn gf_inv(a: u8) -> u8 {
    if a == 0 {
        return 0;
    }
    EXP_TABLE[255 - LOG_TABLE[a as usize] as usize]
}

// --- Kernel Strategies ---

/// A GF(2^8) arithmetic strategy.
///
/// Every matrix operation takes its kernel as an explicit argument, so
/// several decoding sessions with different strategies can run side by
/// side without sharing any state.
pub trait FieldKernel: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Multiplies two field elements.
    fn mul(&self, a: u8, b: u8) -> u8;

    /// Multiplicative inverse of a non-zero element.
    fn inv(&self, a: u8) -> u8 {
        debug_assert_ne!(a, 0, "inverse of 0 is undefined in GF(2^8)");
        gf_inv(a)
    }

    /// `dst[i] = c * src[i]`.
    fn mul_slice(&self, c: u8, src: &[u8], dst: &mut [u8]) {
        debug_assert_eq!(src.len(), dst.len());
        match c {
            0 => dst.iter_mut().for_each(|d| *d = 0),
            1 => dst.copy_from_slice(src),
            _ => {
                for (d, &s) in dst.iter_mut().zip(src) {
                    *d = self.mul(c, s);
                }
            }
        }
    }

    /// `buf[i] = c * buf[i]`.
    fn mul_slice_in_place(&self, c: u8, buf: &mut [u8]) {
        match c {
            0 => buf.iter_mut().for_each(|b| *b = 0),
            1 => {}
            _ => buf.iter_mut().for_each(|b| *b = self.mul(c, *b)),
        }
    }

    /// `dst[i] ^= c * src[i]`.
    fn mul_slice_xor(&self, c: u8, src: &[u8], dst: &mut [u8]) {
        debug_assert_eq!(src.len(), dst.len());
        match c {
            0 => {}
            1 => {
                for (d, &s) in dst.iter_mut().zip(src) {
                    *d ^= s;
                }
            }
            _ => {
                for (d, &s) in dst.iter_mut().zip(src) {
                    *d ^= self.mul(c, s);
                }
            }
        }
    }
}

/// Log/exp table multiplication.
#[derive(Clone, Copy, Debug, Default)]
pub struct TableKernel;

impl FieldKernel for TableKernel {
    fn name(&self) -> &'static str {
        "table"
    }

    #[inline(always)]
    fn mul(&self, a: u8, b: u8) -> u8 {
        gf_mul_table(a, b)
    }

    fn mul_slice_xor(&self, c: u8, src: &[u8], dst: &mut [u8]) {
        debug_assert_eq!(src.len(), dst.len());
        if c == 0 {
            return;
        }
        let log_c = LOG_TABLE[c as usize] as usize;
        for (d, &s) in dst.iter_mut().zip(src) {
            if s != 0 {
                *d ^= EXP_TABLE[log_c + LOG_TABLE[s as usize] as usize];
            }
        }
    }
}

/// Full 256x256 product table. One lookup per element at the cost of 64 KiB.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProductKernel;

impl FieldKernel for ProductKernel {
    fn name(&self) -> &'static str {
        "product"
    }

    #[inline(always)]
    fn mul(&self, a: u8, b: u8) -> u8 {
        MUL_TABLE[a as usize][b as usize]
    }

    fn mul_slice(&self, c: u8, src: &[u8], dst: &mut [u8]) {
        debug_assert_eq!(src.len(), dst.len());
        let row = &MUL_TABLE[c as usize];
        for (d, &s) in dst.iter_mut().zip(src) {
            *d = row[s as usize];
        }
    }

    fn mul_slice_in_place(&self, c: u8, buf: &mut [u8]) {
        let row = &MUL_TABLE[c as usize];
        buf.iter_mut().for_each(|b| *b = row[*b as usize]);
    }

    fn mul_slice_xor(&self, c: u8, src: &[u8], dst: &mut [u8]) {
        debug_assert_eq!(src.len(), dst.len());
        if c == 0 {
            return;
        }
        let row = &MUL_TABLE[c as usize];
        for (d, &s) in dst.iter_mut().zip(src) {
            *d ^= row[s as usize];
        }
    }
}

/// Carry-less shift-and-add. Needs no tables at all, including for the
/// inverse, which is computed as `a^254`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShiftKernel;

impl FieldKernel for ShiftKernel {
    fn name(&self) -> &'static str {
        "shift"
    }

    #[inline(always)]
    fn mul(&self, a: u8, b: u8) -> u8 {
        gf_mul_shift(a, b)
    }

    fn inv(&self, a: u8) -> u8 {
        debug_assert_ne!(a, 0, "inverse of 0 is undefined in GF(2^8)");
        let mut result = 1u8;
        let mut base = a;
        let mut power = 254u32;
        while power > 0 {
            if power & 1 != 0 {
                result = gf_mul_shift(result, base);
            }
            base = gf_mul_shift(base, base);
            power >>= 1;
        }
        result
    }
}

/// Selects a [`FieldKernel`] strategy, e.g. from configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelKind {
    #[default]
    Table,
    Product,
    Shift,
}

impl KernelKind {
    pub const ALL: [KernelKind; 3] = [KernelKind::Table, KernelKind::Product, KernelKind::Shift];

    pub fn build(self) -> Box<dyn FieldKernel> {
        match self {
            KernelKind::Table => Box::new(TableKernel),
            KernelKind::Product => Box::new(ProductKernel),
            KernelKind::Shift => Box::new(ShiftKernel),
        }
    }
}
