// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::fmt;

/// A fixed-width unsigned register cell.
///
/// One generic sketch serves all three widths; the trait captures the small
/// capability set the algorithm needs: comparison, bounded increment, u64
/// conversion for the accept-probability math, and the little-endian codec
/// hooks for serialization.
pub trait Register: Copy + Ord + Eq + Default + fmt::Debug + 'static {
    /// Number of value bits in the register.
    const BITS: u8;

    /// Serialized size in bytes.
    const SIZE_BYTES: usize;

    /// Largest stage the register can hold.
    const MAX_STAGE: Self;

    /// Logarithm base used by [`with_defaults`], matching the stock tuning
    /// historically shipped for this register width.
    ///
    /// [`with_defaults`]: super::CountMinLogSketch::with_defaults
    const DEFAULT_EXP: f64;

    /// Widens the stage for floating-point math.
    fn as_u64(self) -> u64;

    /// Narrows `value` into a register. Callers guarantee `value` fits.
    fn from_u64(value: u64) -> Self;

    /// The next stage up. Callers guarantee the register is below its cap.
    fn next_stage(self) -> Self;

    /// Appends the register to `out` in little-endian order.
    fn extend_le(self, out: &mut Vec<u8>);

    /// Reads a register from exactly [`Self::SIZE_BYTES`] bytes.
    fn from_le_slice(bytes: &[u8]) -> Self;
}

impl Register for u8 {
    const BITS: u8 = 8;
    const SIZE_BYTES: usize = 1;
    const MAX_STAGE: Self = u8::MAX;
    const DEFAULT_EXP: f64 = 1.5;

    fn as_u64(self) -> u64 {
        self as u64
    }

    fn from_u64(value: u64) -> Self {
        value as u8
    }

    fn next_stage(self) -> Self {
        self + 1
    }

    fn extend_le(self, out: &mut Vec<u8>) {
        out.push(self);
    }

    fn from_le_slice(bytes: &[u8]) -> Self {
        bytes[0]
    }
}

impl Register for u16 {
    const BITS: u8 = 16;
    const SIZE_BYTES: usize = 2;
    const MAX_STAGE: Self = u16::MAX;
    const DEFAULT_EXP: f64 = 1.00026;

    fn as_u64(self) -> u64 {
        self as u64
    }

    fn from_u64(value: u64) -> Self {
        value as u16
    }

    fn next_stage(self) -> Self {
        self + 1
    }

    fn extend_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn from_le_slice(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 2];
        raw.copy_from_slice(bytes);
        u16::from_le_bytes(raw)
    }
}

impl Register for u32 {
    const BITS: u8 = 32;
    const SIZE_BYTES: usize = 4;
    const MAX_STAGE: Self = u32::MAX;
    const DEFAULT_EXP: f64 = 1.00026;

    fn as_u64(self) -> u64 {
        self as u64
    }

    fn from_u64(value: u64) -> Self {
        value as u32
    }

    fn next_stage(self) -> Self {
        self + 1
    }

    fn extend_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn from_le_slice(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(bytes);
        u32::from_le_bytes(raw)
    }
}
