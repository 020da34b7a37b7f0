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

//! Key hashing for sketches.
//!
//! Sketch rows derive their column indices from a single 64-bit hash of the
//! key bytes, split into two 32-bit halves and combined per row as
//! `h1 + i * h2` (Kirsch-Mitzenmacher double hashing). The [`KeyHasher`]
//! trait is the seam: production code uses [`XxHash64KeyHasher`], tests can
//! substitute a hasher that forces collisions.

mod xxhash;

pub use xxhash::hash64;
pub use xxhash::hash64_with_seed;

/// Maps key bytes to two independent-looking 32-bit hash values.
///
/// Implementations must be deterministic: the same key bytes always produce
/// the same pair, which is what keeps queries stable across runs.
pub trait KeyHasher {
    /// Returns the `(h1, h2)` pair for `key`.
    fn hash_pair(&self, key: &[u8]) -> (u32, u32);
}

/// Default [`KeyHasher`] backed by one xxhash64 evaluation per key.
///
/// The low half of the 64-bit hash becomes `h1`, the high half `h2`.
#[derive(Debug, Default, Clone, Copy)]
pub struct XxHash64KeyHasher;

impl KeyHasher for XxHash64KeyHasher {
    fn hash_pair(&self, key: &[u8]) -> (u32, u32) {
        let hash = hash64(key);
        ((hash & 0xffff_ffff) as u32, (hash >> 32) as u32)
    }
}

#[inline]
pub(crate) fn read_u64_le(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(raw)
}

#[inline]
pub(crate) fn read_u32_le(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(raw)
}
