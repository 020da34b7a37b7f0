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

use super::read_u32_le;
use super::read_u64_le;

const DEFAULT_SEED: u64 = 0;

// Unsigned 64-bit primes from xxhash64.
const P1: u64 = 0x9E3779B185EBCA87;
const P2: u64 = 0xC2B2AE3D27D4EB4F;
const P3: u64 = 0x165667B19E3779F9;
const P4: u64 = 0x85EBCA77C2B2AE63;
const P5: u64 = 0x27D4EB2F165667C5;

/// Hashes `data` with the default seed.
///
/// XxHash64 is a fast, non-cryptographic, 64-bit hash function with
/// excellent avalanche and 2-way bit independence properties. Sketch keys
/// are complete byte slices, so the whole input is consumed in one pass.
pub fn hash64(data: &[u8]) -> u64 {
    hash64_with_seed(data, DEFAULT_SEED)
}

/// Hashes `data` with an explicit seed.
pub fn hash64_with_seed(data: &[u8], seed: u64) -> u64 {
    let mut tail = data;

    let mut hash = if data.len() >= 32 {
        let mut v1 = seed.wrapping_add(P1).wrapping_add(P2);
        let mut v2 = seed.wrapping_add(P2);
        let mut v3 = seed;
        let mut v4 = seed.wrapping_sub(P1);

        let mut chunks = data.chunks_exact(32);
        for chunk in &mut chunks {
            v1 = round(v1, read_u64_le(&chunk[0..8]));
            v2 = round(v2, read_u64_le(&chunk[8..16]));
            v3 = round(v3, read_u64_le(&chunk[16..24]));
            v4 = round(v4, read_u64_le(&chunk[24..32]));
        }
        tail = chunks.remainder();

        let mut acc = v1
            .rotate_left(1)
            .wrapping_add(v2.rotate_left(7))
            .wrapping_add(v3.rotate_left(12))
            .wrapping_add(v4.rotate_left(18));
        acc = merge_round(acc, v1);
        acc = merge_round(acc, v2);
        acc = merge_round(acc, v3);
        acc = merge_round(acc, v4);
        acc
    } else {
        seed.wrapping_add(P5)
    };

    hash = hash.wrapping_add(data.len() as u64);

    let mut idx = 0;
    while idx + 8 <= tail.len() {
        let mut k1 = read_u64_le(&tail[idx..idx + 8]);
        k1 = k1.wrapping_mul(P2);
        k1 = k1.rotate_left(31);
        k1 = k1.wrapping_mul(P1);
        hash ^= k1;
        hash = hash.rotate_left(27).wrapping_mul(P1).wrapping_add(P4);
        idx += 8;
    }

    if idx + 4 <= tail.len() {
        let k1 = read_u32_le(&tail[idx..idx + 4]) as u64;
        hash ^= k1.wrapping_mul(P1);
        hash = hash.rotate_left(23).wrapping_mul(P2).wrapping_add(P3);
        idx += 4;
    }

    while idx < tail.len() {
        let k1 = tail[idx] as u64;
        hash ^= k1.wrapping_mul(P5);
        hash = hash.rotate_left(11).wrapping_mul(P1);
        idx += 1;
    }

    finalize(hash)
}

#[inline]
fn round(mut acc: u64, input: u64) -> u64 {
    acc = acc.wrapping_add(input.wrapping_mul(P2));
    acc = acc.rotate_left(31);
    acc.wrapping_mul(P1)
}

#[inline]
fn merge_round(mut acc: u64, val: u64) -> u64 {
    let mut v = val;
    v = v.wrapping_mul(P2);
    v = v.rotate_left(31);
    v = v.wrapping_mul(P1);
    acc ^= v;
    acc.wrapping_mul(P1).wrapping_add(P4)
}

#[inline]
fn finalize(mut hash: u64) -> u64 {
    hash ^= hash >> 33;
    hash = hash.wrapping_mul(P2);
    hash ^= hash >> 29;
    hash = hash.wrapping_mul(P3);
    hash ^ (hash >> 32)
}
