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

//! Binary encoding of the register grid.
//!
//! The wire layout is little-endian: a 1-byte serial version, then `width`
//! as u32, `depth` as u32, `exp` as an IEEE-754 bit pattern, then the store
//! row-major with natively packed registers. Decoding also accepts the
//! legacy layout, which is the same sequence without the version byte.
//! Neither layout carries a register-width marker: the caller selects the
//! matching decoder through the register type.

use crate::cml::register::Register;
use crate::cml::sketch::CountMinLogSketch;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::hash::KeyHasher;

pub(super) const SERIAL_VERSION: u8 = 1;
pub(super) const HEADER_SIZE_BYTES: usize = 16;

struct DecodedState<R> {
    width: usize,
    depth: usize,
    exp: f64,
    store: Vec<R>,
}

impl<R: Register, H: KeyHasher> CountMinLogSketch<R, H> {
    /// Serializes the sketch into the versioned binary layout.
    ///
    /// Policy flags and the stream total are runtime configuration, not part
    /// of the wire format.
    ///
    /// # Examples
    ///
    /// ```
    /// use countminlog::cml::CountMinLogSketch16;
    ///
    /// let mut sketch = CountMinLogSketch16::new(32, 3, 1.00026).unwrap();
    /// sketch.bulk_update(b"key", 100);
    ///
    /// let bytes = sketch.serialize();
    /// assert_eq!(bytes.len(), 1 + 16 + 32 * 3 * 2);
    ///
    /// let restored = CountMinLogSketch16::deserialize(&bytes).unwrap();
    /// assert_eq!(restored.query(b"key"), sketch.query(b"key"));
    /// ```
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = SketchBytes::with_capacity(
            1 + HEADER_SIZE_BYTES + self.store.len() * R::SIZE_BYTES,
        );
        bytes.write_u8(SERIAL_VERSION);
        bytes.write_u32_le(self.width as u32);
        bytes.write_u32_le(self.depth as u32);
        bytes.write_f64_le(self.exp);

        let mut bytes = bytes.into_bytes();
        for &cell in &self.store {
            cell.extend_le(&mut bytes);
        }
        bytes
    }

    /// Deserializes a sketch from either the versioned or the legacy layout.
    ///
    /// The decoded sketch carries the default policies and a freshly seeded
    /// generator; it is query-equivalent to the serialized one, but future
    /// updates draw from the decoder's generator.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error>
    where
        H: Default,
    {
        let state = decode_state::<R>(bytes)?;
        let mut sketch = CountMinLogSketch::<R>::builder()
            .width(state.width)
            .depth(state.depth)
            .exp(state.exp)
            .hasher(H::default())
            .build()?;
        sketch.store = state.store;
        Ok(sketch)
    }

    /// Replaces this sketch's dimensions, base, and registers with the
    /// decoded state, keeping the configured policies, hasher, and generator.
    ///
    /// The wire format carries no register cap, so the cap returns to the
    /// full register range. On failure the receiver is left unchanged.
    pub fn load(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let state = decode_state::<R>(bytes)?;
        if state.exp <= 1.0 || state.exp.is_nan() {
            return Err(Error::invalid_argument("exp must be > 1.0").with_context("exp", state.exp));
        }

        self.width = state.width;
        self.depth = state.depth;
        self.exp = state.exp;
        self.log_exp = state.exp.ln();
        self.c_max = R::MAX_STAGE;
        self.total_count = 0;
        self.store = state.store;
        Ok(())
    }
}

fn decode_state<R: Register>(bytes: &[u8]) -> Result<DecodedState<R>, Error> {
    if bytes.len() < HEADER_SIZE_BYTES {
        return Err(Error::insufficient_data("header")
            .with_context("minimum_bytes", HEADER_SIZE_BYTES)
            .with_context("actual_bytes", bytes.len()));
    }

    // Prefer the versioned layout; an exact length match disambiguates it
    // from legacy data whose width happens to start with the version byte.
    if bytes[0] == SERIAL_VERSION && bytes.len() > HEADER_SIZE_BYTES {
        if let Some(state) = decode_grid::<R>(&bytes[1..])? {
            return Ok(state);
        }
    }
    match decode_grid::<R>(bytes)? {
        Some(state) => Ok(state),
        None => {
            let mut cursor = SketchSlice::new(bytes);
            let width = cursor
                .read_u32_le()
                .map_err(|err| Error::insufficient_data("width").set_source(err))?;
            let depth = cursor
                .read_u32_le()
                .map_err(|err| Error::insufficient_data("depth").set_source(err))?;
            if width == 0 || depth == 0 {
                return Err(Error::new(
                    ErrorKind::MalformedDeserializeData,
                    "width and depth must be positive",
                )
                .with_context("width", width)
                .with_context("depth", depth));
            }
            Err(Error::size_mismatch(
                expected_len::<R>(bytes).unwrap_or(HEADER_SIZE_BYTES),
                bytes.len(),
            ))
        }
    }
}

/// Decodes one header-plus-store grid, or returns `None` when the buffer
/// length disagrees with the header.
fn decode_grid<R: Register>(bytes: &[u8]) -> Result<Option<DecodedState<R>>, Error> {
    let mut cursor = SketchSlice::new(bytes);
    let width = cursor
        .read_u32_le()
        .map_err(|err| Error::insufficient_data("width").set_source(err))? as usize;
    let depth = cursor
        .read_u32_le()
        .map_err(|err| Error::insufficient_data("depth").set_source(err))?
        as usize;
    let exp = cursor
        .read_f64_le()
        .map_err(|err| Error::insufficient_data("exp").set_source(err))?;

    let cells = match width.checked_mul(depth) {
        Some(cells) if cells > 0 => cells,
        _ => return Ok(None),
    };
    let Some(store_bytes) = cells.checked_mul(R::SIZE_BYTES) else {
        return Ok(None);
    };
    if bytes.len() != HEADER_SIZE_BYTES + store_bytes {
        return Ok(None);
    }

    let mut store = Vec::with_capacity(cells);
    for chunk in bytes[HEADER_SIZE_BYTES..].chunks_exact(R::SIZE_BYTES) {
        store.push(R::from_le_slice(chunk));
    }
    Ok(Some(DecodedState {
        width,
        depth,
        exp,
        store,
    }))
}

/// Length the legacy header says the buffer should have, for error reporting.
fn expected_len<R: Register>(bytes: &[u8]) -> Option<usize> {
    let mut cursor = SketchSlice::new(bytes);
    let width = cursor.read_u32_le().ok()? as usize;
    let depth = cursor.read_u32_le().ok()? as usize;
    let cells = width.checked_mul(depth)?;
    Some(HEADER_SIZE_BYTES + cells.checked_mul(R::SIZE_BYTES)?)
}
