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

use std::f64::consts::E;
use std::f64::consts::LN_2;

use crate::cml::register::Register;
use crate::common::RandomSource;
use crate::common::XorShift64;
use crate::error::Error;
use crate::hash::KeyHasher;
use crate::hash::XxHash64KeyHasher;

// Below this distance from 1.0 the geometric-series estimator degenerates to
// 0/0; the limit of the series is simply the stage count.
const BASE_EPSILON: f64 = 1e-12;

/// A Count-Min-Log sketch: a Count-Min sketch whose registers hold the
/// logarithmic stage of a counter instead of the counter itself.
///
/// A register at stage `c` stands for roughly `exp^c` observations, so an
/// 8-, 16-, or 32-bit cell can cover counts far beyond its nominal range.
/// Increments are probabilistic: advancing a register from stage `c` is
/// accepted with probability `exp^-c`, which keeps the expected number of
/// observations per stage geometric.
///
/// Not safe for concurrent use; wrap it in a lock if shared.
///
/// # Examples
///
/// ```
/// use countminlog::cml::CountMinLogSketch16;
///
/// let mut sketch = CountMinLogSketch16::new(2048, 5, 1.00026).unwrap();
/// sketch.update(b"apple");
/// sketch.bulk_update(b"banana", 1000);
///
/// assert!(sketch.query(b"apple") >= 1.0);
/// assert!(sketch.query(b"banana") > 500.0);
/// assert_eq!(sketch.query(b"grape"), 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct CountMinLogSketch<R: Register, H: KeyHasher = XxHash64KeyHasher> {
    pub(super) width: usize,
    pub(super) depth: usize,
    pub(super) exp: f64,
    pub(super) log_exp: f64,
    pub(super) c_max: R,
    pub(super) conservative: bool,
    pub(super) max_sample: bool,
    pub(super) progressive: bool,
    pub(super) total_count: u64,
    pub(super) rng: XorShift64,
    pub(super) hasher: H,
    pub(super) store: Vec<R>,
}

/// Builder for [`CountMinLogSketch`].
///
/// # Examples
///
/// ```
/// use countminlog::cml::CountMinLogSketch8;
///
/// let sketch = CountMinLogSketch8::builder()
///     .width(4096)
///     .depth(4)
///     .exp(1.5)
///     .progressive(true)
///     .build()
///     .unwrap();
/// assert_eq!(sketch.width(), 4096);
/// ```
#[derive(Debug, Clone)]
pub struct CountMinLogBuilder<R: Register, H: KeyHasher = XxHash64KeyHasher> {
    width: usize,
    depth: usize,
    exp: Option<f64>,
    n_bits: Option<u8>,
    conservative: bool,
    max_sample: bool,
    progressive: bool,
    hasher: H,
    _register: std::marker::PhantomData<R>,
}

impl<R: Register, H: KeyHasher> CountMinLogBuilder<R, H> {
    /// Sets the number of columns per row.
    pub fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Sets the number of rows (independent hash functions).
    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Sets the base of the logarithmic counter encoding. Must be > 1.0.
    ///
    /// When unset, the base is derived from the register width so the
    /// largest stage corresponds to roughly `cMax` increments-at-saturation.
    pub fn exp(mut self, exp: f64) -> Self {
        self.exp = Some(exp);
        self
    }

    /// Caps registers at `2^n_bits - 1` instead of the full register range.
    pub fn n_bits(mut self, n_bits: u8) -> Self {
        self.n_bits = Some(n_bits);
        self
    }

    /// Restricts writes to the tied-minimum cells (on by default). When
    /// disabled, every row's cell is incremented on an accepted update.
    pub fn conservative(mut self, conservative: bool) -> Self {
        self.conservative = conservative;
        self
    }

    /// Draws the accept probability from the row maximum instead of the
    /// minimum. Writes still target the minimum cells.
    pub fn max_sample(mut self, max_sample: bool) -> Self {
        self.max_sample = max_sample;
        self
    }

    /// Scales the effective base with the current stage, spending resolution
    /// on small counts and range on large ones.
    pub fn progressive(mut self, progressive: bool) -> Self {
        self.progressive = progressive;
        self
    }

    /// Replaces the key hasher, e.g. with a collision-forcing test double.
    pub fn hasher<H2: KeyHasher>(self, hasher: H2) -> CountMinLogBuilder<R, H2> {
        CountMinLogBuilder {
            width: self.width,
            depth: self.depth,
            exp: self.exp,
            n_bits: self.n_bits,
            conservative: self.conservative,
            max_sample: self.max_sample,
            progressive: self.progressive,
            hasher,
            _register: std::marker::PhantomData,
        }
    }

    /// Validates the configuration and allocates the zeroed register store.
    pub fn build(self) -> Result<CountMinLogSketch<R, H>, Error> {
        if self.width == 0 || self.width > u32::MAX as usize {
            return Err(Error::invalid_argument("width must be positive and fit in 32 bits")
                .with_context("width", self.width));
        }
        if self.depth == 0 || self.depth > u32::MAX as usize {
            return Err(Error::invalid_argument("depth must be positive and fit in 32 bits")
                .with_context("depth", self.depth));
        }
        let exp = self.exp.unwrap_or_else(balanced_exp::<R>);
        if exp <= 1.0 || exp.is_nan() {
            return Err(Error::invalid_argument("exp must be > 1.0").with_context("exp", exp));
        }
        let n_bits = self.n_bits.unwrap_or(R::BITS);
        if n_bits == 0 || n_bits > R::BITS {
            return Err(Error::invalid_argument(format!(
                "{} bit registers allow at most {} value bits",
                R::BITS,
                R::BITS
            ))
            .with_context("n_bits", n_bits));
        }
        let cells = self
            .width
            .checked_mul(self.depth)
            .ok_or_else(|| Error::invalid_argument("sketch dimensions overflow"))?;
        let c_max = if n_bits == R::BITS {
            R::MAX_STAGE
        } else {
            R::from_u64((1u64 << n_bits) - 1)
        };

        Ok(CountMinLogSketch {
            width: self.width,
            depth: self.depth,
            exp,
            log_exp: exp.ln(),
            c_max,
            conservative: self.conservative,
            max_sample: self.max_sample,
            progressive: self.progressive,
            total_count: 0,
            rng: XorShift64::seeded(dimension_seed(self.width, self.depth)),
            hasher: self.hasher,
            store: vec![R::default(); cells],
        })
    }
}

impl<R: Register> CountMinLogSketch<R> {
    /// Returns a builder with the default policies: conservative updates,
    /// min-sampling, constant base.
    pub fn builder() -> CountMinLogBuilder<R> {
        CountMinLogBuilder {
            width: 0,
            depth: 0,
            exp: None,
            n_bits: None,
            conservative: true,
            max_sample: false,
            progressive: false,
            hasher: XxHash64KeyHasher,
            _register: std::marker::PhantomData,
        }
    }

    /// Creates a sketch with explicit dimensions and base.
    ///
    /// # Examples
    ///
    /// ```
    /// use countminlog::cml::CountMinLogSketch16;
    ///
    /// let sketch = CountMinLogSketch16::new(1024, 4, 1.00026).unwrap();
    /// assert_eq!((sketch.width(), sketch.depth()), (1024, 4));
    ///
    /// assert!(CountMinLogSketch16::new(1024, 4, 0.9).is_err());
    /// ```
    pub fn new(width: usize, depth: usize, exp: f64) -> Result<Self, Error> {
        Self::builder().width(width).depth(depth).exp(exp).build()
    }

    /// Creates a sketch sized for the given error bounds: estimates exceed
    /// the true count by more than `epsilon` times the stream length with
    /// probability at most `delta`.
    ///
    /// Width is `ceil(e / epsilon)` and depth `ceil(ln(1 / delta))`; the
    /// base is derived from the register width.
    pub fn for_epsilon_delta(epsilon: f64, delta: f64) -> Result<Self, Error> {
        if !(epsilon > 0.0 && epsilon < 1.0) {
            return Err(
                Error::invalid_argument("epsilon must be in (0, 1)").with_context("epsilon", epsilon)
            );
        }
        if !(delta > 0.0 && delta < 1.0) {
            return Err(Error::invalid_argument("delta must be in (0, 1)").with_context("delta", delta));
        }
        let (width, depth) = epsilon_delta_dimensions(epsilon, delta);
        Self::builder().width(width).depth(depth).build()
    }

    /// Creates a sketch sized for an expected number of distinct items and a
    /// target error rate in `[0.001, 1.0)`.
    pub fn for_capacity(capacity: u64, error_rate: f64) -> Result<Self, Error> {
        if !(0.001..1.0).contains(&error_rate) {
            return Err(
                Error::invalid_argument("error rate needs to be >= 0.001 and < 1.0")
                    .with_context("error_rate", error_rate),
            );
        }
        if capacity == 0 {
            return Err(Error::invalid_argument("capacity must be positive"));
        }
        let (width, depth) = capacity_dimensions(capacity, error_rate);
        Self::builder().width(width).depth(depth).build()
    }

    /// Returns a sketch with the stock tuning for this register width: one
    /// million columns, seven rows, base [`Register::DEFAULT_EXP`], with the
    /// max-sample and progressive policies enabled.
    pub fn with_defaults() -> Result<Self, Error> {
        Self::builder()
            .width(1_000_000)
            .depth(7)
            .exp(R::DEFAULT_EXP)
            .max_sample(true)
            .progressive(true)
            .build()
    }
}

impl<R: Register, H: KeyHasher> CountMinLogSketch<R, H> {
    /// Counts one occurrence of `key`.
    ///
    /// Returns true iff a register was advanced: the draw may reject the
    /// increment (that is what keeps the encoding logarithmic), and a key
    /// whose registers are all at the cap can no longer be counted.
    pub fn update(&mut self, key: &[u8]) -> bool {
        self.total_count = self.total_count.saturating_add(1);

        let (h1, h2) = self.hasher.hash_pair(key);
        let mut min_stage = R::MAX_STAGE;
        let mut max_stage = R::default();
        for row in 0..self.depth {
            let value = self.store[self.row_index(h1, h2, row)];
            min_stage = min_stage.min(value);
            max_stage = max_stage.max(value);
        }

        if min_stage >= self.c_max {
            return false;
        }
        let decision_stage = if self.max_sample { max_stage } else { min_stage };
        if !self.accept(decision_stage.as_u64()) {
            return false;
        }

        let bumped = min_stage.next_stage();
        for row in 0..self.depth {
            let idx = self.row_index(h1, h2, row);
            let value = self.store[idx];
            if value == min_stage {
                self.store[idx] = bumped;
            } else if !self.conservative && value < self.c_max {
                self.store[idx] = value.next_stage();
            }
        }
        true
    }

    /// Counts `freq` occurrences of `key`, hashing only once.
    ///
    /// Each logical occurrence still gets its own accept draw. Returns true
    /// iff at least one draw was accepted.
    pub fn bulk_update(&mut self, key: &[u8], freq: u64) -> bool {
        self.total_count = self.total_count.saturating_add(freq);
        if freq == 0 {
            return false;
        }

        let (h1, h2) = self.hasher.hash_pair(key);
        let mut indexes = Vec::with_capacity(self.depth);
        let mut min_stage = R::MAX_STAGE;
        let mut max_stage = R::default();
        for row in 0..self.depth {
            let idx = self.row_index(h1, h2, row);
            let value = self.store[idx];
            indexes.push(idx);
            min_stage = min_stage.min(value);
            max_stage = max_stage.max(value);
        }

        let mut any_updated = false;
        for _ in 0..freq {
            if min_stage >= self.c_max {
                break;
            }
            let decision_stage = if self.max_sample { max_stage } else { min_stage };
            if !self.accept(decision_stage.as_u64()) {
                continue;
            }

            let bumped = min_stage.next_stage();
            for &idx in &indexes {
                let value = self.store[idx];
                if value == min_stage {
                    self.store[idx] = bumped;
                } else if !self.conservative && value < self.c_max {
                    self.store[idx] = value.next_stage();
                }
            }
            any_updated = true;

            min_stage = R::MAX_STAGE;
            max_stage = R::default();
            for &idx in &indexes {
                let value = self.store[idx];
                min_stage = min_stage.min(value);
                max_stage = max_stage.max(value);
            }
        }
        any_updated
    }

    /// Returns the estimated count of `key`.
    ///
    /// The minimum stage over the key's rows is inverted through the
    /// geometric encoding; the result is zero exactly when every row is at
    /// stage zero.
    pub fn query(&self, key: &[u8]) -> f64 {
        let (h1, h2) = self.hasher.hash_pair(key);
        let mut min_stage = R::MAX_STAGE;
        for row in 0..self.depth {
            let value = self.store[self.row_index(h1, h2, row)];
            min_stage = min_stage.min(value);
        }
        self.estimate_stage(min_stage)
    }

    /// Returns the estimated share of the stream attributed to `key`, or
    /// zero for an unseen key.
    pub fn probability(&self, key: &[u8]) -> f64 {
        let estimate = self.query(key);
        if estimate > 0.0 && self.total_count > 0 {
            estimate / self.total_count as f64
        } else {
            0.0
        }
    }

    /// Combines `other` into this sketch by taking the pointwise maximum of
    /// every register; stream totals add up.
    ///
    /// Fails without touching either operand unless both sketches share
    /// width, depth, base, and register cap (the register width is already
    /// enforced by the type).
    ///
    /// # Examples
    ///
    /// ```
    /// use countminlog::cml::CountMinLogSketch16;
    ///
    /// let mut a = CountMinLogSketch16::new(2048, 5, 1.00026).unwrap();
    /// let mut b = CountMinLogSketch16::new(2048, 5, 1.00026).unwrap();
    /// a.update(b"x");
    /// b.update(b"y");
    /// a.merge(&b).unwrap();
    /// assert!(a.query(b"x") >= 1.0);
    /// assert!(a.query(b"y") >= 1.0);
    /// ```
    pub fn merge(&mut self, other: &Self) -> Result<(), Error> {
        if self.width != other.width
            || self.depth != other.depth
            || self.exp != other.exp
            || self.c_max != other.c_max
        {
            return Err(
                Error::incompatible("sketches must share width, depth, exp, and register cap")
                    .with_context("self", format!("{}x{}, exp {}", self.width, self.depth, self.exp))
                    .with_context(
                        "other",
                        format!("{}x{}, exp {}", other.width, other.depth, other.exp),
                    ),
            );
        }

        for (cell, &other_cell) in self.store.iter_mut().zip(&other.store) {
            if other_cell > *cell {
                *cell = other_cell;
            }
        }
        self.total_count = self.total_count.saturating_add(other.total_count);
        Ok(())
    }

    /// Returns the sketch to a fresh state: all registers zero, stream total
    /// zero. Dimensions, policies, and the generator state are kept.
    pub fn reset(&mut self) {
        for cell in &mut self.store {
            *cell = R::default();
        }
        self.total_count = 0;
    }

    /// Number of columns per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Base of the logarithmic counter encoding.
    pub fn exp(&self) -> f64 {
        self.exp
    }

    /// Largest stage a register may reach.
    pub fn max_stage(&self) -> u64 {
        self.c_max.as_u64()
    }

    /// Number of stream items observed, whether or not their draw was
    /// accepted.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// True iff nothing has been counted since construction or reset.
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    /// Percentage of registers above stage zero.
    pub fn fill_rate(&self) -> f64 {
        let occupied = self.store.iter().filter(|cell| cell.as_u64() > 0).count();
        100.0 * occupied as f64 / self.store.len() as f64
    }

    /// Whether writes are restricted to the tied-minimum cells.
    pub fn conservative(&self) -> bool {
        self.conservative
    }

    /// Whether the accept probability follows the row maximum.
    pub fn max_sample(&self) -> bool {
        self.max_sample
    }

    /// Whether the effective base scales with the stage.
    pub fn progressive(&self) -> bool {
        self.progressive
    }

    fn row_index(&self, h1: u32, h2: u32, row: usize) -> usize {
        let salted = h1.wrapping_add((row as u32).wrapping_mul(h2)) as usize;
        row * self.width + salted % self.width
    }

    fn accept(&mut self, stage: u64) -> bool {
        self.rng.next_f64() < self.accept_probability(stage)
    }

    fn accept_probability(&self, stage: u64) -> f64 {
        if self.progressive {
            1.0 / (self.stage_weight(stage + 1) - self.stage_weight(stage))
        } else {
            (-(stage as f64) * self.log_exp).exp()
        }
    }

    fn effective_exp(&self, stage: u64) -> f64 {
        if !self.progressive {
            return self.exp;
        }
        1.0 + (self.exp - 1.0) * (stage as f64 - 1.0) / self.c_max.as_u64() as f64
    }

    /// Expected number of observations needed to reach `stage`: the
    /// telescoped sum of per-stage point values.
    fn stage_weight(&self, stage: u64) -> f64 {
        if stage == 0 {
            return 0.0;
        }
        if stage == 1 {
            return 1.0;
        }
        let base = self.effective_exp(stage);
        if (base - 1.0).abs() < BASE_EPSILON {
            return stage as f64;
        }
        (1.0 - base.powf(stage as f64)) / (1.0 - base)
    }

    fn estimate_stage(&self, stage: R) -> f64 {
        let c = stage.as_u64();
        // The saturated stage must not probe past the register cap.
        let clamped = if stage >= self.c_max && c >= 2 { c - 1 } else { c };
        self.stage_weight(clamped)
    }
}

/// Type alias for the 8-bit register variant.
pub type CountMinLogSketch8 = CountMinLogSketch<u8>;
/// Type alias for the 16-bit register variant.
pub type CountMinLogSketch16 = CountMinLogSketch<u16>;
/// Type alias for the 32-bit register variant.
pub type CountMinLogSketch32 = CountMinLogSketch<u32>;

/// Base that spreads the register's representable range over the counter
/// space: the largest stage corresponds to roughly `cMax` logical
/// increments-at-saturation.
fn balanced_exp<R: Register>() -> f64 {
    let c_max = R::MAX_STAGE.as_u64() as f64;
    c_max.powf(1.0 / (c_max - 1.0))
}

fn epsilon_delta_dimensions(epsilon: f64, delta: f64) -> (usize, usize) {
    let width = (E / epsilon).ceil() as usize;
    let depth = (1.0 / delta).ln().ceil() as usize;
    (width, depth.max(1))
}

fn capacity_dimensions(capacity: u64, error_rate: f64) -> (usize, usize) {
    let m = ((capacity as f64 * error_rate.ln()) / -LN_2).ceil().max(1.0);
    let rows = (LN_2 * m / capacity as f64).ceil().max(1.0);
    let width = ((m / rows).floor() as usize).max(1);
    (width, rows as usize)
}

fn dimension_seed(width: usize, depth: usize) -> u64 {
    (width as u64).wrapping_shl(32) ^ depth as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    /// Forces every key onto column zero of every row.
    struct ClashHasher;

    impl KeyHasher for ClashHasher {
        fn hash_pair(&self, _key: &[u8]) -> (u32, u32) {
            (0, 0)
        }
    }

    fn clash_sketch(width: usize, depth: usize, exp: f64) -> CountMinLogSketch<u8, ClashHasher> {
        CountMinLogSketch::<u8>::builder()
            .width(width)
            .depth(depth)
            .exp(exp)
            .hasher(ClashHasher)
            .build()
            .unwrap()
    }

    #[test]
    fn builder_rejects_bad_parameters() {
        assert_eq!(
            CountMinLogSketch8::new(0, 4, 1.5).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            CountMinLogSketch8::new(16, 0, 1.5).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            CountMinLogSketch8::new(16, 4, 1.0).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            CountMinLogSketch8::builder()
                .width(16)
                .depth(4)
                .n_bits(9)
                .build()
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidArgument
        );
        assert!(CountMinLogSketch8::builder()
            .width(16)
            .depth(4)
            .n_bits(8)
            .build()
            .is_ok());
    }

    #[test]
    fn constructor_guards_cover_parameter_ranges() {
        assert!(CountMinLogSketch16::for_epsilon_delta(0.0, 0.5).is_err());
        assert!(CountMinLogSketch16::for_epsilon_delta(1.0, 0.5).is_err());
        assert!(CountMinLogSketch16::for_epsilon_delta(0.1, 0.0).is_err());
        assert!(CountMinLogSketch16::for_epsilon_delta(0.1, 1.0).is_err());
        assert!(CountMinLogSketch16::for_capacity(1000, 0.0005).is_err());
        assert!(CountMinLogSketch16::for_capacity(1000, 1.0).is_err());
        assert!(CountMinLogSketch16::for_capacity(0, 0.01).is_err());
    }

    #[test]
    fn epsilon_delta_formula() {
        let (width, depth) = epsilon_delta_dimensions(0.01, 0.01);
        assert_eq!(width, 272); // ceil(e / 0.01)
        assert_eq!(depth, 5); // ceil(ln 100)
    }

    #[test]
    fn capacity_formula() {
        let (width, depth) = capacity_dimensions(10_000_000, 0.01);
        assert_eq!(depth, 5);
        assert_eq!(width, 13_287_712);
    }

    #[test]
    fn balanced_exp_spans_the_register_range() {
        // alpha^(cMax - 1) == cMax by construction.
        let alpha = balanced_exp::<u8>();
        assert!((alpha.powi(254) - 255.0).abs() < 1e-9);
        let alpha16 = balanced_exp::<u16>();
        assert!((alpha16.powi(65534) - 65535.0).abs() < 1e-6);
    }

    #[test]
    fn first_update_always_lands() {
        let mut sketch = CountMinLogSketch16::new(64, 4, 1.00026).unwrap();
        assert!(sketch.update(b"fresh"));
        assert_eq!(sketch.query(b"fresh"), 1.0);
        assert_eq!(sketch.total_count(), 1);
    }

    #[test]
    fn conservative_update_skips_cells_above_the_minimum() {
        let mut sketch = clash_sketch(8, 3, 1.5);
        // Rows collide on column zero; pre-stage row 2 above the others.
        sketch.store[2 * 8] = 1;

        assert!(sketch.update(b"any"));
        assert_eq!(sketch.store[0], 1);
        assert_eq!(sketch.store[8], 1);
        assert_eq!(sketch.store[2 * 8], 1);
    }

    #[test]
    fn non_conservative_update_advances_every_row() {
        let mut sketch = CountMinLogSketch::<u8>::builder()
            .width(8)
            .depth(3)
            .exp(1.5)
            .conservative(false)
            .hasher(ClashHasher)
            .build()
            .unwrap();
        sketch.store[2 * 8] = 1;

        assert!(sketch.update(b"any"));
        assert_eq!(sketch.store[0], 1);
        assert_eq!(sketch.store[8], 1);
        assert_eq!(sketch.store[2 * 8], 2);
    }

    #[test]
    fn max_sample_draws_from_the_row_maximum() {
        let mut sketch = CountMinLogSketch::<u8>::builder()
            .width(8)
            .depth(2)
            .exp(1000.0)
            .max_sample(true)
            .hasher(ClashHasher)
            .build()
            .unwrap();
        sketch.store[8] = 2;

        // Stage 0 would accept unconditionally; the row maximum of 2 under a
        // huge base gives p = 1e-6, far below the seeded generator's first
        // draw, so the update must be rejected.
        let mut rng = XorShift64::seeded(dimension_seed(8, 2));
        assert!(rng.next_f64() > 1e-6);
        assert!(!sketch.update(b"any"));
        assert_eq!(sketch.store[0], 0);
    }

    #[test]
    fn registers_never_pass_the_cap() {
        let mut sketch = CountMinLogSketch::<u8>::builder()
            .width(4)
            .depth(2)
            .exp(1.1)
            .n_bits(3)
            .hasher(ClashHasher)
            .build()
            .unwrap();
        assert_eq!(sketch.max_stage(), 7);

        let mut previous = vec![0u8; sketch.store.len()];
        for _ in 0..10_000 {
            sketch.update(b"hot");
            for (cell, prev) in sketch.store.iter().zip(&previous) {
                assert!(*cell >= *prev);
                assert!(cell.as_u64() <= 7);
            }
            previous = sketch.store.clone();
        }
        // The cap is tiny and the base small, so the key must saturate.
        assert!(!sketch.update(b"hot"));
        assert!(!sketch.bulk_update(b"hot", 100));
    }

    #[test]
    fn bulk_update_matches_repeated_updates_in_expectation() {
        let mut sketch = CountMinLogSketch16::new(256, 4, 1.00026).unwrap();
        assert!(sketch.bulk_update(b"bulk", 500));
        let estimate = sketch.query(b"bulk");
        assert!(estimate > 400.0 && estimate < 600.0, "estimate {estimate}");
        assert_eq!(sketch.total_count(), 500);
    }

    #[test]
    fn estimator_values() {
        let sketch = CountMinLogSketch16::new(16, 2, 1.5).unwrap();
        assert_eq!(sketch.estimate_stage(0), 0.0);
        assert_eq!(sketch.estimate_stage(1), 1.0);
        // (1 - exp^2) / (1 - exp) = 1 + exp
        assert!((sketch.estimate_stage(2) - 2.5).abs() < 1e-12);
        assert!((sketch.estimate_stage(3) - 4.75).abs() < 1e-12);
    }

    #[test]
    fn estimator_clamps_at_saturation() {
        let sketch = CountMinLogSketch::<u8>::builder()
            .width(16)
            .depth(2)
            .exp(1.5)
            .n_bits(4)
            .build()
            .unwrap();
        // At the cap the exponent stays at c - 1 instead of probing past it.
        let saturated = sketch.estimate_stage(15);
        let below = sketch.estimate_stage(14);
        assert!((saturated - below).abs() < 1e-9);
    }

    #[test]
    fn progressive_estimator_survives_a_base_near_one() {
        let sketch = CountMinLogSketch16::builder()
            .width(16)
            .depth(2)
            .exp(1.0 + 5e-13)
            .progressive(true)
            .build()
            .unwrap();
        // The effective base collapses to 1.0 within epsilon; the geometric
        // series limit is the stage count itself.
        assert_eq!(sketch.estimate_stage(5), 5.0);
        assert_eq!(sketch.estimate_stage(1), 1.0);
        assert_eq!(sketch.estimate_stage(0), 0.0);
    }

    #[test]
    fn progressive_accept_probability_is_a_probability() {
        let sketch = CountMinLogSketch::<u8>::builder()
            .width(16)
            .depth(2)
            .exp(1.5)
            .progressive(true)
            .build()
            .unwrap();
        for stage in 0..=20u64 {
            let p = sketch.accept_probability(stage);
            assert!(p > 0.0 && p <= 1.0, "stage {stage} gave p {p}");
        }
        assert_eq!(sketch.accept_probability(0), 1.0);
    }

    #[test]
    fn reset_clears_counts_but_keeps_shape() {
        let mut sketch = CountMinLogSketch16::new(64, 3, 1.00026).unwrap();
        sketch.bulk_update(b"key", 100);
        assert!(sketch.fill_rate() > 0.0);

        sketch.reset();
        assert!(sketch.is_empty());
        assert_eq!(sketch.total_count(), 0);
        assert_eq!(sketch.fill_rate(), 0.0);
        assert_eq!(sketch.query(b"key"), 0.0);
        assert_eq!((sketch.width(), sketch.depth()), (64, 3));
    }

    #[test]
    fn probability_tracks_the_stream_share() {
        let mut sketch = CountMinLogSketch16::new(256, 4, 1.00026).unwrap();
        assert_eq!(sketch.probability(b"a"), 0.0);
        sketch.update(b"a");
        sketch.update(b"b");
        let share = sketch.probability(b"a");
        assert!(share > 0.0 && share <= 1.0);
    }
}
