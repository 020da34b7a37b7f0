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

use std::collections::HashMap;

use crate::cml::CountMinLogSketch;
use crate::cml::Register;
use crate::error::Error;

/// A Count-Min-Log sketch that also tracks the `k` keys with the highest
/// estimates seen so far.
///
/// The tracker holds at most `k` entries of `key -> estimate`. Eviction
/// compares a candidate's fresh estimate against the *stored* estimate of
/// the current minimum entry; stored estimates can go stale, and the sketch
/// is deliberately not re-queried for incumbents. That keeps every update at
/// one sketch query, at the price of an approximate ranking.
#[derive(Debug, Clone)]
pub struct TopKSketch<R: Register> {
    sketch: CountMinLogSketch<R>,
    capacity: usize,
    entries: HashMap<Vec<u8>, u64>,
}

impl<R: Register> TopKSketch<R> {
    /// Creates a tracker of capacity `k` over a sketch dimensioned from
    /// `(epsilon, delta)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use countminlog::topk::TopKSketch;
    ///
    /// let topk = TopKSketch::<u32>::new(0.01, 0.005, 40).unwrap();
    /// assert_eq!(topk.capacity(), 40);
    /// assert!(TopKSketch::<u32>::new(0.01, 0.005, 0).is_err());
    /// ```
    pub fn new(delta: f64, epsilon: f64, k: usize) -> Result<Self, Error> {
        if k == 0 {
            return Err(Error::invalid_argument("k must be at least 1"));
        }
        let sketch = CountMinLogSketch::for_epsilon_delta(epsilon, delta)?;
        Ok(Self {
            sketch,
            capacity: k,
            entries: HashMap::with_capacity(k),
        })
    }

    /// Counts one occurrence of `key` and refreshes the tracker when the
    /// sketch accepted the increment.
    pub fn update(&mut self, key: &[u8]) {
        if !self.sketch.update(key) {
            return;
        }
        let estimate = self.estimate(key);
        self.offer(key, estimate);
    }

    /// Returns the sketch estimate for `key`, rounded to a whole count.
    pub fn estimate(&self, key: &[u8]) -> u64 {
        self.sketch.query(key).round() as u64
    }

    /// Read-only unordered snapshot of the tracked `(key, estimate)` pairs.
    pub fn entries(&self) -> impl Iterator<Item = (&[u8], u64)> + '_ {
        self.entries
            .iter()
            .map(|(key, &estimate)| (key.as_slice(), estimate))
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True iff no key is tracked yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of keys the tracker holds.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The underlying sketch.
    pub fn sketch(&self) -> &CountMinLogSketch<R> {
        &self.sketch
    }

    /// Clears the tracker and the underlying sketch.
    pub fn reset(&mut self) {
        self.sketch.reset();
        self.entries.clear();
    }

    fn offer(&mut self, key: &[u8], estimate: u64) {
        if let Some(stored) = self.entries.get_mut(key) {
            *stored = estimate;
            return;
        }
        if self.entries.len() < self.capacity {
            self.entries.insert(key.to_vec(), estimate);
            return;
        }

        // Victim: smallest stored estimate, ties broken toward the smallest
        // key in byte order.
        let victim = self
            .entries
            .iter()
            .map(|(key, &stored)| (stored, key))
            .min();
        if let Some((victim_estimate, victim_key)) = victim {
            if estimate > victim_estimate {
                let victim_key = victim_key.clone();
                self.entries.remove(&victim_key);
                self.entries.insert(key.to_vec(), estimate);
            }
        }
    }
}
