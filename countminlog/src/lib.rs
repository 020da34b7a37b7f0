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

//! Count-Min-Log sketches: approximate frequency counts for streaming data
//! in sub-linear space.
//!
//! The crate centers on [`cml::CountMinLogSketch`], a Count-Min sketch whose
//! registers store logarithmic counter stages, so 8-, 16-, or 32-bit cells
//! represent effective counts far beyond their nominal range. On top of it,
//! [`topk::TopKSketch`] tracks the most frequent keys observed.
//!
//! Sketches are not thread-safe: wrap them in a lock when shared. All
//! estimates are probabilistic upper-biased counts, never exact.
//!
//! # Example
//!
//! ```rust
//! use countminlog::cml::CountMinLogSketch16;
//!
//! let mut sketch = CountMinLogSketch16::for_epsilon_delta(0.01, 0.01).unwrap();
//! sketch.bulk_update(b"login", 10_000);
//! sketch.update(b"logout");
//!
//! assert!(sketch.query(b"login") > 5_000.0);
//! assert!(sketch.query(b"logout") >= 1.0);
//! ```

pub mod cml;
pub mod common;
pub mod error;
pub mod hash;
pub mod topk;

mod codec;
