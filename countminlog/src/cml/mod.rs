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

//! Count-Min-Log sketch implementation for frequency estimation.
//!
//! A Count-Min-Log sketch stores the *logarithmic stage* of each counter
//! instead of the counter itself: a register at stage `c` stands for a
//! cumulative count of `(1 - exp^c) / (1 - exp)`, and advancing a register
//! is accepted with probability `exp^-c`. That trades a little estimation
//! error for registers that cover counts far beyond their nominal range.
//!
//! # Usage
//!
//! ```rust
//! use countminlog::cml::CountMinLogSketch16;
//!
//! let mut sketch = CountMinLogSketch16::for_capacity(100_000, 0.01).unwrap();
//!
//! sketch.update(b"apple");
//! sketch.bulk_update(b"banana", 300);
//!
//! let banana = sketch.query(b"banana");
//! assert!(banana > 100.0);
//! assert!(sketch.query(b"apple") >= 1.0);
//! ```
//!
//! # Register widths
//!
//! The sketch is generic over its register width; `u8`, `u16`, and `u32`
//! registers share one implementation through the [`Register`] trait, with
//! the aliases [`CountMinLogSketch8`], [`CountMinLogSketch16`], and
//! [`CountMinLogSketch32`] naming the common choices.
//!
//! # Serialization
//!
//! ```rust
//! use countminlog::cml::CountMinLogSketch8;
//!
//! let mut sketch = CountMinLogSketch8::new(512, 4, 1.5).unwrap();
//! sketch.bulk_update(b"hot", 50);
//!
//! let bytes = sketch.serialize();
//! let restored = CountMinLogSketch8::deserialize(&bytes).unwrap();
//! assert_eq!(restored.query(b"hot"), sketch.query(b"hot"));
//! ```

mod register;
mod serialization;
mod sketch;

pub use self::register::Register;
pub use self::sketch::CountMinLogBuilder;
pub use self::sketch::CountMinLogSketch;
pub use self::sketch::CountMinLogSketch16;
pub use self::sketch::CountMinLogSketch32;
pub use self::sketch::CountMinLogSketch8;
