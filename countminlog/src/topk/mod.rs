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

//! Top-K tracking layered on a Count-Min-Log sketch.
//!
//! # Usage
//!
//! ```rust
//! use countminlog::topk::TopKSketch;
//!
//! let mut topk = TopKSketch::<u32>::new(0.01, 0.01, 2).unwrap();
//! for _ in 0..50 {
//!     topk.update(b"hot");
//! }
//! topk.update(b"cold");
//!
//! assert!(topk.estimate(b"hot") >= 40);
//! assert!(topk.entries().any(|(key, _)| key == b"hot"));
//! ```

mod tracker;

pub use self::tracker::TopKSketch;
