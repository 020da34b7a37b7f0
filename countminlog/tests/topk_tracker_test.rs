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

use countminlog::error::ErrorKind;
use countminlog::topk::TopKSketch;

fn snapshot(topk: &TopKSketch<u32>) -> HashMap<Vec<u8>, u64> {
    topk.entries()
        .map(|(key, estimate)| (key.to_vec(), estimate))
        .collect()
}

#[test]
fn tracker_keeps_the_heaviest_keys() {
    let mut topk = TopKSketch::<u32>::new(0.01, 0.01, 2).unwrap();

    topk.update(b"light");
    for _ in 0..10 {
        topk.update(b"mid");
    }
    for _ in 0..50 {
        topk.update(b"heavy");
    }

    let entries = snapshot(&topk);
    assert_eq!(entries.len(), 2);
    assert!(entries.contains_key(b"heavy".as_slice()));
    assert!(entries.contains_key(b"mid".as_slice()));
    assert!(!entries.contains_key(b"light".as_slice()));

    let heavy = entries[b"heavy".as_slice()];
    let mid = entries[b"mid".as_slice()];
    assert!((40..=60).contains(&heavy), "heavy tracked at {heavy}");
    assert!((8..=12).contains(&mid), "mid tracked at {mid}");
}

#[test]
fn estimates_follow_the_sketch() {
    let mut topk = TopKSketch::<u32>::new(0.005, 0.005, 8).unwrap();
    for _ in 0..100 {
        topk.update(b"key");
    }

    let estimate = topk.estimate(b"key");
    assert!((90..=110).contains(&estimate), "estimated {estimate}");
    assert_eq!(
        estimate,
        topk.sketch().query(b"key").round() as u64,
    );
    assert_eq!(topk.estimate(b"never-seen"), 0);
}

#[test]
fn capacity_bounds_the_tracker() {
    let mut topk = TopKSketch::<u32>::new(0.01, 0.01, 3).unwrap();
    for key in [b"a", b"b", b"c", b"d", b"e"] {
        for _ in 0..5 {
            topk.update(key);
        }
    }
    assert_eq!(topk.len(), 3);
    assert_eq!(topk.capacity(), 3);
}

#[test]
fn constructor_validates_parameters() {
    assert_eq!(
        TopKSketch::<u32>::new(0.01, 0.01, 0).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
    assert_eq!(
        TopKSketch::<u32>::new(1.5, 0.01, 4).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
    assert_eq!(
        TopKSketch::<u32>::new(0.01, 0.0, 4).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
}
