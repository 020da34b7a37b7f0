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

use countminlog::cml::CountMinLogSketch16;
use countminlog::error::ErrorKind;
use googletest::assert_that;
use googletest::prelude::contains_substring;

fn sketch() -> CountMinLogSketch16 {
    CountMinLogSketch16::new(2048, 5, 1.000002).unwrap()
}

#[test]
fn merge_keeps_both_streams_estimates() {
    let mut a = sketch();
    let mut b = sketch();
    a.bulk_update(b"x", 1_000);
    b.bulk_update(b"y", 2_000);

    let b_before = b.serialize();
    a.merge(&b).unwrap();

    let x = a.query(b"x");
    let y = a.query(b"y");
    assert!((x - 1_000.0).abs() <= 10.0, "x estimated at {x}");
    assert!((y - 2_000.0).abs() <= 20.0, "y estimated at {y}");
    assert_eq!(a.total_count(), 3_000);

    // The right-hand operand is never touched.
    assert_eq!(b.serialize(), b_before);
}

#[test]
fn merge_with_a_copy_changes_nothing() {
    let mut a = sketch();
    a.bulk_update(b"x", 500);
    let before = a.serialize();

    let copy = a.clone();
    a.merge(&copy).unwrap();
    assert_eq!(a.serialize(), before);
}

#[test]
fn merge_commutes() {
    let mut a = sketch();
    let mut b = sketch();
    a.bulk_update(b"x", 750);
    a.update(b"z");
    b.bulk_update(b"y", 1_500);
    b.update(b"z");

    let mut ab = a.clone();
    ab.merge(&b).unwrap();
    let mut ba = b.clone();
    ba.merge(&a).unwrap();

    assert_eq!(ab.serialize(), ba.serialize());
}

#[test]
fn merge_rejects_mismatched_width() {
    let mut a = sketch();
    let b = CountMinLogSketch16::new(1024, 5, 1.000002).unwrap();

    let a_before = a.serialize();
    let err = a.merge(&b).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleSketch);
    assert_that!(err.message(), contains_substring("must share width"));

    // A failed merge leaves the receiver unchanged.
    assert_eq!(a.serialize(), a_before);
}

#[test]
fn merge_rejects_mismatched_depth_and_exp() {
    let mut a = sketch();
    let depth_mismatch = CountMinLogSketch16::new(2048, 4, 1.000002).unwrap();
    assert_eq!(
        a.merge(&depth_mismatch).unwrap_err().kind(),
        ErrorKind::IncompatibleSketch
    );

    let exp_mismatch = CountMinLogSketch16::new(2048, 5, 1.0002).unwrap();
    assert_eq!(
        a.merge(&exp_mismatch).unwrap_err().kind(),
        ErrorKind::IncompatibleSketch
    );
}
