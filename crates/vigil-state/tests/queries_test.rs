// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod common;

use vigil_core::api::{QueryKind, UsageHint};
use vigil_core::StateError;
use vigil_state::QueryStatus;

#[test]
fn test_query_lifecycle() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();
    device.set_query_latency(2);
    let query = ctx.queries().allocate(QueryKind::SamplesPassed).unwrap();

    // --- 2. ACT ---
    ctx.queries().begin(&query).unwrap();
    let running = ctx.queries().status(&query).unwrap();
    ctx.array_buffers().allocate(16, UsageHint::StaticDraw).unwrap();
    ctx.queries().finish(&query).unwrap();
    let first_poll = ctx.queries().result(&query).unwrap();
    let second_poll = ctx.queries().is_result_available(&query).unwrap();
    let third_poll = ctx.queries().result(&query).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(running, QueryStatus::Running);
    assert_eq!(first_poll, None);
    assert!(!second_poll);
    let samples = third_poll.expect("The result should be available after the latency");
    assert!(samples > 0);
    assert_eq!(
        ctx.queries().status(&query).unwrap(),
        QueryStatus::Available(samples)
    );
}

#[test]
fn test_one_running_query_per_kind() {
    // --- 1. ARRANGE ---
    let (mut ctx, _device) = common::setup();
    let first = ctx.queries().allocate(QueryKind::TimeElapsed).unwrap();
    let second = ctx.queries().allocate(QueryKind::TimeElapsed).unwrap();
    let other_kind = ctx.queries().allocate(QueryKind::AnySamplesPassed).unwrap();
    ctx.queries().begin(&first).unwrap();

    // --- 2. ACT ---
    let same_kind = ctx.queries().begin(&second);
    let again = ctx.queries().begin(&first);
    let different_kind = ctx.queries().begin(&other_kind);

    // --- 3. ASSERT ---
    for result in [same_kind, again] {
        match result {
            Err(StateError::QueryAlreadyRunning { kind, running }) => {
                assert_eq!(kind, QueryKind::TimeElapsed);
                assert_eq!(running, first.name());
            }
            other => panic!("Expected QueryAlreadyRunning, got {other:?}"),
        }
    }
    assert!(different_kind.is_ok());
    assert_eq!(ctx.queries().running(QueryKind::TimeElapsed), Some(first));
}

#[test]
fn test_finish_requires_running_query() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();
    let query = ctx.queries().allocate(QueryKind::SamplesPassed).unwrap();
    device.clear_calls();

    // --- 2. ACT ---
    let result = ctx.queries().finish(&query);

    // --- 3. ASSERT ---
    assert!(matches!(
        result,
        Err(StateError::QueryNotRunning {
            kind: QueryKind::SamplesPassed,
            ..
        })
    ));
    assert!(device.calls().is_empty());
    assert_eq!(ctx.queries().status(&query).unwrap(), QueryStatus::Idle);
}

#[test]
fn test_idle_query_has_no_result() {
    // --- 1. ARRANGE ---
    let (mut ctx, _device) = common::setup();
    let query = ctx.queries().allocate(QueryKind::AnySamplesPassed).unwrap();

    // --- 2. ACT ---
    let result = ctx.queries().result(&query).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(result, None);
}

#[test]
fn test_delete_running_query_ends_it() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();
    let query = ctx.queries().allocate(QueryKind::TimeElapsed).unwrap();
    ctx.queries().begin(&query).unwrap();

    // --- 2. ACT ---
    ctx.queries().delete(&query).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(device.call_count("end_query"), 1);
    assert_eq!(ctx.queries().running(QueryKind::TimeElapsed), None);
    assert_eq!(device.live_object_count(), 0);
    assert!(matches!(
        ctx.queries().begin(&query),
        Err(StateError::Deleted { .. })
    ));
}
