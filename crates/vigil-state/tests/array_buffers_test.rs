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

use vigil_core::api::{BufferTarget, ByteRange, UsageHint};
use vigil_core::{ObjectKind, StateError};
use vigil_infra::HeadlessDevice;
use vigil_state::GraphicsContext;

#[test]
fn test_allocate_leaves_buffer_bound() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();

    // --- 2. ACT ---
    let buffer = ctx.array_buffers().allocate(64, UsageHint::StaticDraw).unwrap();

    // --- 3. ASSERT ---
    let buffers = ctx.array_buffers();
    assert_eq!(buffers.currently_bound(), Some(buffer));
    assert!(buffers.is_bound(&buffer).unwrap());
    assert_eq!(buffers.range(&buffer).unwrap().interval(), 64);
    assert_eq!(buffers.usage(&buffer).unwrap(), UsageHint::StaticDraw);
    assert_eq!(
        device.bound_buffer(BufferTarget::Array),
        buffer.name(),
        "The device binding should follow the cached binding"
    );
}

#[test]
fn test_rebinding_bound_buffer_makes_no_device_call() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();
    let buffer = ctx.array_buffers().allocate(16, UsageHint::StaticDraw).unwrap();
    device.clear_calls();

    // --- 2. ACT ---
    ctx.array_buffers().bind(&buffer).unwrap();
    ctx.array_buffers().bind(&buffer).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(
        device.call_count("bind_buffer"),
        0,
        "Binding the bound buffer must be elided"
    );
}

#[test]
fn test_unbind_twice_issues_one_call() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();
    ctx.array_buffers().allocate(16, UsageHint::StaticDraw).unwrap();
    device.clear_calls();

    // --- 2. ACT ---
    ctx.array_buffers().unbind().unwrap();
    ctx.array_buffers().unbind().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(device.call_count("bind_buffer"), 1);
    assert!(!ctx.array_buffers().any_is_bound());
    assert_eq!(device.bound_buffer(BufferTarget::Array), 0);
}

#[test]
fn test_update_requires_binding() {
    // --- 1. ARRANGE ---
    let (mut ctx, _device) = common::setup();
    let first = ctx.array_buffers().allocate(8, UsageHint::DynamicDraw).unwrap();
    let second = ctx.array_buffers().allocate(8, UsageHint::DynamicDraw).unwrap();

    // --- 2. ACT ---
    let result = ctx
        .array_buffers()
        .update(&first, ByteRange::from_size(4).unwrap(), &[1, 2, 3, 4]);

    // --- 3. ASSERT ---
    match result {
        Err(StateError::BufferNotBound {
            kind,
            required,
            bound,
        }) => {
            assert_eq!(kind, ObjectKind::ArrayBuffer);
            assert_eq!(required, first.name());
            assert_eq!(bound, Some(second.name()));
        }
        other => panic!("Expected BufferNotBound, got {other:?}"),
    }
}

#[test]
fn test_update_then_read_back() {
    // --- 1. ARRANGE ---
    let (mut ctx, _device) = common::setup();
    let buffer = ctx.array_buffers().allocate(8, UsageHint::DynamicDraw).unwrap();

    // --- 2. ACT ---
    ctx.array_buffers()
        .update(&buffer, ByteRange::new(2, 5).unwrap(), &[9, 8, 7, 6])
        .unwrap();
    let bytes = ctx.array_buffers().read(&buffer).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(bytes, vec![0, 0, 9, 8, 7, 6, 0, 0]);
}

#[test]
fn test_update_outside_buffer_is_range_error() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();
    let buffer = ctx.array_buffers().allocate(4, UsageHint::DynamicDraw).unwrap();
    device.clear_calls();

    // --- 2. ACT ---
    let past_end = ctx
        .array_buffers()
        .update(&buffer, ByteRange::new(2, 5).unwrap(), &[1, 2, 3, 4]);
    let mismatched = ctx
        .array_buffers()
        .update(&buffer, ByteRange::new(0, 1).unwrap(), &[1, 2, 3]);

    // --- 3. ASSERT ---
    assert!(matches!(past_end, Err(StateError::RangeCheck(_))));
    assert!(matches!(mismatched, Err(StateError::RangeCheck(_))));
    assert_eq!(device.call_count("buffer_sub_data"), 0);
}

#[test]
fn test_reallocate_discards_contents() {
    // --- 1. ARRANGE ---
    let (mut ctx, _device) = common::setup();
    let buffer = ctx.array_buffers().allocate(4, UsageHint::StreamDraw).unwrap();
    ctx.array_buffers()
        .update(&buffer, ByteRange::from_size(4).unwrap(), &[1, 1, 1, 1])
        .unwrap();

    // --- 2. ACT ---
    ctx.array_buffers().reallocate(&buffer).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(ctx.array_buffers().read(&buffer).unwrap(), vec![0; 4]);
    assert_eq!(ctx.array_buffers().range(&buffer).unwrap().interval(), 4);
}

#[test]
fn test_zero_size_is_rejected_before_device() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();

    // --- 2. ACT ---
    let result = ctx.array_buffers().allocate(0, UsageHint::StaticDraw);

    // --- 3. ASSERT ---
    assert!(matches!(result, Err(StateError::RangeCheck(_))));
    assert!(device.calls().is_empty(), "No device call should be made");
}

#[test]
fn test_deleted_buffer_is_rejected() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();
    let buffer = ctx.array_buffers().allocate(16, UsageHint::StaticDraw).unwrap();

    // --- 2. ACT ---
    ctx.array_buffers().delete(&buffer).unwrap();

    // --- 3. ASSERT ---
    assert!(!ctx.array_buffers().any_is_bound(), "Delete should unbind");
    assert_eq!(device.live_object_count(), 0);
    for result in [
        ctx.array_buffers().bind(&buffer),
        ctx.array_buffers().delete(&buffer),
        ctx.array_buffers().reallocate(&buffer),
    ] {
        assert!(
            matches!(
                result,
                Err(StateError::Deleted {
                    kind: ObjectKind::ArrayBuffer,
                    ..
                })
            ),
            "Every use of a deleted buffer should fail, got {result:?}"
        );
    }
}

#[test]
fn test_recycled_name_does_not_revive_old_handle() {
    // --- 1. ARRANGE ---
    let (mut ctx, _device) = common::setup();
    let old = ctx.array_buffers().allocate(16, UsageHint::StaticDraw).unwrap();
    ctx.array_buffers().delete(&old).unwrap();

    // --- 2. ACT ---
    let new = ctx.array_buffers().allocate(16, UsageHint::StaticDraw).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(new.name(), old.name(), "The device should reuse the name");
    assert_ne!(new, old);
    assert!(matches!(
        ctx.array_buffers().is_bound(&old),
        Err(StateError::Deleted { .. })
    ));
    assert!(ctx.array_buffers().is_bound(&new).unwrap());
}

#[test]
fn test_buffer_from_other_context_is_rejected() {
    // --- 1. ARRANGE ---
    let (mut ctx, _device) = common::setup();
    let mut other = GraphicsContext::new(HeadlessDevice::new()).unwrap();
    let foreign = other.array_buffers().allocate(16, UsageHint::StaticDraw).unwrap();

    // --- 2. ACT ---
    let result = ctx.array_buffers().bind(&foreign);

    // --- 3. ASSERT ---
    match result {
        Err(StateError::WrongContext {
            kind,
            object_context,
            current_context,
            ..
        }) => {
            assert_eq!(kind, ObjectKind::ArrayBuffer);
            assert_eq!(object_context, other.id());
            assert_eq!(current_context, ctx.id());
        }
        other => panic!("Expected WrongContext, got {other:?}"),
    }
}

#[test]
fn test_device_failure_leaves_nothing_behind() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();
    device.fail_next("buffer_data", "out of memory");

    // --- 2. ACT ---
    let result = ctx.array_buffers().allocate(32, UsageHint::StaticDraw);

    // --- 3. ASSERT ---
    assert!(matches!(result, Err(StateError::Device(_))));
    assert_eq!(device.live_object_count(), 0, "The buffer should be discarded");
    assert!(!ctx.array_buffers().any_is_bound());
}
