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

use vigil_core::api::{BufferTarget, ByteRange, IndexType, UsageHint};
use vigil_core::StateError;
use vigil_state::ArrayDependency;

#[test]
fn test_allocate_on_default_object() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();

    // --- 2. ACT ---
    let ib = ctx
        .index_buffers()
        .allocate(6, IndexType::U16, UsageHint::StaticDraw)
        .unwrap();

    // --- 3. ASSERT ---
    let default = ctx.array_objects().default();
    let index_buffers = ctx.index_buffers();
    assert_eq!(index_buffers.currently_bound(), Some(ib));
    assert_eq!(index_buffers.range(&ib).unwrap().interval(), 12);
    assert_eq!(index_buffers.indices(&ib).unwrap(), 6);
    assert_eq!(index_buffers.index_type(&ib).unwrap(), IndexType::U16);
    assert_eq!(index_buffers.referrers(&ib).unwrap(), vec![default]);
    assert_eq!(device.element_buffer_of(0), Some(ib.name()));
}

#[test]
fn test_unbind_on_default_object() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();
    let ib = ctx
        .index_buffers()
        .allocate(3, IndexType::U8, UsageHint::StaticDraw)
        .unwrap();

    // --- 2. ACT ---
    ctx.index_buffers().unbind().unwrap();

    // --- 3. ASSERT ---
    assert!(!ctx.index_buffers().any_is_bound());
    assert!(ctx.index_buffers().referrers(&ib).unwrap().is_empty());
    assert_eq!(device.bound_buffer(BufferTarget::ElementArray), 0);
}

#[test]
fn test_non_rebindable_object_refuses_new_index_buffer() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();
    let vbo = ctx.array_buffers().allocate(48, UsageHint::StaticDraw).unwrap();
    let mut builder = ctx.array_objects().new_builder();
    builder
        .set_attribute_floating(&ctx, 0, common::float_attribute(vbo, 3, 0))
        .unwrap();
    let array = ctx.array_objects().allocate(&builder).unwrap();
    device.clear_calls();

    // --- 2. ACT ---
    let result = ctx
        .index_buffers()
        .allocate(6, IndexType::U16, UsageHint::StaticDraw);

    // --- 3. ASSERT ---
    match result {
        Err(StateError::IndexBufferAlreadyConfigured {
            array_object,
            attached,
            ..
        }) => {
            assert_eq!(array_object, array.name());
            assert_eq!(attached, None);
        }
        other => panic!("Expected IndexBufferAlreadyConfigured, got {other:?}"),
    }
    assert_eq!(device.call_count("gen_buffer"), 0, "Nothing should be created");
}

#[test]
fn test_non_rebindable_object_accepts_its_own_index_buffer() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();
    let ib = ctx
        .index_buffers()
        .allocate(6, IndexType::U16, UsageHint::StaticDraw)
        .unwrap();
    let other = ctx
        .index_buffers()
        .allocate(6, IndexType::U16, UsageHint::StaticDraw)
        .unwrap();
    let mut builder = ctx.array_objects().new_builder();
    builder.set_index_buffer(&ctx, &ib).unwrap();
    ctx.array_objects().allocate(&builder).unwrap();
    device.clear_calls();

    // --- 2. ACT ---
    let same = ctx.index_buffers().bind(&ib);
    let different = ctx.index_buffers().bind(&other);
    let unbind = ctx.index_buffers().unbind();

    // --- 3. ASSERT ---
    assert!(same.is_ok());
    assert!(matches!(
        different,
        Err(StateError::IndexBufferAlreadyConfigured { .. })
    ));
    assert!(matches!(
        unbind,
        Err(StateError::IndexBufferAlreadyConfigured { .. })
    ));
    assert_eq!(device.call_count("bind_buffer"), 0);
    assert_eq!(ctx.index_buffers().currently_bound(), Some(ib));
}

#[test]
fn test_rebindable_object_accepts_any_index_buffer() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();
    let first = ctx
        .index_buffers()
        .allocate(6, IndexType::U16, UsageHint::StaticDraw)
        .unwrap();
    let mut builder = ctx.array_objects().new_builder();
    builder.set_index_buffer(&ctx, &first).unwrap();
    builder.set_index_buffer_rebindable(true);
    let array = ctx.array_objects().allocate(&builder).unwrap();

    // --- 2. ACT ---
    let second = ctx
        .index_buffers()
        .allocate(12, IndexType::U32, UsageHint::DynamicDraw)
        .unwrap();

    // --- 3. ASSERT ---
    let arrays = ctx.array_objects();
    assert_eq!(arrays.index_buffer_of(&array).unwrap(), Some(second));
    let references = arrays.references(&array).unwrap();
    assert!(references.contains(&ArrayDependency::IndexBuffer(second)));
    assert!(!references.contains(&ArrayDependency::IndexBuffer(first)));
    assert_eq!(
        ctx.index_buffers().owner(&first).unwrap(),
        None,
        "Taken from the default object, then replaced"
    );
    assert_eq!(ctx.index_buffers().owner(&second).unwrap(), Some(array));
    assert_eq!(device.element_buffer_of(array.name()), Some(second.name()));
}

#[test]
fn test_index_buffer_moves_to_newest_owner() {
    // --- 1. ARRANGE ---
    let (mut ctx, _device) = common::setup();
    let ib = ctx
        .index_buffers()
        .allocate(6, IndexType::U16, UsageHint::StaticDraw)
        .unwrap();
    let default = ctx.array_objects().default();
    let mut builder = ctx.array_objects().new_builder();
    builder.set_index_buffer(&ctx, &ib).unwrap();

    // --- 2. ACT ---
    let a = ctx.array_objects().allocate(&builder).unwrap();
    let owner_after_a = ctx.index_buffers().owner(&ib).unwrap();
    let b = ctx.array_objects().allocate(&builder).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(owner_after_a, Some(a));
    assert_eq!(ctx.index_buffers().referrers(&ib).unwrap(), vec![b]);
    let arrays = ctx.array_objects();
    assert_eq!(arrays.index_buffer_of(&b).unwrap(), Some(ib));
    assert_eq!(arrays.index_buffer_of(&a).unwrap(), None, "The previous owner is detached");
    assert_eq!(arrays.index_buffer_of(&default).unwrap(), None);
    assert!(arrays.references(&a).unwrap().is_empty());
}

#[test]
fn test_bind_on_default_object_takes_ownership() {
    // --- 1. ARRANGE ---
    let (mut ctx, _device) = common::setup();
    let ib = ctx
        .index_buffers()
        .allocate(6, IndexType::U16, UsageHint::StaticDraw)
        .unwrap();
    let mut builder = ctx.array_objects().new_builder();
    builder.set_index_buffer(&ctx, &ib).unwrap();
    let array = ctx.array_objects().allocate(&builder).unwrap();
    ctx.array_objects().unbind().unwrap();

    // --- 2. ACT ---
    ctx.index_buffers().bind(&ib).unwrap();

    // --- 3. ASSERT ---
    let default = ctx.array_objects().default();
    assert_eq!(ctx.index_buffers().owner(&ib).unwrap(), Some(default));
    assert_eq!(ctx.index_buffers().currently_bound(), Some(ib));
    assert_eq!(ctx.array_objects().index_buffer_of(&array).unwrap(), None);
    assert!(!ctx
        .array_objects()
        .references(&array)
        .unwrap()
        .contains(&ArrayDependency::IndexBuffer(ib)));
}

#[test]
fn test_update_requires_current_index_buffer() {
    // --- 1. ARRANGE ---
    let (mut ctx, _device) = common::setup();
    let ib = ctx
        .index_buffers()
        .allocate(4, IndexType::U8, UsageHint::DynamicDraw)
        .unwrap();

    // --- 2. ACT ---
    ctx.index_buffers()
        .update(&ib, ByteRange::new(1, 2).unwrap(), &[5, 6])
        .unwrap();
    let bytes = ctx.index_buffers().read(&ib).unwrap();
    ctx.index_buffers().unbind().unwrap();
    let unbound = ctx.index_buffers().read(&ib);

    // --- 3. ASSERT ---
    assert_eq!(bytes, vec![0, 5, 6, 0]);
    assert!(matches!(unbound, Err(StateError::BufferNotBound { .. })));
}

#[test]
fn test_delete_detaches_from_every_object() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();
    let ib = ctx
        .index_buffers()
        .allocate(6, IndexType::U16, UsageHint::StaticDraw)
        .unwrap();
    let mut builder = ctx.array_objects().new_builder();
    builder.set_index_buffer(&ctx, &ib).unwrap();
    let array = ctx.array_objects().allocate(&builder).unwrap();

    // --- 2. ACT ---
    ctx.index_buffers().delete(&ib).unwrap();

    // --- 3. ASSERT ---
    let arrays = ctx.array_objects();
    assert_eq!(arrays.index_buffer_of(&array).unwrap(), None);
    assert!(arrays.references(&array).unwrap().is_empty());
    let default = arrays.default();
    assert_eq!(arrays.index_buffer_of(&default).unwrap(), None);
    assert_eq!(device.element_buffer_of(array.name()), None);
    assert!(matches!(
        ctx.index_buffers().bind(&ib),
        Err(StateError::Deleted { .. })
    ));
}

#[test]
fn test_failed_allocation_restores_previous_index_buffer() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();
    let ib = ctx
        .index_buffers()
        .allocate(6, IndexType::U16, UsageHint::StaticDraw)
        .unwrap();
    device.fail_next("buffer_data", "out of memory");

    // --- 2. ACT ---
    let result = ctx
        .index_buffers()
        .allocate(6, IndexType::U16, UsageHint::StaticDraw);

    // --- 3. ASSERT ---
    assert!(matches!(result, Err(StateError::Device(_))));
    assert_eq!(ctx.index_buffers().currently_bound(), Some(ib));
    assert_eq!(device.element_buffer_of(0), Some(ib.name()));
    assert_eq!(device.live_object_count(), 1);
}

#[test]
fn test_zero_indices_is_range_error() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();

    // --- 2. ACT ---
    let result = ctx
        .index_buffers()
        .allocate(0, IndexType::U32, UsageHint::StaticDraw);

    // --- 3. ASSERT ---
    assert!(matches!(result, Err(StateError::RangeCheck(_))));
    assert!(device.calls().is_empty());
}
