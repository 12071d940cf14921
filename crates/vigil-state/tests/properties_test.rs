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

//! Invariants checked over random operation sequences.

mod common;

use std::collections::HashSet;

use proptest::prelude::*;
use vigil_core::api::{IndexType, TextureFormat, TextureParameters, UsageHint};
use vigil_core::{
    ArrayBufferId, ArrayObjectId, FramebufferId, IndexBufferId, ProgramId, StateError,
};
use vigil_infra::HeadlessDevice;
use vigil_state::{ArrayDependency, GraphicsContext, TextureRef};

const TRACKED_UNITS: usize = 4;

#[derive(Debug, Clone)]
enum ArrayOp {
    AllocateBuffer,
    BindBuffer(usize),
    UnbindBuffer,
    DeleteBuffer(usize),
    AllocateIndexBuffer,
    BindIndexBuffer(usize),
    DeleteIndexBuffer(usize),
    AllocateArray {
        slots: Vec<(u32, usize)>,
        index_buffer: Option<usize>,
        rebindable: bool,
    },
    BindArray(usize),
    UnbindArray,
    DeleteArray(usize),
}

fn array_op() -> impl Strategy<Value = ArrayOp> {
    prop_oneof![
        Just(ArrayOp::AllocateBuffer),
        any::<usize>().prop_map(ArrayOp::BindBuffer),
        Just(ArrayOp::UnbindBuffer),
        any::<usize>().prop_map(ArrayOp::DeleteBuffer),
        Just(ArrayOp::AllocateIndexBuffer),
        any::<usize>().prop_map(ArrayOp::BindIndexBuffer),
        any::<usize>().prop_map(ArrayOp::DeleteIndexBuffer),
        (
            prop::collection::vec((0u32..16, any::<usize>()), 0..4),
            prop::option::of(any::<usize>()),
            any::<bool>(),
        )
            .prop_map(|(slots, index_buffer, rebindable)| ArrayOp::AllocateArray {
                slots,
                index_buffer,
                rebindable,
            }),
        any::<usize>().prop_map(ArrayOp::BindArray),
        Just(ArrayOp::UnbindArray),
        any::<usize>().prop_map(ArrayOp::DeleteArray),
    ]
}

#[derive(Default)]
struct ArrayWorld {
    buffers: Vec<ArrayBufferId>,
    index_buffers: Vec<IndexBufferId>,
    arrays: Vec<ArrayObjectId>,
}

fn pick<T: Copy>(items: &[T], index: usize) -> Option<T> {
    if items.is_empty() {
        None
    } else {
        Some(items[index % items.len()])
    }
}

/// Applies `op`, checking binding idempotence on the way. Refused operations are fine.
fn apply(
    ctx: &mut GraphicsContext,
    device: &HeadlessDevice,
    world: &mut ArrayWorld,
    op: &ArrayOp,
) -> Result<(), TestCaseError> {
    match op {
        ArrayOp::AllocateBuffer => {
            world
                .buffers
                .push(ctx.array_buffers().allocate(64, UsageHint::StaticDraw).unwrap());
        }
        ArrayOp::BindBuffer(i) => {
            if let Some(buffer) = pick(&world.buffers, *i) {
                device.clear_calls();
                let first = ctx.array_buffers().bind(&buffer);
                let second = ctx.array_buffers().bind(&buffer);
                if first.is_ok() {
                    prop_assert!(second.is_ok());
                    prop_assert!(device.call_count("bind_buffer") <= 1);
                    prop_assert_eq!(ctx.array_buffers().currently_bound(), Some(buffer));
                } else {
                    let first_deleted = matches!(first, Err(StateError::Deleted { .. }));
                    prop_assert!(first_deleted);
                }
            }
        }
        ArrayOp::UnbindBuffer => ctx.array_buffers().unbind().unwrap(),
        ArrayOp::DeleteBuffer(i) => {
            if let Some(buffer) = pick(&world.buffers, *i) {
                let _ = ctx.array_buffers().delete(&buffer);
            }
        }
        ArrayOp::AllocateIndexBuffer => {
            if let Ok(index_buffer) =
                ctx.index_buffers()
                    .allocate(6, IndexType::U16, UsageHint::StaticDraw)
            {
                world.index_buffers.push(index_buffer);
            }
        }
        ArrayOp::BindIndexBuffer(i) => {
            if let Some(index_buffer) = pick(&world.index_buffers, *i) {
                let _ = ctx.index_buffers().bind(&index_buffer);
            }
        }
        ArrayOp::DeleteIndexBuffer(i) => {
            if let Some(index_buffer) = pick(&world.index_buffers, *i) {
                let _ = ctx.index_buffers().delete(&index_buffer);
            }
        }
        ArrayOp::AllocateArray {
            slots,
            index_buffer,
            rebindable,
        } => {
            let mut builder = ctx.array_objects().new_builder();
            for (slot, i) in slots {
                if let Some(buffer) = pick(&world.buffers, *i) {
                    let _ = builder.set_attribute_floating(
                        ctx,
                        *slot,
                        common::float_attribute(buffer, 4, 0),
                    );
                }
            }
            if let Some(index_buffer) = index_buffer.and_then(|i| pick(&world.index_buffers, i)) {
                let _ = builder.set_index_buffer(ctx, &index_buffer);
            }
            builder.set_index_buffer_rebindable(*rebindable);
            if let Ok(array) = ctx.array_objects().allocate(&builder) {
                world.arrays.push(array);
            }
        }
        ArrayOp::BindArray(i) => {
            if let Some(array) = pick(&world.arrays, *i) {
                device.clear_calls();
                let first = ctx.array_objects().bind(&array);
                let second = ctx.array_objects().bind(&array);
                if first.is_ok() {
                    prop_assert!(second.is_ok());
                    prop_assert!(device.call_count("bind_vertex_array") <= 1);
                    prop_assert_eq!(ctx.array_objects().currently_bound(), array);
                }
            }
        }
        ArrayOp::UnbindArray => ctx.array_objects().unbind().unwrap(),
        ArrayOp::DeleteArray(i) => {
            if let Some(array) = pick(&world.arrays, *i) {
                let _ = ctx.array_objects().delete(&array);
            }
        }
    }
    Ok(())
}

/// Every live array object references exactly its populated sources and its index buffer,
/// and every index buffer has at most one owner.
fn check_reference_graph(
    ctx: &mut GraphicsContext,
    world: &ArrayWorld,
) -> Result<(), TestCaseError> {
    let default = ctx.array_objects().default();
    for array in world.arrays.iter().chain(std::iter::once(&default)) {
        let Ok(references) = ctx.array_objects().references(array) else {
            continue;
        };
        let mut expected = HashSet::new();
        for slot in 0..ctx.array_objects().max_attributes() {
            if let Some(attribute) = ctx.array_objects().attribute_at(array, slot).unwrap() {
                expected.insert(ArrayDependency::ArrayBuffer(attribute.buffer()));
            }
        }
        if let Some(index_buffer) = ctx.array_objects().index_buffer_of(array).unwrap() {
            expected.insert(ArrayDependency::IndexBuffer(index_buffer));
            prop_assert_eq!(ctx.index_buffers().owner(&index_buffer).unwrap(), Some(*array));
        }
        prop_assert_eq!(&references, &expected);

        for dependency in references {
            let live = match dependency {
                ArrayDependency::ArrayBuffer(buffer) => ctx.array_buffers().range(&buffer).is_ok(),
                ArrayDependency::IndexBuffer(index_buffer) => {
                    ctx.index_buffers().range(&index_buffer).is_ok()
                }
            };
            prop_assert!(live, "{dependency:?} is referenced after deletion");
        }
    }

    for index_buffer in &world.index_buffers {
        let Ok(owners) = ctx.index_buffers().referrers(index_buffer) else {
            continue;
        };
        prop_assert!(owners.len() <= 1, "{owners:?} all own index buffer {}", index_buffer.name());
        for owner in owners {
            prop_assert_eq!(
                ctx.array_objects().index_buffer_of(&owner).unwrap(),
                Some(*index_buffer)
            );
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
enum TextureOp {
    Allocate2D(usize),
    AllocateCube(usize),
    Bind(usize, usize),
    Unbind(usize),
    Delete(usize),
}

fn texture_op() -> impl Strategy<Value = TextureOp> {
    prop_oneof![
        (0..TRACKED_UNITS).prop_map(TextureOp::Allocate2D),
        (0..TRACKED_UNITS).prop_map(TextureOp::AllocateCube),
        (0..TRACKED_UNITS, any::<usize>()).prop_map(|(u, t)| TextureOp::Bind(u, t)),
        (0..TRACKED_UNITS).prop_map(TextureOp::Unbind),
        any::<usize>().prop_map(TextureOp::Delete),
    ]
}

/// A texture is in the reverse index of a unit exactly when the unit holds it.
fn check_texture_index(
    ctx: &mut GraphicsContext,
    device: &HeadlessDevice,
    textures: &[TextureRef],
) -> Result<(), TestCaseError> {
    let units = ctx.textures().units();
    for texture in textures {
        let Ok(bound_units) = ctx.textures().units_of(*texture) else {
            continue;
        };
        prop_assert!(bound_units.iter().all(|u| (u as usize) < TRACKED_UNITS));
        for (index, unit) in units.iter().take(TRACKED_UNITS).enumerate() {
            let holds = ctx.textures().bound_to(unit).unwrap() == Some(*texture);
            prop_assert_eq!(bound_units.contains(index as u32), holds);
            if holds {
                prop_assert_eq!(
                    device.bound_texture(index as u32, texture.target()),
                    texture.name()
                );
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
enum BindOp {
    BindDraw(usize),
    BindRead(usize),
    UnbindDraw,
    UnbindRead,
    Activate(usize),
    Deactivate,
}

fn bind_op() -> impl Strategy<Value = BindOp> {
    prop_oneof![
        (0..3usize).prop_map(BindOp::BindDraw),
        (0..3usize).prop_map(BindOp::BindRead),
        Just(BindOp::UnbindDraw),
        Just(BindOp::UnbindRead),
        (0..3usize).prop_map(BindOp::Activate),
        Just(BindOp::Deactivate),
    ]
}

/// Runs `op`, then runs it again and returns the device calls the repeat issued.
fn repeat_bind_op(
    ctx: &mut GraphicsContext,
    device: &HeadlessDevice,
    framebuffers: &[FramebufferId],
    programs: &[ProgramId],
    op: &BindOp,
) -> usize {
    let run = |ctx: &mut GraphicsContext| match op {
        BindOp::BindDraw(i) => ctx.framebuffers().bind_draw(&framebuffers[*i]).unwrap(),
        BindOp::BindRead(i) => ctx.framebuffers().bind_read(&framebuffers[*i]).unwrap(),
        BindOp::UnbindDraw => ctx.framebuffers().unbind_draw().unwrap(),
        BindOp::UnbindRead => ctx.framebuffers().unbind_read().unwrap(),
        BindOp::Activate(i) => ctx.shaders().activate(&programs[*i]).unwrap(),
        BindOp::Deactivate => ctx.shaders().deactivate().unwrap(),
    };
    run(ctx);
    device.clear_calls();
    run(ctx);
    device.calls().len()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_array_reference_graph(ops in prop::collection::vec(array_op(), 1..40)) {
        let (mut ctx, device) = common::setup();
        let mut world = ArrayWorld::default();
        for op in &ops {
            apply(&mut ctx, &device, &mut world, op)?;
            check_reference_graph(&mut ctx, &world)?;
        }

        let default = ctx.array_objects().default();
        let deleted = ctx.array_objects().delete(&default);
        prop_assert!(
            matches!(deleted, Err(StateError::ObjectNotDeletable { .. })),
            "default array object deletion returned {:?}",
            deleted
        );
    }

    #[test]
    fn prop_texture_reverse_index(ops in prop::collection::vec(texture_op(), 1..40)) {
        let (mut ctx, device) = common::setup();
        let units = ctx.textures().units();
        let mut textures: Vec<TextureRef> = Vec::new();
        for op in &ops {
            match op {
                TextureOp::Allocate2D(u) => {
                    let texture = ctx
                        .textures()
                        .allocate_2d(&units[*u], 4, 4, TextureFormat::Rgba8, TextureParameters::default())
                        .unwrap();
                    textures.push(texture.into());
                }
                TextureOp::AllocateCube(u) => {
                    let texture = ctx
                        .textures()
                        .allocate_cube(&units[*u], 4, TextureFormat::Rgba8, TextureParameters::default())
                        .unwrap();
                    textures.push(texture.into());
                }
                TextureOp::Bind(u, t) => {
                    if let Some(texture) = pick(&textures, *t) {
                        device.clear_calls();
                        let first = match texture {
                            TextureRef::Texture2D(id) => ctx.textures().bind_2d(&units[*u], &id),
                            TextureRef::Cube(id) => ctx.textures().bind_cube(&units[*u], &id),
                        };
                        if first.is_ok() {
                            device.clear_calls();
                            let second = match texture {
                                TextureRef::Texture2D(id) => ctx.textures().bind_2d(&units[*u], &id),
                                TextureRef::Cube(id) => ctx.textures().bind_cube(&units[*u], &id),
                            };
                            prop_assert!(second.is_ok());
                            prop_assert_eq!(device.call_count("bind_texture"), 0);
                            prop_assert_eq!(device.call_count("active_texture"), 0);
                            prop_assert_eq!(ctx.textures().bound_to(&units[*u]).unwrap(), Some(texture));
                        }
                    }
                }
                TextureOp::Unbind(u) => ctx.textures().unbind(&units[*u]).unwrap(),
                TextureOp::Delete(t) => {
                    if let Some(texture) = pick(&textures, *t) {
                        let _ = ctx.textures().delete(texture);
                    }
                }
            }
            check_texture_index(&mut ctx, &device, &textures)?;
        }
    }

    #[test]
    fn prop_repeated_framebuffer_and_program_binds_are_elided(
        ops in prop::collection::vec(bind_op(), 1..40)
    ) {
        let (mut ctx, device) = common::setup();
        let units = ctx.textures().units();
        let mut framebuffers = Vec::new();
        for unit in units.iter().take(3) {
            let texture = common::rgba_texture(&mut ctx, unit, 8);
            let mut builder = ctx.framebuffers().new_builder();
            builder.attach_color_texture_2d(&ctx, 0, 0, &texture).unwrap();
            framebuffers.push(ctx.framebuffers().allocate(&builder).unwrap());
        }
        ctx.framebuffers().unbind_draw().unwrap();
        let vertex = ctx.shaders().compile_vertex("v", &["void main() {}\n"]).unwrap();
        let fragment = ctx.shaders().compile_fragment("f", &["void main() {}\n"]).unwrap();
        let programs: Vec<ProgramId> = (0..3)
            .map(|i| {
                ctx.shaders()
                    .link(&format!("program {i}"), &vertex, None, &fragment)
                    .unwrap()
            })
            .collect();

        for op in &ops {
            let repeated_calls = repeat_bind_op(&mut ctx, &device, &framebuffers, &programs, op);
            prop_assert_eq!(repeated_calls, 0, "Repeating {:?} reached the device", op);
            match op {
                BindOp::BindDraw(i) => {
                    prop_assert_eq!(ctx.framebuffers().draw_bound(), Some(framebuffers[*i]));
                }
                BindOp::BindRead(i) => {
                    prop_assert_eq!(ctx.framebuffers().read_bound(), Some(framebuffers[*i]));
                }
                BindOp::UnbindDraw => {
                    prop_assert_eq!(ctx.framebuffers().draw_bound(), None);
                }
                BindOp::UnbindRead => {
                    prop_assert_eq!(ctx.framebuffers().read_bound(), None);
                }
                BindOp::Activate(i) => {
                    prop_assert_eq!(ctx.shaders().activated(), Some(programs[*i]));
                }
                BindOp::Deactivate => {
                    prop_assert_eq!(ctx.shaders().activated(), None);
                }
            }
        }
    }
}
