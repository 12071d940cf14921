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

use vigil_core::api::{
    AttachmentPoint, BlitBuffers, BlitFilter, CubeFace, FramebufferStatus, FramebufferTarget,
    PixelArea, TextureFormat, TextureImageTarget, TextureParameters,
};
use vigil_core::StateError;
use vigil_state::{FramebufferAttachment, GraphicsContext, TextureRef};

/// Allocates a framebuffer with one color texture at point 0 and returns both.
fn color_framebuffer(
    ctx: &mut GraphicsContext,
    unit: usize,
) -> (vigil_core::FramebufferId, vigil_core::Texture2DId) {
    let unit = common::unit(ctx, unit);
    let texture = common::rgba_texture(ctx, &unit, 16);
    let mut builder = ctx.framebuffers().new_builder();
    builder
        .attach_color_texture_2d(ctx, 0, 0, &texture)
        .unwrap();
    let framebuffer = ctx.framebuffers().allocate(&builder).unwrap();
    (framebuffer, texture)
}

#[test]
fn test_allocate_binds_as_draw_framebuffer() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();
    let units = ctx.textures().units();
    let color = common::rgba_texture(&mut ctx, &units[0], 16);
    let depth = common::depth_texture(&mut ctx, &units[1], 16);
    let mut builder = ctx.framebuffers().new_builder();
    builder.attach_color_texture_2d(&ctx, 1, 0, &color).unwrap();
    builder.attach_depth_texture_2d(&ctx, &depth).unwrap();

    // --- 2. ACT ---
    let framebuffer = ctx.framebuffers().allocate(&builder).unwrap();

    // --- 3. ASSERT ---
    let framebuffers = ctx.framebuffers();
    assert!(framebuffers.is_draw_bound(&framebuffer).unwrap());
    assert!(!framebuffers.any_read_bound());
    assert_eq!(
        framebuffers.attachments(&framebuffer).unwrap(),
        vec![
            (
                AttachmentPoint::Color(1),
                FramebufferAttachment {
                    texture: TextureRef::Texture2D(color),
                    image: TextureImageTarget::Texture2D,
                }
            ),
            (
                AttachmentPoint::Depth,
                FramebufferAttachment {
                    texture: TextureRef::Texture2D(depth),
                    image: TextureImageTarget::Texture2D,
                }
            ),
        ]
    );
    assert_eq!(framebuffers.draw_buffers(&framebuffer).unwrap()[0], Some(1));
    assert_eq!(framebuffers.references(&framebuffer).unwrap().len(), 2);
    assert_eq!(ctx.textures().attached_to(color).unwrap(), vec![framebuffer]);
    assert_eq!(
        device.bound_framebuffer(FramebufferTarget::Draw),
        framebuffer.name()
    );
}

#[test]
fn test_cube_face_attachment() {
    // --- 1. ARRANGE ---
    let (mut ctx, _device) = common::setup();
    let unit = common::unit(&mut ctx, 0);
    let cube = ctx
        .textures()
        .allocate_cube(&unit, 16, TextureFormat::Rgba16f, TextureParameters::default())
        .unwrap();
    let mut builder = ctx.framebuffers().new_builder();
    builder
        .attach_color_texture_cube_face(&ctx, 0, 0, &cube, CubeFace::NegativeY)
        .unwrap();

    // --- 2. ACT ---
    let framebuffer = ctx.framebuffers().allocate(&builder).unwrap();

    // --- 3. ASSERT ---
    let attachments = ctx.framebuffers().attachments(&framebuffer).unwrap();
    assert_eq!(
        attachments[0].1.image,
        TextureImageTarget::CubeFace(CubeFace::NegativeY)
    );
    assert!(ctx.framebuffers().draw_references(cube));
}

#[test]
fn test_incomplete_framebuffer_is_deleted() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();
    let builder = ctx.framebuffers().new_builder();

    // --- 2. ACT ---
    let result = ctx.framebuffers().allocate(&builder);

    // --- 3. ASSERT ---
    assert!(matches!(
        result,
        Err(StateError::FramebufferInvalid(
            FramebufferStatus::IncompleteMissingAttachment
        ))
    ));
    assert_eq!(device.live_object_count(), 0);
    assert!(!ctx.framebuffers().any_draw_bound());
    assert_eq!(device.bound_framebuffer(FramebufferTarget::Draw), 0);
}

#[test]
fn test_failed_allocation_restores_previous_draw_binding() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();
    let (first, _) = color_framebuffer(&mut ctx, 0);
    let unit = common::unit(&mut ctx, 1);
    let texture = common::rgba_texture(&mut ctx, &unit, 16);
    let mut builder = ctx.framebuffers().new_builder();
    builder.attach_color_texture_2d(&ctx, 0, 0, &texture).unwrap();
    device.set_framebuffer_status_override(Some(FramebufferStatus::Unsupported));

    // --- 2. ACT ---
    let result = ctx.framebuffers().allocate(&builder);

    // --- 3. ASSERT ---
    assert!(matches!(
        result,
        Err(StateError::FramebufferInvalid(FramebufferStatus::Unsupported))
    ));
    assert_eq!(ctx.framebuffers().draw_bound(), Some(first));
    assert_eq!(device.bound_framebuffer(FramebufferTarget::Draw), first.name());
    assert!(ctx.textures().attached_to(texture).unwrap().is_empty());
}

#[test]
fn test_builder_checks_limits_and_formats() {
    // --- 1. ARRANGE ---
    let (mut ctx, _device) = common::setup();
    let unit = common::unit(&mut ctx, 0);
    let color = common::rgba_texture(&mut ctx, &unit, 8);
    let depth_stencil = ctx
        .textures()
        .allocate_2d(
            &unit,
            8,
            8,
            TextureFormat::Depth24Stencil8,
            TextureParameters::default(),
        )
        .unwrap();
    let points = ctx.framebuffers().max_color_attachments();
    let draw_buffers = ctx.framebuffers().max_draw_buffers();
    let mut builder = ctx.framebuffers().new_builder();

    // --- 2. ACT ---
    let bad_point = builder.attach_color_texture_2d(&ctx, points, 0, &color);
    let bad_draw_buffer = builder.attach_color_texture_2d(&ctx, 0, draw_buffers, &color);
    let bad_depth = builder.attach_depth_texture_2d(&ctx, &depth_stencil);
    let good_depth_stencil = builder.attach_depth_stencil_texture_2d(&ctx, &depth_stencil);

    // --- 3. ASSERT ---
    assert!(matches!(bad_point, Err(StateError::RangeCheck(_))));
    assert!(matches!(bad_draw_buffer, Err(StateError::RangeCheck(_))));
    assert!(matches!(
        bad_depth,
        Err(StateError::TextureFormat {
            requirement: "depth-renderable",
            ..
        })
    ));
    assert!(good_depth_stencil.is_ok());
}

#[test]
fn test_sampling_draw_attachment_is_feedback_loop() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();
    let (framebuffer, texture) = color_framebuffer(&mut ctx, 0);
    let units = ctx.textures().units();
    device.clear_calls();

    // --- 2. ACT ---
    let rebind_same_unit = ctx.textures().bind_2d(&units[0], &texture);
    let bind_other_unit = ctx.textures().bind_2d(&units[4], &texture);
    let update = ctx
        .textures()
        .update_2d(&units[0], PixelArea::of_size(1, 1), &[0; 4]);

    // --- 3. ASSERT ---
    for result in [rebind_same_unit, bind_other_unit, update] {
        match result {
            Err(StateError::FeedbackLoop {
                framebuffer: f,
                texture: t,
            }) => {
                assert_eq!(f, framebuffer.name());
                assert_eq!(t, texture.name());
            }
            other => panic!("Expected FeedbackLoop, got {other:?}"),
        }
    }
    assert!(device.calls().is_empty(), "Nothing should reach the device");
}

#[test]
fn test_feedback_clears_once_draw_framebuffer_unbound() {
    // --- 1. ARRANGE ---
    let (mut ctx, _device) = common::setup();
    let (_, texture) = color_framebuffer(&mut ctx, 0);
    let unit = common::unit(&mut ctx, 2);

    // --- 2. ACT ---
    ctx.framebuffers().unbind_draw().unwrap();
    let result = ctx.textures().bind_2d(&unit, &texture);

    // --- 3. ASSERT ---
    assert!(result.is_ok());
    assert!(!ctx.framebuffers().draw_references(texture));
}

#[test]
fn test_deleting_texture_detaches_it() {
    // --- 1. ARRANGE ---
    let (mut ctx, _device) = common::setup();
    let (framebuffer, texture) = color_framebuffer(&mut ctx, 0);

    // --- 2. ACT ---
    ctx.textures().delete_2d(&texture).unwrap();

    // --- 3. ASSERT ---
    let framebuffers = ctx.framebuffers();
    assert!(framebuffers.attachments(&framebuffer).unwrap().is_empty());
    assert!(framebuffers.references(&framebuffer).unwrap().is_empty());
    assert_eq!(
        framebuffers.validate_draw().unwrap(),
        FramebufferStatus::IncompleteMissingAttachment
    );
}

#[test]
fn test_validate_requires_binding() {
    // --- 1. ARRANGE ---
    let (mut ctx, _device) = common::setup();
    let (framebuffer, _) = color_framebuffer(&mut ctx, 0);

    // --- 2. ACT ---
    let draw = ctx.framebuffers().validate_draw();
    let read = ctx.framebuffers().validate_read();
    ctx.framebuffers().bind_read(&framebuffer).unwrap();
    let read_bound = ctx.framebuffers().validate_read();

    // --- 3. ASSERT ---
    assert_eq!(draw.unwrap(), FramebufferStatus::Complete);
    assert!(matches!(read, Err(StateError::FramebufferNotBound("read"))));
    assert_eq!(read_bound.unwrap(), FramebufferStatus::Complete);
}

#[test]
fn test_blit_rules() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();
    let (source, _) = color_framebuffer(&mut ctx, 0);
    let (target, _) = color_framebuffer(&mut ctx, 1);
    let area = PixelArea::of_size(16, 16);

    // --- 2. ACT ---
    let unbound = ctx
        .framebuffers()
        .blit(area, area, BlitBuffers::COLOR, BlitFilter::Nearest);
    ctx.framebuffers().bind_read(&target).unwrap();
    let same = ctx
        .framebuffers()
        .blit(area, area, BlitBuffers::COLOR, BlitFilter::Nearest);
    ctx.framebuffers().bind_read(&source).unwrap();
    let linear_depth = ctx
        .framebuffers()
        .blit(area, area, BlitBuffers::DEPTH, BlitFilter::Linear);
    let ok = ctx
        .framebuffers()
        .blit(area, area, BlitBuffers::COLOR, BlitFilter::Linear);

    // --- 3. ASSERT ---
    assert!(matches!(unbound, Err(StateError::FramebufferNotBound("read"))));
    assert!(matches!(same, Err(StateError::FramebufferReadDrawSame(n)) if n == target.name()));
    assert!(matches!(linear_depth, Err(StateError::FramebufferWrongBlitFilter)));
    assert!(ok.is_ok());
    assert_eq!(device.call_count("blit_framebuffer"), 1);
}

#[test]
fn test_delete_unbinds_both_targets() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();
    let (framebuffer, texture) = color_framebuffer(&mut ctx, 0);
    ctx.framebuffers().bind_read(&framebuffer).unwrap();

    // --- 2. ACT ---
    ctx.framebuffers().delete(&framebuffer).unwrap();

    // --- 3. ASSERT ---
    assert!(!ctx.framebuffers().any_draw_bound());
    assert!(!ctx.framebuffers().any_read_bound());
    assert_eq!(device.bound_framebuffer(FramebufferTarget::Read), 0);
    assert!(ctx.textures().attached_to(texture).unwrap().is_empty());
    assert!(matches!(
        ctx.framebuffers().bind_draw(&framebuffer),
        Err(StateError::Deleted { .. })
    ));
}

#[test]
fn test_rebinding_draw_framebuffer_is_elided() {
    // --- 1. ARRANGE ---
    let (mut ctx, device) = common::setup();
    let (framebuffer, _) = color_framebuffer(&mut ctx, 0);
    device.clear_calls();

    // --- 2. ACT ---
    ctx.framebuffers().bind_draw(&framebuffer).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(device.call_count("bind_framebuffer"), 0);
}
