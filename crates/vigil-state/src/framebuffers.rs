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

//! Framebuffers, their texture attachments and the draw/read binding points.

use std::collections::{BTreeMap, HashSet};

use vigil_core::api::{
    AttachmentPoint, BlitBuffers, BlitFilter, CubeFace, FramebufferStatus, FramebufferTarget,
    PixelArea, TextureImageTarget,
};
use vigil_core::handle::{FramebufferId, FramebufferKey, Registry, Texture2DId, TextureCubeId};
use vigil_core::{ContextId, GraphicsDevice, ObjectKind, ReferenceContainer, StateError};

use crate::context::{checked_limit, GraphicsContext};
use crate::textures::TextureRef;

const MIN_COLOR_ATTACHMENTS: i32 = 8;
const MIN_DRAW_BUFFERS: i32 = 8;
const MAX_TRACKED_ATTACHMENTS: u32 = 1024;

/// A texture image attached to a color attachment point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorAttachment {
    /// A 2D texture.
    Texture2D(Texture2DId),
    /// One face of a cube texture.
    CubeFace(TextureCubeId, CubeFace),
}

impl ColorAttachment {
    fn texture(&self) -> TextureRef {
        match self {
            ColorAttachment::Texture2D(t) => TextureRef::Texture2D(*t),
            ColorAttachment::CubeFace(t, _) => TextureRef::Cube(*t),
        }
    }

    fn image(&self) -> TextureImageTarget {
        match self {
            ColorAttachment::Texture2D(_) => TextureImageTarget::Texture2D,
            ColorAttachment::CubeFace(_, face) => TextureImageTarget::CubeFace(*face),
        }
    }
}

/// A 2D texture attached to the depth or the depth-stencil point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthAttachment {
    /// Attached to the depth point.
    Depth(Texture2DId),
    /// Attached to the depth-stencil point.
    DepthStencil(Texture2DId),
}

impl DepthAttachment {
    fn texture(&self) -> Texture2DId {
        match self {
            DepthAttachment::Depth(t) | DepthAttachment::DepthStencil(t) => *t,
        }
    }

    fn point(&self) -> AttachmentPoint {
        match self {
            DepthAttachment::Depth(_) => AttachmentPoint::Depth,
            DepthAttachment::DepthStencil(_) => AttachmentPoint::DepthStencil,
        }
    }
}

/// One attachment of an allocated framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferAttachment {
    /// The attached texture.
    pub texture: TextureRef,
    /// The attached image of the texture.
    pub image: TextureImageTarget,
}

/// A description of a framebuffer that has not been allocated yet.
///
/// Obtained from [`Framebuffers::new_builder`].
#[derive(Debug, Clone)]
pub struct FramebufferBuilder {
    context: ContextId,
    colors: BTreeMap<u32, ColorAttachment>,
    depth: Option<DepthAttachment>,
    /// Entry `i` is the color point draw buffer `i` writes to.
    draw_buffers: Vec<Option<u32>>,
    max_color_attachments: u32,
}

impl FramebufferBuilder {
    /// Attaches a 2D texture at color point `point` and routes draw buffer `draw_buffer` to it.
    /// ## Errors
    /// * `StateError::RangeCheck` - If `point` or `draw_buffer` exceeds the device limits.
    /// * `StateError::TextureFormat` - If the texture format is not color-renderable.
    pub fn attach_color_texture_2d(
        &mut self,
        ctx: &GraphicsContext,
        point: u32,
        draw_buffer: u32,
        texture: &Texture2DId,
    ) -> Result<(), StateError> {
        self.attach_color(ctx, point, draw_buffer, ColorAttachment::Texture2D(*texture))
    }

    /// Attaches one face of a cube texture at color point `point`.
    pub fn attach_color_texture_cube_face(
        &mut self,
        ctx: &GraphicsContext,
        point: u32,
        draw_buffer: u32,
        texture: &TextureCubeId,
        face: CubeFace,
    ) -> Result<(), StateError> {
        self.attach_color(ctx, point, draw_buffer, ColorAttachment::CubeFace(*texture, face))
    }

    fn attach_color(
        &mut self,
        ctx: &GraphicsContext,
        point: u32,
        draw_buffer: u32,
        attachment: ColorAttachment,
    ) -> Result<(), StateError> {
        self.check_context(ctx)?;
        if point >= self.max_color_attachments {
            return Err(StateError::RangeCheck(format!(
                "Color attachment {point} is not in [0, {})",
                self.max_color_attachments
            )));
        }
        if draw_buffer as usize >= self.draw_buffers.len() {
            return Err(StateError::RangeCheck(format!(
                "Draw buffer {draw_buffer} is not in [0, {})",
                self.draw_buffers.len()
            )));
        }
        let format = ctx.textures.format_of(&attachment.texture())?;
        if !format.is_color_renderable() {
            return Err(StateError::TextureFormat {
                format,
                requirement: "color-renderable",
            });
        }
        self.detach_color(point);
        self.colors.insert(point, attachment);
        self.draw_buffers[draw_buffer as usize] = Some(point);
        Ok(())
    }

    /// Removes the color attachment at `point` and every draw buffer routed to it.
    pub fn detach_color(&mut self, point: u32) {
        self.colors.remove(&point);
        for entry in &mut self.draw_buffers {
            if *entry == Some(point) {
                *entry = None;
            }
        }
    }

    /// Attaches a 2D texture with a depth-renderable format at the depth point.
    pub fn attach_depth_texture_2d(
        &mut self,
        ctx: &GraphicsContext,
        texture: &Texture2DId,
    ) -> Result<(), StateError> {
        self.check_context(ctx)?;
        let format = ctx.textures.format_of(&TextureRef::Texture2D(*texture))?;
        if !format.is_depth_renderable() {
            return Err(StateError::TextureFormat {
                format,
                requirement: "depth-renderable",
            });
        }
        self.depth = Some(DepthAttachment::Depth(*texture));
        Ok(())
    }

    /// Attaches a 2D texture with a depth-stencil format at the depth-stencil point.
    pub fn attach_depth_stencil_texture_2d(
        &mut self,
        ctx: &GraphicsContext,
        texture: &Texture2DId,
    ) -> Result<(), StateError> {
        self.check_context(ctx)?;
        let format = ctx.textures.format_of(&TextureRef::Texture2D(*texture))?;
        if !format.is_depth_stencil_renderable() {
            return Err(StateError::TextureFormat {
                format,
                requirement: "depth-stencil-renderable",
            });
        }
        self.depth = Some(DepthAttachment::DepthStencil(*texture));
        Ok(())
    }

    /// Removes the depth or depth-stencil attachment.
    pub fn detach_depth(&mut self) {
        self.depth = None;
    }

    /// Returns the color attachment at `point`.
    pub fn color_at(&self, point: u32) -> Option<ColorAttachment> {
        self.colors.get(&point).copied()
    }

    /// Returns the depth or depth-stencil attachment.
    pub fn depth(&self) -> Option<DepthAttachment> {
        self.depth
    }

    /// Returns the draw buffer routing.
    pub fn draw_buffers(&self) -> &[Option<u32>] {
        &self.draw_buffers
    }

    fn attachments(&self) -> Vec<(AttachmentPoint, FramebufferAttachment)> {
        let colors = self.colors.iter().map(|(point, color)| {
            (
                AttachmentPoint::Color(*point),
                FramebufferAttachment {
                    texture: color.texture(),
                    image: color.image(),
                },
            )
        });
        let depth = self.depth.map(|depth| {
            (
                depth.point(),
                FramebufferAttachment {
                    texture: TextureRef::Texture2D(depth.texture()),
                    image: TextureImageTarget::Texture2D,
                },
            )
        });
        colors.chain(depth).collect()
    }

    fn check_context(&self, ctx: &GraphicsContext) -> Result<(), StateError> {
        if self.context != ctx.id() {
            return Err(StateError::WrongContext {
                kind: ObjectKind::FramebufferBuilder,
                name: 0,
                object_context: self.context,
                current_context: ctx.id(),
            });
        }
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct FramebufferRecord {
    pub(crate) attachments: BTreeMap<AttachmentPoint, FramebufferAttachment>,
    pub(crate) draw_buffers: Vec<Option<u32>>,
    /// One entry per attachment point.
    pub(crate) references: ReferenceContainer<TextureRef>,
}

#[derive(Debug)]
pub(crate) struct FramebufferState {
    pub(crate) registry: Registry<FramebufferKey, FramebufferRecord>,
    pub(crate) draw: Option<FramebufferId>,
    pub(crate) read: Option<FramebufferId>,
    max_color_attachments: u32,
    max_draw_buffers: u32,
}

impl FramebufferState {
    pub(crate) fn new(context: ContextId, device: &dyn GraphicsDevice) -> Result<Self, StateError> {
        let max_color_attachments = checked_limit(
            "color attachments",
            device.max_color_attachments()?,
            MIN_COLOR_ATTACHMENTS,
            MAX_TRACKED_ATTACHMENTS,
        )?;
        let max_draw_buffers = checked_limit(
            "draw buffers",
            device.max_draw_buffers()?,
            MIN_DRAW_BUFFERS,
            MAX_TRACKED_ATTACHMENTS,
        )?;
        Ok(Self {
            registry: Registry::new(context, ObjectKind::Framebuffer),
            draw: None,
            read: None,
            max_color_attachments,
            max_draw_buffers,
        })
    }

    /// Fails with `FeedbackLoop` if `texture` is attached to the bound draw framebuffer.
    pub(crate) fn check_feedback(&self, texture: &TextureRef) -> Result<(), StateError> {
        let Some(draw) = self.draw else {
            return Ok(());
        };
        let record = self.registry.get(&draw)?;
        if record.references.contains(texture) {
            return Err(StateError::FeedbackLoop {
                framebuffer: draw.name(),
                texture: texture.name(),
            });
        }
        Ok(())
    }

    /// Drops every attachment of `framebuffer` that uses `texture`, returning how many.
    pub(crate) fn forget_texture(&mut self, framebuffer: &FramebufferId, texture: &TextureRef) -> usize {
        let Ok(record) = self.registry.get_mut(framebuffer) else {
            return 0;
        };
        let before = record.attachments.len();
        record
            .attachments
            .retain(|_, attachment| attachment.texture != *texture);
        record.references.remove_all(*texture);
        before - record.attachments.len()
    }

    fn target_slot(&mut self, target: FramebufferTarget) -> &mut Option<FramebufferId> {
        match target {
            FramebufferTarget::Draw => &mut self.draw,
            FramebufferTarget::Read => &mut self.read,
        }
    }

    fn bind(
        &mut self,
        device: &dyn GraphicsDevice,
        target: FramebufferTarget,
        framebuffer: &FramebufferId,
    ) -> Result<(), StateError> {
        self.registry.validate(framebuffer)?;
        let slot = self.target_slot(target);
        if *slot == Some(*framebuffer) {
            log::trace!("Framebuffer {} already bound to {target:?}", framebuffer.name());
            return Ok(());
        }
        device.bind_framebuffer(target, framebuffer.name())?;
        *slot = Some(*framebuffer);
        Ok(())
    }

    fn unbind(
        &mut self,
        device: &dyn GraphicsDevice,
        target: FramebufferTarget,
    ) -> Result<(), StateError> {
        let slot = self.target_slot(target);
        if slot.is_some() {
            device.bind_framebuffer(target, 0)?;
            *slot = None;
        }
        Ok(())
    }

    fn is_bound(
        &self,
        target: FramebufferTarget,
        framebuffer: &FramebufferId,
    ) -> Result<bool, StateError> {
        self.registry.validate(framebuffer)?;
        let bound = match target {
            FramebufferTarget::Draw => self.draw,
            FramebufferTarget::Read => self.read,
        };
        Ok(bound == Some(*framebuffer))
    }
}

fn target_label(target: FramebufferTarget) -> &'static str {
    match target {
        FramebufferTarget::Draw => "draw",
        FramebufferTarget::Read => "read",
    }
}

/// Framebuffer construction and draw/read binding.
///
/// Obtained from [`GraphicsContext::framebuffers`].
pub struct Framebuffers<'a> {
    pub(crate) ctx: &'a mut GraphicsContext,
}

impl Framebuffers<'_> {
    /// Returns an empty builder.
    pub fn new_builder(&self) -> FramebufferBuilder {
        let state = &self.ctx.framebuffers;
        FramebufferBuilder {
            context: self.ctx.id(),
            colors: BTreeMap::new(),
            depth: None,
            draw_buffers: vec![None; state.max_draw_buffers as usize],
            max_color_attachments: state.max_color_attachments,
        }
    }

    /// Returns the number of color attachment points.
    pub fn max_color_attachments(&self) -> u32 {
        self.ctx.framebuffers.max_color_attachments
    }

    /// Returns the number of draw buffers.
    pub fn max_draw_buffers(&self) -> u32 {
        self.ctx.framebuffers.max_draw_buffers
    }

    /// Allocates a framebuffer from `builder` and leaves it bound as the draw framebuffer.
    /// ## Errors
    /// * `StateError::Deleted` - If an attached texture has been deleted since it was attached.
    /// * `StateError::FramebufferInvalid` - If the device reports the framebuffer incomplete.
    ///   The framebuffer is deleted again and the previous draw binding restored.
    pub fn allocate(&mut self, builder: &FramebufferBuilder) -> Result<FramebufferId, StateError> {
        builder.check_context(self.ctx)?;
        let GraphicsContext {
            device,
            textures,
            framebuffers,
            ..
        } = &mut *self.ctx;
        let device = device.as_ref();

        let attachments = builder.attachments();
        for (_, attachment) in &attachments {
            textures.validate(&attachment.texture)?;
        }

        let name = device.gen_framebuffer()?;
        if let Err(err) = configure(device, name, &attachments, &builder.draw_buffers) {
            let previous = framebuffers.draw.map_or(0, |f| f.name());
            if let Err(rebind) = device.bind_framebuffer(FramebufferTarget::Draw, previous) {
                log::warn!("Failed to restore draw framebuffer {previous}: {rebind}");
                framebuffers.draw = None;
            }
            if let Err(delete) = device.delete_framebuffer(name) {
                log::warn!("Failed to delete framebuffer {name} after a failed allocation: {delete}");
            }
            return Err(err);
        }

        let mut references = ReferenceContainer::new();
        for (_, attachment) in &attachments {
            references.add(attachment.texture);
        }
        let framebuffer = framebuffers.registry.create(
            name,
            FramebufferRecord {
                attachments: attachments.iter().copied().collect(),
                draw_buffers: builder.draw_buffers.clone(),
                references,
            },
        );
        framebuffers.draw = Some(framebuffer);
        for (_, attachment) in &attachments {
            if let Ok(referrers) = textures.referrers_mut(&attachment.texture) {
                referrers.add(framebuffer);
            }
        }
        log::debug!("Allocated framebuffer {name} with {} attachment(s)", attachments.len());
        Ok(framebuffer)
    }

    /// Binds `framebuffer` as the draw framebuffer.
    pub fn bind_draw(&mut self, framebuffer: &FramebufferId) -> Result<(), StateError> {
        let GraphicsContext {
            device,
            framebuffers,
            ..
        } = &mut *self.ctx;
        framebuffers.bind(device.as_ref(), FramebufferTarget::Draw, framebuffer)
    }

    /// Binds the default framebuffer as the draw framebuffer.
    pub fn unbind_draw(&mut self) -> Result<(), StateError> {
        let GraphicsContext {
            device,
            framebuffers,
            ..
        } = &mut *self.ctx;
        framebuffers.unbind(device.as_ref(), FramebufferTarget::Draw)
    }

    /// Binds `framebuffer` as the read framebuffer.
    pub fn bind_read(&mut self, framebuffer: &FramebufferId) -> Result<(), StateError> {
        let GraphicsContext {
            device,
            framebuffers,
            ..
        } = &mut *self.ctx;
        framebuffers.bind(device.as_ref(), FramebufferTarget::Read, framebuffer)
    }

    /// Binds the default framebuffer as the read framebuffer.
    pub fn unbind_read(&mut self) -> Result<(), StateError> {
        let GraphicsContext {
            device,
            framebuffers,
            ..
        } = &mut *self.ctx;
        framebuffers.unbind(device.as_ref(), FramebufferTarget::Read)
    }

    /// Returns the bound draw framebuffer.
    pub fn draw_bound(&self) -> Option<FramebufferId> {
        self.ctx.framebuffers.draw
    }

    /// Returns the bound read framebuffer.
    pub fn read_bound(&self) -> Option<FramebufferId> {
        self.ctx.framebuffers.read
    }

    /// Returns `true` if a non-default draw framebuffer is bound.
    pub fn any_draw_bound(&self) -> bool {
        self.ctx.framebuffers.draw.is_some()
    }

    /// Returns `true` if a non-default read framebuffer is bound.
    pub fn any_read_bound(&self) -> bool {
        self.ctx.framebuffers.read.is_some()
    }

    /// Returns `true` if `framebuffer` is the draw framebuffer.
    pub fn is_draw_bound(&self, framebuffer: &FramebufferId) -> Result<bool, StateError> {
        self.ctx
            .framebuffers
            .is_bound(FramebufferTarget::Draw, framebuffer)
    }

    /// Returns `true` if `framebuffer` is the read framebuffer.
    pub fn is_read_bound(&self, framebuffer: &FramebufferId) -> Result<bool, StateError> {
        self.ctx
            .framebuffers
            .is_bound(FramebufferTarget::Read, framebuffer)
    }

    /// Asks the device for the status of the bound draw framebuffer.
    /// ## Errors
    /// * `StateError::FramebufferNotBound` - If only the default framebuffer is bound.
    pub fn validate_draw(&self) -> Result<FramebufferStatus, StateError> {
        self.validate(FramebufferTarget::Draw)
    }

    /// Asks the device for the status of the bound read framebuffer.
    pub fn validate_read(&self) -> Result<FramebufferStatus, StateError> {
        self.validate(FramebufferTarget::Read)
    }

    fn validate(&self, target: FramebufferTarget) -> Result<FramebufferStatus, StateError> {
        let bound = match target {
            FramebufferTarget::Draw => self.ctx.framebuffers.draw,
            FramebufferTarget::Read => self.ctx.framebuffers.read,
        };
        if bound.is_none() {
            return Err(StateError::FramebufferNotBound(target_label(target)));
        }
        Ok(self.ctx.device.check_framebuffer_status(target)?)
    }

    /// Copies `source` of the read framebuffer to `target` of the draw framebuffer.
    /// ## Errors
    /// * `StateError::FramebufferNotBound` - If either binding is the default framebuffer.
    /// * `StateError::FramebufferReadDrawSame` - If both bindings name the same framebuffer.
    /// * `StateError::FramebufferWrongBlitFilter` - If depth or stencil is copied with
    ///   [`BlitFilter::Linear`].
    pub fn blit(
        &mut self,
        source: PixelArea,
        target: PixelArea,
        buffers: BlitBuffers,
        filter: BlitFilter,
    ) -> Result<(), StateError> {
        let state = &self.ctx.framebuffers;
        let read = state
            .read
            .ok_or(StateError::FramebufferNotBound(target_label(FramebufferTarget::Read)))?;
        let draw = state
            .draw
            .ok_or(StateError::FramebufferNotBound(target_label(FramebufferTarget::Draw)))?;
        if read == draw {
            return Err(StateError::FramebufferReadDrawSame(read.name()));
        }
        if filter == BlitFilter::Linear
            && buffers.intersects(BlitBuffers::DEPTH | BlitBuffers::STENCIL)
        {
            return Err(StateError::FramebufferWrongBlitFilter);
        }
        self.ctx
            .device
            .blit_framebuffer(source, target, buffers, filter)?;
        Ok(())
    }

    /// Returns the attachments of `framebuffer` in attachment point order.
    pub fn attachments(
        &self,
        framebuffer: &FramebufferId,
    ) -> Result<Vec<(AttachmentPoint, FramebufferAttachment)>, StateError> {
        let record = self.ctx.framebuffers.registry.get(framebuffer)?;
        Ok(record
            .attachments
            .iter()
            .map(|(point, attachment)| (*point, *attachment))
            .collect())
    }

    /// Returns the distinct textures attached to `framebuffer`.
    pub fn references(&self, framebuffer: &FramebufferId) -> Result<HashSet<TextureRef>, StateError> {
        Ok(self
            .ctx
            .framebuffers
            .registry
            .get(framebuffer)?
            .references
            .references())
    }

    /// Returns the draw buffer routing of `framebuffer`.
    pub fn draw_buffers(&self, framebuffer: &FramebufferId) -> Result<Vec<Option<u32>>, StateError> {
        Ok(self
            .ctx
            .framebuffers
            .registry
            .get(framebuffer)?
            .draw_buffers
            .clone())
    }

    /// Returns `true` if `texture` is attached to the bound draw framebuffer.
    pub fn draw_references(&self, texture: impl Into<TextureRef>) -> bool {
        let texture = texture.into();
        matches!(
            self.ctx.framebuffers.check_feedback(&texture),
            Err(StateError::FeedbackLoop { .. })
        )
    }

    /// Deletes `framebuffer`, rebinding the default framebuffer wherever it is bound.
    pub fn delete(&mut self, framebuffer: &FramebufferId) -> Result<(), StateError> {
        let GraphicsContext {
            device,
            textures,
            framebuffers,
            ..
        } = &mut *self.ctx;
        let device = device.as_ref();

        framebuffers.registry.validate(framebuffer)?;
        for target in [FramebufferTarget::Draw, FramebufferTarget::Read] {
            if framebuffers.is_bound(target, framebuffer)? {
                framebuffers.unbind(device, target)?;
            }
        }
        device.delete_framebuffer(framebuffer.name())?;
        let mut record = framebuffers.registry.mark_deleted(framebuffer)?;
        for texture in record.references.clear() {
            if let Ok(referrers) = textures.referrers_mut(&texture) {
                referrers.remove_all(*framebuffer);
            }
        }
        Ok(())
    }
}

fn configure(
    device: &dyn GraphicsDevice,
    name: u32,
    attachments: &[(AttachmentPoint, FramebufferAttachment)],
    draw_buffers: &[Option<u32>],
) -> Result<(), StateError> {
    device.bind_framebuffer(FramebufferTarget::Draw, name)?;
    for (point, attachment) in attachments {
        device.framebuffer_texture(
            FramebufferTarget::Draw,
            *point,
            attachment.image,
            attachment.texture.name(),
        )?;
    }
    device.draw_buffers(draw_buffers)?;
    match device.check_framebuffer_status(FramebufferTarget::Draw)? {
        FramebufferStatus::Complete => Ok(()),
        status => Err(StateError::FramebufferInvalid(status)),
    }
}
