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

//! Textures and the texture unit table.
//!
//! Every unit holds at most one texture at a time. Alongside the unit table
//! the tracker keeps a reverse index from each texture to the set of units it
//! is bound to, which is updated in the same call as the table so the two
//! never disagree. Deleting a texture visits only the units in its entry.

use std::collections::HashMap;

use vigil_core::api::{
    CubeFace, PixelArea, TextureFormat, TextureImageTarget, TextureParameters, TextureTarget,
};
use vigil_core::handle::{
    FramebufferId, Registry, Texture2DId, Texture2DKey, TextureCubeId, TextureCubeKey,
};
use vigil_core::units::MAX_TRACKED_UNITS;
use vigil_core::{
    ContextConfig, ContextId, GraphicsDevice, ObjectKind, ReferenceContainer, StateError, UnitSet,
};

use crate::context::{checked_limit, GraphicsContext};
use crate::framebuffers::FramebufferState;

const MIN_TEXTURE_UNITS: i32 = 16;
const MIN_TEXTURE_SIZE: i32 = 1024;
const MIN_TEXTURE_EXTENT: u32 = 2;

/// A texture unit of one context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureUnit {
    context: ContextId,
    index: u32,
}

impl TextureUnit {
    /// Returns the index of the unit.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Returns the context the unit belongs to.
    pub fn context(&self) -> ContextId {
        self.context
    }
}

/// A texture of either family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureRef {
    /// A 2D texture.
    Texture2D(Texture2DId),
    /// A cube texture.
    Cube(TextureCubeId),
}

impl TextureRef {
    /// Returns the device name of the texture.
    pub fn name(&self) -> u32 {
        match self {
            TextureRef::Texture2D(t) => t.name(),
            TextureRef::Cube(t) => t.name(),
        }
    }

    /// Returns the target the texture binds to.
    pub fn target(&self) -> TextureTarget {
        match self {
            TextureRef::Texture2D(_) => TextureTarget::Texture2D,
            TextureRef::Cube(_) => TextureTarget::CubeMap,
        }
    }
}

impl From<Texture2DId> for TextureRef {
    fn from(texture: Texture2DId) -> Self {
        TextureRef::Texture2D(texture)
    }
}

impl From<TextureCubeId> for TextureRef {
    fn from(texture: TextureCubeId) -> Self {
        TextureRef::Cube(texture)
    }
}

#[derive(Debug)]
pub(crate) struct Texture2DRecord {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) format: TextureFormat,
    pub(crate) parameters: TextureParameters,
    /// Framebuffers this texture is attached to.
    pub(crate) referrers: ReferenceContainer<FramebufferId>,
}

#[derive(Debug)]
pub(crate) struct TextureCubeRecord {
    pub(crate) size: u32,
    pub(crate) format: TextureFormat,
    pub(crate) parameters: TextureParameters,
    pub(crate) referrers: ReferenceContainer<FramebufferId>,
}

fn slot_of(target: TextureTarget) -> usize {
    match target {
        TextureTarget::Texture2D => 0,
        TextureTarget::CubeMap => 1,
    }
}

#[derive(Debug)]
pub(crate) struct TextureState {
    context: ContextId,
    pub(crate) textures_2d: Registry<Texture2DKey, Texture2DRecord>,
    pub(crate) cubes: Registry<TextureCubeKey, TextureCubeRecord>,
    /// Per unit, the 2D slot and the cube slot.
    units: Vec<[Option<TextureRef>; 2]>,
    reverse: HashMap<TextureRef, UnitSet>,
    active_unit: Option<u32>,
    max_size: u32,
}

impl TextureState {
    pub(crate) fn new(
        context: ContextId,
        device: &dyn GraphicsDevice,
        config: &ContextConfig,
    ) -> Result<Self, StateError> {
        let unit_count = checked_limit(
            "texture units",
            device.max_texture_units()?,
            MIN_TEXTURE_UNITS,
            config.max_texture_units_clamp.min(MAX_TRACKED_UNITS as u32),
        )?;
        let max_size = checked_limit(
            "maximum texture size",
            device.max_texture_size()?,
            MIN_TEXTURE_SIZE,
            i32::MAX.unsigned_abs(),
        )?;
        Ok(Self {
            context,
            textures_2d: Registry::new(context, ObjectKind::Texture2D),
            cubes: Registry::new(context, ObjectKind::TextureCube),
            units: vec![[None; 2]; unit_count as usize],
            reverse: HashMap::new(),
            active_unit: None,
            max_size,
        })
    }

    pub(crate) fn validate(&self, texture: &TextureRef) -> Result<(), StateError> {
        match texture {
            TextureRef::Texture2D(t) => self.textures_2d.validate(t),
            TextureRef::Cube(t) => self.cubes.validate(t),
        }
    }

    pub(crate) fn format_of(&self, texture: &TextureRef) -> Result<TextureFormat, StateError> {
        match texture {
            TextureRef::Texture2D(t) => Ok(self.textures_2d.get(t)?.format),
            TextureRef::Cube(t) => Ok(self.cubes.get(t)?.format),
        }
    }

    pub(crate) fn referrers_mut(
        &mut self,
        texture: &TextureRef,
    ) -> Result<&mut ReferenceContainer<FramebufferId>, StateError> {
        match texture {
            TextureRef::Texture2D(t) => Ok(&mut self.textures_2d.get_mut(t)?.referrers),
            TextureRef::Cube(t) => Ok(&mut self.cubes.get_mut(t)?.referrers),
        }
    }

    fn check_unit(&self, unit: &TextureUnit) -> Result<usize, StateError> {
        if unit.context != self.context {
            return Err(StateError::WrongContext {
                kind: ObjectKind::TextureUnit,
                name: unit.index,
                object_context: unit.context,
                current_context: self.context,
            });
        }
        let index = unit.index as usize;
        if index >= self.units.len() {
            return Err(StateError::RangeCheck(format!(
                "Texture unit {} is not in [0, {})",
                unit.index,
                self.units.len()
            )));
        }
        Ok(index)
    }

    fn check_extent(&self, what: &str, extent: u32) -> Result<(), StateError> {
        if !(MIN_TEXTURE_EXTENT..=self.max_size).contains(&extent) {
            return Err(StateError::RangeCheck(format!(
                "Texture {what} {extent} is not in [{MIN_TEXTURE_EXTENT}, {}]",
                self.max_size
            )));
        }
        Ok(())
    }

    fn bound_at(&self, unit: usize, target: TextureTarget) -> Option<TextureRef> {
        self.units[unit][slot_of(target)]
    }

    fn select_unit(&mut self, device: &dyn GraphicsDevice, unit: usize) -> Result<(), StateError> {
        let index = unit as u32;
        if self.active_unit == Some(index) {
            return Ok(());
        }
        device.active_texture(index)?;
        self.active_unit = Some(index);
        Ok(())
    }

    /// Records `texture` in slot `target` of `unit` and in the reverse index.
    fn record_binding(&mut self, unit: usize, texture: TextureRef) {
        self.units[unit][slot_of(texture.target())] = Some(texture);
        self.reverse.entry(texture).or_default().insert(unit as u32);
    }

    /// Forgets slot `target` of `unit`, pruning the reverse entry if it empties.
    fn forget_binding(&mut self, unit: usize, target: TextureTarget) -> Option<TextureRef> {
        let texture = self.units[unit][slot_of(target)].take()?;
        if let Some(set) = self.reverse.get_mut(&texture) {
            set.remove(unit as u32);
            if set.is_empty() {
                self.reverse.remove(&texture);
            }
        }
        Some(texture)
    }

    fn unbind_slot(
        &mut self,
        device: &dyn GraphicsDevice,
        unit: usize,
        target: TextureTarget,
    ) -> Result<(), StateError> {
        if self.bound_at(unit, target).is_none() {
            return Ok(());
        }
        self.select_unit(device, unit)?;
        device.bind_texture(target, 0)?;
        self.forget_binding(unit, target);
        Ok(())
    }

    /// Clears whatever is on `unit` that is not of family `keep`.
    fn clear_other_family(
        &mut self,
        device: &dyn GraphicsDevice,
        unit: usize,
        keep: TextureTarget,
    ) -> Result<(), StateError> {
        let other = match keep {
            TextureTarget::Texture2D => TextureTarget::CubeMap,
            TextureTarget::CubeMap => TextureTarget::Texture2D,
        };
        self.unbind_slot(device, unit, other)
    }

    fn bind(
        &mut self,
        device: &dyn GraphicsDevice,
        framebuffers: &FramebufferState,
        unit: &TextureUnit,
        texture: TextureRef,
    ) -> Result<(), StateError> {
        let index = self.check_unit(unit)?;
        self.validate(&texture)?;
        framebuffers.check_feedback(&texture)?;
        if self.bound_at(index, texture.target()) == Some(texture) {
            log::trace!("Texture {} already bound to unit {}", texture.name(), unit.index);
            return Ok(());
        }
        self.clear_other_family(device, index, texture.target())?;
        self.select_unit(device, index)?;
        device.bind_texture(texture.target(), texture.name())?;
        self.forget_binding(index, texture.target());
        self.record_binding(index, texture);
        Ok(())
    }

    /// Returns the texture of family `target` on `unit`, or `TextureNotBound`.
    fn require_bound(
        &self,
        unit: &TextureUnit,
        target: TextureTarget,
    ) -> Result<(usize, TextureRef), StateError> {
        let index = self.check_unit(unit)?;
        self.bound_at(index, target)
            .map(|texture| (index, texture))
            .ok_or(StateError::TextureNotBound { unit: unit.index })
    }

    /// Runs a fresh allocation on `unit`; the texture is registered only on success.
    fn allocate_on_unit(
        &mut self,
        device: &dyn GraphicsDevice,
        unit: usize,
        target: TextureTarget,
        configure: impl FnOnce(&dyn GraphicsDevice) -> Result<(), StateError>,
    ) -> Result<u32, StateError> {
        self.clear_other_family(device, unit, target)?;
        self.select_unit(device, unit)?;
        let name = device.gen_texture()?;
        let result = device
            .bind_texture(target, name)
            .map_err(StateError::from)
            .and_then(|()| configure(device));
        // Whatever was on the slot is no longer bound on the device.
        self.forget_binding(unit, target);
        if let Err(err) = result {
            if let Err(delete) = device.delete_texture(name) {
                log::warn!("Failed to delete texture {name} after a failed allocation: {delete}");
            }
            return Err(err);
        }
        Ok(name)
    }
}

fn check_update(
    image: PixelArea,
    area: PixelArea,
    format: TextureFormat,
    data: &[u8],
) -> Result<(), StateError> {
    if !image.contains(&area) {
        return Err(StateError::RangeCheck(format!(
            "Update area {area:?} is not within the image {}x{}",
            image.width, image.height
        )));
    }
    let expected = area.texel_count() * u64::from(format.bytes_per_pixel());
    if data.len() as u64 != expected {
        return Err(StateError::RangeCheck(format!(
            "Update area needs {expected} bytes of {format:?} but {} were supplied",
            data.len()
        )));
    }
    Ok(())
}

/// Texture allocation, update and texture unit binding.
///
/// Obtained from [`GraphicsContext::textures`].
pub struct Textures<'a> {
    pub(crate) ctx: &'a mut GraphicsContext,
}

impl Textures<'_> {
    /// Returns every texture unit of the context, in index order.
    pub fn units(&self) -> Vec<TextureUnit> {
        let context = self.ctx.id();
        (0..self.ctx.textures.units.len() as u32)
            .map(|index| TextureUnit { context, index })
            .collect()
    }

    /// Returns the largest width or height a texture may have.
    pub fn max_texture_size(&self) -> u32 {
        self.ctx.textures.max_size
    }

    /// Allocates a 2D texture and leaves it bound to `unit`.
    /// ## Arguments
    /// * `unit` - The unit the texture is bound to.
    /// * `width` - Width in texels, in `[2, max_texture_size]`.
    /// * `height` - Height in texels, in `[2, max_texture_size]`.
    /// * `format` - The texel format.
    /// * `parameters` - Sampling parameters.
    /// ## Errors
    /// * `StateError::RangeCheck` - If a dimension is out of range.
    /// * `StateError::Device` - If the device fails. The texture is deleted again.
    pub fn allocate_2d(
        &mut self,
        unit: &TextureUnit,
        width: u32,
        height: u32,
        format: TextureFormat,
        parameters: TextureParameters,
    ) -> Result<Texture2DId, StateError> {
        let GraphicsContext {
            device, textures, ..
        } = &mut *self.ctx;
        let device = device.as_ref();

        let index = textures.check_unit(unit)?;
        textures.check_extent("width", width)?;
        textures.check_extent("height", height)?;

        let name = textures.allocate_on_unit(device, index, TextureTarget::Texture2D, |device| {
            device.texture_parameters(TextureTarget::Texture2D, &parameters)?;
            device.texture_image(TextureImageTarget::Texture2D, width, height, format, None)?;
            Ok(())
        })?;

        let texture = textures.textures_2d.create(
            name,
            Texture2DRecord {
                width,
                height,
                format,
                parameters,
                referrers: ReferenceContainer::new(),
            },
        );
        textures.record_binding(index, texture.into());
        log::debug!("Allocated 2D texture {name} ({width}x{height} {format:?}) on unit {}", unit.index);
        Ok(texture)
    }

    /// Allocates a cube texture with square faces of `size` texels and leaves it bound to `unit`.
    pub fn allocate_cube(
        &mut self,
        unit: &TextureUnit,
        size: u32,
        format: TextureFormat,
        parameters: TextureParameters,
    ) -> Result<TextureCubeId, StateError> {
        let GraphicsContext {
            device, textures, ..
        } = &mut *self.ctx;
        let device = device.as_ref();

        let index = textures.check_unit(unit)?;
        textures.check_extent("size", size)?;

        let name = textures.allocate_on_unit(device, index, TextureTarget::CubeMap, |device| {
            device.texture_parameters(TextureTarget::CubeMap, &parameters)?;
            for face in CubeFace::ALL {
                device.texture_image(TextureImageTarget::CubeFace(face), size, size, format, None)?;
            }
            Ok(())
        })?;

        let texture = textures.cubes.create(
            name,
            TextureCubeRecord {
                size,
                format,
                parameters,
                referrers: ReferenceContainer::new(),
            },
        );
        textures.record_binding(index, texture.into());
        log::debug!("Allocated cube texture {name} ({size} {format:?}) on unit {}", unit.index);
        Ok(texture)
    }

    /// Binds a 2D texture to `unit`, clearing whatever else the unit holds.
    /// ## Errors
    /// * `StateError::FeedbackLoop` - If `texture` is attached to the bound draw framebuffer.
    pub fn bind_2d(&mut self, unit: &TextureUnit, texture: &Texture2DId) -> Result<(), StateError> {
        self.bind(unit, TextureRef::Texture2D(*texture))
    }

    /// Binds a cube texture to `unit`, clearing whatever else the unit holds.
    pub fn bind_cube(&mut self, unit: &TextureUnit, texture: &TextureCubeId) -> Result<(), StateError> {
        self.bind(unit, TextureRef::Cube(*texture))
    }

    fn bind(&mut self, unit: &TextureUnit, texture: TextureRef) -> Result<(), StateError> {
        let GraphicsContext {
            device,
            textures,
            framebuffers,
            ..
        } = &mut *self.ctx;
        textures.bind(device.as_ref(), framebuffers, unit, texture)
    }

    /// Clears both slots of `unit`.
    pub fn unbind(&mut self, unit: &TextureUnit) -> Result<(), StateError> {
        let GraphicsContext {
            device, textures, ..
        } = &mut *self.ctx;
        let device = device.as_ref();
        let index = textures.check_unit(unit)?;
        textures.unbind_slot(device, index, TextureTarget::Texture2D)?;
        textures.unbind_slot(device, index, TextureTarget::CubeMap)
    }

    /// Returns `true` if `unit` holds any texture.
    pub fn unit_is_bound(&self, unit: &TextureUnit) -> Result<bool, StateError> {
        let index = self.ctx.textures.check_unit(unit)?;
        Ok(self.ctx.textures.units[index].iter().any(Option::is_some))
    }

    /// Returns the 2D texture bound to `unit`.
    pub fn bound_2d(&self, unit: &TextureUnit) -> Result<Option<Texture2DId>, StateError> {
        let index = self.ctx.textures.check_unit(unit)?;
        Ok(match self.ctx.textures.bound_at(index, TextureTarget::Texture2D) {
            Some(TextureRef::Texture2D(texture)) => Some(texture),
            _ => None,
        })
    }

    /// Returns the cube texture bound to `unit`.
    pub fn bound_cube(&self, unit: &TextureUnit) -> Result<Option<TextureCubeId>, StateError> {
        let index = self.ctx.textures.check_unit(unit)?;
        Ok(match self.ctx.textures.bound_at(index, TextureTarget::CubeMap) {
            Some(TextureRef::Cube(texture)) => Some(texture),
            _ => None,
        })
    }

    /// Returns the texture bound to `unit` of either family.
    pub fn bound_to(&self, unit: &TextureUnit) -> Result<Option<TextureRef>, StateError> {
        let index = self.ctx.textures.check_unit(unit)?;
        Ok(self.ctx.textures.units[index].iter().flatten().next().copied())
    }

    /// Returns the units `texture` is bound to.
    pub fn units_of(&self, texture: impl Into<TextureRef>) -> Result<UnitSet, StateError> {
        let texture = texture.into();
        self.ctx.textures.validate(&texture)?;
        Ok(self
            .ctx
            .textures
            .reverse
            .get(&texture)
            .copied()
            .unwrap_or_default())
    }

    /// Returns `true` if `texture` is bound to at least one unit.
    pub fn is_bound_anywhere(&self, texture: impl Into<TextureRef>) -> Result<bool, StateError> {
        Ok(!self.units_of(texture)?.is_empty())
    }

    /// Returns the dimensions of a 2D texture.
    pub fn size_2d(&self, texture: &Texture2DId) -> Result<(u32, u32), StateError> {
        let record = self.ctx.textures.textures_2d.get(texture)?;
        Ok((record.width, record.height))
    }

    /// Returns the face size of a cube texture.
    pub fn size_cube(&self, texture: &TextureCubeId) -> Result<u32, StateError> {
        Ok(self.ctx.textures.cubes.get(texture)?.size)
    }

    /// Returns the format of a texture.
    pub fn format(&self, texture: impl Into<TextureRef>) -> Result<TextureFormat, StateError> {
        self.ctx.textures.format_of(&texture.into())
    }

    /// Returns the sampling parameters of a texture.
    pub fn parameters(&self, texture: impl Into<TextureRef>) -> Result<TextureParameters, StateError> {
        match texture.into() {
            TextureRef::Texture2D(t) => Ok(self.ctx.textures.textures_2d.get(&t)?.parameters),
            TextureRef::Cube(t) => Ok(self.ctx.textures.cubes.get(&t)?.parameters),
        }
    }

    /// Returns the framebuffers `texture` is attached to.
    pub fn attached_to(&self, texture: impl Into<TextureRef>) -> Result<Vec<FramebufferId>, StateError> {
        let texture = texture.into();
        let referrers = match &texture {
            TextureRef::Texture2D(t) => &self.ctx.textures.textures_2d.get(t)?.referrers,
            TextureRef::Cube(t) => &self.ctx.textures.cubes.get(t)?.referrers,
        };
        Ok(referrers.iter().collect())
    }

    /// Replaces `area` of the 2D texture bound to `unit` with `data`.
    /// ## Errors
    /// * `StateError::TextureNotBound` - If `unit` holds no 2D texture.
    /// * `StateError::FeedbackLoop` - If the texture is attached to the bound draw framebuffer.
    /// * `StateError::RangeCheck` - If `area` exceeds the texture or `data` does not match it.
    pub fn update_2d(
        &mut self,
        unit: &TextureUnit,
        area: PixelArea,
        data: &[u8],
    ) -> Result<(), StateError> {
        let GraphicsContext {
            device,
            textures,
            framebuffers,
            ..
        } = &mut *self.ctx;
        let device = device.as_ref();

        let (index, texture) = textures.require_bound(unit, TextureTarget::Texture2D)?;
        let TextureRef::Texture2D(id) = texture else {
            return Err(StateError::TextureNotBound { unit: unit.index });
        };
        let record = textures.textures_2d.get(&id)?;
        let format = record.format;
        check_update(PixelArea::of_size(record.width, record.height), area, format, data)?;
        framebuffers.check_feedback(&texture)?;

        textures.select_unit(device, index)?;
        device.texture_sub_image(TextureImageTarget::Texture2D, area, format, data)?;
        Ok(())
    }

    /// Replaces `area` of one face of the cube texture bound to `unit` with `data`.
    pub fn update_cube(
        &mut self,
        unit: &TextureUnit,
        face: CubeFace,
        area: PixelArea,
        data: &[u8],
    ) -> Result<(), StateError> {
        let GraphicsContext {
            device,
            textures,
            framebuffers,
            ..
        } = &mut *self.ctx;
        let device = device.as_ref();

        let (index, texture) = textures.require_bound(unit, TextureTarget::CubeMap)?;
        let TextureRef::Cube(id) = texture else {
            return Err(StateError::TextureNotBound { unit: unit.index });
        };
        let record = textures.cubes.get(&id)?;
        let format = record.format;
        check_update(PixelArea::of_size(record.size, record.size), area, format, data)?;
        framebuffers.check_feedback(&texture)?;

        textures.select_unit(device, index)?;
        device.texture_sub_image(TextureImageTarget::CubeFace(face), area, format, data)?;
        Ok(())
    }

    /// Binds `texture` to `unit` and reads back its image.
    pub fn get_image_2d(
        &mut self,
        unit: &TextureUnit,
        texture: &Texture2DId,
    ) -> Result<Vec<u8>, StateError> {
        self.bind_2d(unit, texture)?;
        let GraphicsContext {
            device, textures, ..
        } = &mut *self.ctx;
        let device = device.as_ref();
        let format = textures.textures_2d.get(texture)?.format;
        let index = textures.check_unit(unit)?;
        textures.select_unit(device, index)?;
        Ok(device.get_texture_image(TextureImageTarget::Texture2D, format)?)
    }

    /// Regenerates the mipmaps of the 2D texture bound to `unit`.
    pub fn regenerate_mipmaps_2d(&mut self, unit: &TextureUnit) -> Result<(), StateError> {
        self.regenerate_mipmaps(unit, TextureTarget::Texture2D)
    }

    /// Regenerates the mipmaps of the cube texture bound to `unit`.
    pub fn regenerate_mipmaps_cube(&mut self, unit: &TextureUnit) -> Result<(), StateError> {
        self.regenerate_mipmaps(unit, TextureTarget::CubeMap)
    }

    fn regenerate_mipmaps(
        &mut self,
        unit: &TextureUnit,
        target: TextureTarget,
    ) -> Result<(), StateError> {
        let GraphicsContext {
            device, textures, ..
        } = &mut *self.ctx;
        let device = device.as_ref();
        let (index, _) = textures.require_bound(unit, target)?;
        textures.select_unit(device, index)?;
        device.generate_mipmap(target)?;
        Ok(())
    }

    /// Deletes a 2D texture. See [`delete`](Self::delete).
    pub fn delete_2d(&mut self, texture: &Texture2DId) -> Result<(), StateError> {
        self.delete(TextureRef::Texture2D(*texture))
    }

    /// Deletes a cube texture. See [`delete`](Self::delete).
    pub fn delete_cube(&mut self, texture: &TextureCubeId) -> Result<(), StateError> {
        self.delete(TextureRef::Cube(*texture))
    }

    /// Deletes `texture`.
    ///
    /// The texture is first unbound from every unit it is bound to, and is
    /// detached from every framebuffer it is attached to.
    /// ## Errors
    /// * `StateError::Deleted` - If `texture` was already deleted.
    pub fn delete(&mut self, texture: TextureRef) -> Result<(), StateError> {
        let GraphicsContext {
            device,
            textures,
            framebuffers,
            ..
        } = &mut *self.ctx;
        let device = device.as_ref();

        textures.validate(&texture)?;
        let units = textures.reverse.get(&texture).copied().unwrap_or_default();
        for unit in units.iter() {
            textures.unbind_slot(device, unit as usize, texture.target())?;
        }
        device.delete_texture(texture.name())?;

        let referrers = match &texture {
            TextureRef::Texture2D(t) => textures.textures_2d.mark_deleted(t)?.referrers,
            TextureRef::Cube(t) => textures.cubes.mark_deleted(t)?.referrers,
        };
        for framebuffer in referrers.iter() {
            let detached = framebuffers.forget_texture(&framebuffer, &texture);
            log::debug!(
                "Detached deleted texture {} from {detached} attachment(s) of framebuffer {}",
                texture.name(),
                framebuffer.name()
            );
        }
        Ok(())
    }
}
