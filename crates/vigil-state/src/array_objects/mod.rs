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

//! Array objects: per-attribute source descriptors, the optional index
//! buffer coupling and the single current array object.

mod attribute;
mod builder;

pub use self::attribute::{AttributeDescriptor, FloatingAttribute, IntegralAttribute};
pub use self::builder::ArrayObjectBuilder;

use std::collections::HashSet;

use vigil_core::api::BufferTarget;
use vigil_core::handle::{ArrayBufferId, ArrayObjectId, ArrayObjectKey, IndexBufferId, Registry};
use vigil_core::{
    ContextConfig, ContextId, GraphicsDevice, ObjectKind, ReferenceContainer, StateError,
};

use crate::array_buffers::ArrayBufferState;
use crate::context::{checked_limit, GraphicsContext};
use crate::index_buffers::transfer_ownership;

/// The minimum number of vertex attributes a device must support.
const MIN_VERTEX_ATTRIBUTES: i32 = 16;

/// A simpler object an array object depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayDependency {
    /// The source buffer of at least one attribute slot.
    ArrayBuffer(ArrayBufferId),
    /// The attached index buffer.
    IndexBuffer(IndexBufferId),
}

#[derive(Debug)]
pub(crate) struct ArrayObjectRecord {
    pub(crate) attributes: Vec<Option<AttributeDescriptor>>,
    pub(crate) index_buffer: Option<IndexBufferId>,
    pub(crate) rebindable: bool,
    /// One entry per populated slot plus one for the index buffer.
    pub(crate) references: ReferenceContainer<ArrayDependency>,
}

impl ArrayObjectRecord {
    fn empty(max_attributes: u32) -> Self {
        Self {
            attributes: vec![None; max_attributes as usize],
            index_buffer: None,
            rebindable: false,
            references: ReferenceContainer::new(),
        }
    }

    fn from_builder(builder: &ArrayObjectBuilder) -> Self {
        let mut record = Self::empty(builder.max_attributes());
        record.rebindable = builder.rebindable;
        for (index, attribute) in builder.attributes() {
            record.set_attribute(index as usize, Some(*attribute));
        }
        record.replace_index_buffer(builder.index_buffer);
        record
    }

    fn set_attribute(&mut self, slot: usize, attribute: Option<AttributeDescriptor>) {
        if let Some(old) = self.attributes[slot].take() {
            self.references
                .remove(ArrayDependency::ArrayBuffer(old.buffer()));
        }
        if let Some(new) = attribute {
            self.references.add(ArrayDependency::ArrayBuffer(new.buffer()));
        }
        self.attributes[slot] = attribute;
    }

    /// Clears every slot sourced from `buffer`, returning how many were cleared.
    pub(crate) fn detach_buffer(&mut self, buffer: &ArrayBufferId) -> usize {
        let slots: Vec<usize> = self
            .attributes
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some_and(|a| a.buffer() == *buffer))
            .map(|(i, _)| i)
            .collect();
        for &slot in &slots {
            self.set_attribute(slot, None);
        }
        slots.len()
    }

    /// Replaces the coupled index buffer, returning the previous one.
    pub(crate) fn replace_index_buffer(
        &mut self,
        index_buffer: Option<IndexBufferId>,
    ) -> Option<IndexBufferId> {
        let previous = self.index_buffer.take();
        if let Some(old) = previous {
            self.references.remove(ArrayDependency::IndexBuffer(old));
        }
        if let Some(new) = index_buffer {
            self.references.add(ArrayDependency::IndexBuffer(new));
        }
        self.index_buffer = index_buffer;
        previous
    }
}

#[derive(Debug)]
pub(crate) struct ArrayObjectState {
    pub(crate) registry: Registry<ArrayObjectKey, ArrayObjectRecord>,
    pub(crate) default: ArrayObjectId,
    pub(crate) bound: ArrayObjectId,
    pub(crate) max_attributes: u32,
    strict: bool,
}

impl ArrayObjectState {
    pub(crate) fn new(
        context: ContextId,
        device: &dyn GraphicsDevice,
        config: &ContextConfig,
    ) -> Result<Self, StateError> {
        let max_attributes = checked_limit(
            "maximum vertex attributes",
            device.max_vertex_attributes()?,
            MIN_VERTEX_ATTRIBUTES,
            config.max_vertex_attributes_clamp,
        )?;
        let mut registry = Registry::new(context, ObjectKind::ArrayObject);
        let default = registry.create(0, ArrayObjectRecord::empty(max_attributes));
        Ok(Self {
            registry,
            default,
            bound: default,
            max_attributes,
            strict: config.strict_attributes,
        })
    }

    pub(crate) fn bind(
        &mut self,
        device: &dyn GraphicsDevice,
        array: &ArrayObjectId,
    ) -> Result<(), StateError> {
        self.registry.validate(array)?;
        if self.bound == *array {
            log::trace!("Array object {} already bound", array.name());
            return Ok(());
        }
        device.bind_vertex_array(array.name())?;
        self.bound = *array;
        Ok(())
    }

    /// Fails unless the current array object accepts `requested` as its index buffer.
    ///
    /// The default array object accepts anything. A rebindable object accepts
    /// any index buffer. Otherwise only the already attached buffer is accepted.
    pub(crate) fn check_index_buffer_binding(
        &self,
        requested: Option<IndexBufferId>,
    ) -> Result<(), StateError> {
        if self.bound == self.default {
            return Ok(());
        }
        let record = self.registry.get(&self.bound)?;
        if record.rebindable && requested.is_some() {
            return Ok(());
        }
        if requested.is_some() && record.index_buffer == requested {
            return Ok(());
        }
        Err(StateError::IndexBufferAlreadyConfigured {
            array_object: self.bound.name(),
            attached: record.index_buffer.map(|b| b.name()),
            requested: requested.map(|b| b.name()),
        })
    }

    /// Returns the index buffer coupled to the current array object.
    pub(crate) fn current_index_buffer(&self) -> Option<IndexBufferId> {
        self.registry
            .get(&self.bound)
            .ok()
            .and_then(|record| record.index_buffer)
    }

    fn check_builder(&self, builder: &ArrayObjectBuilder) -> Result<(), StateError> {
        let context = self.default.context();
        if builder.context != context {
            return Err(StateError::WrongContext {
                kind: ObjectKind::ArrayObjectBuilder,
                name: 0,
                object_context: builder.context,
                current_context: context,
            });
        }
        Ok(())
    }
}

/// Construction, binding and deletion of array objects.
///
/// Obtained from [`GraphicsContext::array_objects`].
pub struct ArrayObjects<'a> {
    pub(crate) ctx: &'a mut GraphicsContext,
}

impl ArrayObjects<'_> {
    /// Returns an empty builder whose strictness follows the context configuration.
    pub fn new_builder(&self) -> ArrayObjectBuilder {
        let arrays = &self.ctx.arrays;
        ArrayObjectBuilder::new(self.ctx.id(), arrays.max_attributes, arrays.strict)
    }

    /// Returns a builder holding a copy of the configuration of `array`.
    ///
    /// The builder shares nothing with `array`; modifying it never affects the object.
    pub fn new_builder_from_object(
        &self,
        array: &ArrayObjectId,
    ) -> Result<ArrayObjectBuilder, StateError> {
        let record = self.ctx.arrays.registry.get(array)?;
        let mut builder = self.new_builder();
        builder.attributes = record.attributes.clone();
        builder.index_buffer = record.index_buffer;
        builder.rebindable = record.rebindable;
        Ok(builder)
    }

    /// Allocates an array object configured from `builder` and leaves it bound.
    ///
    /// Populated slots are enabled and empty slots are disabled. The source
    /// buffer of each populated slot is bound only if it is not
    /// already the bound array buffer. The array-buffer binding is cleared
    /// once configuration completes. An index buffer named by `builder` is
    /// taken from whichever array object owned it before.
    /// ## Errors
    /// * `StateError::WrongContext` - If `builder` belongs to another context.
    /// * `StateError::Deleted` - If a buffer the builder refers to has been deleted since.
    /// * `StateError::Device` - If configuration fails. The half-configured object
    ///   is unbound and deleted before the error is returned.
    pub fn allocate(&mut self, builder: &ArrayObjectBuilder) -> Result<ArrayObjectId, StateError> {
        let GraphicsContext {
            device,
            buffers,
            index_buffers,
            arrays,
            ..
        } = &mut *self.ctx;
        let device = device.as_ref();

        arrays.check_builder(builder)?;
        for buffer in builder.buffers() {
            buffers.registry.validate(&buffer)?;
        }
        if let Some(index_buffer) = &builder.index_buffer {
            index_buffers.registry.validate(index_buffer)?;
        }

        let name = device.gen_vertex_array()?;
        if let Err(err) = configure(device, buffers, name, builder) {
            if let Err(unbind) = device.bind_vertex_array(0) {
                log::warn!("Failed to unbind array object {name} after a failed allocation: {unbind}");
            }
            arrays.bound = arrays.default;
            if let Err(delete) = device.delete_vertex_array(name) {
                log::warn!("Failed to delete array object {name} after a failed allocation: {delete}");
            }
            return Err(err);
        }

        let array = arrays
            .registry
            .create(name, ArrayObjectRecord::from_builder(builder));
        arrays.bound = array;

        for (_, attribute) in builder.attributes() {
            if let Ok(record) = buffers.registry.get_mut(&attribute.buffer()) {
                record.referrers.add(array);
            }
        }
        if let Some(index_buffer) = &builder.index_buffer {
            transfer_ownership(arrays, index_buffers, index_buffer, array);
        }
        log::debug!(
            "Allocated array object {name} with {} attribute(s)",
            builder.attributes().count()
        );
        Ok(array)
    }

    /// Binds `array`. Binding the current array object makes no device call.
    pub fn bind(&mut self, array: &ArrayObjectId) -> Result<(), StateError> {
        let GraphicsContext { device, arrays, .. } = &mut *self.ctx;
        arrays.bind(device.as_ref(), array)
    }

    /// Binds the default array object.
    pub fn unbind(&mut self) -> Result<(), StateError> {
        let GraphicsContext { device, arrays, .. } = &mut *self.ctx;
        let default = arrays.default;
        arrays.bind(device.as_ref(), &default)
    }

    /// Returns the current array object.
    pub fn currently_bound(&self) -> ArrayObjectId {
        self.ctx.arrays.bound
    }

    /// Returns the default array object. It always exists and cannot be deleted.
    pub fn default(&self) -> ArrayObjectId {
        self.ctx.arrays.default
    }

    /// Returns `true` if `array` is the current array object.
    pub fn is_bound(&self, array: &ArrayObjectId) -> Result<bool, StateError> {
        self.ctx.arrays.registry.validate(array)?;
        Ok(self.ctx.arrays.bound == *array)
    }

    /// Returns the number of attribute slots every array object has.
    pub fn max_attributes(&self) -> u32 {
        self.ctx.arrays.max_attributes
    }

    /// Returns the descriptor of slot `index` of `array`, if populated.
    pub fn attribute_at(
        &self,
        array: &ArrayObjectId,
        index: u32,
    ) -> Result<Option<AttributeDescriptor>, StateError> {
        let record = self.ctx.arrays.registry.get(array)?;
        record
            .attributes
            .get(index as usize)
            .copied()
            .ok_or_else(|| {
                StateError::RangeCheck(format!(
                    "Attribute index {index} is not in [0, {})",
                    record.attributes.len()
                ))
            })
    }

    /// Returns the index buffer coupled to `array`.
    pub fn index_buffer_of(&self, array: &ArrayObjectId) -> Result<Option<IndexBufferId>, StateError> {
        Ok(self.ctx.arrays.registry.get(array)?.index_buffer)
    }

    /// Returns `true` if `array` accepts binding a different index buffer.
    pub fn is_index_buffer_rebindable(&self, array: &ArrayObjectId) -> Result<bool, StateError> {
        Ok(self.ctx.arrays.registry.get(array)?.rebindable)
    }

    /// Returns the distinct objects `array` currently depends on.
    pub fn references(&self, array: &ArrayObjectId) -> Result<HashSet<ArrayDependency>, StateError> {
        Ok(self.ctx.arrays.registry.get(array)?.references.references())
    }

    /// Deletes `array`, binding the default array object first if `array` is current.
    /// ## Errors
    /// * `StateError::ObjectNotDeletable` - If `array` is the default array object.
    /// * `StateError::Deleted` - If `array` was already deleted.
    pub fn delete(&mut self, array: &ArrayObjectId) -> Result<(), StateError> {
        let GraphicsContext {
            device,
            buffers,
            index_buffers,
            arrays,
            ..
        } = &mut *self.ctx;
        let device = device.as_ref();

        arrays.registry.validate(array)?;
        if *array == arrays.default {
            return Err(StateError::ObjectNotDeletable {
                kind: ObjectKind::ArrayObject,
                name: array.name(),
            });
        }
        if arrays.bound == *array {
            let default = arrays.default;
            arrays.bind(device, &default)?;
        }
        device.delete_vertex_array(array.name())?;
        let mut record = arrays.registry.mark_deleted(array)?;

        for dependency in record.references.clear() {
            match dependency {
                ArrayDependency::ArrayBuffer(buffer) => {
                    if let Ok(buffer) = buffers.registry.get_mut(&buffer) {
                        buffer.referrers.remove_all(*array);
                    }
                }
                ArrayDependency::IndexBuffer(index_buffer) => {
                    if let Ok(index_buffer) = index_buffers.registry.get_mut(&index_buffer) {
                        index_buffer.referrers.remove_all(*array);
                    }
                }
            }
        }
        Ok(())
    }
}

fn configure(
    device: &dyn GraphicsDevice,
    buffers: &mut ArrayBufferState,
    name: u32,
    builder: &ArrayObjectBuilder,
) -> Result<(), StateError> {
    device.bind_vertex_array(name)?;
    if let Some(index_buffer) = &builder.index_buffer {
        device.bind_buffer(BufferTarget::ElementArray, index_buffer.name())?;
    }
    for (index, slot) in builder.attributes.iter().enumerate() {
        let index = index as u32;
        let Some(attribute) = slot else {
            device.disable_vertex_attribute(index)?;
            continue;
        };
        device.enable_vertex_attribute(index)?;
        buffers.bind(device, &attribute.buffer())?;
        match attribute {
            AttributeDescriptor::Floating(a) => device.vertex_attribute_pointer(
                index,
                a.elements,
                a.scalar,
                a.normalized,
                a.stride,
                a.offset,
            )?,
            AttributeDescriptor::Integral(a) => device.vertex_attribute_integral_pointer(
                index, a.elements, a.scalar, a.stride, a.offset,
            )?,
        }
        device.vertex_attribute_divisor(index, attribute.divisor())?;
    }
    buffers.unbind(device)
}
