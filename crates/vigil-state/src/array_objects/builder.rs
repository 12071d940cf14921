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

//! Mutable, not-yet-allocated array object descriptions.

use vigil_core::handle::{ArrayBufferId, IndexBufferId};
use vigil_core::{ContextId, ObjectKind, StateError};

use super::attribute::{AttributeDescriptor, FloatingAttribute, IntegralAttribute};
use crate::context::GraphicsContext;

/// A description of an array object that has not been allocated yet.
///
/// Obtained from [`ArrayObjects::new_builder`](super::ArrayObjects::new_builder)
/// or [`ArrayObjects::new_builder_from_object`](super::ArrayObjects::new_builder_from_object)
/// and consumed by [`ArrayObjects::allocate`](super::ArrayObjects::allocate).
/// Setters validate their arguments against the context the builder came from.
#[derive(Debug, Clone)]
pub struct ArrayObjectBuilder {
    pub(crate) context: ContextId,
    pub(crate) attributes: Vec<Option<AttributeDescriptor>>,
    pub(crate) index_buffer: Option<IndexBufferId>,
    pub(crate) rebindable: bool,
    strict: bool,
}

impl ArrayObjectBuilder {
    pub(crate) fn new(context: ContextId, max_attributes: u32, strict: bool) -> Self {
        Self {
            context,
            attributes: vec![None; max_attributes as usize],
            index_buffer: None,
            rebindable: false,
            strict,
        }
    }

    /// Returns the number of attribute slots.
    pub fn max_attributes(&self) -> u32 {
        self.attributes.len() as u32
    }

    /// Selects whether assigning an already populated slot is rejected.
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Returns `true` if assigning an already populated slot is rejected.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Selects whether the allocated object accepts binding a different index buffer
    /// while one is attached.
    pub fn set_index_buffer_rebindable(&mut self, rebindable: bool) {
        self.rebindable = rebindable;
    }

    /// Populates slot `index` with a floating-point attribute.
    /// ## Errors
    /// * `StateError::RangeCheck` - If `index`, the element count or the offset is out of range.
    /// * `StateError::AttributeAlreadyAssigned` - In strict mode, if the slot is populated.
    /// * `StateError::Deleted` / `StateError::WrongContext` - If the source buffer is unusable.
    pub fn set_attribute_floating(
        &mut self,
        ctx: &GraphicsContext,
        index: u32,
        attribute: FloatingAttribute,
    ) -> Result<(), StateError> {
        self.set_attribute(ctx, index, AttributeDescriptor::Floating(attribute))
    }

    /// Populates slot `index` with an integral attribute.
    pub fn set_attribute_integral(
        &mut self,
        ctx: &GraphicsContext,
        index: u32,
        attribute: IntegralAttribute,
    ) -> Result<(), StateError> {
        self.set_attribute(ctx, index, AttributeDescriptor::Integral(attribute))
    }

    fn set_attribute(
        &mut self,
        ctx: &GraphicsContext,
        index: u32,
        attribute: AttributeDescriptor,
    ) -> Result<(), StateError> {
        self.check_context(ctx)?;
        let slot = self.slot_index(index)?;
        if !(1..=4).contains(&attribute.elements()) {
            return Err(StateError::RangeCheck(format!(
                "Attribute element count {} is not in [1, 4]",
                attribute.elements()
            )));
        }
        let buffer = attribute.buffer();
        let range = ctx.buffers.registry.get(&buffer)?.range;
        if !range.includes_value(attribute.offset()) {
            return Err(StateError::RangeCheck(format!(
                "Attribute offset {} is not within the range {range} of array buffer {}",
                attribute.offset(),
                buffer.name()
            )));
        }
        if self.strict && self.attributes[slot].is_some() {
            return Err(StateError::AttributeAlreadyAssigned(format!("slot {index}")));
        }
        self.attributes[slot] = Some(attribute);
        Ok(())
    }

    /// Clears slot `index`.
    pub fn disable_attribute(&mut self, index: u32) -> Result<(), StateError> {
        let slot = self.slot_index(index)?;
        self.attributes[slot] = None;
        Ok(())
    }

    /// Returns the descriptor of slot `index`, if populated.
    pub fn attribute_at(&self, index: u32) -> Result<Option<AttributeDescriptor>, StateError> {
        let slot = self.slot_index(index)?;
        Ok(self.attributes[slot])
    }

    /// Attaches `index_buffer` to the object.
    pub fn set_index_buffer(
        &mut self,
        ctx: &GraphicsContext,
        index_buffer: &IndexBufferId,
    ) -> Result<(), StateError> {
        self.check_context(ctx)?;
        ctx.index_buffers.registry.validate(index_buffer)?;
        self.index_buffer = Some(*index_buffer);
        Ok(())
    }

    /// Removes any index buffer from the description.
    pub fn set_no_index_buffer(&mut self) {
        self.index_buffer = None;
    }

    /// Returns the index buffer of the description.
    pub fn index_buffer(&self) -> Option<IndexBufferId> {
        self.index_buffer
    }

    /// Clears every slot and the index buffer. Strictness and the rebind policy are kept.
    pub fn reset(&mut self) {
        self.attributes.iter_mut().for_each(|slot| *slot = None);
        self.index_buffer = None;
    }

    /// Iterates over the populated slots.
    pub fn attributes(&self) -> impl Iterator<Item = (u32, &AttributeDescriptor)> + '_ {
        self.attributes
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|a| (i as u32, a)))
    }

    /// Returns the distinct buffers the populated slots read from.
    pub fn buffers(&self) -> Vec<ArrayBufferId> {
        let mut buffers: Vec<ArrayBufferId> = Vec::new();
        for (_, attribute) in self.attributes() {
            if !buffers.contains(&attribute.buffer()) {
                buffers.push(attribute.buffer());
            }
        }
        buffers
    }

    fn slot_index(&self, index: u32) -> Result<usize, StateError> {
        if index >= self.max_attributes() {
            return Err(StateError::RangeCheck(format!(
                "Attribute index {index} is not in [0, {})",
                self.max_attributes()
            )));
        }
        Ok(index as usize)
    }

    pub(crate) fn check_context(&self, ctx: &GraphicsContext) -> Result<(), StateError> {
        if self.context != ctx.id() {
            return Err(StateError::WrongContext {
                kind: ObjectKind::ArrayObjectBuilder,
                name: 0,
                object_context: self.context,
                current_context: ctx.id(),
            });
        }
        Ok(())
    }
}
