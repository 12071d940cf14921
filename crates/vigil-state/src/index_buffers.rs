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

//! Index buffers and their coupling to array objects.
//!
//! The element-array binding point belongs to the current array object, so
//! "the bound index buffer" always means the index buffer coupled to the
//! current array object. Binding one therefore goes through the coupling
//! policy of that array object.

use vigil_core::api::{BufferTarget, ByteRange, IndexType, UsageHint};
use vigil_core::handle::{ArrayObjectId, IndexBufferId, IndexBufferKey, Registry};
use vigil_core::{ContextId, ObjectKind, ReferenceContainer, StateError};

use crate::array_buffers::{check_update_range, discard_buffer};
use crate::array_objects::ArrayObjectState;
use crate::context::GraphicsContext;

#[derive(Debug)]
pub(crate) struct IndexBufferRecord {
    pub(crate) range: ByteRange,
    pub(crate) usage: UsageHint,
    pub(crate) index_type: IndexType,
    pub(crate) indices: u64,
    /// Array objects this buffer is coupled to.
    pub(crate) referrers: ReferenceContainer<ArrayObjectId>,
}

#[derive(Debug)]
pub(crate) struct IndexBufferState {
    pub(crate) registry: Registry<IndexBufferKey, IndexBufferRecord>,
}

impl IndexBufferState {
    pub(crate) fn new(context: ContextId) -> Self {
        Self {
            registry: Registry::new(context, ObjectKind::IndexBuffer),
        }
    }

    fn check_bound(
        &self,
        arrays: &ArrayObjectState,
        index_buffer: &IndexBufferId,
    ) -> Result<&IndexBufferRecord, StateError> {
        let record = self.registry.get(index_buffer)?;
        let current = arrays.current_index_buffer();
        if current != Some(*index_buffer) {
            return Err(StateError::BufferNotBound {
                kind: ObjectKind::IndexBuffer,
                required: index_buffer.name(),
                bound: current.map(|b| b.name()),
            });
        }
        Ok(record)
    }
}

/// Records `index_buffer` as the index buffer of the current array object.
fn couple(
    arrays: &mut ArrayObjectState,
    index_buffers: &mut IndexBufferState,
    index_buffer: Option<IndexBufferId>,
) {
    let array = arrays.bound;
    let Ok(record) = arrays.registry.get_mut(&array) else {
        return;
    };
    let previous = record.replace_index_buffer(index_buffer);
    if previous == index_buffer {
        return;
    }
    if let Some(previous) = previous {
        if let Ok(previous) = index_buffers.registry.get_mut(&previous) {
            previous.referrers.remove(array);
        }
    }
    if let Some(index_buffer) = index_buffer {
        transfer_ownership(arrays, index_buffers, &index_buffer, array);
    }
}

/// Makes `owner` the only array object `index_buffer` is coupled to.
///
/// Any previous owner loses its index buffer. Only the bookkeeping changes;
/// the previous owner's device-side element binding is left as it was.
pub(crate) fn transfer_ownership(
    arrays: &mut ArrayObjectState,
    index_buffers: &mut IndexBufferState,
    index_buffer: &IndexBufferId,
    owner: ArrayObjectId,
) {
    let Ok(record) = index_buffers.registry.get_mut(index_buffer) else {
        return;
    };
    for previous in record.referrers.clear() {
        if previous == owner {
            continue;
        }
        if let Ok(array) = arrays.registry.get_mut(&previous) {
            if array.index_buffer == Some(*index_buffer) {
                array.replace_index_buffer(None);
                log::debug!(
                    "Index buffer {} moved from array object {} to {}",
                    index_buffer.name(),
                    previous.name(),
                    owner.name()
                );
            }
        }
    }
    record.referrers.add(owner);
}

/// Allocation, binding and deletion of index buffers.
///
/// Obtained from [`GraphicsContext::index_buffers`].
pub struct IndexBuffers<'a> {
    pub(crate) ctx: &'a mut GraphicsContext,
}

impl IndexBuffers<'_> {
    /// Allocates a buffer holding `indices` indices of type `index_type` and
    /// couples it to the current array object.
    /// ## Errors
    /// * `StateError::RangeCheck` - If `indices` is zero.
    /// * `StateError::IndexBufferAlreadyConfigured` - If the current array object
    ///   does not accept a new index buffer. Nothing is created in that case.
    pub fn allocate(
        &mut self,
        indices: u64,
        index_type: IndexType,
        usage: UsageHint,
    ) -> Result<IndexBufferId, StateError> {
        let size = indices
            .checked_mul(index_type.size_bytes())
            .ok_or_else(|| StateError::RangeCheck(format!("{indices} indices overflow")))?;
        let range = ByteRange::from_size(size).ok_or_else(|| {
            StateError::RangeCheck("Index buffer must hold at least one index".to_string())
        })?;
        let GraphicsContext {
            device,
            index_buffers,
            arrays,
            ..
        } = &mut *self.ctx;
        let device = device.as_ref();

        if arrays.bound != arrays.default {
            let record = arrays.registry.get(&arrays.bound)?;
            if !record.rebindable {
                return Err(StateError::IndexBufferAlreadyConfigured {
                    array_object: arrays.bound.name(),
                    attached: record.index_buffer.map(|b| b.name()),
                    requested: None,
                });
            }
        }

        let name = device.gen_buffer()?;
        let configured = device
            .bind_buffer(BufferTarget::ElementArray, name)
            .and_then(|()| device.buffer_data(BufferTarget::ElementArray, size, None, usage));
        if let Err(err) = configured {
            discard_buffer(device, name);
            if let Some(previous) = arrays.current_index_buffer() {
                if let Err(rebind) = device.bind_buffer(BufferTarget::ElementArray, previous.name()) {
                    log::warn!(
                        "Failed to restore index buffer {} after a failed allocation: {rebind}",
                        previous.name()
                    );
                }
            }
            return Err(err.into());
        }

        let index_buffer = index_buffers.registry.create(
            name,
            IndexBufferRecord {
                range,
                usage,
                index_type,
                indices,
                referrers: ReferenceContainer::new(),
            },
        );
        couple(arrays, index_buffers, Some(index_buffer));
        log::debug!("Allocated index buffer {name} of {indices} {index_type:?} indices ({usage:?})");
        Ok(index_buffer)
    }

    /// Binds `index_buffer` to the current array object.
    ///
    /// Binding the index buffer already coupled to the current array object makes
    /// no device call.
    /// ## Errors
    /// * `StateError::IndexBufferAlreadyConfigured` - If the current array object is
    ///   not the default one, is not rebindable and has a different (or no) index buffer.
    pub fn bind(&mut self, index_buffer: &IndexBufferId) -> Result<(), StateError> {
        let GraphicsContext {
            device,
            index_buffers,
            arrays,
            ..
        } = &mut *self.ctx;

        index_buffers.registry.validate(index_buffer)?;
        arrays.check_index_buffer_binding(Some(*index_buffer))?;
        if arrays.current_index_buffer() == Some(*index_buffer) {
            log::trace!("Index buffer {} already bound", index_buffer.name());
            return Ok(());
        }
        device.bind_buffer(BufferTarget::ElementArray, index_buffer.name())?;
        couple(arrays, index_buffers, Some(*index_buffer));
        Ok(())
    }

    /// Clears the index buffer of the default array object.
    /// ## Errors
    /// * `StateError::IndexBufferAlreadyConfigured` - If the current array object is not
    ///   the default one.
    pub fn unbind(&mut self) -> Result<(), StateError> {
        let GraphicsContext {
            device,
            index_buffers,
            arrays,
            ..
        } = &mut *self.ctx;

        arrays.check_index_buffer_binding(None)?;
        if arrays.current_index_buffer().is_none() {
            return Ok(());
        }
        device.bind_buffer(BufferTarget::ElementArray, 0)?;
        couple(arrays, index_buffers, None);
        Ok(())
    }

    /// Returns `true` if `index_buffer` is coupled to the current array object.
    pub fn is_bound(&self, index_buffer: &IndexBufferId) -> Result<bool, StateError> {
        self.ctx.index_buffers.registry.validate(index_buffer)?;
        Ok(self.ctx.arrays.current_index_buffer() == Some(*index_buffer))
    }

    /// Returns `true` if the current array object has an index buffer.
    pub fn any_is_bound(&self) -> bool {
        self.ctx.arrays.current_index_buffer().is_some()
    }

    /// Returns the index buffer of the current array object.
    pub fn currently_bound(&self) -> Option<IndexBufferId> {
        self.ctx.arrays.current_index_buffer()
    }

    /// Returns the byte range of `index_buffer`.
    pub fn range(&self, index_buffer: &IndexBufferId) -> Result<ByteRange, StateError> {
        Ok(self.ctx.index_buffers.registry.get(index_buffer)?.range)
    }

    /// Returns the index type of `index_buffer`.
    pub fn index_type(&self, index_buffer: &IndexBufferId) -> Result<IndexType, StateError> {
        Ok(self.ctx.index_buffers.registry.get(index_buffer)?.index_type)
    }

    /// Returns the number of indices `index_buffer` holds.
    pub fn indices(&self, index_buffer: &IndexBufferId) -> Result<u64, StateError> {
        Ok(self.ctx.index_buffers.registry.get(index_buffer)?.indices)
    }

    /// Returns the usage hint `index_buffer` was allocated with.
    pub fn usage(&self, index_buffer: &IndexBufferId) -> Result<UsageHint, StateError> {
        Ok(self.ctx.index_buffers.registry.get(index_buffer)?.usage)
    }

    /// Returns the array object `index_buffer` is coupled to, if any.
    pub fn owner(&self, index_buffer: &IndexBufferId) -> Result<Option<ArrayObjectId>, StateError> {
        Ok(self
            .ctx
            .index_buffers
            .registry
            .get(index_buffer)?
            .referrers
            .iter()
            .next())
    }

    /// Returns the array objects `index_buffer` is coupled to. There is at most one.
    pub fn referrers(&self, index_buffer: &IndexBufferId) -> Result<Vec<ArrayObjectId>, StateError> {
        Ok(self
            .ctx
            .index_buffers
            .registry
            .get(index_buffer)?
            .referrers
            .iter()
            .collect())
    }

    /// Replaces the bytes of `index_buffer` in `range` with `data`.
    /// ## Errors
    /// * `StateError::BufferNotBound` - If `index_buffer` is not the current index buffer.
    /// * `StateError::RangeCheck` - If `range` exceeds the buffer or does not match `data`.
    pub fn update(
        &mut self,
        index_buffer: &IndexBufferId,
        range: ByteRange,
        data: &[u8],
    ) -> Result<(), StateError> {
        let record = self
            .ctx
            .index_buffers
            .check_bound(&self.ctx.arrays, index_buffer)?;
        check_update_range(record.range, range, data)?;
        self.ctx
            .device
            .buffer_sub_data(BufferTarget::ElementArray, range.lower(), data)?;
        Ok(())
    }

    /// Re-issues the allocation of `index_buffer` with no data, discarding its contents.
    pub fn reallocate(&mut self, index_buffer: &IndexBufferId) -> Result<(), StateError> {
        let record = self
            .ctx
            .index_buffers
            .check_bound(&self.ctx.arrays, index_buffer)?;
        let (size, usage) = (record.range.interval(), record.usage);
        self.ctx
            .device
            .buffer_data(BufferTarget::ElementArray, size, None, usage)?;
        Ok(())
    }

    /// Reads back the whole contents of `index_buffer`, which must be bound.
    pub fn read(&mut self, index_buffer: &IndexBufferId) -> Result<Vec<u8>, StateError> {
        let record = self
            .ctx
            .index_buffers
            .check_bound(&self.ctx.arrays, index_buffer)?;
        let size = record.range.interval();
        Ok(self
            .ctx
            .device
            .get_buffer_sub_data(BufferTarget::ElementArray, 0, size)?)
    }

    /// Deletes `index_buffer`, severing its coupling to the array object that owns it.
    /// ## Errors
    /// * `StateError::Deleted` - If `index_buffer` was already deleted.
    pub fn delete(&mut self, index_buffer: &IndexBufferId) -> Result<(), StateError> {
        let GraphicsContext {
            device,
            index_buffers,
            arrays,
            ..
        } = &mut *self.ctx;

        index_buffers.registry.validate(index_buffer)?;
        device.delete_buffer(index_buffer.name())?;
        let record = index_buffers.registry.mark_deleted(index_buffer)?;

        for array in record.referrers.iter() {
            if let Ok(array_record) = arrays.registry.get_mut(&array) {
                if array_record.index_buffer == Some(*index_buffer) {
                    array_record.replace_index_buffer(None);
                    log::debug!(
                        "Detached deleted index buffer {} from array object {}",
                        index_buffer.name(),
                        array.name()
                    );
                }
            }
        }
        Ok(())
    }
}
