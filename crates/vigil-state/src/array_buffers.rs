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

//! Tracking of buffers bound to the array-buffer target.

use vigil_core::api::{BufferTarget, ByteRange, UsageHint};
use vigil_core::handle::{ArrayBufferId, ArrayBufferKey, ArrayObjectId, Registry};
use vigil_core::{ContextId, GraphicsDevice, ObjectKind, ReferenceContainer, StateError};

use crate::context::GraphicsContext;

#[derive(Debug)]
pub(crate) struct ArrayBufferRecord {
    pub(crate) range: ByteRange,
    pub(crate) usage: UsageHint,
    /// Array objects with at least one attribute sourced from this buffer.
    pub(crate) referrers: ReferenceContainer<ArrayObjectId>,
}

#[derive(Debug)]
pub(crate) struct ArrayBufferState {
    pub(crate) registry: Registry<ArrayBufferKey, ArrayBufferRecord>,
    pub(crate) bound: Option<ArrayBufferId>,
}

impl ArrayBufferState {
    pub(crate) fn new(context: ContextId) -> Self {
        Self {
            registry: Registry::new(context, ObjectKind::ArrayBuffer),
            bound: None,
        }
    }

    /// Binds `buffer`, issuing a device call only if it is not already bound.
    pub(crate) fn bind(
        &mut self,
        device: &dyn GraphicsDevice,
        buffer: &ArrayBufferId,
    ) -> Result<(), StateError> {
        self.registry.validate(buffer)?;
        if self.bound == Some(*buffer) {
            log::trace!("Array buffer {} already bound", buffer.name());
            return Ok(());
        }
        device.bind_buffer(BufferTarget::Array, buffer.name())?;
        self.bound = Some(*buffer);
        Ok(())
    }

    pub(crate) fn unbind(&mut self, device: &dyn GraphicsDevice) -> Result<(), StateError> {
        if self.bound.is_some() {
            device.bind_buffer(BufferTarget::Array, 0)?;
            self.bound = None;
        }
        Ok(())
    }

    fn check_bound(&self, buffer: &ArrayBufferId) -> Result<&ArrayBufferRecord, StateError> {
        let record = self.registry.get(buffer)?;
        if self.bound != Some(*buffer) {
            return Err(StateError::BufferNotBound {
                kind: ObjectKind::ArrayBuffer,
                required: buffer.name(),
                bound: self.bound.map(|b| b.name()),
            });
        }
        Ok(record)
    }
}

/// Allocation, binding and deletion of array buffers.
///
/// Obtained from [`GraphicsContext::array_buffers`].
pub struct ArrayBuffers<'a> {
    pub(crate) ctx: &'a mut GraphicsContext,
}

impl ArrayBuffers<'_> {
    /// Allocates a buffer of `size` bytes and leaves it bound.
    /// ## Errors
    /// * `StateError::RangeCheck` - If `size` is zero.
    /// * `StateError::Device` - If the device fails to create or allocate the buffer.
    pub fn allocate(&mut self, size: u64, usage: UsageHint) -> Result<ArrayBufferId, StateError> {
        let range = ByteRange::from_size(size).ok_or_else(|| {
            StateError::RangeCheck("Buffer size must be at least one byte".to_string())
        })?;
        let GraphicsContext {
            device, buffers, ..
        } = &mut *self.ctx;
        let device = device.as_ref();

        let name = device.gen_buffer()?;
        if let Err(err) = device.bind_buffer(BufferTarget::Array, name) {
            discard_buffer(device, name);
            return Err(err.into());
        }
        if let Err(err) = device.buffer_data(BufferTarget::Array, size, None, usage) {
            // Deleting the buffer also clears the target it was bound to.
            discard_buffer(device, name);
            buffers.bound = None;
            return Err(err.into());
        }

        let buffer = buffers.registry.create(
            name,
            ArrayBufferRecord {
                range,
                usage,
                referrers: ReferenceContainer::new(),
            },
        );
        buffers.bound = Some(buffer);
        log::debug!("Allocated array buffer {name} of {size} bytes ({usage:?})");
        Ok(buffer)
    }

    /// Binds `buffer`. Binding the already bound buffer makes no device call.
    pub fn bind(&mut self, buffer: &ArrayBufferId) -> Result<(), StateError> {
        let GraphicsContext {
            device, buffers, ..
        } = &mut *self.ctx;
        buffers.bind(device.as_ref(), buffer)
    }

    /// Clears the array-buffer binding.
    pub fn unbind(&mut self) -> Result<(), StateError> {
        let GraphicsContext {
            device, buffers, ..
        } = &mut *self.ctx;
        buffers.unbind(device.as_ref())
    }

    /// Returns `true` if `buffer` is the bound array buffer.
    pub fn is_bound(&self, buffer: &ArrayBufferId) -> Result<bool, StateError> {
        self.ctx.buffers.registry.validate(buffer)?;
        Ok(self.ctx.buffers.bound == Some(*buffer))
    }

    /// Returns `true` if any array buffer is bound.
    pub fn any_is_bound(&self) -> bool {
        self.ctx.buffers.bound.is_some()
    }

    /// Returns the bound array buffer, if any.
    pub fn currently_bound(&self) -> Option<ArrayBufferId> {
        self.ctx.buffers.bound
    }

    /// Returns the byte range of `buffer`.
    pub fn range(&self, buffer: &ArrayBufferId) -> Result<ByteRange, StateError> {
        Ok(self.ctx.buffers.registry.get(buffer)?.range)
    }

    /// Returns the usage hint `buffer` was allocated with.
    pub fn usage(&self, buffer: &ArrayBufferId) -> Result<UsageHint, StateError> {
        Ok(self.ctx.buffers.registry.get(buffer)?.usage)
    }

    /// Replaces the bytes of `buffer` in `range` with `data`.
    /// ## Errors
    /// * `StateError::BufferNotBound` - If `buffer` is not the bound array buffer.
    /// * `StateError::RangeCheck` - If `range` exceeds the buffer or does not match `data`.
    pub fn update(
        &mut self,
        buffer: &ArrayBufferId,
        range: ByteRange,
        data: &[u8],
    ) -> Result<(), StateError> {
        let record = self.ctx.buffers.check_bound(buffer)?;
        check_update_range(record.range, range, data)?;
        self.ctx
            .device
            .buffer_sub_data(BufferTarget::Array, range.lower(), data)?;
        Ok(())
    }

    /// Re-issues the allocation of `buffer` with no data.
    ///
    /// The previous contents are discarded.
    pub fn reallocate(&mut self, buffer: &ArrayBufferId) -> Result<(), StateError> {
        let record = self.ctx.buffers.check_bound(buffer)?;
        let (size, usage) = (record.range.interval(), record.usage);
        self.ctx
            .device
            .buffer_data(BufferTarget::Array, size, None, usage)?;
        log::trace!("Reallocated array buffer {}", buffer.name());
        Ok(())
    }

    /// Reads back the whole contents of `buffer`, which must be bound.
    pub fn read(&mut self, buffer: &ArrayBufferId) -> Result<Vec<u8>, StateError> {
        let record = self.ctx.buffers.check_bound(buffer)?;
        let size = record.range.interval();
        Ok(self
            .ctx
            .device
            .get_buffer_sub_data(BufferTarget::Array, 0, size)?)
    }

    /// Deletes `buffer`, unbinding it first if it is bound.
    ///
    /// Every attribute slot of every array object sourced from `buffer` is
    /// cleared, so no array object keeps a reference to a deleted buffer.
    /// The slots are cleared in the bookkeeping only: no device call detaches
    /// or disables them, so the device-side array objects keep whatever the
    /// device does with a deleted source buffer.
    /// ## Errors
    /// * `StateError::Deleted` - If `buffer` was already deleted.
    pub fn delete(&mut self, buffer: &ArrayBufferId) -> Result<(), StateError> {
        let GraphicsContext {
            device,
            buffers,
            arrays,
            ..
        } = &mut *self.ctx;
        let device = device.as_ref();

        buffers.registry.validate(buffer)?;
        if buffers.bound == Some(*buffer) {
            buffers.unbind(device)?;
        }
        device.delete_buffer(buffer.name())?;
        let record = buffers.registry.mark_deleted(buffer)?;

        for array in record.referrers.iter() {
            if let Ok(array_record) = arrays.registry.get_mut(&array) {
                let cleared = array_record.detach_buffer(buffer);
                log::debug!(
                    "Detached deleted array buffer {} from {cleared} attribute(s) of array object {}",
                    buffer.name(),
                    array.name()
                );
            }
        }
        Ok(())
    }
}

pub(crate) fn check_update_range(
    buffer: ByteRange,
    range: ByteRange,
    data: &[u8],
) -> Result<(), StateError> {
    if !buffer.includes(&range) {
        return Err(StateError::RangeCheck(format!(
            "Update range {range} is not within the buffer range {buffer}"
        )));
    }
    if data.len() as u64 != range.interval() {
        return Err(StateError::RangeCheck(format!(
            "Update range {range} covers {} bytes but {} bytes were supplied",
            range.interval(),
            data.len()
        )));
    }
    Ok(())
}

/// Deletes a buffer created by a failed allocation.
pub(crate) fn discard_buffer(device: &dyn GraphicsDevice, name: u32) {
    if let Err(err) = device.delete_buffer(name) {
        log::warn!("Failed to delete buffer {name} after a failed allocation: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_range_checks() {
        let buffer = ByteRange::from_size(16).unwrap();
        assert!(check_update_range(buffer, ByteRange::new(0, 3).unwrap(), &[0; 4]).is_ok());
        assert!(matches!(
            check_update_range(buffer, ByteRange::new(12, 16).unwrap(), &[0; 5]),
            Err(StateError::RangeCheck(_))
        ));
        assert!(matches!(
            check_update_range(buffer, ByteRange::new(0, 3).unwrap(), &[0; 3]),
            Err(StateError::RangeCheck(_))
        ));
    }
}
