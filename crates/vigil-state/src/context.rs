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

//! The context-scoped state every tracker operates on.

use vigil_core::{ContextConfig, ContextId, GraphicsDevice, StateError};

use crate::array_buffers::{ArrayBufferState, ArrayBuffers};
use crate::array_objects::{ArrayObjectState, ArrayObjects};
use crate::framebuffers::{FramebufferState, Framebuffers};
use crate::index_buffers::{IndexBufferState, IndexBuffers};
use crate::queries::{Queries, QueryState};
use crate::shaders::{ShaderState, Shaders};
use crate::textures::{TextureState, Textures};

/// A device context together with the shadow of its binding state.
///
/// Every binding point, object table and reference graph of one device
/// context lives here as a plain field. Components are reached through
/// short-lived facades (`ctx.array_buffers()`, `ctx.textures()`, ...) that
/// borrow the context mutably for the duration of one call, so operations
/// that span components (binding an attribute's source buffer while
/// configuring an array object, consulting the draw framebuffer before binding
/// a texture) see one consistent state.
///
/// A context is single-threaded: the device it wraps is current on one thread
/// at a time and nothing here is locked.
#[derive(Debug)]
pub struct GraphicsContext {
    id: ContextId,
    config: ContextConfig,
    pub(crate) device: Box<dyn GraphicsDevice>,
    pub(crate) buffers: ArrayBufferState,
    pub(crate) index_buffers: IndexBufferState,
    pub(crate) arrays: ArrayObjectState,
    pub(crate) textures: TextureState,
    pub(crate) framebuffers: FramebufferState,
    pub(crate) shaders: ShaderState,
    pub(crate) queries: QueryState,
}

impl GraphicsContext {
    /// Creates a context over `device` using the default configuration.
    /// ## Errors
    /// * `StateError::NonCompliantDevice` - If a capability is below the required minimum.
    /// * `StateError::Device` - If a capability query or the initial binding fails.
    pub fn new<D: GraphicsDevice>(device: D) -> Result<Self, StateError> {
        Self::with_config(device, ContextConfig::default())
    }

    /// Creates a context over `device`.
    ///
    /// Device capabilities are queried exactly once, here. Nothing is returned
    /// if any component fails to initialize.
    pub fn with_config<D: GraphicsDevice>(
        device: D,
        config: ContextConfig,
    ) -> Result<Self, StateError> {
        let id = ContextId::next();
        let device: Box<dyn GraphicsDevice> = Box::new(device);
        log::debug!("Creating graphics context {id} with {config:?}");

        let arrays = ArrayObjectState::new(id, device.as_ref(), &config)?;
        let textures = TextureState::new(id, device.as_ref(), &config)?;
        let framebuffers = FramebufferState::new(id, device.as_ref())?;

        Ok(Self {
            id,
            buffers: ArrayBufferState::new(id),
            index_buffers: IndexBufferState::new(id),
            arrays,
            textures,
            framebuffers,
            shaders: ShaderState::new(id, &config),
            queries: QueryState::new(id),
            device,
            config,
        })
    }

    /// Returns the identity of this context.
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Returns the configuration this context was created with.
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Returns the underlying device.
    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    /// Array buffer allocation and binding.
    pub fn array_buffers(&mut self) -> ArrayBuffers<'_> {
        ArrayBuffers { ctx: self }
    }

    /// Index buffer allocation and binding.
    pub fn index_buffers(&mut self) -> IndexBuffers<'_> {
        IndexBuffers { ctx: self }
    }

    /// Array object construction and binding.
    pub fn array_objects(&mut self) -> ArrayObjects<'_> {
        ArrayObjects { ctx: self }
    }

    /// Texture allocation and texture unit binding.
    pub fn textures(&mut self) -> Textures<'_> {
        Textures { ctx: self }
    }

    /// Framebuffer construction and draw/read binding.
    pub fn framebuffers(&mut self) -> Framebuffers<'_> {
        Framebuffers { ctx: self }
    }

    /// Shader compilation, program linking and uniform writes.
    pub fn shaders(&mut self) -> Shaders<'_> {
        Shaders { ctx: self }
    }

    /// Asynchronous queries.
    pub fn queries(&mut self) -> Queries<'_> {
        Queries { ctx: self }
    }
}

/// Reads a device limit, failing if it is below `minimum` and clamping it to `clamp`.
pub(crate) fn checked_limit(
    what: &str,
    reported: i32,
    minimum: i32,
    clamp: u32,
) -> Result<u32, StateError> {
    log::debug!("Device reports {what} = {reported}");
    if reported < minimum {
        let message =
            format!("Reported {what} {reported} is less than the required {minimum}");
        log::error!("{message}");
        return Err(StateError::NonCompliantDevice(message));
    }
    let reported = reported.unsigned_abs();
    let clamped = reported.min(clamp);
    if clamped != reported {
        log::debug!("Clamped unreasonable {what} {reported} to {clamped}");
    }
    Ok(clamped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_limit() {
        assert_eq!(checked_limit("units", 32, 16, 1024).unwrap(), 32);
        assert_eq!(checked_limit("units", 5000, 16, 1024).unwrap(), 1024);
        assert!(matches!(
            checked_limit("units", 8, 16, 1024),
            Err(StateError::NonCompliantDevice(_))
        ));
        assert!(matches!(
            checked_limit("units", -1, 16, 1024),
            Err(StateError::NonCompliantDevice(_))
        ));
    }
}
