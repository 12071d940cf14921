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

//! A headless, in-memory graphics device.
//!
//! [`HeadlessDevice`] behaves like a strict driver: it hands out and recycles
//! object names, keeps per-target bindings and rejects calls a real device
//! would reject. It also records every call it receives, which lets tests
//! count device traffic, and it can be scripted to fail specific calls.

mod calls;
mod device;
mod state;

pub use calls::RecordedCall;
pub use state::LinkScript;

use std::sync::{Arc, Mutex, MutexGuard};

use vigil_core::api::{ActiveVariable, BufferTarget, FramebufferStatus, FramebufferTarget, TextureTarget};
use vigil_core::DeviceError;

use state::HeadlessState;

/// The limits a [`HeadlessDevice`] reports through its capability queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessLimits {
    /// Reported vertex attribute count.
    pub max_vertex_attributes: i32,
    /// Reported texture unit count.
    pub max_texture_units: i32,
    /// Reported maximum texture size.
    pub max_texture_size: i32,
    /// Reported color attachment count.
    pub max_color_attachments: i32,
    /// Reported draw buffer count.
    pub max_draw_buffers: i32,
}

impl Default for HeadlessLimits {
    fn default() -> Self {
        Self {
            max_vertex_attributes: 16,
            max_texture_units: 32,
            max_texture_size: 8192,
            max_color_attachments: 8,
            max_draw_buffers: 8,
        }
    }
}

/// The internal, non-clonable state of the headless device.
#[derive(Debug)]
pub struct HeadlessDeviceInternal {
    limits: HeadlessLimits,
    state: Mutex<HeadlessState>,
}

/// A clonable handle to a headless device.
///
/// Clones share one device, so a test can keep a clone to inspect the device
/// after handing another clone to a graphics context.
#[derive(Clone, Debug)]
pub struct HeadlessDevice {
    inner: Arc<HeadlessDeviceInternal>,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    /// Creates a device reporting the default limits.
    pub fn new() -> Self {
        Self::with_limits(HeadlessLimits::default())
    }

    /// Creates a device reporting the given limits.
    pub fn with_limits(limits: HeadlessLimits) -> Self {
        log::debug!("Creating headless device with {limits:?}");
        Self {
            inner: Arc::new(HeadlessDeviceInternal {
                limits,
                state: Mutex::new(HeadlessState::new()),
            }),
        }
    }

    /// Returns the limits this device reports.
    pub fn limits(&self) -> HeadlessLimits {
        self.inner.limits
    }

    fn lock(&self, operation: &'static str) -> Result<MutexGuard<'_, HeadlessState>, DeviceError> {
        self.inner
            .state
            .lock()
            .map_err(|_| DeviceError::new(operation, "device state lock poisoned"))
    }

    /// Records a call and applies any scripted failure for it.
    fn enter(
        &self,
        operation: &'static str,
        detail: String,
    ) -> Result<MutexGuard<'_, HeadlessState>, DeviceError> {
        let mut state = self.lock(operation)?;
        log::trace!("headless: {operation}({detail})");
        state.calls.push(RecordedCall { operation, detail });
        if let Some(message) = state.take_failure(operation) {
            return Err(DeviceError::new(operation, message));
        }
        Ok(state)
    }

    // --- Scripting ---

    /// Makes the next call to `operation` fail with `message`.
    ///
    /// Several failures may be queued for the same operation; each applies once.
    pub fn fail_next(&self, operation: &'static str, message: impl Into<String>) {
        if let Ok(mut state) = self.lock(operation) {
            state.failures.push((operation, message.into()));
        }
    }

    /// Makes the next shader compilation fail with `log`.
    pub fn fail_next_compile(&self, log: impl Into<String>) {
        if let Ok(mut state) = self.lock("compile_shader") {
            state.compile_failures.push_back(log.into());
        }
    }

    /// Makes the next program link succeed and report the given actives.
    pub fn push_link_reflection(
        &self,
        attributes: Vec<ActiveVariable>,
        uniforms: Vec<ActiveVariable>,
    ) {
        self.push_link_script(LinkScript::Succeed {
            attributes,
            uniforms,
        });
    }

    /// Queues the outcome of the next program link.
    pub fn push_link_script(&self, script: LinkScript) {
        if let Ok(mut state) = self.lock("link_program") {
            state.link_scripts.push_back(script);
        }
    }

    /// Sets how many availability polls a finished query needs before its result is ready.
    pub fn set_query_latency(&self, polls: u32) {
        if let Ok(mut state) = self.lock("query_result_available") {
            state.query_latency = polls;
        }
    }

    /// Forces every completeness check to report `status`, or restores real checks with `None`.
    pub fn set_framebuffer_status_override(&self, status: Option<FramebufferStatus>) {
        if let Ok(mut state) = self.lock("check_framebuffer_status") {
            state.status_override = status;
        }
    }

    // --- Inspection ---

    /// Returns a copy of every call recorded so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock("calls")
            .map(|state| state.calls.clone())
            .unwrap_or_default()
    }

    /// Returns how many calls to `operation` were recorded.
    pub fn call_count(&self, operation: &str) -> usize {
        self.lock("calls")
            .map(|state| {
                state
                    .calls
                    .iter()
                    .filter(|call| call.operation == operation)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Forgets every recorded call.
    pub fn clear_calls(&self) {
        if let Ok(mut state) = self.lock("calls") {
            state.calls.clear();
        }
    }

    /// Returns the buffer bound to `target` (`0` if none).
    pub fn bound_buffer(&self, target: BufferTarget) -> u32 {
        self.lock("inspect")
            .map(|state| state.bound_buffer(target))
            .unwrap_or(0)
    }

    /// Returns the bound vertex array (`0` for the default one).
    pub fn bound_vertex_array(&self) -> u32 {
        self.lock("inspect")
            .map(|state| state.vertex_array)
            .unwrap_or(0)
    }

    /// Returns the element buffer recorded in vertex array `array`.
    pub fn element_buffer_of(&self, array: u32) -> Option<u32> {
        self.lock("inspect")
            .ok()?
            .vertex_arrays
            .get(&array)
            .map(|store| store.element_buffer)
    }

    /// Returns the buffer attribute `index` of vertex array `array` reads from, if enabled.
    pub fn attribute_source(&self, array: u32, index: u32) -> Option<u32> {
        let state = self.lock("inspect").ok()?;
        let attribute = state.vertex_arrays.get(&array)?.attributes.get(&index)?;
        attribute.enabled.then_some(attribute.buffer)
    }

    /// Returns the texture bound to `target` of `unit` (`0` if none).
    pub fn bound_texture(&self, unit: u32, target: TextureTarget) -> u32 {
        self.lock("inspect")
            .ok()
            .and_then(|state| state.unit_bindings.get(&(unit, target)).copied())
            .unwrap_or(0)
    }

    /// Returns the framebuffer bound to `target` (`0` for the default framebuffer).
    pub fn bound_framebuffer(&self, target: FramebufferTarget) -> u32 {
        self.lock("inspect")
            .map(|state| state.bound_framebuffer(target))
            .unwrap_or(0)
    }

    /// Returns the current program (`0` if none).
    pub fn current_program(&self) -> u32 {
        self.lock("inspect")
            .map(|state| state.current_program)
            .unwrap_or(0)
    }

    /// Returns the number of live device objects of every family.
    pub fn live_object_count(&self) -> usize {
        self.lock("inspect")
            .map(|state| {
                state.buffers.len()
                    + state.vertex_arrays.len().saturating_sub(1)
                    + state.textures.len()
                    + state.framebuffers.len()
                    + state.shaders.len()
                    + state.programs.len()
                    + state.queries.len()
            })
            .unwrap_or(0)
    }
}
