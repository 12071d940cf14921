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

//! The in-memory object tables of the headless device.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use vigil_core::api::*;

use super::calls::RecordedCall;

/// Hands out object names the way a real driver does: the lowest free name
/// first, so names of deleted objects are reused.
#[derive(Debug, Default)]
pub(crate) struct NamePool {
    next: u32,
    free: BTreeSet<u32>,
}

impl NamePool {
    pub(crate) fn acquire(&mut self) -> u32 {
        if let Some(name) = self.free.pop_first() {
            return name;
        }
        self.next += 1;
        self.next
    }

    pub(crate) fn release(&mut self, name: u32) {
        if name != 0 && name <= self.next {
            self.free.insert(name);
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct BufferStore {
    pub(crate) data: Vec<u8>,
    pub(crate) usage: UsageHint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AttributeStore {
    pub(crate) buffer: u32,
    pub(crate) enabled: bool,
    pub(crate) divisor: u32,
}

#[derive(Debug, Default)]
pub(crate) struct VertexArrayStore {
    pub(crate) element_buffer: u32,
    pub(crate) attributes: BTreeMap<u32, AttributeStore>,
}

#[derive(Debug)]
pub(crate) struct ImageStore {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) format: TextureFormat,
    pub(crate) data: Vec<u8>,
}

#[derive(Debug, Default)]
pub(crate) struct TextureStore {
    /// Fixed by the first bind, as a real driver does.
    pub(crate) target: Option<TextureTarget>,
    pub(crate) images: HashMap<TextureImageTarget, ImageStore>,
    pub(crate) parameters: TextureParameters,
    pub(crate) mipmapped: bool,
}

#[derive(Debug, Default)]
pub(crate) struct FramebufferStore {
    pub(crate) attachments: BTreeMap<AttachmentPoint, (TextureImageTarget, u32)>,
    pub(crate) draw_buffers: Vec<Option<u32>>,
}

#[derive(Debug)]
pub(crate) struct ShaderStore {
    pub(crate) stage: ShaderStage,
    pub(crate) compiled: bool,
    pub(crate) log: String,
}

#[derive(Debug, Default)]
pub(crate) struct ProgramStore {
    pub(crate) attached: Vec<u32>,
    pub(crate) linked: bool,
    pub(crate) log: String,
    pub(crate) attributes: Vec<ActiveVariable>,
    pub(crate) uniforms: Vec<ActiveVariable>,
}

#[derive(Debug, Default)]
pub(crate) struct QueryStore {
    pub(crate) kind: Option<QueryKind>,
    pub(crate) started_at: usize,
    pub(crate) result: Option<u64>,
    pub(crate) polls_remaining: u32,
}

/// The outcome of the next link, queued by a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkScript {
    /// The link succeeds and reports the given actives.
    Succeed {
        /// Active vertex attributes.
        attributes: Vec<ActiveVariable>,
        /// Active uniforms.
        uniforms: Vec<ActiveVariable>,
    },
    /// The link fails with the given log text.
    Fail(String),
}

#[derive(Debug, Default)]
pub(crate) struct HeadlessState {
    pub(crate) buffer_names: NamePool,
    pub(crate) array_names: NamePool,
    pub(crate) texture_names: NamePool,
    pub(crate) framebuffer_names: NamePool,
    /// Shaders and programs share one namespace.
    pub(crate) program_names: NamePool,
    pub(crate) query_names: NamePool,

    pub(crate) buffers: HashMap<u32, BufferStore>,
    pub(crate) array_buffer: u32,
    pub(crate) vertex_arrays: HashMap<u32, VertexArrayStore>,
    pub(crate) vertex_array: u32,

    pub(crate) textures: HashMap<u32, TextureStore>,
    pub(crate) active_unit: u32,
    pub(crate) unit_bindings: HashMap<(u32, TextureTarget), u32>,

    pub(crate) framebuffers: HashMap<u32, FramebufferStore>,
    pub(crate) draw_framebuffer: u32,
    pub(crate) read_framebuffer: u32,
    pub(crate) status_override: Option<FramebufferStatus>,

    pub(crate) shaders: HashMap<u32, ShaderStore>,
    pub(crate) programs: HashMap<u32, ProgramStore>,
    pub(crate) current_program: u32,
    pub(crate) compile_failures: VecDeque<String>,
    pub(crate) link_scripts: VecDeque<LinkScript>,

    pub(crate) queries: HashMap<u32, QueryStore>,
    pub(crate) running_queries: HashMap<QueryKind, u32>,
    pub(crate) query_latency: u32,

    pub(crate) calls: Vec<RecordedCall>,
    pub(crate) failures: Vec<(&'static str, String)>,
}

impl HeadlessState {
    pub(crate) fn new() -> Self {
        let mut state = Self::default();
        state.vertex_arrays.insert(0, VertexArrayStore::default());
        state
    }

    /// Removes and returns the first scripted failure for `operation`.
    pub(crate) fn take_failure(&mut self, operation: &str) -> Option<String> {
        let position = self.failures.iter().position(|(op, _)| *op == operation)?;
        Some(self.failures.remove(position).1)
    }

    pub(crate) fn bound_buffer(&self, target: BufferTarget) -> u32 {
        match target {
            BufferTarget::Array => self.array_buffer,
            BufferTarget::ElementArray => self
                .vertex_arrays
                .get(&self.vertex_array)
                .map_or(0, |array| array.element_buffer),
        }
    }

    pub(crate) fn bound_texture(&self, target: TextureTarget) -> u32 {
        self.unit_bindings
            .get(&(self.active_unit, target))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn bound_framebuffer(&self, target: FramebufferTarget) -> u32 {
        match target {
            FramebufferTarget::Draw => self.draw_framebuffer,
            FramebufferTarget::Read => self.read_framebuffer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_pool_reuses_lowest_free_name() {
        let mut pool = NamePool::default();
        assert_eq!(pool.acquire(), 1);
        assert_eq!(pool.acquire(), 2);
        assert_eq!(pool.acquire(), 3);

        pool.release(2);
        pool.release(1);
        assert_eq!(pool.acquire(), 1);
        assert_eq!(pool.acquire(), 2);
        assert_eq!(pool.acquire(), 4);
    }

    #[test]
    fn test_name_pool_ignores_unknown_names() {
        let mut pool = NamePool::default();
        pool.release(0);
        pool.release(10);
        assert_eq!(pool.acquire(), 1);
    }
}
