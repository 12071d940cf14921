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

//! Typed object handles and the liveness registry that validates them.
//!
//! The device recycles integer names after deletion, so a name alone never
//! says whether an object is alive. Every managed object is instead stored in
//! a [`Registry`] keyed by a generational slot key: deleting an object frees
//! its slot, and the stale key held by any outstanding [`Handle`] can never
//! resolve again, even after the slot (or the device name) is reused.

use crate::context::ContextId;
use crate::error::{ObjectKind, StateError};
use slotmap::{Key, SlotMap};

slotmap::new_key_type! {
    /// Registry key of an array buffer.
    pub struct ArrayBufferKey;
    /// Registry key of an index buffer.
    pub struct IndexBufferKey;
    /// Registry key of an array object.
    pub struct ArrayObjectKey;
    /// Registry key of a 2D texture.
    pub struct Texture2DKey;
    /// Registry key of a cube texture.
    pub struct TextureCubeKey;
    /// Registry key of a framebuffer.
    pub struct FramebufferKey;
    /// Registry key of a vertex shader.
    pub struct VertexShaderKey;
    /// Registry key of a geometry shader.
    pub struct GeometryShaderKey;
    /// Registry key of a fragment shader.
    pub struct FragmentShaderKey;
    /// Registry key of a program.
    pub struct ProgramKey;
    /// Registry key of a query.
    pub struct QueryKey;
}

/// A reference to a managed object.
///
/// Handles are plain copyable values: the context they were created in, the
/// registry slot of the object and the device name it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle<K> {
    context: ContextId,
    key: K,
    name: u32,
}

impl<K: Key> Handle<K> {
    /// Returns the identity of the context this object was created in.
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Returns the device name of this object.
    pub fn name(&self) -> u32 {
        self.name
    }

    /// Returns the registry key of this object.
    pub fn key(&self) -> K {
        self.key
    }
}

/// A handle to an array buffer.
pub type ArrayBufferId = Handle<ArrayBufferKey>;
/// A handle to an index buffer.
pub type IndexBufferId = Handle<IndexBufferKey>;
/// A handle to an array object.
pub type ArrayObjectId = Handle<ArrayObjectKey>;
/// A handle to a 2D texture.
pub type Texture2DId = Handle<Texture2DKey>;
/// A handle to a cube texture.
pub type TextureCubeId = Handle<TextureCubeKey>;
/// A handle to a framebuffer.
pub type FramebufferId = Handle<FramebufferKey>;
/// A handle to a vertex shader.
pub type VertexShaderId = Handle<VertexShaderKey>;
/// A handle to a geometry shader.
pub type GeometryShaderId = Handle<GeometryShaderKey>;
/// A handle to a fragment shader.
pub type FragmentShaderId = Handle<FragmentShaderKey>;
/// A handle to a program.
pub type ProgramId = Handle<ProgramKey>;
/// A handle to a query.
pub type QueryId = Handle<QueryKey>;

struct Entry<V> {
    name: u32,
    value: V,
}

/// The liveness registry for one family of managed objects in one context.
pub struct Registry<K: Key, V> {
    context: ContextId,
    kind: ObjectKind,
    entries: SlotMap<K, Entry<V>>,
}

impl<K: Key, V> Registry<K, V> {
    /// Creates an empty registry for objects of `kind` created in `context`.
    pub fn new(context: ContextId, kind: ObjectKind) -> Self {
        Self {
            context,
            kind,
            entries: SlotMap::with_key(),
        }
    }

    /// Returns the kind of object this registry tracks.
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Registers a newly created device object and returns its handle.
    pub fn create(&mut self, name: u32, value: V) -> Handle<K> {
        let key = self.entries.insert(Entry { name, value });
        log::debug!("Created {} {} in context {}", self.kind, name, self.context);
        Handle {
            context: self.context,
            key,
            name,
        }
    }

    /// Fails with [`StateError::WrongContext`] if `handle` was created in another context.
    pub fn check_context(&self, handle: &Handle<K>) -> Result<(), StateError> {
        if handle.context != self.context {
            return Err(StateError::WrongContext {
                kind: self.kind,
                name: handle.name,
                object_context: handle.context,
                current_context: self.context,
            });
        }
        Ok(())
    }

    /// Fails with [`StateError::Deleted`] if `handle` no longer refers to a live object.
    pub fn check_live(&self, handle: &Handle<K>) -> Result<(), StateError> {
        if self.is_live(handle) {
            Ok(())
        } else {
            Err(StateError::Deleted {
                kind: self.kind,
                name: handle.name,
            })
        }
    }

    /// Checks context identity, then liveness.
    pub fn validate(&self, handle: &Handle<K>) -> Result<(), StateError> {
        self.check_context(handle)?;
        self.check_live(handle)
    }

    /// Returns `true` if `handle` belongs to this context and is not deleted.
    pub fn is_live(&self, handle: &Handle<K>) -> bool {
        handle.context == self.context
            && self
                .entries
                .get(handle.key)
                .is_some_and(|entry| entry.name == handle.name)
    }

    /// Validates `handle` and returns the tracked state of the object.
    pub fn get(&self, handle: &Handle<K>) -> Result<&V, StateError> {
        self.validate(handle)?;
        self.entries
            .get(handle.key)
            .map(|entry| &entry.value)
            .ok_or(StateError::Deleted {
                kind: self.kind,
                name: handle.name,
            })
    }

    /// Validates `handle` and returns the tracked state of the object mutably.
    pub fn get_mut(&mut self, handle: &Handle<K>) -> Result<&mut V, StateError> {
        self.validate(handle)?;
        let kind = self.kind;
        self.entries
            .get_mut(handle.key)
            .map(|entry| &mut entry.value)
            .ok_or(StateError::Deleted {
                kind,
                name: handle.name,
            })
    }

    /// Marks the object deleted and returns its final tracked state.
    ///
    /// Deletion is one-way: every later use of `handle` fails with
    /// [`StateError::Deleted`], including a second call to this method.
    pub fn mark_deleted(&mut self, handle: &Handle<K>) -> Result<V, StateError> {
        self.validate(handle)?;
        let kind = self.kind;
        let entry = self.entries.remove(handle.key).ok_or(StateError::Deleted {
            kind,
            name: handle.name,
        })?;
        log::debug!("Deleted {} {} in context {}", kind, entry.name, self.context);
        Ok(entry.value)
    }

    /// Returns the number of live objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no object is live.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the live objects and their tracked state.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<K>, &V)> + '_ {
        let context = self.context;
        self.entries.iter().map(move |(key, entry)| {
            (
                Handle {
                    context,
                    key,
                    name: entry.name,
                },
                &entry.value,
            )
        })
    }

    /// Iterates mutably over the live objects and their tracked state.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle<K>, &mut V)> + '_ {
        let context = self.context;
        self.entries.iter_mut().map(move |(key, entry)| {
            (
                Handle {
                    context,
                    key,
                    name: entry.name,
                },
                &mut entry.value,
            )
        })
    }
}

impl<K: Key, V> std::fmt::Debug for Registry<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("context", &self.context)
            .field("kind", &self.kind)
            .field("live", &self.entries.len())
            .finish()
    }
}
