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

//! # Vigil State
//!
//! The state trackers of one device context. Every tracker validates the
//! context and liveness of the handles it is given, compares against its
//! cached bindings before issuing a device call, and keeps the dependency
//! graph between composite objects and the objects they use up to date.
//!
//! ```no_run
//! use vigil_core::api::UsageHint;
//! use vigil_state::GraphicsContext;
//! # fn run(device: impl vigil_core::GraphicsDevice) -> Result<(), vigil_core::StateError> {
//! let mut ctx = GraphicsContext::new(device)?;
//! let buffer = ctx.array_buffers().allocate(64, UsageHint::StaticDraw)?;
//! ctx.array_buffers().bind(&buffer)?; // already bound: no device call
//! ctx.array_buffers().delete(&buffer)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod array_buffers;
pub mod array_objects;
pub mod context;
pub mod framebuffers;
pub mod index_buffers;
pub mod queries;
pub mod shaders;
pub mod textures;

pub use array_buffers::ArrayBuffers;
pub use array_objects::{
    ArrayDependency, ArrayObjectBuilder, ArrayObjects, AttributeDescriptor, FloatingAttribute,
    IntegralAttribute,
};
pub use context::GraphicsContext;
pub use framebuffers::{
    ColorAttachment, DepthAttachment, FramebufferAttachment, FramebufferBuilder, Framebuffers,
};
pub use index_buffers::IndexBuffers;
pub use queries::{Queries, QueryStatus};
pub use shaders::{ProgramAttribute, ProgramUniform, ShaderRef, Shaders};
pub use textures::{TextureRef, TextureUnit, Textures};
