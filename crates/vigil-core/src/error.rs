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

//! Defines the hierarchy of error types for the state tracking layer.

use crate::api::{FramebufferStatus, QueryKind, TextureFormat};
use crate::context::ContextId;
use std::fmt;

/// The family of a managed object, used to label errors and log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A buffer bound to the array-buffer target.
    ArrayBuffer,
    /// A buffer bound to the element-array target.
    IndexBuffer,
    /// A vertex array object.
    ArrayObject,
    /// A two-dimensional texture.
    Texture2D,
    /// A cube map texture.
    TextureCube,
    /// A texture unit.
    TextureUnit,
    /// A framebuffer object.
    Framebuffer,
    /// A compiled vertex shader.
    VertexShader,
    /// A compiled geometry shader.
    GeometryShader,
    /// A compiled fragment shader.
    FragmentShader,
    /// A linked shader program.
    Program,
    /// An asynchronous device query.
    Query,
    /// A not-yet-allocated array object description.
    ArrayObjectBuilder,
    /// A not-yet-allocated framebuffer description.
    FramebufferBuilder,
    /// A reflected program uniform.
    Uniform,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ObjectKind::ArrayBuffer => "array buffer",
            ObjectKind::IndexBuffer => "index buffer",
            ObjectKind::ArrayObject => "array object",
            ObjectKind::Texture2D => "2D texture",
            ObjectKind::TextureCube => "cube texture",
            ObjectKind::TextureUnit => "texture unit",
            ObjectKind::Framebuffer => "framebuffer",
            ObjectKind::VertexShader => "vertex shader",
            ObjectKind::GeometryShader => "geometry shader",
            ObjectKind::FragmentShader => "fragment shader",
            ObjectKind::Program => "program",
            ObjectKind::Query => "query",
            ObjectKind::ArrayObjectBuilder => "array object builder",
            ObjectKind::FramebufferBuilder => "framebuffer builder",
            ObjectKind::Uniform => "uniform",
        };
        f.write_str(label)
    }
}

/// A failure reported by the underlying device call surface.
///
/// The state layer never inspects or reinterprets these; they are wrapped in
/// [`StateError::Device`] and returned to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceError {
    /// The device operation that failed (e.g. `"gen_buffer"`).
    pub operation: String,
    /// The backend-provided description of the failure.
    pub message: String,
}

impl DeviceError {
    /// Creates a new device error for the given operation.
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Device call '{}' failed: {}", self.operation, self.message)
    }
}

impl std::error::Error for DeviceError {}

/// An error raised by a tracked operation.
///
/// Every variant is terminal for the call that produced it; nothing is retried
/// and nothing is swallowed.
#[derive(Debug)]
pub enum StateError {
    /// The object was created under a different device context.
    WrongContext {
        /// The kind of object that was presented.
        kind: ObjectKind,
        /// The device name of the object.
        name: u32,
        /// The context the object belongs to.
        object_context: ContextId,
        /// The context the operation runs in.
        current_context: ContextId,
    },
    /// The object has already been deleted.
    Deleted {
        /// The kind of object that was presented.
        kind: ObjectKind,
        /// The device name the object had.
        name: u32,
    },
    /// A delete was attempted on an object that cannot be deleted.
    ObjectNotDeletable {
        /// The kind of the protected object.
        kind: ObjectKind,
        /// The device name of the protected object.
        name: u32,
    },
    /// The operation requires the buffer to be the current binding of its target.
    BufferNotBound {
        /// The kind of buffer.
        kind: ObjectKind,
        /// The buffer the operation was given.
        required: u32,
        /// The buffer actually bound, if any.
        bound: Option<u32>,
    },
    /// A different index buffer is already attached to a non-rebindable array object.
    IndexBufferAlreadyConfigured {
        /// The device name of the current array object.
        array_object: u32,
        /// The index buffer currently attached.
        attached: Option<u32>,
        /// The index buffer that was requested.
        requested: Option<u32>,
    },
    /// A vertex attribute slot or program attribute name is already populated.
    AttributeAlreadyAssigned(String),
    /// A program reported the same uniform name twice.
    UniformAlreadyAssigned(String),
    /// A texture would be sampled while attached to the current draw framebuffer.
    FeedbackLoop {
        /// The device name of the draw framebuffer.
        framebuffer: u32,
        /// The device name of the texture.
        texture: u32,
    },
    /// A uniform was written while its program is not the active program.
    ProgramNotActive {
        /// The uniform that was written.
        uniform: String,
        /// The program owning the uniform.
        program: u32,
        /// The program currently active, if any.
        active: Option<u32>,
    },
    /// A uniform value does not match the reflected uniform type.
    ProgramTypeError {
        /// The uniform that was written.
        uniform: String,
        /// The reflected type.
        expected: String,
        /// The type of the supplied value.
        received: String,
    },
    /// Compiling a shader or linking a program failed.
    ProgramCompileError {
        /// The caller-supplied name of the shader or program.
        name: String,
        /// The (bounded) diagnostic log text.
        message: String,
    },
    /// The device reported a capability below the required minimum.
    NonCompliantDevice(String),
    /// An argument lies outside its legal range.
    RangeCheck(String),
    /// A texture format cannot be used for the requested purpose.
    TextureFormat {
        /// The offending format.
        format: TextureFormat,
        /// What the format was required to be.
        requirement: &'static str,
    },
    /// No texture of the required family is bound to the unit.
    TextureNotBound {
        /// The index of the unit.
        unit: u32,
    },
    /// The operation requires a framebuffer bound to the named target.
    FramebufferNotBound(&'static str),
    /// The device reported an incomplete framebuffer.
    FramebufferInvalid(FramebufferStatus),
    /// A blit was attempted with the same framebuffer as source and target.
    FramebufferReadDrawSame(u32),
    /// A depth or stencil blit was requested with a non-nearest filter.
    FramebufferWrongBlitFilter,
    /// A query of this kind is already running.
    QueryAlreadyRunning {
        /// The kind of query.
        kind: QueryKind,
        /// The device name of the running query.
        running: u32,
    },
    /// The query is not the running query of its kind.
    QueryNotRunning {
        /// The kind of query.
        kind: QueryKind,
        /// The device name of the query presented.
        name: u32,
    },
    /// A generic failure of the device call surface.
    Device(DeviceError),
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::WrongContext {
                kind,
                name,
                object_context,
                current_context,
            } => write!(
                f,
                "The {kind} {name} belongs to context {object_context}, not the current context {current_context}"
            ),
            StateError::Deleted { kind, name } => {
                write!(f, "The {kind} {name} has already been deleted")
            }
            StateError::ObjectNotDeletable { kind, name } => {
                write!(f, "The {kind} {name} cannot be deleted")
            }
            StateError::BufferNotBound {
                kind,
                required,
                bound,
            } => match bound {
                Some(bound) => write!(
                    f,
                    "The {kind} {required} is not bound (the bound {kind} is {bound})"
                ),
                None => write!(f, "The {kind} {required} is not bound (nothing is bound)"),
            },
            StateError::IndexBufferAlreadyConfigured {
                array_object,
                attached,
                requested,
            } => write!(
                f,
                "Array object {} already has index buffer {} and does not allow rebinding to {}",
                array_object,
                fmt_name(*attached),
                fmt_name(*requested)
            ),
            StateError::AttributeAlreadyAssigned(attribute) => {
                write!(f, "Attribute {attribute} has already been assigned")
            }
            StateError::UniformAlreadyAssigned(uniform) => {
                write!(f, "Uniform {uniform} has already been assigned")
            }
            StateError::FeedbackLoop {
                framebuffer,
                texture,
            } => write!(
                f,
                "Texture {texture} is attached to the bound draw framebuffer {framebuffer}"
            ),
            StateError::ProgramNotActive {
                uniform,
                program,
                active,
            } => write!(
                f,
                "Uniform '{}' belongs to program {} but the active program is {}",
                uniform,
                program,
                fmt_name(*active)
            ),
            StateError::ProgramTypeError {
                uniform,
                expected,
                received,
            } => write!(
                f,
                "Uniform '{uniform}' has type {expected} but a value of type {received} was supplied"
            ),
            StateError::ProgramCompileError { name, message } => {
                write!(f, "Compilation of '{name}' failed: {message}")
            }
            StateError::NonCompliantDevice(msg) => {
                write!(f, "The device is not compliant: {msg}")
            }
            StateError::RangeCheck(msg) => write!(f, "Range check failed: {msg}"),
            StateError::TextureFormat {
                format,
                requirement,
            } => write!(f, "Texture format {format:?} is not {requirement}"),
            StateError::TextureNotBound { unit } => {
                write!(f, "No texture is bound to texture unit {unit}")
            }
            StateError::FramebufferNotBound(target) => {
                write!(f, "No framebuffer is bound to the {target} target")
            }
            StateError::FramebufferInvalid(status) => {
                write!(f, "The framebuffer is incomplete: {status:?}")
            }
            StateError::FramebufferReadDrawSame(name) => write!(
                f,
                "Framebuffer {name} is bound as both the read and draw framebuffer"
            ),
            StateError::FramebufferWrongBlitFilter => write!(
                f,
                "Depth and stencil blits must use nearest filtering"
            ),
            StateError::QueryAlreadyRunning { kind, running } => {
                write!(f, "A {kind:?} query is already running ({running})")
            }
            StateError::QueryNotRunning { kind, name } => {
                write!(f, "Query {name} is not the running {kind:?} query")
            }
            StateError::Device(err) => write!(f, "{err}"),
        }
    }
}

fn fmt_name(name: Option<u32>) -> String {
    match name {
        Some(name) => name.to_string(),
        None => "none".to_string(),
    }
}

impl std::error::Error for StateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StateError::Device(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DeviceError> for StateError {
    fn from(err: DeviceError) -> Self {
        StateError::Device(err)
    }
}

/// An error raised while loading a [`ContextConfig`](crate::config::ContextConfig).
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration text could not be parsed.
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(err) => write!(f, "Invalid context configuration: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Parse(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err)
    }
}
