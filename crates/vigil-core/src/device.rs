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

//! The contract between the state trackers and the device they guard.
//!
//! The device is an opaque collaborator: it generates and deletes objects by
//! integer name, binds them to targets and configures whatever is bound. It
//! offers no safety of its own. Any call may fail with a [`DeviceError`],
//! which the trackers propagate unmodified.

use crate::api::*;
use crate::error::DeviceError;
use std::fmt::Debug;

/// Integer limits queried once when a context is created.
pub trait DeviceCapabilities {
    /// The number of generic vertex attributes the device supports.
    fn max_vertex_attributes(&self) -> Result<i32, DeviceError>;

    /// The number of texture image units available to fragment shaders.
    fn max_texture_units(&self) -> Result<i32, DeviceError>;

    /// The largest width or height of a 2D texture.
    fn max_texture_size(&self) -> Result<i32, DeviceError>;

    /// The number of color attachment points of a framebuffer.
    fn max_color_attachments(&self) -> Result<i32, DeviceError>;

    /// The number of simultaneous draw buffers.
    fn max_draw_buffers(&self) -> Result<i32, DeviceError>;
}

/// Retrieval of human-readable compiler and linker output.
pub trait DiagnosticLog {
    /// Returns at most `capacity` bytes of the info log of a shader.
    ///
    /// Text beyond `capacity` is dropped, not reported as an error.
    fn shader_info_log(&self, shader: u32, capacity: usize) -> Result<String, DeviceError>;

    /// Returns at most `capacity` bytes of the info log of a program.
    fn program_info_log(&self, program: u32, capacity: usize) -> Result<String, DeviceError>;
}

/// The call surface of a handle-based graphics device.
///
/// Implementations are bound to a single device context and are driven from
/// one thread; nothing here is required to be `Send` or `Sync`.
pub trait GraphicsDevice: DeviceCapabilities + DiagnosticLog + Debug + 'static {
    // --- Buffers ---

    /// Generates a new buffer name.
    /// ## Returns
    /// The device name of the new buffer. Names of deleted buffers may be reused.
    fn gen_buffer(&self) -> Result<u32, DeviceError>;

    /// Binds `buffer` to `target`. A name of `0` clears the target.
    fn bind_buffer(&self, target: BufferTarget, buffer: u32) -> Result<(), DeviceError>;

    /// (Re)allocates the storage of the buffer bound to `target`.
    /// ## Arguments
    /// * `target` - The target whose bound buffer is allocated.
    /// * `size` - The new size in bytes.
    /// * `data` - Initial contents, or `None` to leave the storage undefined.
    /// * `usage` - The usage hint.
    /// ## Errors
    /// * `DeviceError` - If nothing is bound or the storage cannot be allocated.
    fn buffer_data(
        &self,
        target: BufferTarget,
        size: u64,
        data: Option<&[u8]>,
        usage: UsageHint,
    ) -> Result<(), DeviceError>;

    /// Replaces part of the storage of the buffer bound to `target`.
    fn buffer_sub_data(
        &self,
        target: BufferTarget,
        offset: u64,
        data: &[u8],
    ) -> Result<(), DeviceError>;

    /// Reads part of the storage of the buffer bound to `target`.
    fn get_buffer_sub_data(
        &self,
        target: BufferTarget,
        offset: u64,
        size: u64,
    ) -> Result<Vec<u8>, DeviceError>;

    /// Deletes a buffer, releasing its name.
    fn delete_buffer(&self, buffer: u32) -> Result<(), DeviceError>;

    // --- Vertex arrays ---

    /// Generates a new vertex array name.
    fn gen_vertex_array(&self) -> Result<u32, DeviceError>;

    /// Binds a vertex array. A name of `0` binds the default vertex array.
    fn bind_vertex_array(&self, array: u32) -> Result<(), DeviceError>;

    /// Deletes a vertex array, releasing its name.
    fn delete_vertex_array(&self, array: u32) -> Result<(), DeviceError>;

    /// Enables attribute `index` of the bound vertex array.
    fn enable_vertex_attribute(&self, index: u32) -> Result<(), DeviceError>;

    /// Disables attribute `index` of the bound vertex array.
    fn disable_vertex_attribute(&self, index: u32) -> Result<(), DeviceError>;

    /// Points attribute `index` at the bound array buffer, converting components to float.
    /// ## Arguments
    /// * `index` - The attribute index.
    /// * `elements` - The number of components, in `[1, 4]`.
    /// * `scalar` - The stored component type.
    /// * `normalized` - Whether integer components are normalized.
    /// * `stride` - The distance in bytes between consecutive values.
    /// * `offset` - The byte offset of the first value.
    fn vertex_attribute_pointer(
        &self,
        index: u32,
        elements: u32,
        scalar: ScalarType,
        normalized: bool,
        stride: u32,
        offset: u64,
    ) -> Result<(), DeviceError>;

    /// Points attribute `index` at the bound array buffer, keeping components integral.
    fn vertex_attribute_integral_pointer(
        &self,
        index: u32,
        elements: u32,
        scalar: IntegralScalarType,
        stride: u32,
        offset: u64,
    ) -> Result<(), DeviceError>;

    /// Sets the instancing divisor of attribute `index`.
    fn vertex_attribute_divisor(&self, index: u32, divisor: u32) -> Result<(), DeviceError>;

    // --- Textures ---

    /// Generates a new texture name.
    fn gen_texture(&self) -> Result<u32, DeviceError>;

    /// Selects the texture unit subsequent texture binds apply to.
    fn active_texture(&self, unit: u32) -> Result<(), DeviceError>;

    /// Binds `texture` to `target` of the active unit. A name of `0` clears it.
    fn bind_texture(&self, target: TextureTarget, texture: u32) -> Result<(), DeviceError>;

    /// Applies sampling parameters to the texture bound to `target`.
    fn texture_parameters(
        &self,
        target: TextureTarget,
        parameters: &TextureParameters,
    ) -> Result<(), DeviceError>;

    /// Allocates storage for one image of the bound texture.
    fn texture_image(
        &self,
        target: TextureImageTarget,
        width: u32,
        height: u32,
        format: TextureFormat,
        data: Option<&[u8]>,
    ) -> Result<(), DeviceError>;

    /// Replaces a rectangle of one image of the bound texture.
    fn texture_sub_image(
        &self,
        target: TextureImageTarget,
        area: PixelArea,
        format: TextureFormat,
        data: &[u8],
    ) -> Result<(), DeviceError>;

    /// Reads back one image of the bound texture.
    fn get_texture_image(
        &self,
        target: TextureImageTarget,
        format: TextureFormat,
    ) -> Result<Vec<u8>, DeviceError>;

    /// Regenerates the mipmap chain of the texture bound to `target`.
    fn generate_mipmap(&self, target: TextureTarget) -> Result<(), DeviceError>;

    /// Deletes a texture, releasing its name.
    fn delete_texture(&self, texture: u32) -> Result<(), DeviceError>;

    // --- Framebuffers ---

    /// Generates a new framebuffer name.
    fn gen_framebuffer(&self) -> Result<u32, DeviceError>;

    /// Binds `framebuffer` to `target`. A name of `0` binds the default framebuffer.
    fn bind_framebuffer(&self, target: FramebufferTarget, framebuffer: u32)
        -> Result<(), DeviceError>;

    /// Attaches one image of `texture` to `point` of the framebuffer bound to `target`.
    /// A texture name of `0` detaches the point.
    fn framebuffer_texture(
        &self,
        target: FramebufferTarget,
        point: AttachmentPoint,
        image: TextureImageTarget,
        texture: u32,
    ) -> Result<(), DeviceError>;

    /// Maps draw buffers to color attachment points for the bound draw framebuffer.
    ///
    /// Entry `i` names the color attachment written by draw buffer `i`, or `None`.
    fn draw_buffers(&self, mapping: &[Option<u32>]) -> Result<(), DeviceError>;

    /// Checks the completeness of the framebuffer bound to `target`.
    fn check_framebuffer_status(
        &self,
        target: FramebufferTarget,
    ) -> Result<FramebufferStatus, DeviceError>;

    /// Copies a rectangle from the read framebuffer to the draw framebuffer.
    fn blit_framebuffer(
        &self,
        source: PixelArea,
        target: PixelArea,
        buffers: BlitBuffers,
        filter: BlitFilter,
    ) -> Result<(), DeviceError>;

    /// Deletes a framebuffer, releasing its name.
    fn delete_framebuffer(&self, framebuffer: u32) -> Result<(), DeviceError>;

    // --- Shaders and programs ---

    /// Creates a shader object for `stage`.
    fn create_shader(&self, stage: ShaderStage) -> Result<u32, DeviceError>;

    /// Compiles `source` into `shader`.
    /// ## Returns
    /// `true` if compilation succeeded. On failure the reason is available
    /// from [`DiagnosticLog::shader_info_log`].
    fn compile_shader(&self, shader: u32, source: &str) -> Result<bool, DeviceError>;

    /// Deletes a shader object.
    fn delete_shader(&self, shader: u32) -> Result<(), DeviceError>;

    /// Creates a program object.
    fn create_program(&self) -> Result<u32, DeviceError>;

    /// Attaches a compiled shader to a program.
    fn attach_shader(&self, program: u32, shader: u32) -> Result<(), DeviceError>;

    /// Links a program.
    /// ## Returns
    /// `true` if linking succeeded. On failure the reason is available from
    /// [`DiagnosticLog::program_info_log`].
    fn link_program(&self, program: u32) -> Result<bool, DeviceError>;

    /// Lists the active vertex attributes of a linked program.
    fn active_attributes(&self, program: u32) -> Result<Vec<ActiveVariable>, DeviceError>;

    /// Lists the active uniforms of a linked program.
    fn active_uniforms(&self, program: u32) -> Result<Vec<ActiveVariable>, DeviceError>;

    /// Makes `program` the current program. A name of `0` clears it.
    fn use_program(&self, program: u32) -> Result<(), DeviceError>;

    /// Writes a value to the uniform at `location` of the current program.
    fn uniform(&self, location: i32, value: &UniformValue) -> Result<(), DeviceError>;

    /// Writes an array of floats to the uniform at `location` of the current program.
    fn uniform_floats(&self, location: i32, ty: GlslType, values: &[f32])
        -> Result<(), DeviceError>;

    /// Deletes a program object.
    fn delete_program(&self, program: u32) -> Result<(), DeviceError>;

    // --- Queries ---

    /// Generates a new query name.
    fn gen_query(&self) -> Result<u32, DeviceError>;

    /// Starts `query` as the running query of `kind`.
    fn begin_query(&self, kind: QueryKind, query: u32) -> Result<(), DeviceError>;

    /// Ends the running query of `kind`.
    fn end_query(&self, kind: QueryKind) -> Result<(), DeviceError>;

    /// Polls whether the result of `query` is available. Never blocks.
    fn query_result_available(&self, query: u32) -> Result<bool, DeviceError>;

    /// Returns the result of `query`. Only called once the result is available.
    fn query_result(&self, query: u32) -> Result<u64, DeviceError>;

    /// Deletes a query, releasing its name.
    fn delete_query(&self, query: u32) -> Result<(), DeviceError>;
}
