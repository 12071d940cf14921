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

//! [`GraphicsDevice`] implementation of the headless device.

use vigil_core::api::*;
use vigil_core::{DeviceCapabilities, DeviceError, DiagnosticLog, GraphicsDevice};

use super::state::{
    AttributeStore, BufferStore, FramebufferStore, ImageStore, LinkScript, ProgramStore,
    QueryStore, ShaderStore, TextureStore,
};
use super::HeadlessDevice;

fn invalid(operation: &'static str, message: impl Into<String>) -> DeviceError {
    DeviceError::new(operation, message)
}

/// Truncates `text` to at most `capacity` bytes on a character boundary.
fn bounded(text: &str, capacity: usize) -> String {
    if text.len() <= capacity {
        return text.to_string();
    }
    let mut end = capacity;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

impl DeviceCapabilities for HeadlessDevice {
    fn max_vertex_attributes(&self) -> Result<i32, DeviceError> {
        self.enter("max_vertex_attributes", String::new())?;
        Ok(self.inner.limits.max_vertex_attributes)
    }

    fn max_texture_units(&self) -> Result<i32, DeviceError> {
        self.enter("max_texture_units", String::new())?;
        Ok(self.inner.limits.max_texture_units)
    }

    fn max_texture_size(&self) -> Result<i32, DeviceError> {
        self.enter("max_texture_size", String::new())?;
        Ok(self.inner.limits.max_texture_size)
    }

    fn max_color_attachments(&self) -> Result<i32, DeviceError> {
        self.enter("max_color_attachments", String::new())?;
        Ok(self.inner.limits.max_color_attachments)
    }

    fn max_draw_buffers(&self) -> Result<i32, DeviceError> {
        self.enter("max_draw_buffers", String::new())?;
        Ok(self.inner.limits.max_draw_buffers)
    }
}

impl DiagnosticLog for HeadlessDevice {
    fn shader_info_log(&self, shader: u32, capacity: usize) -> Result<String, DeviceError> {
        const OP: &str = "shader_info_log";
        let state = self.enter(OP, format!("{shader}, {capacity}"))?;
        let store = state
            .shaders
            .get(&shader)
            .ok_or_else(|| invalid(OP, format!("no shader {shader}")))?;
        Ok(bounded(&store.log, capacity))
    }

    fn program_info_log(&self, program: u32, capacity: usize) -> Result<String, DeviceError> {
        const OP: &str = "program_info_log";
        let state = self.enter(OP, format!("{program}, {capacity}"))?;
        let store = state
            .programs
            .get(&program)
            .ok_or_else(|| invalid(OP, format!("no program {program}")))?;
        Ok(bounded(&store.log, capacity))
    }
}

impl GraphicsDevice for HeadlessDevice {
    // --- Buffers ---

    fn gen_buffer(&self) -> Result<u32, DeviceError> {
        let mut state = self.enter("gen_buffer", String::new())?;
        let name = state.buffer_names.acquire();
        state.buffers.insert(name, BufferStore::default());
        Ok(name)
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: u32) -> Result<(), DeviceError> {
        const OP: &str = "bind_buffer";
        let mut state = self.enter(OP, format!("{target:?}, {buffer}"))?;
        if buffer != 0 && !state.buffers.contains_key(&buffer) {
            return Err(invalid(OP, format!("no buffer {buffer}")));
        }
        match target {
            BufferTarget::Array => state.array_buffer = buffer,
            BufferTarget::ElementArray => {
                let current = state.vertex_array;
                let array = state
                    .vertex_arrays
                    .get_mut(&current)
                    .ok_or_else(|| invalid(OP, format!("no vertex array {current}")))?;
                array.element_buffer = buffer;
            }
        }
        Ok(())
    }

    fn buffer_data(
        &self,
        target: BufferTarget,
        size: u64,
        data: Option<&[u8]>,
        usage: UsageHint,
    ) -> Result<(), DeviceError> {
        const OP: &str = "buffer_data";
        let mut state = self.enter(OP, format!("{target:?}, {size}, {usage:?}"))?;
        let bound = state.bound_buffer(target);
        let length = usize::try_from(size).map_err(|_| invalid(OP, "size too large"))?;
        let contents = match data {
            Some(bytes) if bytes.len() != length => {
                return Err(invalid(OP, "data length does not match size"));
            }
            Some(bytes) => bytes.to_vec(),
            None => vec![0; length],
        };
        let store = state
            .buffers
            .get_mut(&bound)
            .ok_or_else(|| invalid(OP, format!("no buffer bound to {target:?}")))?;
        store.data = contents;
        store.usage = usage;
        Ok(())
    }

    fn buffer_sub_data(
        &self,
        target: BufferTarget,
        offset: u64,
        data: &[u8],
    ) -> Result<(), DeviceError> {
        const OP: &str = "buffer_sub_data";
        let mut state = self.enter(OP, format!("{target:?}, {offset}, {} bytes", data.len()))?;
        let bound = state.bound_buffer(target);
        let store = state
            .buffers
            .get_mut(&bound)
            .ok_or_else(|| invalid(OP, format!("no buffer bound to {target:?}")))?;
        let start = usize::try_from(offset).map_err(|_| invalid(OP, "offset too large"))?;
        let end = start + data.len();
        if end > store.data.len() {
            return Err(invalid(OP, "write exceeds buffer storage"));
        }
        store.data[start..end].copy_from_slice(data);
        Ok(())
    }

    fn get_buffer_sub_data(
        &self,
        target: BufferTarget,
        offset: u64,
        size: u64,
    ) -> Result<Vec<u8>, DeviceError> {
        const OP: &str = "get_buffer_sub_data";
        let state = self.enter(OP, format!("{target:?}, {offset}, {size}"))?;
        let bound = state.bound_buffer(target);
        let store = state
            .buffers
            .get(&bound)
            .ok_or_else(|| invalid(OP, format!("no buffer bound to {target:?}")))?;
        let start = usize::try_from(offset).map_err(|_| invalid(OP, "offset too large"))?;
        let length = usize::try_from(size).map_err(|_| invalid(OP, "size too large"))?;
        store
            .data
            .get(start..start + length)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| invalid(OP, "read exceeds buffer storage"))
    }

    fn delete_buffer(&self, buffer: u32) -> Result<(), DeviceError> {
        const OP: &str = "delete_buffer";
        let mut state = self.enter(OP, format!("{buffer}"))?;
        if state.buffers.remove(&buffer).is_none() {
            return Err(invalid(OP, format!("no buffer {buffer}")));
        }
        state.buffer_names.release(buffer);
        if state.array_buffer == buffer {
            state.array_buffer = 0;
        }
        let current = state.vertex_array;
        if let Some(array) = state.vertex_arrays.get_mut(&current) {
            if array.element_buffer == buffer {
                array.element_buffer = 0;
            }
        }
        Ok(())
    }

    // --- Vertex arrays ---

    fn gen_vertex_array(&self) -> Result<u32, DeviceError> {
        let mut state = self.enter("gen_vertex_array", String::new())?;
        let name = state.array_names.acquire();
        state.vertex_arrays.insert(name, Default::default());
        Ok(name)
    }

    fn bind_vertex_array(&self, array: u32) -> Result<(), DeviceError> {
        const OP: &str = "bind_vertex_array";
        let mut state = self.enter(OP, format!("{array}"))?;
        if !state.vertex_arrays.contains_key(&array) {
            return Err(invalid(OP, format!("no vertex array {array}")));
        }
        state.vertex_array = array;
        Ok(())
    }

    fn delete_vertex_array(&self, array: u32) -> Result<(), DeviceError> {
        const OP: &str = "delete_vertex_array";
        let mut state = self.enter(OP, format!("{array}"))?;
        if array == 0 || state.vertex_arrays.remove(&array).is_none() {
            return Err(invalid(OP, format!("no vertex array {array}")));
        }
        state.array_names.release(array);
        if state.vertex_array == array {
            state.vertex_array = 0;
        }
        Ok(())
    }

    fn enable_vertex_attribute(&self, index: u32) -> Result<(), DeviceError> {
        self.set_attribute_enabled("enable_vertex_attribute", index, true)
    }

    fn disable_vertex_attribute(&self, index: u32) -> Result<(), DeviceError> {
        self.set_attribute_enabled("disable_vertex_attribute", index, false)
    }

    fn vertex_attribute_pointer(
        &self,
        index: u32,
        elements: u32,
        scalar: ScalarType,
        normalized: bool,
        stride: u32,
        offset: u64,
    ) -> Result<(), DeviceError> {
        self.point_attribute(
            "vertex_attribute_pointer",
            index,
            format!("{index}, {elements}, {scalar:?}, {normalized}, {stride}, {offset}"),
        )
    }

    fn vertex_attribute_integral_pointer(
        &self,
        index: u32,
        elements: u32,
        scalar: IntegralScalarType,
        stride: u32,
        offset: u64,
    ) -> Result<(), DeviceError> {
        self.point_attribute(
            "vertex_attribute_integral_pointer",
            index,
            format!("{index}, {elements}, {scalar:?}, {stride}, {offset}"),
        )
    }

    fn vertex_attribute_divisor(&self, index: u32, divisor: u32) -> Result<(), DeviceError> {
        const OP: &str = "vertex_attribute_divisor";
        let mut state = self.enter(OP, format!("{index}, {divisor}"))?;
        self.check_attribute_index(OP, index)?;
        let current = state.vertex_array;
        let array = state
            .vertex_arrays
            .get_mut(&current)
            .ok_or_else(|| invalid(OP, "no vertex array bound"))?;
        array
            .attributes
            .entry(index)
            .or_insert(AttributeStore {
                buffer: 0,
                enabled: false,
                divisor: 0,
            })
            .divisor = divisor;
        Ok(())
    }

    // --- Textures ---

    fn gen_texture(&self) -> Result<u32, DeviceError> {
        let mut state = self.enter("gen_texture", String::new())?;
        let name = state.texture_names.acquire();
        state.textures.insert(name, TextureStore::default());
        Ok(name)
    }

    fn active_texture(&self, unit: u32) -> Result<(), DeviceError> {
        const OP: &str = "active_texture";
        let mut state = self.enter(OP, format!("{unit}"))?;
        if i64::from(unit) >= i64::from(self.inner.limits.max_texture_units) {
            return Err(invalid(OP, format!("no texture unit {unit}")));
        }
        state.active_unit = unit;
        Ok(())
    }

    fn bind_texture(&self, target: TextureTarget, texture: u32) -> Result<(), DeviceError> {
        const OP: &str = "bind_texture";
        let mut state = self.enter(OP, format!("{target:?}, {texture}"))?;
        if texture != 0 {
            let store = state
                .textures
                .get_mut(&texture)
                .ok_or_else(|| invalid(OP, format!("no texture {texture}")))?;
            match store.target {
                Some(existing) if existing != target => {
                    return Err(invalid(
                        OP,
                        format!("texture {texture} was created as {existing:?}"),
                    ));
                }
                _ => store.target = Some(target),
            }
        }
        let unit = state.active_unit;
        if texture == 0 {
            state.unit_bindings.remove(&(unit, target));
        } else {
            state.unit_bindings.insert((unit, target), texture);
        }
        Ok(())
    }

    fn texture_parameters(
        &self,
        target: TextureTarget,
        parameters: &TextureParameters,
    ) -> Result<(), DeviceError> {
        const OP: &str = "texture_parameters";
        let mut state = self.enter(OP, format!("{target:?}, {parameters:?}"))?;
        let bound = state.bound_texture(target);
        let store = state
            .textures
            .get_mut(&bound)
            .ok_or_else(|| invalid(OP, format!("no texture bound to {target:?}")))?;
        store.parameters = *parameters;
        Ok(())
    }

    fn texture_image(
        &self,
        target: TextureImageTarget,
        width: u32,
        height: u32,
        format: TextureFormat,
        data: Option<&[u8]>,
    ) -> Result<(), DeviceError> {
        const OP: &str = "texture_image";
        let mut state = self.enter(OP, format!("{target:?}, {width}x{height}, {format:?}"))?;
        if i64::from(width.max(height)) > i64::from(self.inner.limits.max_texture_size) {
            return Err(invalid(OP, "texture exceeds the maximum size"));
        }
        let length = width as usize * height as usize * format.bytes_per_pixel() as usize;
        let contents = match data {
            Some(bytes) if bytes.len() != length => {
                return Err(invalid(OP, "data length does not match the image size"));
            }
            Some(bytes) => bytes.to_vec(),
            None => vec![0; length],
        };
        let bound = state.bound_texture(binding_target(target));
        let store = state
            .textures
            .get_mut(&bound)
            .ok_or_else(|| invalid(OP, format!("no texture bound for {target:?}")))?;
        store.images.insert(
            target,
            ImageStore {
                width,
                height,
                format,
                data: contents,
            },
        );
        Ok(())
    }

    fn texture_sub_image(
        &self,
        target: TextureImageTarget,
        area: PixelArea,
        format: TextureFormat,
        data: &[u8],
    ) -> Result<(), DeviceError> {
        const OP: &str = "texture_sub_image";
        let mut state = self.enter(OP, format!("{target:?}, {area:?}, {format:?}"))?;
        let bound = state.bound_texture(binding_target(target));
        let image = state
            .textures
            .get_mut(&bound)
            .and_then(|store| store.images.get_mut(&target))
            .ok_or_else(|| invalid(OP, format!("no image allocated for {target:?}")))?;
        if image.format != format {
            return Err(invalid(OP, "format mismatch"));
        }
        if !PixelArea::of_size(image.width, image.height).contains(&area) {
            return Err(invalid(OP, "area exceeds the image"));
        }
        let bpp = format.bytes_per_pixel() as usize;
        if data.len() != area.texel_count() as usize * bpp {
            return Err(invalid(OP, "data length does not match the area"));
        }
        let row_bytes = area.width as usize * bpp;
        for row in 0..area.height as usize {
            let dst = ((area.y as usize + row) * image.width as usize + area.x as usize) * bpp;
            let src = row * row_bytes;
            image.data[dst..dst + row_bytes].copy_from_slice(&data[src..src + row_bytes]);
        }
        Ok(())
    }

    fn get_texture_image(
        &self,
        target: TextureImageTarget,
        format: TextureFormat,
    ) -> Result<Vec<u8>, DeviceError> {
        const OP: &str = "get_texture_image";
        let state = self.enter(OP, format!("{target:?}, {format:?}"))?;
        let bound = state.bound_texture(binding_target(target));
        state
            .textures
            .get(&bound)
            .and_then(|store| store.images.get(&target))
            .map(|image| image.data.clone())
            .ok_or_else(|| invalid(OP, format!("no image allocated for {target:?}")))
    }

    fn generate_mipmap(&self, target: TextureTarget) -> Result<(), DeviceError> {
        const OP: &str = "generate_mipmap";
        let mut state = self.enter(OP, format!("{target:?}"))?;
        let bound = state.bound_texture(target);
        let store = state
            .textures
            .get_mut(&bound)
            .ok_or_else(|| invalid(OP, format!("no texture bound to {target:?}")))?;
        store.mipmapped = true;
        Ok(())
    }

    fn delete_texture(&self, texture: u32) -> Result<(), DeviceError> {
        const OP: &str = "delete_texture";
        let mut state = self.enter(OP, format!("{texture}"))?;
        if state.textures.remove(&texture).is_none() {
            return Err(invalid(OP, format!("no texture {texture}")));
        }
        state.texture_names.release(texture);
        state.unit_bindings.retain(|_, bound| *bound != texture);
        let attached = [state.draw_framebuffer, state.read_framebuffer];
        for framebuffer in attached {
            if let Some(store) = state.framebuffers.get_mut(&framebuffer) {
                store.attachments.retain(|_, (_, name)| *name != texture);
            }
        }
        Ok(())
    }

    // --- Framebuffers ---

    fn gen_framebuffer(&self) -> Result<u32, DeviceError> {
        let mut state = self.enter("gen_framebuffer", String::new())?;
        let name = state.framebuffer_names.acquire();
        state.framebuffers.insert(name, FramebufferStore::default());
        Ok(name)
    }

    fn bind_framebuffer(
        &self,
        target: FramebufferTarget,
        framebuffer: u32,
    ) -> Result<(), DeviceError> {
        const OP: &str = "bind_framebuffer";
        let mut state = self.enter(OP, format!("{target:?}, {framebuffer}"))?;
        if framebuffer != 0 && !state.framebuffers.contains_key(&framebuffer) {
            return Err(invalid(OP, format!("no framebuffer {framebuffer}")));
        }
        match target {
            FramebufferTarget::Draw => state.draw_framebuffer = framebuffer,
            FramebufferTarget::Read => state.read_framebuffer = framebuffer,
        }
        Ok(())
    }

    fn framebuffer_texture(
        &self,
        target: FramebufferTarget,
        point: AttachmentPoint,
        image: TextureImageTarget,
        texture: u32,
    ) -> Result<(), DeviceError> {
        const OP: &str = "framebuffer_texture";
        let mut state = self.enter(OP, format!("{target:?}, {point:?}, {image:?}, {texture}"))?;
        if texture != 0 && !state.textures.contains_key(&texture) {
            return Err(invalid(OP, format!("no texture {texture}")));
        }
        if let AttachmentPoint::Color(index) = point {
            if i64::from(index) >= i64::from(self.inner.limits.max_color_attachments) {
                return Err(invalid(OP, format!("no color attachment {index}")));
            }
        }
        let bound = state.bound_framebuffer(target);
        let store = state
            .framebuffers
            .get_mut(&bound)
            .ok_or_else(|| invalid(OP, format!("no framebuffer bound to {target:?}")))?;
        if texture == 0 {
            store.attachments.remove(&point);
        } else {
            store.attachments.insert(point, (image, texture));
        }
        Ok(())
    }

    fn draw_buffers(&self, mapping: &[Option<u32>]) -> Result<(), DeviceError> {
        const OP: &str = "draw_buffers";
        let mut state = self.enter(OP, format!("{mapping:?}"))?;
        if mapping.len() as i64 > i64::from(self.inner.limits.max_draw_buffers) {
            return Err(invalid(OP, "too many draw buffers"));
        }
        let bound = state.draw_framebuffer;
        let store = state
            .framebuffers
            .get_mut(&bound)
            .ok_or_else(|| invalid(OP, "no draw framebuffer bound"))?;
        store.draw_buffers = mapping.to_vec();
        Ok(())
    }

    fn check_framebuffer_status(
        &self,
        target: FramebufferTarget,
    ) -> Result<FramebufferStatus, DeviceError> {
        let state = self.enter("check_framebuffer_status", format!("{target:?}"))?;
        if let Some(status) = state.status_override {
            return Ok(status);
        }
        let bound = state.bound_framebuffer(target);
        let Some(store) = state.framebuffers.get(&bound) else {
            return Ok(FramebufferStatus::Complete);
        };
        if store.attachments.is_empty() {
            return Ok(FramebufferStatus::IncompleteMissingAttachment);
        }
        let dangling = store.draw_buffers.iter().flatten().any(|point| {
            !store
                .attachments
                .contains_key(&AttachmentPoint::Color(*point))
        });
        if dangling {
            return Ok(FramebufferStatus::IncompleteDrawBuffer);
        }
        Ok(FramebufferStatus::Complete)
    }

    fn blit_framebuffer(
        &self,
        source: PixelArea,
        target: PixelArea,
        buffers: BlitBuffers,
        filter: BlitFilter,
    ) -> Result<(), DeviceError> {
        const OP: &str = "blit_framebuffer";
        self.enter(OP, format!("{source:?}, {target:?}, {buffers:?}, {filter:?}"))?;
        if filter == BlitFilter::Linear
            && buffers.intersects(BlitBuffers::DEPTH | BlitBuffers::STENCIL)
        {
            return Err(invalid(OP, "linear filter with depth or stencil"));
        }
        Ok(())
    }

    fn delete_framebuffer(&self, framebuffer: u32) -> Result<(), DeviceError> {
        const OP: &str = "delete_framebuffer";
        let mut state = self.enter(OP, format!("{framebuffer}"))?;
        if state.framebuffers.remove(&framebuffer).is_none() {
            return Err(invalid(OP, format!("no framebuffer {framebuffer}")));
        }
        state.framebuffer_names.release(framebuffer);
        if state.draw_framebuffer == framebuffer {
            state.draw_framebuffer = 0;
        }
        if state.read_framebuffer == framebuffer {
            state.read_framebuffer = 0;
        }
        Ok(())
    }

    // --- Shaders and programs ---

    fn create_shader(&self, stage: ShaderStage) -> Result<u32, DeviceError> {
        let mut state = self.enter("create_shader", format!("{stage:?}"))?;
        let name = state.program_names.acquire();
        state.shaders.insert(
            name,
            ShaderStore {
                stage,
                compiled: false,
                log: String::new(),
            },
        );
        Ok(name)
    }

    fn compile_shader(&self, shader: u32, source: &str) -> Result<bool, DeviceError> {
        const OP: &str = "compile_shader";
        let mut state = self.enter(OP, format!("{shader}, {} bytes", source.len()))?;
        let failure = state.compile_failures.pop_front();
        let store = state
            .shaders
            .get_mut(&shader)
            .ok_or_else(|| invalid(OP, format!("no shader {shader}")))?;
        match failure {
            Some(log) => {
                store.compiled = false;
                store.log = log;
            }
            None => {
                store.compiled = true;
                store.log.clear();
            }
        }
        log::trace!("headless: compiled {:?} shader {shader}", store.stage);
        Ok(store.compiled)
    }

    fn delete_shader(&self, shader: u32) -> Result<(), DeviceError> {
        const OP: &str = "delete_shader";
        let mut state = self.enter(OP, format!("{shader}"))?;
        if state.shaders.remove(&shader).is_none() {
            return Err(invalid(OP, format!("no shader {shader}")));
        }
        state.program_names.release(shader);
        Ok(())
    }

    fn create_program(&self) -> Result<u32, DeviceError> {
        let mut state = self.enter("create_program", String::new())?;
        let name = state.program_names.acquire();
        state.programs.insert(name, ProgramStore::default());
        Ok(name)
    }

    fn attach_shader(&self, program: u32, shader: u32) -> Result<(), DeviceError> {
        const OP: &str = "attach_shader";
        let mut state = self.enter(OP, format!("{program}, {shader}"))?;
        if !state.shaders.contains_key(&shader) {
            return Err(invalid(OP, format!("no shader {shader}")));
        }
        let store = state
            .programs
            .get_mut(&program)
            .ok_or_else(|| invalid(OP, format!("no program {program}")))?;
        if store.attached.contains(&shader) {
            return Err(invalid(OP, format!("shader {shader} is already attached")));
        }
        store.attached.push(shader);
        Ok(())
    }

    fn link_program(&self, program: u32) -> Result<bool, DeviceError> {
        const OP: &str = "link_program";
        let mut state = self.enter(OP, format!("{program}"))?;
        let attached = state
            .programs
            .get(&program)
            .ok_or_else(|| invalid(OP, format!("no program {program}")))?
            .attached
            .clone();
        let uncompiled = attached
            .iter()
            .find(|shader| !state.shaders.get(*shader).is_some_and(|s| s.compiled));
        let outcome = match uncompiled {
            Some(shader) => LinkScript::Fail(format!("shader {shader} is not compiled")),
            None => state.link_scripts.pop_front().unwrap_or(LinkScript::Succeed {
                attributes: Vec::new(),
                uniforms: Vec::new(),
            }),
        };
        let store = state
            .programs
            .get_mut(&program)
            .ok_or_else(|| invalid(OP, format!("no program {program}")))?;
        match outcome {
            LinkScript::Succeed {
                attributes,
                uniforms,
            } => {
                store.linked = true;
                store.log.clear();
                store.attributes = attributes;
                store.uniforms = uniforms;
            }
            LinkScript::Fail(log) => {
                store.linked = false;
                store.log = log;
            }
        }
        Ok(store.linked)
    }

    fn active_attributes(&self, program: u32) -> Result<Vec<ActiveVariable>, DeviceError> {
        const OP: &str = "active_attributes";
        let state = self.enter(OP, format!("{program}"))?;
        state
            .programs
            .get(&program)
            .filter(|store| store.linked)
            .map(|store| store.attributes.clone())
            .ok_or_else(|| invalid(OP, format!("program {program} is not linked")))
    }

    fn active_uniforms(&self, program: u32) -> Result<Vec<ActiveVariable>, DeviceError> {
        const OP: &str = "active_uniforms";
        let state = self.enter(OP, format!("{program}"))?;
        state
            .programs
            .get(&program)
            .filter(|store| store.linked)
            .map(|store| store.uniforms.clone())
            .ok_or_else(|| invalid(OP, format!("program {program} is not linked")))
    }

    fn use_program(&self, program: u32) -> Result<(), DeviceError> {
        const OP: &str = "use_program";
        let mut state = self.enter(OP, format!("{program}"))?;
        if program != 0 && !state.programs.get(&program).is_some_and(|p| p.linked) {
            return Err(invalid(OP, format!("program {program} is not linked")));
        }
        state.current_program = program;
        Ok(())
    }

    fn uniform(&self, location: i32, value: &UniformValue) -> Result<(), DeviceError> {
        const OP: &str = "uniform";
        let state = self.enter(OP, format!("{location}, {value:?}"))?;
        check_uniform_location(OP, &state.programs, state.current_program, location)
    }

    fn uniform_floats(
        &self,
        location: i32,
        ty: GlslType,
        values: &[f32],
    ) -> Result<(), DeviceError> {
        const OP: &str = "uniform_floats";
        let state = self.enter(OP, format!("{location}, {ty}, {} floats", values.len()))?;
        check_uniform_location(OP, &state.programs, state.current_program, location)
    }

    fn delete_program(&self, program: u32) -> Result<(), DeviceError> {
        const OP: &str = "delete_program";
        let mut state = self.enter(OP, format!("{program}"))?;
        if state.programs.remove(&program).is_none() {
            return Err(invalid(OP, format!("no program {program}")));
        }
        state.program_names.release(program);
        if state.current_program == program {
            state.current_program = 0;
        }
        Ok(())
    }

    // --- Queries ---

    fn gen_query(&self) -> Result<u32, DeviceError> {
        let mut state = self.enter("gen_query", String::new())?;
        let name = state.query_names.acquire();
        state.queries.insert(name, QueryStore::default());
        Ok(name)
    }

    fn begin_query(&self, kind: QueryKind, query: u32) -> Result<(), DeviceError> {
        const OP: &str = "begin_query";
        let mut state = self.enter(OP, format!("{kind:?}, {query}"))?;
        if state.running_queries.contains_key(&kind) {
            return Err(invalid(OP, format!("a {kind:?} query is already active")));
        }
        let started_at = state.calls.len();
        let store = state
            .queries
            .get_mut(&query)
            .ok_or_else(|| invalid(OP, format!("no query {query}")))?;
        store.kind = Some(kind);
        store.started_at = started_at;
        store.result = None;
        state.running_queries.insert(kind, query);
        Ok(())
    }

    fn end_query(&self, kind: QueryKind) -> Result<(), DeviceError> {
        const OP: &str = "end_query";
        let mut state = self.enter(OP, format!("{kind:?}"))?;
        let query = state
            .running_queries
            .remove(&kind)
            .ok_or_else(|| invalid(OP, format!("no {kind:?} query is active")))?;
        let ended_at = state.calls.len();
        let latency = state.query_latency;
        let store = state
            .queries
            .get_mut(&query)
            .ok_or_else(|| invalid(OP, format!("no query {query}")))?;
        // The amount of recorded work stands in for elapsed time and sample counts.
        let work = (ended_at - store.started_at) as u64;
        store.result = Some(match kind {
            QueryKind::TimeElapsed => work * 1_000,
            QueryKind::SamplesPassed => work,
            QueryKind::AnySamplesPassed => u64::from(work > 0),
        });
        store.polls_remaining = latency;
        Ok(())
    }

    fn query_result_available(&self, query: u32) -> Result<bool, DeviceError> {
        const OP: &str = "query_result_available";
        let mut state = self.enter(OP, format!("{query}"))?;
        let store = state
            .queries
            .get_mut(&query)
            .ok_or_else(|| invalid(OP, format!("no query {query}")))?;
        if store.result.is_none() {
            return Ok(false);
        }
        if store.polls_remaining > 0 {
            store.polls_remaining -= 1;
            return Ok(false);
        }
        Ok(true)
    }

    fn query_result(&self, query: u32) -> Result<u64, DeviceError> {
        const OP: &str = "query_result";
        let state = self.enter(OP, format!("{query}"))?;
        state
            .queries
            .get(&query)
            .and_then(|store| store.result)
            .ok_or_else(|| invalid(OP, format!("query {query} has no result")))
    }

    fn delete_query(&self, query: u32) -> Result<(), DeviceError> {
        const OP: &str = "delete_query";
        let mut state = self.enter(OP, format!("{query}"))?;
        if state.queries.remove(&query).is_none() {
            return Err(invalid(OP, format!("no query {query}")));
        }
        state.query_names.release(query);
        state.running_queries.retain(|_, running| *running != query);
        Ok(())
    }
}

impl HeadlessDevice {
    fn check_attribute_index(&self, operation: &'static str, index: u32) -> Result<(), DeviceError> {
        if i64::from(index) >= i64::from(self.inner.limits.max_vertex_attributes) {
            return Err(invalid(operation, format!("no vertex attribute {index}")));
        }
        Ok(())
    }

    fn set_attribute_enabled(
        &self,
        operation: &'static str,
        index: u32,
        enabled: bool,
    ) -> Result<(), DeviceError> {
        let mut state = self.enter(operation, format!("{index}"))?;
        self.check_attribute_index(operation, index)?;
        let current = state.vertex_array;
        let array = state
            .vertex_arrays
            .get_mut(&current)
            .ok_or_else(|| invalid(operation, "no vertex array bound"))?;
        array
            .attributes
            .entry(index)
            .or_insert(AttributeStore {
                buffer: 0,
                enabled,
                divisor: 0,
            })
            .enabled = enabled;
        Ok(())
    }

    fn point_attribute(
        &self,
        operation: &'static str,
        index: u32,
        detail: String,
    ) -> Result<(), DeviceError> {
        let mut state = self.enter(operation, detail)?;
        self.check_attribute_index(operation, index)?;
        let buffer = state.array_buffer;
        if buffer == 0 {
            return Err(invalid(operation, "no array buffer bound"));
        }
        let current = state.vertex_array;
        let array = state
            .vertex_arrays
            .get_mut(&current)
            .ok_or_else(|| invalid(operation, "no vertex array bound"))?;
        array
            .attributes
            .entry(index)
            .or_insert(AttributeStore {
                buffer,
                enabled: false,
                divisor: 0,
            })
            .buffer = buffer;
        Ok(())
    }
}

fn binding_target(image: TextureImageTarget) -> TextureTarget {
    match image {
        TextureImageTarget::Texture2D => TextureTarget::Texture2D,
        TextureImageTarget::CubeFace(_) => TextureTarget::CubeMap,
    }
}

fn check_uniform_location(
    operation: &'static str,
    programs: &std::collections::HashMap<u32, ProgramStore>,
    current: u32,
    location: i32,
) -> Result<(), DeviceError> {
    let program = programs
        .get(&current)
        .ok_or_else(|| invalid(operation, "no program in use"))?;
    if program.uniforms.iter().any(|u| u.location == location) {
        Ok(())
    } else {
        Err(invalid(operation, format!("no uniform at location {location}")))
    }
}
