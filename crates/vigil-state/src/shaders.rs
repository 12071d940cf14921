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

//! Shaders, programs, the active program and uniform writes.

use std::collections::{HashMap, HashSet};

use vigil_core::api::{ActiveVariable, GlslType, ShaderStage, UniformValue};
use vigil_core::handle::{
    FragmentShaderId, FragmentShaderKey, GeometryShaderId, GeometryShaderKey, ProgramId,
    ProgramKey, Registry, VertexShaderId, VertexShaderKey,
};
use vigil_core::{
    ContextConfig, ContextId, GraphicsDevice, ObjectKind, ReferenceContainer, StateError,
};

use crate::context::GraphicsContext;

const EMPTY_PROGRAM: &str = "Empty program";

/// A compiled shader of any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderRef {
    /// A vertex shader.
    Vertex(VertexShaderId),
    /// A geometry shader.
    Geometry(GeometryShaderId),
    /// A fragment shader.
    Fragment(FragmentShaderId),
}

impl ShaderRef {
    /// Returns the device name of the shader.
    pub fn name(&self) -> u32 {
        match self {
            ShaderRef::Vertex(s) => s.name(),
            ShaderRef::Geometry(s) => s.name(),
            ShaderRef::Fragment(s) => s.name(),
        }
    }

    /// Returns the stage of the shader.
    pub fn stage(&self) -> ShaderStage {
        match self {
            ShaderRef::Vertex(_) => ShaderStage::Vertex,
            ShaderRef::Geometry(_) => ShaderStage::Geometry,
            ShaderRef::Fragment(_) => ShaderStage::Fragment,
        }
    }
}

impl From<VertexShaderId> for ShaderRef {
    fn from(shader: VertexShaderId) -> Self {
        ShaderRef::Vertex(shader)
    }
}

impl From<GeometryShaderId> for ShaderRef {
    fn from(shader: GeometryShaderId) -> Self {
        ShaderRef::Geometry(shader)
    }
}

impl From<FragmentShaderId> for ShaderRef {
    fn from(shader: FragmentShaderId) -> Self {
        ShaderRef::Fragment(shader)
    }
}

/// An active vertex attribute of a linked program.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramAttribute {
    /// The program the attribute belongs to.
    pub program: ProgramId,
    /// The attribute name.
    pub name: String,
    /// The attribute location.
    pub location: i32,
    /// The reflected type.
    pub ty: GlslType,
}

/// An active uniform of a linked program.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramUniform {
    /// The program the uniform belongs to.
    pub program: ProgramId,
    /// The uniform name as reported by the device.
    pub name: String,
    /// The uniform location.
    pub location: i32,
    /// The reflected element type.
    pub ty: GlslType,
    /// The array size (`1` for non-arrays).
    pub size: u32,
}

#[derive(Debug)]
pub(crate) struct ShaderRecord {
    label: String,
    /// Programs linked from this shader.
    referrers: ReferenceContainer<ProgramId>,
}

#[derive(Debug)]
pub(crate) struct ProgramRecord {
    label: String,
    attributes: HashMap<String, ProgramAttribute>,
    uniforms: HashMap<String, ProgramUniform>,
    references: ReferenceContainer<ShaderRef>,
}

#[derive(Debug)]
pub(crate) struct ShaderState {
    vertex: Registry<VertexShaderKey, ShaderRecord>,
    geometry: Registry<GeometryShaderKey, ShaderRecord>,
    fragment: Registry<FragmentShaderKey, ShaderRecord>,
    programs: Registry<ProgramKey, ProgramRecord>,
    active: Option<ProgramId>,
    type_checking: bool,
    activity_checking: bool,
    log_capacity: usize,
}

impl ShaderState {
    pub(crate) fn new(context: ContextId, config: &ContextConfig) -> Self {
        Self {
            vertex: Registry::new(context, ObjectKind::VertexShader),
            geometry: Registry::new(context, ObjectKind::GeometryShader),
            fragment: Registry::new(context, ObjectKind::FragmentShader),
            programs: Registry::new(context, ObjectKind::Program),
            active: None,
            type_checking: config.uniform_type_checking,
            activity_checking: config.uniform_activity_checking,
            log_capacity: config.diagnostic_log_capacity,
        }
    }

    fn shader(&self, shader: &ShaderRef) -> Result<&ShaderRecord, StateError> {
        match shader {
            ShaderRef::Vertex(s) => self.vertex.get(s),
            ShaderRef::Geometry(s) => self.geometry.get(s),
            ShaderRef::Fragment(s) => self.fragment.get(s),
        }
    }

    fn shader_mut(&mut self, shader: &ShaderRef) -> Result<&mut ShaderRecord, StateError> {
        match shader {
            ShaderRef::Vertex(s) => self.vertex.get_mut(s),
            ShaderRef::Geometry(s) => self.geometry.get_mut(s),
            ShaderRef::Fragment(s) => self.fragment.get_mut(s),
        }
    }

    fn mark_shader_deleted(&mut self, shader: &ShaderRef) -> Result<ShaderRecord, StateError> {
        match shader {
            ShaderRef::Vertex(s) => self.vertex.mark_deleted(s),
            ShaderRef::Geometry(s) => self.geometry.mark_deleted(s),
            ShaderRef::Fragment(s) => self.fragment.mark_deleted(s),
        }
    }

    /// Compiles `lines` into a new device shader and returns its name.
    fn compile(
        &self,
        device: &dyn GraphicsDevice,
        stage: ShaderStage,
        label: &str,
        lines: &[&str],
    ) -> Result<u32, StateError> {
        if lines.iter().all(|line| line.trim().is_empty()) {
            return Err(StateError::ProgramCompileError {
                name: label.to_string(),
                message: EMPTY_PROGRAM.to_string(),
            });
        }
        let source = lines.concat();
        let name = device.create_shader(stage)?;
        let compiled = device
            .compile_shader(name, &source)
            .and_then(|ok| {
                if ok {
                    Ok(None)
                } else {
                    device.shader_info_log(name, self.log_capacity).map(Some)
                }
            });
        let failure = match compiled {
            Ok(None) => return Ok(name),
            Ok(Some(log)) => StateError::ProgramCompileError {
                name: label.to_string(),
                message: log,
            },
            Err(err) => err.into(),
        };
        if let Err(delete) = device.delete_shader(name) {
            log::warn!("Failed to delete shader {name} after a failed compilation: {delete}");
        }
        log::error!("Failed to compile {stage:?} shader '{label}': {failure}");
        Err(failure)
    }
}

/// Reads the active variables of a freshly linked program into name-keyed maps.
fn reflect(
    device: &dyn GraphicsDevice,
    program: ProgramId,
) -> Result<(HashMap<String, ProgramAttribute>, HashMap<String, ProgramUniform>), StateError> {
    let mut attributes = HashMap::new();
    for ActiveVariable {
        name, location, ty, ..
    } in device.active_attributes(program.name())?
    {
        if location == -1 {
            log::trace!("Skipping built-in attribute {name}");
            continue;
        }
        if attributes.contains_key(&name) {
            return Err(StateError::AttributeAlreadyAssigned(name));
        }
        attributes.insert(
            name.clone(),
            ProgramAttribute {
                program,
                name,
                location,
                ty,
            },
        );
    }

    let mut uniforms = HashMap::new();
    for ActiveVariable {
        name,
        location,
        ty,
        size,
    } in device.active_uniforms(program.name())?
    {
        if location == -1 {
            log::trace!("Skipping built-in uniform {name}");
            continue;
        }
        if uniforms.contains_key(&name) {
            return Err(StateError::UniformAlreadyAssigned(name));
        }
        uniforms.insert(
            name.clone(),
            ProgramUniform {
                program,
                name,
                location,
                ty,
                size,
            },
        );
    }
    Ok((attributes, uniforms))
}

/// Shader compilation, program linking and uniform writes.
///
/// Obtained from [`GraphicsContext::shaders`].
pub struct Shaders<'a> {
    pub(crate) ctx: &'a mut GraphicsContext,
}

impl Shaders<'_> {
    /// Compiles a vertex shader from the concatenation of `lines`.
    /// ## Errors
    /// * `StateError::ProgramCompileError` - If the source is empty or the device
    ///   rejects it; the message is the device log, truncated to the configured capacity.
    pub fn compile_vertex(&mut self, label: &str, lines: &[&str]) -> Result<VertexShaderId, StateError> {
        let GraphicsContext {
            device, shaders, ..
        } = &mut *self.ctx;
        let name = shaders.compile(device.as_ref(), ShaderStage::Vertex, label, lines)?;
        Ok(shaders.vertex.create(name, ShaderRecord::labelled(label)))
    }

    /// Compiles a geometry shader from the concatenation of `lines`.
    pub fn compile_geometry(
        &mut self,
        label: &str,
        lines: &[&str],
    ) -> Result<GeometryShaderId, StateError> {
        let GraphicsContext {
            device, shaders, ..
        } = &mut *self.ctx;
        let name = shaders.compile(device.as_ref(), ShaderStage::Geometry, label, lines)?;
        Ok(shaders.geometry.create(name, ShaderRecord::labelled(label)))
    }

    /// Compiles a fragment shader from the concatenation of `lines`.
    pub fn compile_fragment(
        &mut self,
        label: &str,
        lines: &[&str],
    ) -> Result<FragmentShaderId, StateError> {
        let GraphicsContext {
            device, shaders, ..
        } = &mut *self.ctx;
        let name = shaders.compile(device.as_ref(), ShaderStage::Fragment, label, lines)?;
        Ok(shaders.fragment.create(name, ShaderRecord::labelled(label)))
    }

    /// Links a program from compiled shaders.
    ///
    /// Built-in variables (reported at location `-1`) are left out of the
    /// attribute and uniform maps.
    /// ## Errors
    /// * `StateError::ProgramCompileError` - If linking fails.
    /// * `StateError::AttributeAlreadyAssigned` / `StateError::UniformAlreadyAssigned` -
    ///   If the device reports a name twice.
    pub fn link(
        &mut self,
        label: &str,
        vertex: &VertexShaderId,
        geometry: Option<&GeometryShaderId>,
        fragment: &FragmentShaderId,
    ) -> Result<ProgramId, StateError> {
        let GraphicsContext {
            device, shaders, ..
        } = &mut *self.ctx;
        let device = device.as_ref();

        let mut stages = vec![ShaderRef::Vertex(*vertex)];
        stages.extend(geometry.map(|g| ShaderRef::Geometry(*g)));
        stages.push(ShaderRef::Fragment(*fragment));
        for shader in &stages {
            shaders.shader(shader)?;
        }

        let name = device.create_program()?;
        let linked = link_program(device, name, &stages, label, shaders.log_capacity);
        let discard = |err: StateError| {
            if let Err(delete) = device.delete_program(name) {
                log::warn!("Failed to delete program {name} after a failed link: {delete}");
            }
            err
        };
        linked.map_err(discard)?;

        let mut references = ReferenceContainer::new();
        for shader in &stages {
            references.add(*shader);
        }
        let program = shaders.programs.create(
            name,
            ProgramRecord {
                label: label.to_string(),
                attributes: HashMap::new(),
                uniforms: HashMap::new(),
                references,
            },
        );
        let reflected = reflect(device, program);
        let (attributes, uniforms) = match reflected {
            Ok(maps) => maps,
            Err(err) => {
                shaders.programs.mark_deleted(&program)?;
                return Err(discard(err));
            }
        };
        if let Ok(record) = shaders.programs.get_mut(&program) {
            record.attributes = attributes;
            record.uniforms = uniforms;
        }
        for shader in &stages {
            if let Ok(record) = shaders.shader_mut(shader) {
                record.referrers.add(program);
            }
        }
        log::debug!("Linked program '{label}' ({name}) from {} shader(s)", stages.len());
        Ok(program)
    }

    /// Makes `program` the active program. Activating the active program makes no device call.
    pub fn activate(&mut self, program: &ProgramId) -> Result<(), StateError> {
        let GraphicsContext {
            device, shaders, ..
        } = &mut *self.ctx;
        shaders.programs.validate(program)?;
        if shaders.active == Some(*program) {
            log::trace!("Program {} already active", program.name());
            return Ok(());
        }
        device.use_program(program.name())?;
        shaders.active = Some(*program);
        Ok(())
    }

    /// Clears the active program.
    pub fn deactivate(&mut self) -> Result<(), StateError> {
        let GraphicsContext {
            device, shaders, ..
        } = &mut *self.ctx;
        if shaders.active.is_some() {
            device.use_program(0)?;
            shaders.active = None;
        }
        Ok(())
    }

    /// Returns the active program.
    pub fn activated(&self) -> Option<ProgramId> {
        self.ctx.shaders.active
    }

    /// Returns `true` if `program` is the active program.
    pub fn is_activated(&self, program: &ProgramId) -> Result<bool, StateError> {
        self.ctx.shaders.programs.validate(program)?;
        Ok(self.ctx.shaders.active == Some(*program))
    }

    /// Returns the active attributes of `program`, keyed by name.
    pub fn attributes(
        &self,
        program: &ProgramId,
    ) -> Result<HashMap<String, ProgramAttribute>, StateError> {
        Ok(self.ctx.shaders.programs.get(program)?.attributes.clone())
    }

    /// Returns the active uniforms of `program`, keyed by name.
    pub fn uniforms(&self, program: &ProgramId) -> Result<HashMap<String, ProgramUniform>, StateError> {
        Ok(self.ctx.shaders.programs.get(program)?.uniforms.clone())
    }

    /// Returns the uniform `name` of `program`, if it is active.
    pub fn uniform(&self, program: &ProgramId, name: &str) -> Result<Option<ProgramUniform>, StateError> {
        Ok(self.ctx.shaders.programs.get(program)?.uniforms.get(name).cloned())
    }

    /// Returns the label `program` was linked with.
    pub fn program_label(&self, program: &ProgramId) -> Result<String, StateError> {
        Ok(self.ctx.shaders.programs.get(program)?.label.clone())
    }

    /// Returns the label `shader` was compiled with.
    pub fn shader_label(&self, shader: impl Into<ShaderRef>) -> Result<String, StateError> {
        Ok(self.ctx.shaders.shader(&shader.into())?.label.clone())
    }

    /// Returns the distinct shaders `program` was linked from and that still exist.
    pub fn references(&self, program: &ProgramId) -> Result<HashSet<ShaderRef>, StateError> {
        Ok(self.ctx.shaders.programs.get(program)?.references.references())
    }

    /// Returns `true` if any live program was linked from `shader`.
    pub fn is_referenced(&self, shader: impl Into<ShaderRef>) -> Result<bool, StateError> {
        Ok(!self.ctx.shaders.shader(&shader.into())?.referrers.is_empty())
    }

    /// Selects whether uniform writes are checked against the reflected type.
    pub fn set_uniform_type_checking(&mut self, enabled: bool) {
        self.ctx.shaders.type_checking = enabled;
    }

    /// Returns `true` if uniform writes are checked against the reflected type.
    pub fn uniform_type_checking(&self) -> bool {
        self.ctx.shaders.type_checking
    }

    /// Selects whether uniform writes require the owning program to be active.
    pub fn set_uniform_activity_checking(&mut self, enabled: bool) {
        self.ctx.shaders.activity_checking = enabled;
    }

    /// Returns `true` if uniform writes require the owning program to be active.
    pub fn uniform_activity_checking(&self) -> bool {
        self.ctx.shaders.activity_checking
    }

    /// Writes `value` to `uniform`.
    /// ## Errors
    /// * `StateError::Deleted` - If the owning program was deleted.
    /// * `StateError::ProgramNotActive` - If activity checking is on and the owning
    ///   program is not active.
    /// * `StateError::ProgramTypeError` - If type checking is on and `value` does not
    ///   match the reflected type.
    pub fn put(&mut self, uniform: &ProgramUniform, value: UniformValue) -> Result<(), StateError> {
        self.check_uniform(uniform)?;
        if self.ctx.shaders.type_checking && value.glsl_type() != uniform.ty {
            return Err(StateError::ProgramTypeError {
                uniform: uniform.name.clone(),
                expected: uniform.ty.to_string(),
                received: value.glsl_type().to_string(),
            });
        }
        self.ctx.device.uniform(uniform.location, &value)?;
        Ok(())
    }

    /// Writes an array of floats to `uniform`.
    /// ## Errors
    /// * `StateError::ProgramTypeError` - If type checking is on and the uniform is not
    ///   of a floating-point type.
    /// * `StateError::RangeCheck` - If `values` holds fewer floats than the uniform array needs.
    pub fn put_floats(&mut self, uniform: &ProgramUniform, values: &[f32]) -> Result<(), StateError> {
        self.check_uniform(uniform)?;
        if self.ctx.shaders.type_checking && !uniform.ty.is_floating_point() {
            return Err(StateError::ProgramTypeError {
                uniform: uniform.name.clone(),
                expected: uniform.ty.to_string(),
                received: "float[]".to_string(),
            });
        }
        let needed = uniform.ty.element_count() as usize * uniform.size as usize;
        if values.len() < needed {
            return Err(StateError::RangeCheck(format!(
                "Uniform {} needs {needed} floats but {} were supplied",
                uniform.name,
                values.len()
            )));
        }
        self.ctx
            .device
            .uniform_floats(uniform.location, uniform.ty, values)?;
        Ok(())
    }

    fn check_uniform(&self, uniform: &ProgramUniform) -> Result<(), StateError> {
        let shaders = &self.ctx.shaders;
        shaders.programs.validate(&uniform.program)?;
        if shaders.activity_checking && shaders.active != Some(uniform.program) {
            return Err(StateError::ProgramNotActive {
                uniform: uniform.name.clone(),
                program: uniform.program.name(),
                active: shaders.active.map(|p| p.name()),
            });
        }
        Ok(())
    }

    /// Deletes a vertex shader. See [`delete_shader`](Self::delete_shader).
    pub fn delete_vertex(&mut self, shader: &VertexShaderId) -> Result<(), StateError> {
        self.delete_shader(ShaderRef::Vertex(*shader))
    }

    /// Deletes a geometry shader. See [`delete_shader`](Self::delete_shader).
    pub fn delete_geometry(&mut self, shader: &GeometryShaderId) -> Result<(), StateError> {
        self.delete_shader(ShaderRef::Geometry(*shader))
    }

    /// Deletes a fragment shader. See [`delete_shader`](Self::delete_shader).
    pub fn delete_fragment(&mut self, shader: &FragmentShaderId) -> Result<(), StateError> {
        self.delete_shader(ShaderRef::Fragment(*shader))
    }

    /// Deletes `shader` and removes it from the references of every program linked from it.
    ///
    /// Linked programs keep working; only the bookkeeping changes.
    pub fn delete_shader(&mut self, shader: ShaderRef) -> Result<(), StateError> {
        let GraphicsContext {
            device, shaders, ..
        } = &mut *self.ctx;
        shaders.shader(&shader)?;
        device.delete_shader(shader.name())?;
        let record = shaders.mark_shader_deleted(&shader)?;
        for program in record.referrers.iter() {
            if let Ok(program) = shaders.programs.get_mut(&program) {
                program.references.remove_all(shader);
            }
        }
        Ok(())
    }

    /// Deletes `program`, deactivating it first if it is active.
    pub fn delete_program(&mut self, program: &ProgramId) -> Result<(), StateError> {
        let GraphicsContext {
            device, shaders, ..
        } = &mut *self.ctx;
        let device = device.as_ref();

        shaders.programs.validate(program)?;
        if shaders.active == Some(*program) {
            device.use_program(0)?;
            shaders.active = None;
        }
        device.delete_program(program.name())?;
        let mut record = shaders.programs.mark_deleted(program)?;
        for shader in record.references.clear() {
            if let Ok(shader) = shaders.shader_mut(&shader) {
                shader.referrers.remove_all(*program);
            }
        }
        Ok(())
    }
}

impl ShaderRecord {
    fn labelled(label: &str) -> Self {
        Self {
            label: label.to_string(),
            referrers: ReferenceContainer::new(),
        }
    }
}

fn link_program(
    device: &dyn GraphicsDevice,
    name: u32,
    stages: &[ShaderRef],
    label: &str,
    log_capacity: usize,
) -> Result<(), StateError> {
    for shader in stages {
        device.attach_shader(name, shader.name())?;
    }
    if device.link_program(name)? {
        return Ok(());
    }
    let message = device.program_info_log(name, log_capacity)?;
    log::error!("Failed to link program '{label}': {message}");
    Err(StateError::ProgramCompileError {
        name: label.to_string(),
        message,
    })
}
