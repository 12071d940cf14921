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

//! Walks the state trackers over a headless device.
//!
//! Usage: `sandbox [config.json]`

use anyhow::{bail, Context};
use vigil_core::api::{
    GlslType, IndexType, QueryKind, ScalarType, TextureFormat, TextureParameters, UniformValue,
    UsageHint,
};
use vigil_core::{ContextConfig, StateError};
use vigil_infra::HeadlessDevice;
use vigil_state::{FloatingAttribute, GraphicsContext};

fn main() -> anyhow::Result<()> {
    vigil_infra::logging::init("info");

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {path}"))?;
            ContextConfig::from_json_str(&text)?
        }
        None => ContextConfig::default(),
    };

    let device = HeadlessDevice::new();
    let mut ctx = GraphicsContext::with_config(device.clone(), config)?;
    log::info!("Context {:?} ready", ctx.id());

    vertex_arrays(&mut ctx)?;
    sampling_and_rendering(&mut ctx)?;
    programs(&mut ctx, &device)?;
    occlusion(&mut ctx)?;

    log::info!(
        "Done: {} device calls, {} live objects",
        device.calls().len(),
        device.live_object_count()
    );
    Ok(())
}

fn attribute(buffer: vigil_core::ArrayBufferId, elements: u32, offset: u64) -> FloatingAttribute {
    FloatingAttribute {
        buffer,
        elements,
        scalar: ScalarType::F32,
        stride: 20,
        offset,
        normalized: false,
        divisor: 0,
    }
}

fn vertex_arrays(ctx: &mut GraphicsContext) -> anyhow::Result<()> {
    let vertices = ctx.array_buffers().allocate(20 * 4, UsageHint::StaticDraw)?;
    let indices = ctx
        .index_buffers()
        .allocate(6, IndexType::U16, UsageHint::StaticDraw)?;

    let mut builder = ctx.array_objects().new_builder();
    builder.set_strict(true);
    builder.set_attribute_floating(ctx, 0, attribute(vertices, 3, 0))?;
    builder.set_attribute_floating(ctx, 1, attribute(vertices, 2, 12))?;
    match builder.set_attribute_floating(ctx, 1, attribute(vertices, 2, 8)) {
        Err(StateError::AttributeAlreadyAssigned(message)) => log::info!("Strict builder: {message}"),
        other => bail!("Strict builder accepted a reassignment: {other:?}"),
    }
    builder.set_index_buffer(ctx, &indices)?;
    let quad = ctx.array_objects().allocate(&builder)?;
    log::info!(
        "Array object {} references {:?}",
        quad.name(),
        ctx.array_objects().references(&quad)?
    );

    match ctx
        .index_buffers()
        .allocate(3, IndexType::U8, UsageHint::StaticDraw)
    {
        Err(error @ StateError::IndexBufferAlreadyConfigured { .. }) => {
            log::info!("Index buffer refused on {}: {error}", quad.name())
        }
        other => bail!("Array object {} accepted a second index buffer: {other:?}", quad.name()),
    }

    ctx.array_buffers().delete(&vertices)?;
    log::info!(
        "After deleting the vertex buffer, slot 0 holds {:?}",
        ctx.array_objects().attribute_at(&quad, 0)?
    );

    ctx.array_objects().delete(&quad)?;
    ctx.index_buffers().delete(&indices)?;
    Ok(())
}

fn sampling_and_rendering(ctx: &mut GraphicsContext) -> anyhow::Result<()> {
    let units = ctx.textures().units();
    let color = ctx.textures().allocate_2d(
        &units[0],
        256,
        256,
        TextureFormat::Rgba8,
        TextureParameters::default(),
    )?;
    let depth = ctx.textures().allocate_2d(
        &units[1],
        256,
        256,
        TextureFormat::Depth24,
        TextureParameters::default(),
    )?;

    let mut builder = ctx.framebuffers().new_builder();
    builder.attach_color_texture_2d(ctx, 0, 0, &color)?;
    builder.attach_depth_texture_2d(ctx, &depth)?;
    let target = ctx.framebuffers().allocate(&builder)?;
    log::info!("Framebuffer {} is {:?}", target.name(), ctx.framebuffers().validate_draw()?);

    match ctx.textures().bind_2d(&units[2], &color) {
        Err(error @ StateError::FeedbackLoop { .. }) => log::info!("Sampling refused: {error}"),
        other => bail!("Sampling a draw attachment was accepted: {other:?}"),
    }
    ctx.framebuffers().unbind_draw()?;
    ctx.textures().bind_2d(&units[2], &color)?;
    log::info!(
        "Texture {} is bound to units {:?}",
        color.name(),
        ctx.textures().units_of(color)?
    );

    ctx.framebuffers().delete(&target)?;
    ctx.textures().delete_2d(&color)?;
    ctx.textures().delete_2d(&depth)?;
    Ok(())
}

fn programs(ctx: &mut GraphicsContext, device: &HeadlessDevice) -> anyhow::Result<()> {
    let vertex = ctx.shaders().compile_vertex(
        "tint.vert",
        &["in vec3 position;\n", "void main() { gl_Position = vec4(position, 1.0); }\n"],
    )?;
    let fragment = ctx.shaders().compile_fragment(
        "tint.frag",
        &["uniform vec4 tint;\n", "out vec4 color;\n", "void main() { color = tint; }\n"],
    )?;

    let variable = |name: &str, location, ty| vigil_core::api::ActiveVariable {
        name: name.to_owned(),
        location,
        ty,
        size: 1,
    };
    device.push_link_reflection(
        vec![variable("position", 0, GlslType::Vec3)],
        vec![variable("tint", 0, GlslType::Vec4)],
    );
    let program = ctx.shaders().link("tint", &vertex, None, &fragment)?;
    let tint = ctx
        .shaders()
        .uniform(&program, "tint")?
        .context("The linked program has no tint uniform")?;

    if let Err(error) = ctx.shaders().put(&tint, UniformValue::Vec4([1.0, 0.5, 0.0, 1.0])) {
        log::info!("Write to inactive program refused: {error}");
    }
    ctx.shaders().activate(&program)?;
    if let Err(error) = ctx.shaders().put(&tint, UniformValue::Vec3([1.0, 0.5, 0.0])) {
        log::info!("Mistyped write refused: {error}");
    }
    ctx.shaders().put(&tint, UniformValue::Vec4([1.0, 0.5, 0.0, 1.0]))?;

    ctx.shaders().delete_program(&program)?;
    ctx.shaders().delete_vertex(&vertex)?;
    ctx.shaders().delete_fragment(&fragment)?;
    Ok(())
}

fn occlusion(ctx: &mut GraphicsContext) -> anyhow::Result<()> {
    let query = ctx.queries().allocate(QueryKind::SamplesPassed)?;
    ctx.queries().begin(&query)?;
    ctx.queries().finish(&query)?;
    let mut polls = 0;
    let samples = loop {
        polls += 1;
        if let Some(samples) = ctx.queries().result(&query)? {
            break samples;
        }
    };
    log::info!("Query {} passed {samples} samples after {polls} polls", query.name());
    ctx.queries().delete(&query)?;
    Ok(())
}
