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

#![allow(dead_code)]

use vigil_core::api::{
    ActiveVariable, GlslType, IntegralScalarType, ScalarType, TextureFormat, TextureParameters,
};
use vigil_core::handle::{ArrayBufferId, Texture2DId};
use vigil_infra::HeadlessDevice;
use vigil_state::{FloatingAttribute, GraphicsContext, IntegralAttribute, TextureUnit};

/// A context over a fresh headless device, with construction-time calls forgotten.
pub fn setup() -> (GraphicsContext, HeadlessDevice) {
    vigil_infra::logging::init_for_tests();
    let device = HeadlessDevice::new();
    let ctx = GraphicsContext::new(device.clone()).expect("headless device is compliant");
    device.clear_calls();
    (ctx, device)
}

pub fn float_attribute(buffer: ArrayBufferId, elements: u32, offset: u64) -> FloatingAttribute {
    FloatingAttribute {
        buffer,
        elements,
        scalar: ScalarType::F32,
        stride: 0,
        offset,
        normalized: false,
        divisor: 0,
    }
}

pub fn integral_attribute(buffer: ArrayBufferId, elements: u32, offset: u64) -> IntegralAttribute {
    IntegralAttribute {
        buffer,
        elements,
        scalar: IntegralScalarType::U16,
        stride: 0,
        offset,
        divisor: 0,
    }
}

pub fn unit(ctx: &mut GraphicsContext, index: usize) -> TextureUnit {
    ctx.textures().units()[index]
}

pub fn rgba_texture(ctx: &mut GraphicsContext, unit: &TextureUnit, size: u32) -> Texture2DId {
    ctx.textures()
        .allocate_2d(unit, size, size, TextureFormat::Rgba8, TextureParameters::default())
        .expect("texture allocation")
}

pub fn depth_texture(ctx: &mut GraphicsContext, unit: &TextureUnit, size: u32) -> Texture2DId {
    ctx.textures()
        .allocate_2d(unit, size, size, TextureFormat::Depth24, TextureParameters::default())
        .expect("texture allocation")
}

pub fn active(name: &str, location: i32, ty: GlslType) -> ActiveVariable {
    ActiveVariable {
        name: name.to_string(),
        location,
        ty,
        size: 1,
    }
}
