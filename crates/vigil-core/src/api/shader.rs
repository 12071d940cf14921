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

//! Shader stages, reflected GLSL types and uniform values.

use std::fmt;

/// A programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// The vertex stage.
    Vertex,
    /// The geometry stage.
    Geometry,
    /// The fragment stage.
    Fragment,
}

/// The type of a program attribute or uniform as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum GlslType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Int,
    IVec2,
    IVec3,
    IVec4,
    UInt,
    UVec2,
    UVec3,
    UVec4,
    Bool,
    Mat2,
    Mat3,
    Mat4,
    Sampler2D,
    SamplerCube,
}

impl GlslType {
    /// Returns the number of scalar components in one value of this type.
    pub const fn element_count(self) -> u32 {
        match self {
            GlslType::Float
            | GlslType::Int
            | GlslType::UInt
            | GlslType::Bool
            | GlslType::Sampler2D
            | GlslType::SamplerCube => 1,
            GlslType::Vec2 | GlslType::IVec2 | GlslType::UVec2 => 2,
            GlslType::Vec3 | GlslType::IVec3 | GlslType::UVec3 => 3,
            GlslType::Vec4 | GlslType::IVec4 | GlslType::UVec4 | GlslType::Mat2 => 4,
            GlslType::Mat3 => 9,
            GlslType::Mat4 => 16,
        }
    }

    /// Returns `true` if values of this type are built from floats.
    pub const fn is_floating_point(self) -> bool {
        matches!(
            self,
            GlslType::Float
                | GlslType::Vec2
                | GlslType::Vec3
                | GlslType::Vec4
                | GlslType::Mat2
                | GlslType::Mat3
                | GlslType::Mat4
        )
    }
}

impl fmt::Display for GlslType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GlslType::Float => "float",
            GlslType::Vec2 => "vec2",
            GlslType::Vec3 => "vec3",
            GlslType::Vec4 => "vec4",
            GlslType::Int => "int",
            GlslType::IVec2 => "ivec2",
            GlslType::IVec3 => "ivec3",
            GlslType::IVec4 => "ivec4",
            GlslType::UInt => "uint",
            GlslType::UVec2 => "uvec2",
            GlslType::UVec3 => "uvec3",
            GlslType::UVec4 => "uvec4",
            GlslType::Bool => "bool",
            GlslType::Mat2 => "mat2",
            GlslType::Mat3 => "mat3",
            GlslType::Mat4 => "mat4",
            GlslType::Sampler2D => "sampler2D",
            GlslType::SamplerCube => "samplerCube",
        };
        f.write_str(name)
    }
}

/// A value written to a single (non-array) uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(missing_docs)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
    IVec2([i32; 2]),
    IVec3([i32; 3]),
    IVec4([i32; 4]),
    UInt(u32),
    UVec2([u32; 2]),
    UVec3([u32; 3]),
    UVec4([u32; 4]),
    Bool(bool),
    Mat2([f32; 4]),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
    /// The index of the texture unit a 2D sampler reads from.
    Sampler2D(u32),
    /// The index of the texture unit a cube sampler reads from.
    SamplerCube(u32),
}

impl UniformValue {
    /// Returns the GLSL type this value can be written to.
    pub const fn glsl_type(&self) -> GlslType {
        match self {
            UniformValue::Float(_) => GlslType::Float,
            UniformValue::Vec2(_) => GlslType::Vec2,
            UniformValue::Vec3(_) => GlslType::Vec3,
            UniformValue::Vec4(_) => GlslType::Vec4,
            UniformValue::Int(_) => GlslType::Int,
            UniformValue::IVec2(_) => GlslType::IVec2,
            UniformValue::IVec3(_) => GlslType::IVec3,
            UniformValue::IVec4(_) => GlslType::IVec4,
            UniformValue::UInt(_) => GlslType::UInt,
            UniformValue::UVec2(_) => GlslType::UVec2,
            UniformValue::UVec3(_) => GlslType::UVec3,
            UniformValue::UVec4(_) => GlslType::UVec4,
            UniformValue::Bool(_) => GlslType::Bool,
            UniformValue::Mat2(_) => GlslType::Mat2,
            UniformValue::Mat3(_) => GlslType::Mat3,
            UniformValue::Mat4(_) => GlslType::Mat4,
            UniformValue::Sampler2D(_) => GlslType::Sampler2D,
            UniformValue::SamplerCube(_) => GlslType::SamplerCube,
        }
    }
}

/// An attribute or uniform reported active by the device after linking.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActiveVariable {
    /// The name as reported by the device.
    pub name: String,
    /// The location, or `-1` for built-in variables.
    pub location: i32,
    /// The reflected type.
    pub ty: GlslType,
    /// The array size (`1` for non-arrays).
    pub size: u32,
}
