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

//! Scalar types used by vertex attributes.

/// The component type of a floating-point vertex attribute, as stored in its buffer.
///
/// Integer types are converted to floating point by the device, optionally normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// 8-bit signed integer.
    I8,
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit signed integer.
    I16,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit signed integer.
    I32,
    /// 32-bit unsigned integer.
    U32,
    /// 16-bit float.
    F16,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
}

impl ScalarType {
    /// Returns the size of one component in bytes.
    pub const fn size_bytes(self) -> u32 {
        match self {
            ScalarType::I8 | ScalarType::U8 => 1,
            ScalarType::I16 | ScalarType::U16 | ScalarType::F16 => 2,
            ScalarType::I32 | ScalarType::U32 | ScalarType::F32 => 4,
            ScalarType::F64 => 8,
        }
    }
}

/// The component type of an integral vertex attribute.
///
/// Integral attributes are delivered to the shader as integers without conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegralScalarType {
    /// 8-bit signed integer.
    I8,
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit signed integer.
    I16,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit signed integer.
    I32,
    /// 32-bit unsigned integer.
    U32,
}

impl IntegralScalarType {
    /// Returns the size of one component in bytes.
    pub const fn size_bytes(self) -> u32 {
        match self {
            IntegralScalarType::I8 | IntegralScalarType::U8 => 1,
            IntegralScalarType::I16 | IntegralScalarType::U16 => 2,
            IntegralScalarType::I32 | IntegralScalarType::U32 => 4,
        }
    }
}
