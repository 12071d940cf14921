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

//! Vertex attribute descriptors.

use vigil_core::api::{IntegralScalarType, ScalarType};
use vigil_core::handle::ArrayBufferId;

/// An attribute whose components reach the shader as floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FloatingAttribute {
    /// The buffer the attribute reads from.
    pub buffer: ArrayBufferId,
    /// The number of components, in `[1, 4]`.
    pub elements: u32,
    /// The stored component type.
    pub scalar: ScalarType,
    /// The distance in bytes between consecutive values (`0` for tightly packed).
    pub stride: u32,
    /// The byte offset of the first value; must lie within the buffer.
    pub offset: u64,
    /// Whether integer components are normalized to `[0, 1]` or `[-1, 1]`.
    pub normalized: bool,
    /// The instancing divisor (`0` for per-vertex data).
    pub divisor: u32,
}

/// An attribute whose components reach the shader as integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntegralAttribute {
    /// The buffer the attribute reads from.
    pub buffer: ArrayBufferId,
    /// The number of components, in `[1, 4]`.
    pub elements: u32,
    /// The stored component type.
    pub scalar: IntegralScalarType,
    /// The distance in bytes between consecutive values (`0` for tightly packed).
    pub stride: u32,
    /// The byte offset of the first value; must lie within the buffer.
    pub offset: u64,
    /// The instancing divisor (`0` for per-vertex data).
    pub divisor: u32,
}

/// The configuration of one populated attribute slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeDescriptor {
    /// A floating-point attribute.
    Floating(FloatingAttribute),
    /// An integral attribute.
    Integral(IntegralAttribute),
}

impl AttributeDescriptor {
    /// The buffer the attribute reads from.
    pub fn buffer(&self) -> ArrayBufferId {
        match self {
            AttributeDescriptor::Floating(a) => a.buffer,
            AttributeDescriptor::Integral(a) => a.buffer,
        }
    }

    /// The number of components.
    pub fn elements(&self) -> u32 {
        match self {
            AttributeDescriptor::Floating(a) => a.elements,
            AttributeDescriptor::Integral(a) => a.elements,
        }
    }

    /// The byte offset of the first value.
    pub fn offset(&self) -> u64 {
        match self {
            AttributeDescriptor::Floating(a) => a.offset,
            AttributeDescriptor::Integral(a) => a.offset,
        }
    }

    /// The instancing divisor.
    pub fn divisor(&self) -> u32 {
        match self {
            AttributeDescriptor::Floating(a) => a.divisor,
            AttributeDescriptor::Integral(a) => a.divisor,
        }
    }
}

impl From<FloatingAttribute> for AttributeDescriptor {
    fn from(attribute: FloatingAttribute) -> Self {
        AttributeDescriptor::Floating(attribute)
    }
}

impl From<IntegralAttribute> for AttributeDescriptor {
    fn from(attribute: IntegralAttribute) -> Self {
        AttributeDescriptor::Integral(attribute)
    }
}
