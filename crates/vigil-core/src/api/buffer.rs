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

//! Defines data structures related to buffer objects.

/// A hint describing how the contents of a buffer will be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UsageHint {
    /// Written once, drawn from many times.
    #[default]
    StaticDraw,
    /// Written once, read back many times.
    StaticRead,
    /// Written once, used as a copy source many times.
    StaticCopy,
    /// Rewritten repeatedly, drawn from many times.
    DynamicDraw,
    /// Rewritten repeatedly, read back many times.
    DynamicRead,
    /// Rewritten repeatedly, used as a copy source many times.
    DynamicCopy,
    /// Written once, used a few times.
    StreamDraw,
    /// Written once, read back a few times.
    StreamRead,
    /// Written once, used as a copy source a few times.
    StreamCopy,
}

/// The binding target of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// The vertex data target.
    Array,
    /// The index data target, stored per array object.
    ElementArray,
}

/// The integer type of the indices stored in an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    /// 8-bit unsigned indices.
    U8,
    /// 16-bit unsigned indices.
    U16,
    /// 32-bit unsigned indices.
    U32,
}

impl IndexType {
    /// Returns the size of one index in bytes.
    pub const fn size_bytes(self) -> u64 {
        match self {
            IndexType::U8 => 1,
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }

    /// Returns the smallest index type able to hold every index below `count`.
    pub const fn for_count(count: u64) -> Self {
        if count <= 0x100 {
            IndexType::U8
        } else if count <= 0x1_0000 {
            IndexType::U16
        } else {
            IndexType::U32
        }
    }
}

/// An inclusive range of byte offsets `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    lower: u64,
    upper: u64,
}

impl ByteRange {
    /// Creates the range `[lower, upper]`, or `None` if `upper < lower`.
    pub const fn new(lower: u64, upper: u64) -> Option<Self> {
        if upper < lower {
            None
        } else {
            Some(Self { lower, upper })
        }
    }

    /// Creates the range covering the first `size` bytes, or `None` if `size` is zero.
    pub const fn from_size(size: u64) -> Option<Self> {
        if size == 0 {
            None
        } else {
            Some(Self {
                lower: 0,
                upper: size - 1,
            })
        }
    }

    /// The first byte of the range.
    pub const fn lower(&self) -> u64 {
        self.lower
    }

    /// The last byte of the range.
    pub const fn upper(&self) -> u64 {
        self.upper
    }

    /// The number of bytes in the range.
    pub const fn interval(&self) -> u64 {
        self.upper - self.lower + 1
    }

    /// Returns `true` if `offset` lies within the range.
    pub const fn includes_value(&self, offset: u64) -> bool {
        offset >= self.lower && offset <= self.upper
    }

    /// Returns `true` if `other` lies entirely within this range.
    pub const fn includes(&self, other: &ByteRange) -> bool {
        other.lower >= self.lower && other.upper <= self.upper
    }
}

impl std::fmt::Display for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}
