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

//! Defines data structures related to textures.

/// The internal format of a texture.
///
/// Only the properties the state layer needs are modelled: the size of a
/// texel and which attachment points the format may be rendered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// One 8-bit normalized channel.
    R8,
    /// Two 8-bit normalized channels.
    Rg8,
    /// Three 8-bit normalized channels.
    Rgb8,
    /// Four 8-bit normalized channels.
    Rgba8,
    /// One 16-bit float channel.
    R16f,
    /// Four 16-bit float channels.
    Rgba16f,
    /// One 32-bit float channel.
    R32f,
    /// Four 32-bit float channels.
    Rgba32f,
    /// Three 32-bit float channels. Not color-renderable.
    Rgb32f,
    /// 16-bit depth.
    Depth16,
    /// 24-bit depth.
    Depth24,
    /// 32-bit float depth.
    Depth32f,
    /// 24-bit depth with 8-bit stencil.
    Depth24Stencil8,
}

impl TextureFormat {
    /// Returns the size of one texel in bytes.
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            TextureFormat::R8 => 1,
            TextureFormat::Rg8 | TextureFormat::R16f | TextureFormat::Depth16 => 2,
            TextureFormat::Rgb8 | TextureFormat::Depth24 => 3,
            TextureFormat::Rgba8
            | TextureFormat::R32f
            | TextureFormat::Depth32f
            | TextureFormat::Depth24Stencil8 => 4,
            TextureFormat::Rgba16f => 8,
            TextureFormat::Rgb32f => 12,
            TextureFormat::Rgba32f => 16,
        }
    }

    /// Returns `true` if the format may be attached at a color attachment point.
    pub const fn is_color_renderable(self) -> bool {
        matches!(
            self,
            TextureFormat::R8
                | TextureFormat::Rg8
                | TextureFormat::Rgb8
                | TextureFormat::Rgba8
                | TextureFormat::R16f
                | TextureFormat::Rgba16f
                | TextureFormat::R32f
                | TextureFormat::Rgba32f
        )
    }

    /// Returns `true` if the format may be attached at the depth attachment point.
    pub const fn is_depth_renderable(self) -> bool {
        matches!(
            self,
            TextureFormat::Depth16 | TextureFormat::Depth24 | TextureFormat::Depth32f
        )
    }

    /// Returns `true` if the format may be attached at the depth-stencil attachment point.
    pub const fn is_depth_stencil_renderable(self) -> bool {
        matches!(self, TextureFormat::Depth24Stencil8)
    }
}

/// How texture coordinates outside `[0, 1]` are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    /// Clamp to the edge texel.
    #[default]
    ClampToEdge,
    /// Repeat the texture.
    Repeat,
    /// Repeat the texture, mirroring every other repetition.
    MirroredRepeat,
}

/// The filter applied when a texture is minified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MinificationFilter {
    /// Nearest texel.
    Nearest,
    /// Linear interpolation between texels.
    #[default]
    Linear,
    /// Linear interpolation within and between mipmap levels.
    LinearMipmapLinear,
    /// Nearest texel of the nearest mipmap level.
    NearestMipmapNearest,
}

/// The filter applied when a texture is magnified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MagnificationFilter {
    /// Nearest texel.
    Nearest,
    /// Linear interpolation between texels.
    #[default]
    Linear,
}

/// Sampling parameters configured when a texture is allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureParameters {
    /// Wrapping along S.
    pub wrap_s: WrapMode,
    /// Wrapping along T.
    pub wrap_t: WrapMode,
    /// Wrapping along R (cube maps only).
    pub wrap_r: WrapMode,
    /// Minification filter.
    pub min_filter: MinificationFilter,
    /// Magnification filter.
    pub mag_filter: MagnificationFilter,
}

/// One face of a cube texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CubeFace {
    /// +X.
    PositiveX,
    /// -X.
    NegativeX,
    /// +Y.
    PositiveY,
    /// -Y.
    NegativeY,
    /// +Z.
    PositiveZ,
    /// -Z.
    NegativeZ,
}

impl CubeFace {
    /// All six faces in device order.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];
}

/// A texture binding target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    /// The 2D target.
    Texture2D,
    /// The cube map target.
    CubeMap,
}

/// A target addressing one image of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureImageTarget {
    /// The single image of a 2D texture.
    Texture2D,
    /// One face of a cube texture.
    CubeFace(CubeFace),
}

/// A rectangle of texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelArea {
    /// Left edge.
    pub x: u32,
    /// Bottom edge.
    pub y: u32,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
}

impl PixelArea {
    /// Creates an area.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates an area anchored at the origin.
    pub const fn of_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Returns the number of texels in the area.
    pub const fn texel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns `true` if `other` lies entirely within this area.
    pub const fn contains(&self, other: &PixelArea) -> bool {
        (other.x as u64) >= (self.x as u64)
            && (other.y as u64) >= (self.y as u64)
            && (other.x as u64 + other.width as u64) <= (self.x as u64 + self.width as u64)
            && (other.y as u64 + other.height as u64) <= (self.y as u64 + self.height as u64)
    }
}
