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

//! Defines data structures related to framebuffers.

use bitflags::bitflags;

/// A framebuffer binding target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferTarget {
    /// The target rendering writes to.
    Draw,
    /// The target reads and blits copy from.
    Read,
}

/// The completeness status reported by the device for a framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferStatus {
    /// The framebuffer can be rendered to.
    Complete,
    /// An attachment is not attachment-complete.
    IncompleteAttachment,
    /// No image is attached.
    IncompleteMissingAttachment,
    /// A draw buffer names an attachment point with no image.
    IncompleteDrawBuffer,
    /// The read buffer names an attachment point with no image.
    IncompleteReadBuffer,
    /// Attachments have mismatched sample counts.
    IncompleteMultisample,
    /// Attachments are layered inconsistently.
    IncompleteLayerTargets,
    /// The combination of formats is not supported by the device.
    Unsupported,
    /// The device reported a status not covered above.
    Unknown(u32),
}

/// An attachment point of a framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttachmentPoint {
    /// The color attachment point with the given index.
    Color(u32),
    /// The depth attachment point.
    Depth,
    /// The combined depth-stencil attachment point.
    DepthStencil,
}

/// The filter used when a blit scales its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlitFilter {
    /// Nearest texel. Required for depth and stencil blits.
    #[default]
    Nearest,
    /// Linear interpolation. Color only.
    Linear,
}

bitflags! {
    /// The set of buffers copied by a framebuffer blit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BlitBuffers: u32 {
        /// The color buffer.
        const COLOR = 1 << 0;
        /// The depth buffer.
        const DEPTH = 1 << 1;
        /// The stencil buffer.
        const STENCIL = 1 << 2;
    }
}
