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

//! # Vigil Core
//!
//! Contracts and vocabulary for tracking the state of a handle-based graphics
//! device: the device call surface, typed handles and their liveness
//! registry, reference containers and the error taxonomy.

#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod context;
pub mod device;
pub mod error;
pub mod handle;
pub mod references;
pub mod units;

pub use config::ContextConfig;
pub use context::ContextId;
pub use device::{DeviceCapabilities, DiagnosticLog, GraphicsDevice};
pub use error::{ConfigError, DeviceError, ObjectKind, StateError};
pub use handle::*;
pub use references::ReferenceContainer;
pub use units::UnitSet;
