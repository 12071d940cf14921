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

//! Behavioural settings of a graphics context.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Settings that select between the policies the state trackers support.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// If `true`, new array object builders reject assigning an already populated
    /// attribute slot instead of overwriting it.
    pub strict_attributes: bool,
    /// If `true`, uniform writes are checked against the reflected uniform type.
    pub uniform_type_checking: bool,
    /// If `true`, uniform writes require the owning program to be active.
    pub uniform_activity_checking: bool,
    /// The largest compiler or linker log retrieved from the device, in bytes.
    pub diagnostic_log_capacity: usize,
    /// The upper bound applied to the device-reported vertex attribute count.
    pub max_vertex_attributes_clamp: u32,
    /// The upper bound applied to the device-reported texture unit count.
    pub max_texture_units_clamp: u32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            strict_attributes: false,
            uniform_type_checking: true,
            uniform_activity_checking: true,
            diagnostic_log_capacity: 8192,
            max_vertex_attributes_clamp: 1024,
            max_texture_units_clamp: 1024,
        }
    }
}

impl ContextConfig {
    /// Parses a configuration from JSON. Missing fields take their default value.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serializes the configuration to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
