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

mod common;

use vigil_core::{ContextConfig, StateError};
use vigil_infra::{HeadlessDevice, HeadlessLimits};
use vigil_state::GraphicsContext;

#[test]
fn test_limits_are_read_at_construction() {
    // --- 1. ARRANGE ---
    vigil_infra::logging::init_for_tests();
    let device = HeadlessDevice::with_limits(HeadlessLimits {
        max_vertex_attributes: 32,
        max_texture_units: 48,
        ..HeadlessLimits::default()
    });

    // --- 2. ACT ---
    let mut ctx = GraphicsContext::new(device.clone()).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(ctx.array_objects().max_attributes(), 32);
    assert_eq!(ctx.textures().units().len(), 48);
    assert_eq!(ctx.textures().max_texture_size(), 8192);
    assert_eq!(ctx.framebuffers().max_color_attachments(), 8);
    assert_eq!(ctx.framebuffers().max_draw_buffers(), 8);
}

#[test]
fn test_reported_limits_are_clamped() {
    // --- 1. ARRANGE ---
    vigil_infra::logging::init_for_tests();
    let device = HeadlessDevice::with_limits(HeadlessLimits {
        max_vertex_attributes: 64,
        max_texture_units: 4096,
        ..HeadlessLimits::default()
    });
    let config = ContextConfig {
        max_vertex_attributes_clamp: 24,
        ..ContextConfig::default()
    };

    // --- 2. ACT ---
    let mut ctx = GraphicsContext::with_config(device, config).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(ctx.array_objects().max_attributes(), 24);
    assert_eq!(ctx.textures().units().len(), 1024);
}

#[test]
fn test_non_compliant_device_is_rejected() {
    // --- 1. ARRANGE ---
    vigil_infra::logging::init_for_tests();
    let cases = [
        HeadlessLimits {
            max_vertex_attributes: 8,
            ..HeadlessLimits::default()
        },
        HeadlessLimits {
            max_texture_units: 15,
            ..HeadlessLimits::default()
        },
        HeadlessLimits {
            max_texture_size: 512,
            ..HeadlessLimits::default()
        },
        HeadlessLimits {
            max_color_attachments: 4,
            ..HeadlessLimits::default()
        },
        HeadlessLimits {
            max_draw_buffers: 1,
            ..HeadlessLimits::default()
        },
    ];

    for limits in cases {
        // --- 2. ACT ---
        let result = GraphicsContext::new(HeadlessDevice::with_limits(limits));

        // --- 3. ASSERT ---
        assert!(
            matches!(result, Err(StateError::NonCompliantDevice(_))),
            "{limits:?} should be rejected"
        );
    }
}

#[test]
fn test_capability_query_failure_propagates() {
    // --- 1. ARRANGE ---
    vigil_infra::logging::init_for_tests();
    let device = HeadlessDevice::new();
    device.fail_next("max_texture_size", "context lost");

    // --- 2. ACT ---
    let result = GraphicsContext::new(device);

    // --- 3. ASSERT ---
    match result {
        Err(StateError::Device(err)) => assert_eq!(err.operation, "max_texture_size"),
        Err(other) => panic!("Expected a device error, got {other:?}"),
        Ok(_) => panic!("Construction should fail"),
    }
}

#[test]
fn test_contexts_have_distinct_identities() {
    // --- 1. ARRANGE ---
    let (first, _) = common::setup();

    // --- 2. ACT ---
    let (second, _) = common::setup();

    // --- 3. ASSERT ---
    assert_ne!(first.id(), second.id());
    assert_eq!(first.config(), &ContextConfig::default());
}

#[test]
fn test_config_from_json() {
    // --- 1. ARRANGE ---
    let text = r#"{ "strict_attributes": true, "diagnostic_log_capacity": 16 }"#;

    // --- 2. ACT ---
    let config = ContextConfig::from_json_str(text).unwrap();

    // --- 3. ASSERT ---
    assert!(config.strict_attributes);
    assert_eq!(config.diagnostic_log_capacity, 16);
    assert!(config.uniform_type_checking, "Missing fields take their default");
    let round = ContextConfig::from_json_str(&config.to_json_string().unwrap()).unwrap();
    assert_eq!(round, config);
}
