//! Unit tests for vulkan_pipeline.rs
//!
//! Tests the conversion of pipeline variant state to Vulkan create-info values.
//! Native pipeline creation is covered by the GPU tests.

use ash::vk;
use discovery_engine::discovery::render::*;
use discovery_engine::discovery::scene::Vertex;
use crate::vulkan_pipeline::*;

// ============================================================================
// FIXED FUNCTION
// ============================================================================

#[test]
fn test_default_fixed_function_maps_to_documented_state() {
    let fixed = FixedFunctionState::default();

    assert_eq!(topology_to_vk(fixed.topology), vk::PrimitiveTopology::TRIANGLE_LIST);
    assert_eq!(polygon_mode_to_vk(fixed.rasterization.polygon_mode), vk::PolygonMode::FILL);
    assert_eq!(cull_mode_to_vk(fixed.rasterization.cull_mode), vk::CullModeFlags::BACK);
    assert_eq!(front_face_to_vk(fixed.rasterization.front_face), vk::FrontFace::CLOCKWISE);
    assert_eq!(compare_op_to_vk(fixed.depth.compare_op), vk::CompareOp::LESS);
}

#[test]
fn test_default_color_blend_is_alpha_blending() {
    let attachment = color_blend_attachment(&ColorBlendState::default());

    assert_eq!(attachment.blend_enable, vk::TRUE);
    assert_eq!(attachment.src_color_blend_factor, vk::BlendFactor::SRC_ALPHA);
    assert_eq!(attachment.dst_color_blend_factor, vk::BlendFactor::ONE_MINUS_SRC_ALPHA);
    assert_eq!(attachment.color_blend_op, vk::BlendOp::ADD);
    assert_eq!(attachment.src_alpha_blend_factor, vk::BlendFactor::ONE);
    assert_eq!(attachment.dst_alpha_blend_factor, vk::BlendFactor::ZERO);
    assert_eq!(attachment.alpha_blend_op, vk::BlendOp::ADD);
    assert_eq!(attachment.color_write_mask, vk::ColorComponentFlags::RGBA);
}

#[test]
fn test_disabled_blending_keeps_write_mask() {
    let state = ColorBlendState { blend_enable: false, ..ColorBlendState::default() };
    let attachment = color_blend_attachment(&state);

    assert_eq!(attachment.blend_enable, vk::FALSE);
    assert_eq!(attachment.color_write_mask, vk::ColorComponentFlags::RGBA);
}

#[test]
fn test_compare_ops() {
    assert_eq!(compare_op_to_vk(CompareOp::Never), vk::CompareOp::NEVER);
    assert_eq!(compare_op_to_vk(CompareOp::LessOrEqual), vk::CompareOp::LESS_OR_EQUAL);
    assert_eq!(compare_op_to_vk(CompareOp::GreaterOrEqual), vk::CompareOp::GREATER_OR_EQUAL);
    assert_eq!(compare_op_to_vk(CompareOp::Always), vk::CompareOp::ALWAYS);
}

#[test]
fn test_blend_ops() {
    assert_eq!(blend_op_to_vk(BlendOp::Subtract), vk::BlendOp::SUBTRACT);
    assert_eq!(blend_op_to_vk(BlendOp::Min), vk::BlendOp::MIN);
    assert_eq!(blend_op_to_vk(BlendOp::Max), vk::BlendOp::MAX);
    assert_eq!(blend_factor_to_vk(BlendFactor::DstAlpha), vk::BlendFactor::DST_ALPHA);
}

#[test]
fn test_dynamic_states() {
    assert_eq!(dynamic_state_to_vk(DynamicState::Viewport), vk::DynamicState::VIEWPORT);
    assert_eq!(dynamic_state_to_vk(DynamicState::Scissor), vk::DynamicState::SCISSOR);
    assert_eq!(dynamic_state_to_vk(DynamicState::LineWidth), vk::DynamicState::LINE_WIDTH);
}

// ============================================================================
// DESCRIPTOR SET LAYOUTS
// ============================================================================

#[test]
fn test_set_layout_bindings() {
    let declarations = [
        BindingDeclaration::uniform(1, 0, ShaderStageFlags::VERTEX),
        BindingDeclaration::sampler(1, 1, ShaderStageFlags::FRAGMENT),
    ];
    let bindings = set_layout_bindings(&declarations);

    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings[0].binding, 0);
    assert_eq!(bindings[0].descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
    assert_eq!(bindings[0].stage_flags, vk::ShaderStageFlags::VERTEX);
    assert_eq!(bindings[0].descriptor_count, 1);
    assert_eq!(bindings[1].binding, 1);
    assert_eq!(bindings[1].descriptor_type, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
    assert_eq!(bindings[1].stage_flags, vk::ShaderStageFlags::FRAGMENT);
}

#[test]
fn test_gap_set_gets_empty_layout() {
    let groups = group_declarations(&[
        BindingDeclaration::uniform(0, 0, ShaderStageFlags::VERTEX),
        BindingDeclaration::sampler(2, 0, ShaderStageFlags::FRAGMENT),
    ]);

    assert_eq!(groups.len(), 3);
    assert!(set_layout_bindings(&groups[1]).is_empty());
    assert_eq!(set_layout_bindings(&groups[2]).len(), 1);
}

// ============================================================================
// VERTEX INPUT
// ============================================================================

#[test]
fn test_vertex_input_from_mesh_vertex() {
    let (bindings, attributes) = vertex_input_descriptions(&Vertex::layout());

    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].stride, std::mem::size_of::<Vertex>() as u32);
    assert_eq!(bindings[0].input_rate, vk::VertexInputRate::VERTEX);

    let formats: Vec<vk::Format> = attributes.iter().map(|a| a.format).collect();
    assert_eq!(
        formats,
        vec![
            vk::Format::R32G32B32_SFLOAT,
            vk::Format::R32G32B32_SFLOAT,
            vk::Format::R32G32_SFLOAT,
            vk::Format::R32G32B32_SFLOAT,
            vk::Format::R32G32B32A32_SFLOAT,
        ]
    );
    assert_eq!(attributes[2].offset, 24);
    assert_eq!(attributes[4].location, 4);
}

#[test]
fn test_instance_rate() {
    let layout = VertexLayout {
        bindings: vec![VertexBinding { binding: 1, stride: 16, input_rate: VertexInputRate::Instance }],
        attributes: vec![VertexAttribute {
            location: 5,
            binding: 1,
            format: BufferFormat::R8G8B8A8_UNORM,
            offset: 0,
        }],
    };
    let (bindings, attributes) = vertex_input_descriptions(&layout);

    assert_eq!(bindings[0].input_rate, vk::VertexInputRate::INSTANCE);
    assert_eq!(attributes[0].format, vk::Format::R8G8B8A8_UNORM);
}

#[test]
fn test_buffer_formats() {
    assert_eq!(buffer_format_to_vk(BufferFormat::R32_SFLOAT), vk::Format::R32_SFLOAT);
    assert_eq!(buffer_format_to_vk(BufferFormat::R32_UINT), vk::Format::R32_UINT);
}
