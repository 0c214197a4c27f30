//! Unit tests for pipeline.rs
//!
//! Tests declaration grouping, default fixed-function state and the variant trait defaults.

use crate::renderer::pipeline::*;

// ============================================================================
// DECLARATION GROUPING
// ============================================================================

#[test]
fn test_group_declarations_sorts_by_set_then_binding() {
    let stages = ShaderStageFlags::FRAGMENT;
    let groups = group_declarations(&[
        BindingDeclaration::sampler(1, 1, stages),
        BindingDeclaration::uniform(0, 0, ShaderStageFlags::VERTEX),
        BindingDeclaration::sampler(1, 0, stages),
    ]);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0], vec![BindingDeclaration::uniform(0, 0, ShaderStageFlags::VERTEX)]);
    assert_eq!(groups[1].iter().map(|d| d.binding).collect::<Vec<_>>(), vec![0, 1]);
    assert!(groups[1].iter().all(|d| d.set == 1));
}

#[test]
fn test_group_declarations_fills_skipped_sets() {
    let groups = group_declarations(&[
        BindingDeclaration::sampler(3, 0, ShaderStageFlags::FRAGMENT),
        BindingDeclaration::uniform(0, 0, ShaderStageFlags::VERTEX),
    ]);

    assert_eq!(groups.len(), 4);
    assert_eq!(groups[0].len(), 1);
    assert!(groups[1].is_empty());
    assert!(groups[2].is_empty());
    assert_eq!(groups[3][0].kind, BindingKind::CombinedImageSampler);
}

#[test]
fn test_group_declarations_empty() {
    assert!(group_declarations(&[]).is_empty());
}

#[test]
#[should_panic(expected = "declared twice")]
fn test_group_declarations_duplicate_panics() {
    group_declarations(&[
        BindingDeclaration::uniform(0, 0, ShaderStageFlags::VERTEX),
        BindingDeclaration::sampler(0, 0, ShaderStageFlags::FRAGMENT),
    ]);
}

#[test]
#[should_panic(expected = "above the limit of 32 sets")]
fn test_group_declarations_rejects_large_set_id() {
    group_declarations(&[
        BindingDeclaration::uniform(0, 0, ShaderStageFlags::VERTEX),
        BindingDeclaration::uniform(4_000_000, 0, ShaderStageFlags::VERTEX),
    ]);
}

#[test]
fn test_group_declarations_accepts_last_set() {
    let groups = group_declarations(&[BindingDeclaration::sampler(
        MAX_BINDING_SETS - 1,
        0,
        ShaderStageFlags::FRAGMENT,
    )]);

    assert_eq!(groups.len(), MAX_BINDING_SETS as usize);
    assert_eq!(groups[31].len(), 1);
}

// ============================================================================
// FIXED FUNCTION DEFAULTS
// ============================================================================

#[test]
fn test_fixed_function_defaults() {
    let state = FixedFunctionState::default();

    assert_eq!(state.topology, PrimitiveTopology::TriangleList);
    assert_eq!(state.rasterization.polygon_mode, PolygonMode::Fill);
    assert_eq!(state.rasterization.cull_mode, CullMode::Back);
    assert_eq!(state.rasterization.front_face, FrontFace::Clockwise);
    assert!(state.depth.test_enable);
    assert!(state.depth.write_enable);
    assert_eq!(state.depth.compare_op, CompareOp::Less);
}

#[test]
fn test_default_blend_is_alpha_blending() {
    let blend = ColorBlendState::default();

    assert!(blend.blend_enable);
    assert_eq!(blend.src_color_factor, BlendFactor::SrcAlpha);
    assert_eq!(blend.dst_color_factor, BlendFactor::OneMinusSrcAlpha);
    assert_eq!(blend.color_blend_op, BlendOp::Add);
    assert_eq!(blend.src_alpha_factor, BlendFactor::One);
    assert_eq!(blend.dst_alpha_factor, BlendFactor::Zero);
    assert_eq!(blend.alpha_blend_op, BlendOp::Add);
}

// ============================================================================
// SHADER STAGES
// ============================================================================

#[test]
fn test_stage_flags_from_stage() {
    assert_eq!(ShaderStageFlags::from(ShaderStage::Vertex), ShaderStageFlags::VERTEX);
    assert_eq!(ShaderStageFlags::from(ShaderStage::Fragment), ShaderStageFlags::FRAGMENT);
    let both = ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT;
    assert!(both.contains(ShaderStageFlags::FRAGMENT));
}

#[test]
fn test_shader_stage_desc_constructors() {
    let vert = ShaderStageDesc::from_path(ShaderStage::Vertex, "shaders/mesh.vert.spv");
    assert_eq!(vert.entry_point, "main");
    assert_eq!(vert.source, ShaderSource::Path("shaders/mesh.vert.spv".into()));

    let frag = ShaderStageDesc::from_words(ShaderStage::Fragment, vec![0x0723_0203]);
    assert_eq!(frag.source, ShaderSource::Spirv(vec![0x0723_0203]));
}

#[test]
fn test_buffer_format_sizes() {
    assert_eq!(BufferFormat::R32_SFLOAT.size_bytes(), 4);
    assert_eq!(BufferFormat::R32G32_SFLOAT.size_bytes(), 8);
    assert_eq!(BufferFormat::R32G32B32_SFLOAT.size_bytes(), 12);
    assert_eq!(BufferFormat::R32G32B32A32_SFLOAT.size_bytes(), 16);
}

// ============================================================================
// VARIANT TRAIT
// ============================================================================

struct Minimal;

impl PipelineVariant for Minimal {
    fn vertex_layout(&self) -> VertexLayout {
        VertexLayout::default()
    }
    fn shader_stages(&self) -> Vec<ShaderStageDesc> {
        vec![ShaderStageDesc::from_words(ShaderStage::Vertex, vec![])]
    }
    fn dynamic_states(&self) -> Vec<DynamicState> {
        vec![DynamicState::Viewport, DynamicState::Scissor]
    }
    fn binding_declarations(&self) -> Vec<BindingDeclaration> {
        Vec::new()
    }
}

#[test]
fn test_variant_fixed_function_defaults() {
    let variant: Box<dyn PipelineVariant> = Box::new(Minimal);
    assert_eq!(variant.fixed_function(), FixedFunctionState::default());
    assert_eq!(variant.dynamic_states().len(), 2);
}
