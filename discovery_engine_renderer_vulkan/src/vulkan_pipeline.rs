/// Pipeline - compiles a PipelineVariant into native Vulkan objects
///
/// Shader modules are loaded once at creation and kept. The set layouts,
/// pipeline layout and pipeline depend on the render pass and are rebuilt
/// after every swapchain recreation.

use ash::vk;
use std::sync::Arc;
use discovery_engine::discovery::render::{
    group_declarations, BindingDeclaration, BindingKind, BlendFactor, BlendOp, BufferFormat,
    ColorBlendState, CompareOp, CullMode, DynamicState, FrontFace, PipelineVariant, PolygonMode,
    PrimitiveTopology, SwapchainResource, VertexInputRate, VertexLayout,
};
use discovery_engine::discovery::Result;
use discovery_engine::{engine_debug, engine_err, engine_warn};

use crate::vulkan::VulkanRenderer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_shader::{stage_flags_to_vk, undeclared_bindings, ShaderModule};

// ===== Pipeline state conversions =====

pub fn topology_to_vk(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
        PrimitiveTopology::PointList => vk::PrimitiveTopology::POINT_LIST,
    }
}

pub fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

pub fn front_face_to_vk(face: FrontFace) -> vk::FrontFace {
    match face {
        FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
        FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
    }
}

pub fn polygon_mode_to_vk(mode: PolygonMode) -> vk::PolygonMode {
    match mode {
        PolygonMode::Fill => vk::PolygonMode::FILL,
        PolygonMode::Line => vk::PolygonMode::LINE,
        PolygonMode::Point => vk::PolygonMode::POINT,
    }
}

pub fn compare_op_to_vk(op: CompareOp) -> vk::CompareOp {
    match op {
        CompareOp::Never => vk::CompareOp::NEVER,
        CompareOp::Less => vk::CompareOp::LESS,
        CompareOp::Equal => vk::CompareOp::EQUAL,
        CompareOp::LessOrEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOp::Greater => vk::CompareOp::GREATER,
        CompareOp::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareOp::GreaterOrEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareOp::Always => vk::CompareOp::ALWAYS,
    }
}

pub fn blend_factor_to_vk(factor: BlendFactor) -> vk::BlendFactor {
    match factor {
        BlendFactor::Zero => vk::BlendFactor::ZERO,
        BlendFactor::One => vk::BlendFactor::ONE,
        BlendFactor::SrcAlpha => vk::BlendFactor::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => vk::BlendFactor::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => vk::BlendFactor::ONE_MINUS_DST_ALPHA,
    }
}

pub fn blend_op_to_vk(op: BlendOp) -> vk::BlendOp {
    match op {
        BlendOp::Add => vk::BlendOp::ADD,
        BlendOp::Subtract => vk::BlendOp::SUBTRACT,
        BlendOp::Min => vk::BlendOp::MIN,
        BlendOp::Max => vk::BlendOp::MAX,
    }
}

pub fn buffer_format_to_vk(format: BufferFormat) -> vk::Format {
    match format {
        BufferFormat::R32_SFLOAT => vk::Format::R32_SFLOAT,
        BufferFormat::R32G32_SFLOAT => vk::Format::R32G32_SFLOAT,
        BufferFormat::R32G32B32_SFLOAT => vk::Format::R32G32B32_SFLOAT,
        BufferFormat::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
        BufferFormat::R32_UINT => vk::Format::R32_UINT,
        BufferFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
    }
}

pub fn dynamic_state_to_vk(state: DynamicState) -> vk::DynamicState {
    match state {
        DynamicState::Viewport => vk::DynamicState::VIEWPORT,
        DynamicState::Scissor => vk::DynamicState::SCISSOR,
        DynamicState::LineWidth => vk::DynamicState::LINE_WIDTH,
    }
}

pub fn binding_kind_to_vk(kind: BindingKind) -> vk::DescriptorType {
    match kind {
        BindingKind::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        BindingKind::CombinedImageSampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
    }
}

/// Layout bindings of one set, one descriptor each
pub fn set_layout_bindings(
    declarations: &[BindingDeclaration],
) -> Vec<vk::DescriptorSetLayoutBinding<'static>> {
    declarations
        .iter()
        .map(|declaration| {
            vk::DescriptorSetLayoutBinding::default()
                .binding(declaration.binding)
                .descriptor_type(binding_kind_to_vk(declaration.kind))
                .descriptor_count(1)
                .stage_flags(stage_flags_to_vk(declaration.stages))
        })
        .collect()
}

/// Blend state of the single color attachment
pub fn color_blend_attachment(state: &ColorBlendState) -> vk::PipelineColorBlendAttachmentState {
    let attachment = vk::PipelineColorBlendAttachmentState::default()
        .color_write_mask(vk::ColorComponentFlags::RGBA)
        .blend_enable(state.blend_enable);

    if !state.blend_enable {
        return attachment;
    }
    attachment
        .src_color_blend_factor(blend_factor_to_vk(state.src_color_factor))
        .dst_color_blend_factor(blend_factor_to_vk(state.dst_color_factor))
        .color_blend_op(blend_op_to_vk(state.color_blend_op))
        .src_alpha_blend_factor(blend_factor_to_vk(state.src_alpha_factor))
        .dst_alpha_blend_factor(blend_factor_to_vk(state.dst_alpha_factor))
        .alpha_blend_op(blend_op_to_vk(state.alpha_blend_op))
}

/// Vertex binding and attribute descriptions
pub fn vertex_input_descriptions(
    layout: &VertexLayout,
) -> (Vec<vk::VertexInputBindingDescription>, Vec<vk::VertexInputAttributeDescription>) {
    let bindings = layout
        .bindings
        .iter()
        .map(|binding| vk::VertexInputBindingDescription {
            binding: binding.binding,
            stride: binding.stride,
            input_rate: match binding.input_rate {
                VertexInputRate::Vertex => vk::VertexInputRate::VERTEX,
                VertexInputRate::Instance => vk::VertexInputRate::INSTANCE,
            },
        })
        .collect();

    let attributes = layout
        .attributes
        .iter()
        .map(|attribute| vk::VertexInputAttributeDescription {
            location: attribute.location,
            binding: attribute.binding,
            format: buffer_format_to_vk(attribute.format),
            offset: attribute.offset,
        })
        .collect();

    (bindings, attributes)
}

// ===== PIPELINE =====

/// Graphics pipeline built from a variant
pub struct Pipeline {
    ctx: Arc<GpuContext>,
    variant: Box<dyn PipelineVariant>,
    /// Declarations grouped by set; index = native set index
    groups: Vec<Vec<BindingDeclaration>>,
    shaders: Vec<ShaderModule>,
    dynamic_states: Vec<DynamicState>,
    set_layouts: Vec<vk::DescriptorSetLayout>,
    layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
}

impl Pipeline {
    /// Load the variant's shaders and build the pipeline against `render_pass`
    ///
    /// # Panics
    ///
    /// Panics when the variant declares no shader stages, or declares the same
    /// (set, binding) pair twice.
    pub fn new(
        ctx: Arc<GpuContext>,
        variant: Box<dyn PipelineVariant>,
        render_pass: vk::RenderPass,
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let stages = variant.shader_stages();
        assert!(!stages.is_empty(), "pipeline variant declares no shader stages");

        let declarations = variant.binding_declarations();
        let groups = group_declarations(&declarations);

        let shaders = stages
            .iter()
            .map(|desc| ShaderModule::load(Arc::clone(&ctx), desc))
            .collect::<Result<Vec<_>>>()?;

        for shader in &shaders {
            let missing = undeclared_bindings(shader.bindings(), &declarations);
            if !missing.is_empty() {
                engine_warn!(
                    "discovery::vulkan",
                    "{:?} shader uses undeclared bindings (set, binding): {:?}",
                    shader.stage(),
                    missing
                );
            }
        }

        let dynamic_states = variant.dynamic_states();
        let mut pipeline = Self {
            ctx,
            variant,
            groups,
            shaders,
            dynamic_states,
            set_layouts: Vec::new(),
            layout: vk::PipelineLayout::null(),
            pipeline: vk::Pipeline::null(),
        };
        pipeline.build(render_pass, extent)?;
        Ok(pipeline)
    }

    /// Native pipeline handle (null while released)
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Native pipeline layout (null while released)
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }

    pub fn is_built(&self) -> bool {
        self.pipeline != vk::Pipeline::null()
    }

    pub fn variant(&self) -> &dyn PipelineVariant {
        self.variant.as_ref()
    }

    /// Number of native descriptor sets, including empty gap sets
    pub fn set_count(&self) -> usize {
        self.groups.len()
    }

    /// Declarations of `set`, empty when the set is not declared
    pub fn declarations(&self, set: u32) -> &[BindingDeclaration] {
        self.groups.get(set as usize).map_or(&[], Vec::as_slice)
    }

    /// First binding slot of `kind` in `set`
    pub fn binding_of(&self, set: u32, kind: BindingKind) -> Option<u32> {
        self.declarations(set)
            .iter()
            .find(|d| d.kind == kind)
            .map(|d| d.binding)
    }

    pub fn has_dynamic_state(&self, state: DynamicState) -> bool {
        self.dynamic_states.contains(&state)
    }

    /// Descriptor-set layout of `set`
    ///
    /// # Panics
    ///
    /// Panics when the variant declares no binding in `set`.
    pub fn descriptor_set_layout(&self, set: u32) -> vk::DescriptorSetLayout {
        match self.groups.get(set as usize) {
            Some(group) if !group.is_empty() => self.set_layouts[set as usize],
            _ => panic!("descriptor set {} is not declared by this pipeline", set),
        }
    }

    /// Create set layouts, pipeline layout and pipeline against `render_pass`
    pub fn build(&mut self, render_pass: vk::RenderPass, extent: vk::Extent2D) -> Result<()> {
        let result = self.create_native(render_pass, extent);
        if result.is_err() {
            self.destroy_native();
        }
        result
    }

    fn create_native(&mut self, render_pass: vk::RenderPass, extent: vk::Extent2D) -> Result<()> {
        let device = &self.ctx.device;
        let fixed = self.variant.fixed_function();

        unsafe {
            for group in &self.groups {
                let bindings = set_layout_bindings(group);
                let layout_create = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);

                let set_layout = device
                    .create_descriptor_set_layout(&layout_create, None)
                    .map_err(|e| engine_err!("discovery::vulkan", "Failed to create descriptor set layout: {:?}", e))?;
                self.set_layouts.push(set_layout);
            }

            let layout_create_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&self.set_layouts);
            self.layout = device
                .create_pipeline_layout(&layout_create_info, None)
                .map_err(|e| engine_err!("discovery::vulkan", "Failed to create pipeline layout: {:?}", e))?;

            let shader_stages: Vec<_> = self.shaders.iter().map(ShaderModule::stage_info).collect();

            // Vertex input state
            let (vertex_bindings, vertex_attributes) = vertex_input_descriptions(&self.variant.vertex_layout());
            let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
                .vertex_binding_descriptions(&vertex_bindings)
                .vertex_attribute_descriptions(&vertex_attributes);

            // Input assembly state
            let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
                .topology(topology_to_vk(fixed.topology))
                .primitive_restart_enable(false);

            // Viewport state: the full swapchain extent unless set dynamically
            let viewports = [vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            }];
            let scissors = [vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            }];
            let viewport_state = vk::PipelineViewportStateCreateInfo::default()
                .viewports(&viewports)
                .scissors(&scissors);

            // Rasterization state
            let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
                .depth_clamp_enable(false)
                .rasterizer_discard_enable(false)
                .polygon_mode(polygon_mode_to_vk(fixed.rasterization.polygon_mode))
                .line_width(fixed.rasterization.line_width)
                .cull_mode(cull_mode_to_vk(fixed.rasterization.cull_mode))
                .front_face(front_face_to_vk(fixed.rasterization.front_face))
                .depth_bias_enable(false);

            // Depth/stencil state
            let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
                .depth_test_enable(fixed.depth.test_enable)
                .depth_write_enable(fixed.depth.write_enable)
                .depth_compare_op(compare_op_to_vk(fixed.depth.compare_op))
                .depth_bounds_test_enable(false)
                .stencil_test_enable(false);

            // Multisample state
            let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
                .sample_shading_enable(false)
                .rasterization_samples(vk::SampleCountFlags::TYPE_1);

            // Color blend state
            let color_blend_attachment = color_blend_attachment(&fixed.color_blend);
            let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
                .logic_op_enable(false)
                .attachments(std::slice::from_ref(&color_blend_attachment));

            // Dynamic state
            let dynamic_states: Vec<vk::DynamicState> =
                self.dynamic_states.iter().copied().map(dynamic_state_to_vk).collect();
            let dynamic_state = vk::PipelineDynamicStateCreateInfo::default()
                .dynamic_states(&dynamic_states);

            let pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
                .stages(&shader_stages)
                .vertex_input_state(&vertex_input_state)
                .input_assembly_state(&input_assembly_state)
                .viewport_state(&viewport_state)
                .rasterization_state(&rasterization_state)
                .depth_stencil_state(&depth_stencil_state)
                .multisample_state(&multisample_state)
                .color_blend_state(&color_blend_state)
                .dynamic_state(&dynamic_state)
                .layout(self.layout)
                .render_pass(render_pass)
                .subpass(0);

            let pipelines = device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_create_info], None)
                .map_err(|e| engine_err!("discovery::vulkan", "Failed to create graphics pipeline: {:?}", e.1))?;
            self.pipeline = pipelines[0];
        }

        engine_debug!(
            "discovery::vulkan",
            "Pipeline built: {} stages, {} sets, {}x{}",
            self.shaders.len(),
            self.set_layouts.len(),
            extent.width,
            extent.height
        );
        Ok(())
    }

    /// Destroy the pipeline, its layout and set layouts; shaders and declarations are kept
    pub fn destroy_native(&mut self) {
        let device = &self.ctx.device;
        unsafe {
            if self.pipeline != vk::Pipeline::null() {
                device.destroy_pipeline(self.pipeline, None);
                self.pipeline = vk::Pipeline::null();
            }
            if self.layout != vk::PipelineLayout::null() {
                device.destroy_pipeline_layout(self.layout, None);
                self.layout = vk::PipelineLayout::null();
            }
            for set_layout in self.set_layouts.drain(..) {
                device.destroy_descriptor_set_layout(set_layout, None);
            }
        }
    }
}

impl SwapchainResource<VulkanRenderer> for Pipeline {
    fn release(&mut self, _host: &VulkanRenderer) {
        self.destroy_native();
    }

    fn rebuild(&mut self, host: &VulkanRenderer) -> Result<()> {
        self.build(host.render_pass(), host.extent())
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe { self.ctx.device.device_wait_idle().ok(); }
        self.destroy_native();
    }
}

#[cfg(test)]
#[path = "vulkan_pipeline_tests.rs"]
mod tests;
