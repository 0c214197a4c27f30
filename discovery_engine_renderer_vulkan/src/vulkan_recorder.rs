/// Command recorders - one native command buffer per swapchain image
///
/// What gets recorded is pluggable through `RecordCommands`; `SceneDraw` is
/// the scene-graph implementation. Recorders register with the renderer and
/// are driven through swapchain recreation like pipelines.

use ash::vk;
use std::sync::{Arc, Mutex};
use discovery_engine::glam::Mat4;
use discovery_engine::discovery::render::{
    BindingKind, ClearValue, CommandBufferLevel, CommandList, DynamicState, RecorderConfig, Rect2D,
    SwapchainResource, Viewport,
};
use discovery_engine::discovery::scene::{
    RecordStats, Scene, SceneBindingLayout, SceneBindings, SceneRecorder, TextureSlot,
};
use discovery_engine::discovery::{Error, Result};
use discovery_engine::{engine_debug, engine_err, engine_trace};
use rustc_hash::FxHashMap;

use crate::vulkan::VulkanRenderer;
use crate::vulkan_buffer::Buffer;
use crate::vulkan_command_list::{RenderTarget, VulkanCommandList};
use crate::vulkan_context::{vk_error, GpuContext};
use crate::vulkan_descriptor::{SamplerBinding, UniformBuffer};
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_sampler::Sampler;
use crate::vulkan_texture::Texture;

/// Everything a recording pass may use besides the command list
pub struct RecordTarget<'a> {
    /// Context for lazily created descriptor-backed resources
    pub ctx: &'a Arc<GpuContext>,
    pub pipeline: &'a Pipeline,
    pub image_index: u32,
    pub image_count: usize,
    pub extent: vk::Extent2D,
    pub clear_values: &'a [ClearValue],
    pub default_texture: &'a Arc<Texture>,
    pub sampler: &'a Arc<Sampler>,
}

/// Content of a recorder's command buffers
pub trait RecordCommands {
    /// Record the commands of `target.image_index` between `begin` and `end`
    fn record(&mut self, cmd: &mut VulkanCommandList<'_>, target: &RecordTarget<'_>) -> Result<()>;

    /// The swapchain image count changed; per-image resources must be recreated
    fn image_count_changed(&mut self, _image_count: usize) {}
}

/// Owner of one command buffer per swapchain image
pub struct CommandRecorder<R: RecordCommands> {
    ctx: Arc<GpuContext>,
    config: RecorderConfig,
    pipeline: Arc<Mutex<Pipeline>>,
    commands: R,
    command_buffers: Vec<vk::CommandBuffer>,
    /// Image count the per-image state was created for
    image_count: usize,
}

impl<R: RecordCommands> CommandRecorder<R> {
    /// Allocate and record one command buffer per image of `host`'s swapchain
    pub fn new(
        host: &VulkanRenderer,
        pipeline: Arc<Mutex<Pipeline>>,
        commands: R,
        config: RecorderConfig,
    ) -> Result<Self> {
        let mut recorder = Self {
            ctx: Arc::clone(host.context()),
            config,
            pipeline,
            commands,
            command_buffers: Vec::new(),
            image_count: host.image_count(),
        };
        recorder.allocate(host.image_count())?;
        recorder.record_all(host)?;
        Ok(recorder)
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Number of allocated command buffers (0 while released)
    pub fn command_buffer_count(&self) -> usize {
        self.command_buffers.len()
    }

    /// Command buffer of `image_index`
    pub fn command_buffer(&self, image_index: u32) -> Result<vk::CommandBuffer> {
        self.command_buffers
            .get(image_index as usize)
            .copied()
            .ok_or_else(|| {
                engine_err!(
                    "discovery::recorder",
                    "No command buffer for image {} ({} allocated)",
                    image_index,
                    self.command_buffers.len()
                )
            })
    }

    pub fn commands(&self) -> &R {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut R {
        &mut self.commands
    }

    pub fn pipeline(&self) -> &Arc<Mutex<Pipeline>> {
        &self.pipeline
    }

    /// Re-record the command buffer of `image_index`
    ///
    /// The caller guarantees the buffer is not pending on the GPU.
    pub fn record(&mut self, host: &VulkanRenderer, image_index: u32) -> Result<()> {
        let command_buffer = self.command_buffer(image_index)?;
        let framebuffer = host.framebuffer(image_index)?;

        let pipeline = self
            .pipeline
            .lock()
            .map_err(|_| engine_err!("discovery::recorder", "Pipeline lock poisoned"))?;

        let target = RecordTarget {
            ctx: host.context(),
            pipeline: &pipeline,
            image_index,
            image_count: host.image_count(),
            extent: host.extent(),
            clear_values: &self.config.clear_values,
            default_texture: host.default_texture(),
            sampler: host.sampler(),
        };

        let mut cmd = VulkanCommandList::new(
            &self.ctx.device,
            command_buffer,
            RenderTarget {
                render_pass: host.render_pass(),
                framebuffer,
                extent: host.extent(),
            },
            self.config.level,
            self.config.one_time_submit,
        );

        cmd.begin()?;
        self.commands.record(&mut cmd, &target)?;
        cmd.end()?;

        engine_trace!("discovery::recorder", "Recorded command buffer of image {}", image_index);
        Ok(())
    }

    fn record_all(&mut self, host: &VulkanRenderer) -> Result<()> {
        for image_index in 0..self.command_buffers.len() {
            self.record(host, image_index as u32)?;
        }
        Ok(())
    }

    fn allocate(&mut self, count: usize) -> Result<()> {
        let pool = self.ctx.lock_command_pool()?;
        let level = match self.config.level {
            CommandBufferLevel::Primary => vk::CommandBufferLevel::PRIMARY,
            CommandBufferLevel::Secondary => vk::CommandBufferLevel::SECONDARY,
        };

        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(*pool)
            .level(level)
            .command_buffer_count(count as u32);

        self.command_buffers = unsafe {
            self.ctx
                .device
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| vk_error("allocate command buffers", e))?
        };
        Ok(())
    }

    fn free(&mut self) {
        if self.command_buffers.is_empty() {
            return;
        }
        let pool = match self.ctx.command_pool.lock() {
            Ok(pool) => *pool,
            Err(poisoned) => *poisoned.into_inner(),
        };
        unsafe {
            self.ctx.device.free_command_buffers(pool, &self.command_buffers);
        }
        self.command_buffers.clear();
    }
}

impl<R: RecordCommands> SwapchainResource<VulkanRenderer> for CommandRecorder<R> {
    fn release(&mut self, _host: &VulkanRenderer) {
        self.free();
    }

    fn rebuild(&mut self, host: &VulkanRenderer) -> Result<()> {
        let image_count = host.image_count();
        if image_count != self.image_count {
            engine_debug!(
                "discovery::recorder",
                "Image count changed {} -> {}, dropping per-image resources",
                self.image_count,
                image_count
            );
            self.commands.image_count_changed(image_count);
            self.image_count = image_count;
        }

        self.free();
        self.allocate(image_count)?;
        self.record_all(host)
    }
}

impl<R: RecordCommands> Drop for CommandRecorder<R> {
    fn drop(&mut self) {
        unsafe { self.ctx.device.device_wait_idle().ok(); }
        self.free();
    }
}

// ===== SCENE DRAW =====

/// Descriptor-backed resources created while recording a scene
struct SceneResources {
    layout: SceneBindingLayout,
    view_projection: Mat4,
    view_projection_uniform: Option<UniformBuffer<Mat4>>,
    node_uniforms: FxHashMap<usize, UniformBuffer<Mat4>>,
    default_textures: FxHashMap<TextureSlot, SamplerBinding>,
}

/// Drop per-node entries of nodes past the end of the scene; returns how many went
pub(crate) fn prune_node_entries<V>(entries: &mut FxHashMap<usize, V>, node_count: usize) -> usize {
    let before = entries.len();
    entries.retain(|&node_index, _| node_index < node_count);
    before - entries.len()
}

impl SceneResources {
    fn clear(&mut self) {
        self.view_projection_uniform = None;
        self.node_uniforms.clear();
        self.default_textures.clear();
    }
}

/// Records a scene graph with `SceneRecorder`
pub struct SceneDraw {
    scene: Scene<Buffer>,
    textures: Vec<Arc<Texture>>,
    recorder: SceneRecorder<SamplerBinding>,
    resources: SceneResources,
    last_stats: RecordStats,
}

impl SceneDraw {
    /// Draw `scene`, sampling `textures` by index
    pub fn new(scene: Scene<Buffer>, textures: Vec<Arc<Texture>>, layout: SceneBindingLayout) -> Self {
        Self {
            scene,
            textures,
            recorder: SceneRecorder::new(layout.clone()),
            resources: SceneResources {
                layout,
                view_projection: Mat4::IDENTITY,
                view_projection_uniform: None,
                node_uniforms: FxHashMap::default(),
                default_textures: FxHashMap::default(),
            },
            last_stats: RecordStats::default(),
        }
    }

    pub fn scene(&self) -> &Scene<Buffer> {
        &self.scene
    }

    /// Mutable scene; changes show up the next time an image is recorded
    pub fn scene_mut(&mut self) -> &mut Scene<Buffer> {
        &mut self.scene
    }

    /// Camera matrix written into the view/projection uniform at every recording
    pub fn set_view_projection(&mut self, view_projection: Mat4) {
        self.resources.view_projection = view_projection;
    }

    pub fn view_projection(&self) -> Mat4 {
        self.resources.view_projection
    }

    pub fn view_projection_uniform(&self) -> Option<&UniformBuffer<Mat4>> {
        self.resources.view_projection_uniform.as_ref()
    }

    /// Transform uniform of `node_index`, once the node has been drawn
    pub fn node_uniform(&self, node_index: usize) -> Option<&UniformBuffer<Mat4>> {
        self.resources.node_uniforms.get(&node_index)
    }

    pub fn node_uniform_count(&self) -> usize {
        self.resources.node_uniforms.len()
    }

    /// Cached binding of `texture_index`
    pub fn texture_binding(&self, texture_index: usize) -> Option<&SamplerBinding> {
        self.recorder.cached_texture_binding(texture_index)
    }

    pub fn cached_texture_count(&self) -> usize {
        self.recorder.cached_texture_count()
    }

    /// Counters of the most recent recording
    pub fn last_stats(&self) -> RecordStats {
        self.last_stats
    }
}

impl RecordCommands for SceneDraw {
    fn record(&mut self, cmd: &mut VulkanCommandList<'_>, target: &RecordTarget<'_>) -> Result<()> {
        if target.pipeline.has_dynamic_state(DynamicState::Viewport) {
            cmd.set_viewport(Viewport::from_extent(target.extent.width, target.extent.height))?;
        }
        if target.pipeline.has_dynamic_state(DynamicState::Scissor) {
            cmd.set_scissor(Rect2D::from_extent(target.extent.width, target.extent.height))?;
        }

        let pruned = prune_node_entries(&mut self.resources.node_uniforms, self.scene.nodes.len());
        if pruned > 0 {
            engine_debug!("discovery::recorder", "Dropped {} transform uniforms of removed nodes", pruned);
        }

        let mut frame = SceneFrame {
            resources: &mut self.resources,
            textures: &self.textures,
            target,
        };

        self.last_stats = self.recorder.record(
            cmd,
            &mut frame,
            target.pipeline,
            &self.scene,
            target.image_index,
            target.clear_values,
        )?;
        Ok(())
    }

    fn image_count_changed(&mut self, _image_count: usize) {
        self.recorder.clear_cache();
        self.resources.clear();
    }
}

/// Scene bindings backed by the resources of one `SceneDraw` for one recording
struct SceneFrame<'a> {
    resources: &'a mut SceneResources,
    textures: &'a [Arc<Texture>],
    target: &'a RecordTarget<'a>,
}

impl SceneFrame<'_> {
    /// Uniform binding slot of `set`, or an error when the pipeline declares none
    fn uniform_binding(&self, set: u32) -> Result<u32> {
        self.target
            .pipeline
            .binding_of(set, BindingKind::UniformBuffer)
            .ok_or_else(|| {
                Error::InvalidResource(format!("pipeline declares no uniform buffer in set {}", set))
            })
    }

    fn sampler_binding(&self, texture: Arc<Texture>, set: u32) -> Result<SamplerBinding> {
        let binding = self
            .target
            .pipeline
            .binding_of(set, BindingKind::CombinedImageSampler)
            .ok_or_else(|| {
                Error::InvalidResource(format!("pipeline declares no sampler in set {}", set))
            })?;

        SamplerBinding::new(
            Arc::clone(self.target.ctx),
            binding,
            self.target.pipeline.descriptor_set_layout(set),
            self.target.image_count,
            texture,
            Arc::clone(self.target.sampler),
        )
    }
}

impl SceneBindings for SceneFrame<'_> {
    type Group = vk::DescriptorSet;
    type TextureBinding = SamplerBinding;

    fn view_projection(&mut self, image_index: u32) -> Result<vk::DescriptorSet> {
        let value = self.resources.view_projection;
        if self.resources.view_projection_uniform.is_none() {
            let set = self.resources.layout.view_projection;
            let uniform = UniformBuffer::new(
                Arc::clone(self.target.ctx),
                self.uniform_binding(set)?,
                self.target.pipeline.descriptor_set_layout(set),
                self.target.image_count,
                value,
            )?;
            self.resources.view_projection_uniform = Some(uniform);
        }

        let uniform = self
            .resources
            .view_projection_uniform
            .as_mut()
            .ok_or_else(|| engine_err!("discovery::recorder", "View/projection uniform missing"))?;
        uniform.set(value);
        uniform.update(image_index)?;
        uniform.descriptor_set(image_index)
    }

    fn default_texture(&mut self, slot: TextureSlot, image_index: u32) -> Result<vk::DescriptorSet> {
        if !self.resources.default_textures.contains_key(&slot) {
            let set = self
                .resources
                .layout
                .textures
                .iter()
                .find(|(s, _)| *s == slot)
                .map(|(_, set)| *set)
                .ok_or_else(|| {
                    Error::InvalidResource(format!("texture slot {:?} has no set in the binding layout", slot))
                })?;
            let binding = self.sampler_binding(Arc::clone(self.target.default_texture), set)?;
            self.resources.default_textures.insert(slot, binding);
        }

        self.resources
            .default_textures
            .get(&slot)
            .map(|binding| binding.descriptor_set(image_index))
            .ok_or_else(|| engine_err!("discovery::recorder", "Default texture binding missing"))
    }

    fn create_texture_binding(&mut self, texture_index: usize, set: u32) -> Result<SamplerBinding> {
        let texture = self.textures.get(texture_index).cloned().ok_or_else(|| {
            Error::InvalidResource(format!(
                "texture index {} out of range ({} textures)",
                texture_index,
                self.textures.len()
            ))
        })?;
        engine_debug!("discovery::recorder", "Creating sampler binding for texture {}", texture_index);
        self.sampler_binding(texture, set)
    }

    fn texture_group(&self, binding: &SamplerBinding, image_index: u32) -> vk::DescriptorSet {
        binding.descriptor_set(image_index)
    }

    fn node_transform(&mut self, node_index: usize, image_index: u32, world: &Mat4) -> Result<vk::DescriptorSet> {
        if !self.resources.node_uniforms.contains_key(&node_index) {
            let set = self.resources.layout.node_transform;
            let uniform = UniformBuffer::new(
                Arc::clone(self.target.ctx),
                self.uniform_binding(set)?,
                self.target.pipeline.descriptor_set_layout(set),
                self.target.image_count,
                *world,
            )?;
            self.resources.node_uniforms.insert(node_index, uniform);
        }

        let uniform = self
            .resources
            .node_uniforms
            .get_mut(&node_index)
            .ok_or_else(|| engine_err!("discovery::recorder", "Transform uniform of node {} missing", node_index))?;
        uniform.set(*world);
        uniform.update(image_index)?;
        uniform.descriptor_set(image_index)
    }
}

#[cfg(test)]
#[path = "vulkan_recorder_tests.rs"]
mod tests;
