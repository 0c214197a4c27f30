/// VulkanRenderer - device context, swapchain owner and frame loop
///
/// Owns the surface, the swapchain bundle, the frame sync objects, the frame
/// pacer and the resource registry. Device-level state lives in the shared
/// `GpuContext`, which every resource holds an `Arc` of.
///
/// Frame loop:
///
/// ```text
/// submit(recorder)      acquire (implicit) -> re-record image -> queue submit
/// present()             queue present -> recreate swapchain if needed
/// ```

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle};
use std::ffi::CString;
use std::sync::{Arc, Mutex};
use bytemuck::Pod;
use discovery_engine::discovery::render::{
    CommandBufferLevel, Config, FramePacer, PipelineVariant, RecorderConfig, RenderWindow,
    ResourceRegistry, SwapchainHost, SwapchainResource, ValidationStats,
};
use discovery_engine::discovery::scene::{IndexBuffer, Primitive, Scene, SceneBindingLayout, TextureSlots, Vertex};
use discovery_engine::discovery::{Error, Result};
use discovery_engine::{engine_bail, engine_debug, engine_err, engine_error, engine_info, engine_warn};

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_descriptor::UniformBuffer;
use crate::vulkan_device::{create_logical_device, select_physical_device, SelectedDevice};
use crate::vulkan_frame::{FrameSyncObjects, VulkanFrameSync};
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_recorder::{CommandRecorder, RecordCommands, SceneDraw};
use crate::vulkan_sampler::Sampler;
use crate::vulkan_swapchain::{query_depth_format, SurfaceTarget, SwapchainBundle};
use crate::vulkan_texture::Texture;

const VALIDATION_LAYER: &std::ffi::CStr = c"VK_LAYER_KHRONOS_validation";

/// Device context and presentation engine
pub struct VulkanRenderer {
    ctx: Arc<GpuContext>,
    surface_loader: ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: SwapchainBundle,
    depth_format: vk::Format,
    frame_sync: FrameSyncObjects,
    pacer: FramePacer,
    registry: ResourceRegistry<VulkanRenderer>,
    /// 1x1 white texture bound to unset texture slots
    default_texture: Arc<Texture>,
    sampler: Arc<Sampler>,
    config: Config,
    drawable_size: (u32, u32),
    /// Set by `resize`, consumed by the next recreation
    resized: bool,
}

/// Objects created between the logical device and the `GpuContext`
struct DeviceParts {
    device: ash::Device,
    selected: SelectedDevice,
    allocator: Allocator,
    command_pool: vk::CommandPool,
}

/// Objects created after the `GpuContext`
struct PresentationParts {
    default_texture: Arc<Texture>,
    sampler: Arc<Sampler>,
    depth_format: vk::Format,
    frame_sync: FrameSyncObjects,
    swapchain: SwapchainBundle,
}

impl VulkanRenderer {
    /// Bring up the device context and the first swapchain for `window`
    ///
    /// # Errors
    ///
    /// - `Error::InitializationFailed` when the loader, instance, surface or
    ///   device cannot be created
    /// - `Error::NoSuitableDevice` when no GPU has graphics and present
    ///   queues, the swapchain extension and usable surface formats
    /// - `Error::NoSupportedDepthFormat` when no depth format is usable
    pub fn new<W: RenderWindow>(window: &W, config: Config) -> Result<Self> {
        let entry = unsafe { ash::Entry::load() }.map_err(|e| {
            engine_error!("discovery::vulkan", "Failed to load Vulkan library: {:?}", e);
            Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
        })?;

        let display_handle = window.display_handle().map_err(|e| {
            engine_error!("discovery::vulkan", "Failed to get display handle: {}", e);
            Error::InitializationFailed(format!("Failed to get display handle: {}", e))
        })?;
        let window_handle = window.window_handle().map_err(|e| {
            engine_error!("discovery::vulkan", "Failed to get window handle: {}", e);
            Error::InitializationFailed(format!("Failed to get window handle: {}", e))
        })?;

        let validation = Self::validation_enabled(&entry, &config);
        let instance = Self::create_instance(&entry, display_handle.as_raw(), &config, validation)?;

        let debug = match Self::create_debug_messenger(&entry, &instance, &config, validation) {
            Ok(debug) => debug,
            Err(e) => {
                unsafe { instance.destroy_instance(None); }
                return Err(e);
            }
        };

        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
        let surface = unsafe {
            ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
        };
        let surface = match surface {
            Ok(surface) => surface,
            Err(e) => {
                engine_error!("discovery::vulkan", "Failed to create surface: {:?}", e);
                unsafe { Self::destroy_instance(&instance, &debug); }
                return Err(Error::InitializationFailed(format!("Failed to create surface: {:?}", e)));
            }
        };

        let parts = match Self::create_device(&instance, &surface_loader, surface) {
            Ok(parts) => parts,
            Err(e) => {
                unsafe {
                    surface_loader.destroy_surface(surface, None);
                    Self::destroy_instance(&instance, &debug);
                }
                return Err(e);
            }
        };

        let families = parts.selected.queue_families;
        let (graphics_queue, present_queue) = unsafe {
            (
                parts.device.get_device_queue(families.graphics, 0),
                parts.device.get_device_queue(families.present, 0),
            )
        };

        // From here on the context owns device, allocator, pool, messenger and instance
        let ctx = Arc::new(GpuContext::new(
            entry,
            instance,
            parts.device,
            parts.selected.physical_device,
            parts.allocator,
            (graphics_queue, families.graphics, present_queue, families.present),
            parts.command_pool,
            parts.selected.max_anisotropy,
            debug,
        ));

        let swapchain_loader = ash::khr::swapchain::Device::new(ctx.instance(), &ctx.device);
        let drawable_size = window.drawable_size();

        let presentation = match Self::create_presentation(
            &ctx,
            &surface_loader,
            surface,
            &swapchain_loader,
            drawable_size,
        ) {
            Ok(presentation) => presentation,
            Err(e) => {
                unsafe { surface_loader.destroy_surface(surface, None); }
                return Err(e);
            }
        };

        let pacer = FramePacer::new(presentation.swapchain.image_count());

        engine_info!(
            "discovery::vulkan",
            "Vulkan renderer ready ({}x{}, {} swapchain images, validation {})",
            presentation.swapchain.extent.width,
            presentation.swapchain.extent.height,
            presentation.swapchain.image_count(),
            if validation { "on" } else { "off" }
        );

        Ok(Self {
            ctx,
            surface_loader,
            surface,
            swapchain_loader,
            swapchain: presentation.swapchain,
            depth_format: presentation.depth_format,
            frame_sync: presentation.frame_sync,
            pacer,
            registry: ResourceRegistry::new(),
            default_texture: presentation.default_texture,
            sampler: presentation.sampler,
            config,
            drawable_size,
            resized: false,
        })
    }

    // ===== BRING-UP HELPERS =====

    /// Whether the validation layer is requested, compiled in and installed
    fn validation_enabled(entry: &ash::Entry, config: &Config) -> bool {
        if !config.enable_validation {
            return false;
        }
        if !cfg!(feature = "vulkan-validation") {
            engine_debug!(
                "discovery::vulkan",
                "Validation requested but the vulkan-validation feature is disabled"
            );
            return false;
        }

        let layers = unsafe { entry.enumerate_instance_layer_properties() }.unwrap_or_default();
        let available = layers
            .iter()
            .any(|layer| layer.layer_name_as_c_str().is_ok_and(|name| name == VALIDATION_LAYER));
        if !available {
            engine_warn!("discovery::vulkan", "Validation layer not installed, continuing without it");
        }
        available
    }

    fn create_instance(
        entry: &ash::Entry,
        display_handle: RawDisplayHandle,
        config: &Config,
        validation: bool,
    ) -> Result<ash::Instance> {
        let app_name = CString::new(config.app_name.as_str()).map_err(|e| {
            engine_error!("discovery::vulkan", "Invalid application name: {}", e);
            Error::InitializationFailed(format!("Invalid application name: {}", e))
        })?;
        let (major, minor, patch) = config.app_version;

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, major, minor, patch))
            .engine_name(c"Discovery")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_3);

        let mut extension_names = ash_window::enumerate_required_extensions(display_handle)
            .map_err(|e| {
                engine_error!("discovery::vulkan", "Failed to get required extensions: {}", e);
                Error::InitializationFailed(format!("Failed to get required extensions: {}", e))
            })?
            .to_vec();

        let layer_names = if validation {
            extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&extension_names);

        unsafe {
            entry.create_instance(&create_info, None).map_err(|e| {
                engine_error!("discovery::vulkan", "Failed to create Vulkan instance: {:?}", e);
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })
        }
    }

    #[cfg(feature = "vulkan-validation")]
    fn create_debug_messenger(
        entry: &ash::Entry,
        instance: &ash::Instance,
        config: &Config,
        validation: bool,
    ) -> Result<(Option<ash::ext::debug_utils::Instance>, Option<vk::DebugUtilsMessengerEXT>)> {
        use discovery_engine::discovery::render::DebugSeverity;

        if !validation {
            return Ok((None, None));
        }

        let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);

        crate::debug::init_debug_config(crate::debug::Config {
            severity: config.debug_severity,
            output: config.debug_output.clone(),
            message_filter: config.debug_message_filter,
            break_on_error: config.break_on_validation_error,
            panic_on_error: config.panic_on_error,
            enable_stats: config.enable_validation_stats,
        });

        let severity_flags = match config.debug_severity {
            DebugSeverity::ErrorsOnly => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            DebugSeverity::ErrorsAndWarnings => {
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
            }
            DebugSeverity::All => {
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                    | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
            }
        };

        let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(severity_flags)
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

        let messenger = unsafe {
            debug_utils
                .create_debug_utils_messenger(&debug_info, None)
                .map_err(|e| {
                    crate::debug::cleanup_debug_config();
                    engine_error!("discovery::vulkan", "Failed to create debug messenger: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
                })?
        };

        Ok((Some(debug_utils), Some(messenger)))
    }

    #[cfg(not(feature = "vulkan-validation"))]
    fn create_debug_messenger(
        _entry: &ash::Entry,
        _instance: &ash::Instance,
        _config: &Config,
        _validation: bool,
    ) -> Result<(Option<ash::ext::debug_utils::Instance>, Option<vk::DebugUtilsMessengerEXT>)> {
        Ok((None, None))
    }

    /// Destroy the messenger then the instance, before a context exists
    unsafe fn destroy_instance(
        instance: &ash::Instance,
        debug: &(Option<ash::ext::debug_utils::Instance>, Option<vk::DebugUtilsMessengerEXT>),
    ) {
        if let (Some(debug_utils), Some(messenger)) = debug {
            debug_utils.destroy_debug_utils_messenger(*messenger, None);
        }
        #[cfg(feature = "vulkan-validation")]
        crate::debug::cleanup_debug_config();
        instance.destroy_instance(None);
    }

    fn create_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<DeviceParts> {
        let selected = select_physical_device(instance, surface_loader, surface)?;
        let device = create_logical_device(instance, &selected)?;

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device: selected.physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        });
        let allocator = match allocator {
            Ok(allocator) => allocator,
            Err(e) => {
                engine_error!("discovery::vulkan", "Failed to create GPU allocator: {:?}", e);
                unsafe { device.destroy_device(None); }
                return Err(Error::InitializationFailed(format!("Failed to create allocator: {:?}", e)));
            }
        };

        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(selected.queue_families.graphics)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let command_pool = match unsafe { device.create_command_pool(&pool_info, None) } {
            Ok(pool) => pool,
            Err(e) => {
                engine_error!("discovery::vulkan", "Failed to create command pool: {:?}", e);
                drop(allocator);
                unsafe { device.destroy_device(None); }
                return Err(Error::InitializationFailed(format!("Failed to create command pool: {:?}", e)));
            }
        };

        Ok(DeviceParts {
            device,
            selected,
            allocator,
            command_pool,
        })
    }

    fn create_presentation(
        ctx: &Arc<GpuContext>,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        swapchain_loader: &ash::khr::swapchain::Device,
        (width, height): (u32, u32),
    ) -> Result<PresentationParts> {
        let default_texture = Arc::new(Texture::white(Arc::clone(ctx))?);
        let sampler = Arc::new(Sampler::new(Arc::clone(ctx))?);
        let depth_format = query_depth_format(ctx)?;
        let mut frame_sync = FrameSyncObjects::new(&ctx.device)?;

        let target = SurfaceTarget {
            surface_loader,
            surface,
            swapchain_loader,
        };
        let swapchain = match SwapchainBundle::build(ctx, &target, depth_format, width, height) {
            Ok(swapchain) => swapchain,
            Err(e) => {
                frame_sync.destroy(&ctx.device);
                return Err(e);
            }
        };

        Ok(PresentationParts {
            default_texture,
            sampler,
            depth_format,
            frame_sync,
            swapchain,
        })
    }

    // ===== FRAME LOOP =====

    /// Record a new drawable size; the swapchain is rebuilt at the next frame boundary
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != self.drawable_size {
            engine_debug!("discovery::vulkan", "Resize to {}x{}", width, height);
            self.drawable_size = (width, height);
            self.resized = true;
        }
    }

    /// Acquire the image of the current frame
    ///
    /// Returns the cached index when called twice in a frame. Returns
    /// `Ok(None)` and skips the frame when the drawable is zero-sized or the
    /// swapchain was out of date (it is rebuilt before returning).
    pub fn acquire_next_image(&mut self) -> Result<Option<u32>> {
        if let Some(image_index) = self.pacer.acquired_image() {
            return Ok(Some(image_index));
        }
        if self.is_minimized() {
            return Ok(None);
        }
        if self.resized {
            self.recreate_swapchain()?;
        }

        let sync = VulkanFrameSync::new(
            &self.ctx,
            &self.swapchain_loader,
            self.swapchain.swapchain,
            &self.frame_sync,
        );
        match self.pacer.acquire(&sync)? {
            Some(image_index) => Ok(Some(image_index)),
            None => {
                engine_debug!("discovery::vulkan", "Swapchain out of date on acquire");
                self.recreate_swapchain()?;
                Ok(None)
            }
        }
    }

    /// Re-record and submit `recorder`'s buffer for the image of this frame
    ///
    /// Acquires implicitly. Returns false when the frame was skipped, in
    /// which case `present` must not be called. One submit per frame.
    pub fn submit<R: RecordCommands>(&mut self, recorder: &Arc<Mutex<CommandRecorder<R>>>) -> Result<bool> {
        let Some(image_index) = self.acquire_next_image()? else {
            return Ok(false);
        };
        if self.pacer.submitted() {
            engine_bail!(
                "discovery::vulkan",
                "Image {} already submitted this frame; call present first",
                image_index
            );
        }

        let command_buffer = {
            let mut recorder = recorder
                .lock()
                .map_err(|_| engine_err!("discovery::vulkan", "Recorder lock poisoned"))?;
            if recorder.config().level == CommandBufferLevel::Secondary {
                engine_bail!("discovery::vulkan", "Secondary command buffers cannot be submitted to a queue");
            }
            recorder.record(self, image_index)?;
            recorder.command_buffer(image_index)?
        };

        let sync = VulkanFrameSync::new(
            &self.ctx,
            &self.swapchain_loader,
            self.swapchain.swapchain,
            &self.frame_sync,
        );
        self.pacer.submit(&sync, std::slice::from_ref(&command_buffer))?;
        Ok(true)
    }

    /// Present the image of this frame and advance to the next frame slot
    ///
    /// Rebuilds the swapchain when it is out of date, suboptimal, or the
    /// drawable was resized.
    pub fn present(&mut self) -> Result<()> {
        let sync = VulkanFrameSync::new(
            &self.ctx,
            &self.swapchain_loader,
            self.swapchain.swapchain,
            &self.frame_sync,
        );
        let status = self.pacer.present(&sync)?;

        if status.needs_recreate() || self.resized {
            engine_debug!("discovery::vulkan", "Present reported {:?} (resized: {})", status, self.resized);
            self.recreate_swapchain()?;
        }
        Ok(())
    }

    /// Run the recreation protocol at the current drawable size
    ///
    /// Deferred while the drawable is zero-sized.
    pub fn recreate_swapchain(&mut self) -> Result<()> {
        if self.is_minimized() {
            self.resized = true;
            return Ok(());
        }

        let (width, height) = self.drawable_size;
        let registry = std::mem::take(&mut self.registry);
        let result = registry.recreate(self, width, height);
        self.registry = registry;
        result?;

        self.resized = false;
        Ok(())
    }

    fn is_minimized(&self) -> bool {
        self.drawable_size.0 == 0 || self.drawable_size.1 == 0
    }

    // ===== RESOURCE CREATION =====

    /// Compile `variant` against the current render pass and register it
    pub fn create_pipeline<V: PipelineVariant + 'static>(&mut self, variant: V) -> Result<Arc<Mutex<Pipeline>>> {
        let pipeline = Pipeline::new(
            Arc::clone(&self.ctx),
            Box::new(variant),
            self.render_pass(),
            self.extent(),
        )?;
        let pipeline = Arc::new(Mutex::new(pipeline));
        self.registry.register_pipeline(&pipeline);
        Ok(pipeline)
    }

    /// Create a recorder drawing with `pipeline`, record every image and register it
    pub fn create_recorder<R: RecordCommands + 'static>(
        &mut self,
        pipeline: &Arc<Mutex<Pipeline>>,
        commands: R,
        config: RecorderConfig,
    ) -> Result<Arc<Mutex<CommandRecorder<R>>>> {
        let recorder = CommandRecorder::new(self, Arc::clone(pipeline), commands, config)?;
        let recorder = Arc::new(Mutex::new(recorder));
        self.registry.register_recorder(&recorder);
        Ok(recorder)
    }

    /// Create a recorder drawing `scene`, clearing to `Config::clear_color`
    pub fn create_scene_recorder(
        &mut self,
        pipeline: &Arc<Mutex<Pipeline>>,
        scene: Scene<Buffer>,
        textures: Vec<Arc<Texture>>,
        layout: SceneBindingLayout,
    ) -> Result<Arc<Mutex<CommandRecorder<SceneDraw>>>> {
        let config = RecorderConfig::with_clear_color(self.config.clear_color);
        self.create_recorder(pipeline, SceneDraw::new(scene, textures, layout), config)
    }

    /// Upload caller-decoded RGBA8 pixels
    pub fn create_texture(&self, width: u32, height: u32, pixels: &[u8]) -> Result<Arc<Texture>> {
        Ok(Arc::new(Texture::from_rgba8(Arc::clone(&self.ctx), width, height, pixels)?))
    }

    pub fn create_vertex_buffer(&self, vertices: &[Vertex]) -> Result<Arc<Buffer>> {
        Ok(Arc::new(Buffer::from_slice(
            Arc::clone(&self.ctx),
            vertices,
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?))
    }

    /// Index buffer of 32-bit indices (see `widen_indices`)
    pub fn create_index_buffer(&self, indices: &[u32]) -> Result<Arc<Buffer>> {
        Ok(Arc::new(Buffer::from_slice(
            Arc::clone(&self.ctx),
            indices,
            vk::BufferUsageFlags::INDEX_BUFFER,
        )?))
    }

    /// Vertex buffer, optional index buffer and texture slots of one primitive
    pub fn create_primitive(
        &self,
        vertices: &[Vertex],
        indices: Option<&[u32]>,
        textures: TextureSlots,
    ) -> Result<Primitive<Buffer>> {
        let index_buffer = match indices {
            Some(indices) => Some(IndexBuffer {
                buffer: self.create_index_buffer(indices)?,
                count: indices.len() as u32,
            }),
            None => None,
        };

        Ok(Primitive {
            vertex_buffer: self.create_vertex_buffer(vertices)?,
            vertex_count: vertices.len() as u32,
            index_buffer,
            textures,
        })
    }

    /// Uniform bound at the first uniform binding of `set` in `pipeline`
    pub fn create_uniform<T: Pod>(&self, pipeline: &Pipeline, set: u32, value: T) -> Result<UniformBuffer<T>> {
        let binding = pipeline
            .binding_of(set, discovery_engine::discovery::render::BindingKind::UniformBuffer)
            .ok_or_else(|| Error::InvalidResource(format!("pipeline declares no uniform buffer in set {}", set)))?;
        UniformBuffer::new(
            Arc::clone(&self.ctx),
            binding,
            pipeline.descriptor_set_layout(set),
            self.image_count(),
            value,
        )
    }

    /// Write `value` into the slot of the acquired image only
    pub fn update_uniform<T: Pod>(&self, uniform: &mut UniformBuffer<T>, value: T) -> Result<()> {
        let Some(image_index) = self.pacer.acquired_image() else {
            engine_bail!("discovery::vulkan", "update_uniform called without an acquired image");
        };
        uniform.set(value);
        uniform.update(image_index)
    }

    // ===== REGISTRY =====

    /// Stop driving `resource` through swapchain recreation
    ///
    /// Unknown resources are ignored. Dropping the last handle unregisters implicitly.
    pub fn unregister<R>(&mut self, resource: &Arc<Mutex<R>>) -> bool
    where
        R: SwapchainResource<VulkanRenderer> + 'static,
    {
        self.registry.unregister(resource)
    }

    pub fn pipeline_count(&self) -> usize {
        self.registry.pipeline_count()
    }

    pub fn recorder_count(&self) -> usize {
        self.registry.recorder_count()
    }

    /// Block until the device is idle
    pub fn wait_idle(&self) -> Result<()> {
        self.ctx.wait_idle()
    }

    // ===== ACCESSORS =====

    pub fn context(&self) -> &Arc<GpuContext> {
        &self.ctx
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn image_count(&self) -> usize {
        self.swapchain.image_count()
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent
    }

    pub fn render_pass(&self) -> vk::RenderPass {
        self.swapchain.render_pass
    }

    /// Framebuffer of `image_index`
    pub fn framebuffer(&self, image_index: u32) -> Result<vk::Framebuffer> {
        self.swapchain
            .framebuffers
            .get(image_index as usize)
            .copied()
            .ok_or_else(|| {
                engine_err!(
                    "discovery::vulkan",
                    "No framebuffer for image {} ({} images)",
                    image_index,
                    self.swapchain.framebuffers.len()
                )
            })
    }

    pub fn surface_format(&self) -> vk::Format {
        self.swapchain.format
    }

    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.swapchain.present_mode
    }

    pub fn depth_format(&self) -> vk::Format {
        self.depth_format
    }

    pub fn drawable_size(&self) -> (u32, u32) {
        self.drawable_size
    }

    pub fn current_frame(&self) -> usize {
        self.pacer.current_frame()
    }

    pub fn acquired_image(&self) -> Option<u32> {
        self.pacer.acquired_image()
    }

    pub fn default_texture(&self) -> &Arc<Texture> {
        &self.default_texture
    }

    pub fn sampler(&self) -> &Arc<Sampler> {
        &self.sampler
    }

    /// Validation message counters (zero without the `vulkan-validation` feature)
    pub fn validation_stats(&self) -> ValidationStats {
        #[cfg(feature = "vulkan-validation")]
        {
            crate::debug::get_validation_stats()
        }
        #[cfg(not(feature = "vulkan-validation"))]
        {
            ValidationStats::default()
        }
    }
}

impl SwapchainHost for VulkanRenderer {
    fn wait_idle(&self) -> Result<()> {
        self.ctx.wait_idle()
    }

    fn teardown_swapchain(&mut self) {
        self.swapchain.destroy(&self.ctx, &self.swapchain_loader);
    }

    fn build_swapchain(&mut self, width: u32, height: u32) -> Result<()> {
        let target = SurfaceTarget {
            surface_loader: &self.surface_loader,
            surface: self.surface,
            swapchain_loader: &self.swapchain_loader,
        };
        self.swapchain = SwapchainBundle::build(&self.ctx, &target, self.depth_format, width, height)?;
        self.pacer.reset_images(self.swapchain.image_count());
        Ok(())
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        unsafe { self.ctx.device.device_wait_idle().ok(); }

        self.swapchain.destroy(&self.ctx, &self.swapchain_loader);
        self.frame_sync.destroy(&self.ctx.device);
        unsafe { self.surface_loader.destroy_surface(self.surface, None); }

        // Device and instance go with the last Arc<GpuContext>
        engine_debug!("discovery::vulkan", "Vulkan renderer destroyed");
    }
}
