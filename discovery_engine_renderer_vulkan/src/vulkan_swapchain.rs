/// Swapchain bundle - presentable images, shared depth target, render pass, framebuffers
///
/// Built in full from the surface at a given drawable size and destroyed in
/// full on resize or when presentation reports the swapchain out of date.

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use discovery_engine::discovery::{Error, Result};
use discovery_engine::{engine_debug, engine_error};

use crate::vulkan_context::{vk_error, GpuContext};

/// Depth formats tried in order
pub const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

// ===== SELECTION RULES =====

/// Prefer B8G8R8A8_SRGB / SRGB_NONLINEAR, otherwise the first reported format
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_SRGB
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| formats.first())
        .copied()
}

/// MAILBOX when available, otherwise FIFO (always supported)
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// The surface's extent when fixed, else the drawable size clamped to the surface limits
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// One more than the minimum, capped by the maximum (0 = no maximum)
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// First candidate whose optimal-tiling features allow depth/stencil attachments
///
/// `optimal_features` returns the optimal tiling features of a format.
pub fn find_depth_format<F>(optimal_features: F) -> Result<vk::Format>
where
    F: Fn(vk::Format) -> vk::FormatFeatureFlags,
{
    DEPTH_FORMAT_CANDIDATES
        .iter()
        .copied()
        .find(|&format| {
            optimal_features(format).contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        })
        .ok_or_else(|| {
            engine_error!("discovery::vulkan", "No supported depth format among {:?}", DEPTH_FORMAT_CANDIDATES);
            Error::NoSupportedDepthFormat
        })
}

/// Image aspects of a depth format
pub fn depth_aspect(format: vk::Format) -> vk::ImageAspectFlags {
    match format {
        vk::Format::D32_SFLOAT_S8_UINT | vk::Format::D24_UNORM_S8_UINT | vk::Format::D16_UNORM_S8_UINT => {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        }
        _ => vk::ImageAspectFlags::DEPTH,
    }
}

/// Query the depth format for `physical_device`
pub(crate) fn query_depth_format(ctx: &GpuContext) -> Result<vk::Format> {
    find_depth_format(|format| unsafe {
        ctx.instance()
            .get_physical_device_format_properties(ctx.physical_device, format)
            .optimal_tiling_features
    })
}

// ===== BUNDLE =====

/// Depth image shared by every framebuffer
#[derive(Default)]
pub struct DepthTarget {
    pub image: vk::Image,
    pub allocation: Option<Allocation>,
    pub view: vk::ImageView,
    pub format: vk::Format,
}

/// Everything derived from the surface at one drawable size
#[derive(Default)]
pub struct SwapchainBundle {
    pub swapchain: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    pub present_mode: vk::PresentModeKHR,
    pub depth: DepthTarget,
    pub render_pass: vk::RenderPass,
    pub framebuffers: Vec<vk::Framebuffer>,
}

/// Surface and loaders a bundle is built from
pub struct SurfaceTarget<'a> {
    pub surface_loader: &'a ash::khr::surface::Instance,
    pub surface: vk::SurfaceKHR,
    pub swapchain_loader: &'a ash::khr::swapchain::Device,
}

impl SwapchainBundle {
    /// Build a complete bundle for a `width` x `height` drawable
    ///
    /// On failure everything created so far is destroyed again.
    pub fn build(
        ctx: &GpuContext,
        target: &SurfaceTarget<'_>,
        depth_format: vk::Format,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let mut bundle = Self::default();
        match bundle.create(ctx, target, depth_format, width, height) {
            Ok(()) => {
                engine_debug!(
                    "discovery::vulkan",
                    "Swapchain built: {}x{}, {} images, {:?}, {:?}",
                    bundle.extent.width,
                    bundle.extent.height,
                    bundle.images.len(),
                    bundle.format,
                    bundle.present_mode
                );
                Ok(bundle)
            }
            Err(e) => {
                bundle.destroy(ctx, target.swapchain_loader);
                Err(e)
            }
        }
    }

    /// Number of presentable images
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Whether the bundle holds a live swapchain
    pub fn is_built(&self) -> bool {
        self.swapchain != vk::SwapchainKHR::null()
    }

    fn create(
        &mut self,
        ctx: &GpuContext,
        target: &SurfaceTarget<'_>,
        depth_format: vk::Format,
        width: u32,
        height: u32,
    ) -> Result<()> {
        unsafe {
            let capabilities = target
                .surface_loader
                .get_physical_device_surface_capabilities(ctx.physical_device, target.surface)
                .map_err(|e| {
                    engine_error!("discovery::vulkan", "Failed to get surface capabilities: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get surface capabilities: {:?}", e))
                })?;

            let formats = target
                .surface_loader
                .get_physical_device_surface_formats(ctx.physical_device, target.surface)
                .map_err(|e| {
                    engine_error!("discovery::vulkan", "Failed to query surface formats: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get surface formats: {:?}", e))
                })?;

            let present_modes = target
                .surface_loader
                .get_physical_device_surface_present_modes(ctx.physical_device, target.surface)
                .map_err(|e| {
                    engine_error!("discovery::vulkan", "Failed to query present modes: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get present modes: {:?}", e))
                })?;

            let surface_format = choose_surface_format(&formats).ok_or_else(|| {
                engine_error!("discovery::vulkan", "Surface reports no formats");
                Error::InitializationFailed("Surface reports no formats".to_string())
            })?;

            self.format = surface_format.format;
            self.present_mode = choose_present_mode(&present_modes);
            self.extent = choose_extent(&capabilities, width, height);

            let queue_families = [ctx.graphics_queue_family, ctx.present_queue_family];
            let mut swapchain_create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(target.surface)
                .min_image_count(choose_image_count(&capabilities))
                .image_format(surface_format.format)
                .image_color_space(surface_format.color_space)
                .image_extent(self.extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(self.present_mode)
                .clipped(true);

            swapchain_create_info = if ctx.graphics_queue_family != ctx.present_queue_family {
                swapchain_create_info
                    .image_sharing_mode(vk::SharingMode::CONCURRENT)
                    .queue_family_indices(&queue_families)
            } else {
                swapchain_create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            };

            self.swapchain = target
                .swapchain_loader
                .create_swapchain(&swapchain_create_info, None)
                .map_err(|e| {
                    engine_error!("discovery::vulkan", "Failed to create swapchain: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
                })?;

            self.images = target
                .swapchain_loader
                .get_swapchain_images(self.swapchain)
                .map_err(|e| {
                    engine_error!("discovery::vulkan", "Failed to get swapchain images: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get swapchain images: {:?}", e))
                })?;

            for &image in &self.images {
                let view = create_image_view(&ctx.device, image, self.format, vk::ImageAspectFlags::COLOR)?;
                self.image_views.push(view);
            }

            self.create_depth_target(ctx, depth_format)?;
            self.render_pass = create_render_pass(&ctx.device, self.format, depth_format)?;

            for &view in &self.image_views {
                let attachments = [view, self.depth.view];
                let framebuffer_info = vk::FramebufferCreateInfo::default()
                    .render_pass(self.render_pass)
                    .attachments(&attachments)
                    .width(self.extent.width)
                    .height(self.extent.height)
                    .layers(1);

                let framebuffer = ctx
                    .device
                    .create_framebuffer(&framebuffer_info, None)
                    .map_err(|e| {
                        engine_error!("discovery::vulkan", "Failed to create framebuffer: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create framebuffer: {:?}", e))
                    })?;
                self.framebuffers.push(framebuffer);
            }

            Ok(())
        }
    }

    fn create_depth_target(&mut self, ctx: &GpuContext, format: vk::Format) -> Result<()> {
        unsafe {
            self.depth.format = format;

            let image_create_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format)
                .extent(vk::Extent3D {
                    width: self.extent.width,
                    height: self.extent.height,
                    depth: 1,
                })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            self.depth.image = ctx
                .device
                .create_image(&image_create_info, None)
                .map_err(|e| vk_error("create depth image", e))?;

            let requirements = ctx.device.get_image_memory_requirements(self.depth.image);
            let allocation = ctx.allocate("depth_target", requirements, MemoryLocation::GpuOnly, false)?;

            ctx.device
                .bind_image_memory(self.depth.image, allocation.memory(), allocation.offset())
                .map_err(|e| vk_error("bind depth image memory", e))?;
            self.depth.allocation = Some(allocation);

            self.depth.view = create_image_view(&ctx.device, self.depth.image, format, depth_aspect(format))?;
            Ok(())
        }
    }

    /// Destroy framebuffers, depth target, render pass, image views, then the swapchain
    ///
    /// Null handles are skipped, so a partially built bundle can be destroyed.
    pub fn destroy(&mut self, ctx: &GpuContext, swapchain_loader: &ash::khr::swapchain::Device) {
        unsafe {
            for framebuffer in self.framebuffers.drain(..) {
                ctx.device.destroy_framebuffer(framebuffer, None);
            }

            if self.depth.view != vk::ImageView::null() {
                ctx.device.destroy_image_view(self.depth.view, None);
            }
            if let Some(allocation) = self.depth.allocation.take() {
                ctx.free(allocation);
            }
            if self.depth.image != vk::Image::null() {
                ctx.device.destroy_image(self.depth.image, None);
            }
            self.depth = DepthTarget::default();

            if self.render_pass != vk::RenderPass::null() {
                ctx.device.destroy_render_pass(self.render_pass, None);
                self.render_pass = vk::RenderPass::null();
            }

            for view in self.image_views.drain(..) {
                ctx.device.destroy_image_view(view, None);
            }
            self.images.clear();

            if self.swapchain != vk::SwapchainKHR::null() {
                swapchain_loader.destroy_swapchain(self.swapchain, None);
                self.swapchain = vk::SwapchainKHR::null();
            }
        }
    }
}

/// 2D view over the first mip level and layer of `image`
pub(crate) fn create_image_view(
    device: &ash::Device,
    image: vk::Image,
    format: vk::Format,
    aspect_mask: vk::ImageAspectFlags,
) -> Result<vk::ImageView> {
    let create_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        })
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        });

    unsafe {
        device
            .create_image_view(&create_info, None)
            .map_err(|e| vk_error("create image view", e))
    }
}

/// Color + depth render pass with one subpass
///
/// Color: CLEAR/STORE, UNDEFINED -> PRESENT_SRC. Depth: CLEAR/DONT_CARE.
pub(crate) fn create_render_pass(
    device: &ash::Device,
    color_format: vk::Format,
    depth_format: vk::Format,
) -> Result<vk::RenderPass> {
    let attachments = [
        vk::AttachmentDescription::default()
            .format(color_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR),
        vk::AttachmentDescription::default()
            .format(depth_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
    ];

    let color_attachment_ref = vk::AttachmentReference::default()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    let depth_attachment_ref = vk::AttachmentReference::default()
        .attachment(1)
        .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(std::slice::from_ref(&color_attachment_ref))
        .depth_stencil_attachment(&depth_attachment_ref);

    let stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS;
    let dependency = vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(stages)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(stages)
        .dst_access_mask(
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        );

    let render_pass_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(std::slice::from_ref(&subpass))
        .dependencies(std::slice::from_ref(&dependency));

    unsafe {
        device.create_render_pass(&render_pass_info, None).map_err(|e| {
            engine_error!("discovery::vulkan", "Failed to create render pass: {:?}", e);
            Error::InitializationFailed(format!("Failed to create render pass: {:?}", e))
        })
    }
}

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;
