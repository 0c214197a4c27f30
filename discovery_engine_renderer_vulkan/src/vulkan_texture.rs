/// Texture - sampled RGBA8 sRGB image uploaded from host pixels

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use std::sync::Arc;
use discovery_engine::discovery::{Error, Result};
use discovery_engine::engine_error;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::{vk_error, GpuContext};
use crate::vulkan_swapchain::create_image_view;

/// Pixel of the default texture bound to unset texture slots
pub const WHITE_PIXEL: [u8; 4] = [255, 255, 255, 255];

/// Format of every uploaded texture
pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;

/// Byte length of a tightly packed RGBA8 image
pub fn expected_rgba8_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(4)
}

/// Check the size and pixel count of an RGBA8 upload
pub fn validate_rgba8(width: u32, height: u32, pixels: &[u8]) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidResource(format!(
            "texture size {}x{} must be non-zero",
            width, height
        )));
    }
    match expected_rgba8_len(width, height) {
        Some(len) if len == pixels.len() => Ok(()),
        expected => Err(Error::InvalidResource(format!(
            "{}x{} RGBA8 texture needs {:?} bytes, got {}",
            width,
            height,
            expected,
            pixels.len()
        ))),
    }
}

/// Device-local 2D texture in SHADER_READ_ONLY_OPTIMAL layout
pub struct Texture {
    ctx: Arc<GpuContext>,
    image: vk::Image,
    view: vk::ImageView,
    allocation: Option<Allocation>,
    width: u32,
    height: u32,
}

impl Texture {
    /// Upload caller-decoded RGBA8 pixels
    ///
    /// Pixels go through a staging buffer and a one-shot command buffer:
    /// UNDEFINED -> TRANSFER_DST_OPTIMAL, copy, -> SHADER_READ_ONLY_OPTIMAL.
    pub fn from_rgba8(ctx: Arc<GpuContext>, width: u32, height: u32, pixels: &[u8]) -> Result<Self> {
        validate_rgba8(width, height, pixels).map_err(|e| {
            engine_error!("discovery::vulkan", "Rejected texture upload: {}", e);
            e
        })?;

        let mut texture = Self {
            ctx: Arc::clone(&ctx),
            image: vk::Image::null(),
            view: vk::ImageView::null(),
            allocation: None,
            width,
            height,
        };

        // Drop cleans up whatever was created before a failure
        texture.create_image()?;
        texture.upload(pixels)?;
        texture.view = create_image_view(&ctx.device, texture.image, TEXTURE_FORMAT, vk::ImageAspectFlags::COLOR)?;
        Ok(texture)
    }

    /// 1x1 opaque white texture
    pub fn white(ctx: Arc<GpuContext>) -> Result<Self> {
        Self::from_rgba8(ctx, 1, 1, &WHITE_PIXEL)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Image view sampled by descriptor sets
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    fn create_image(&mut self) -> Result<()> {
        let ctx = &self.ctx;
        unsafe {
            let image_create_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(TEXTURE_FORMAT)
                .extent(vk::Extent3D { width: self.width, height: self.height, depth: 1 })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            self.image = ctx
                .device
                .create_image(&image_create_info, None)
                .map_err(|e| vk_error("create texture image", e))?;

            let requirements = ctx.device.get_image_memory_requirements(self.image);
            let allocation = ctx.allocate("texture", requirements, MemoryLocation::GpuOnly, false)?;

            let bound = ctx
                .device
                .bind_image_memory(self.image, allocation.memory(), allocation.offset());
            self.allocation = Some(allocation);
            bound.map_err(|e| vk_error("bind texture memory", e))
        }
    }

    fn upload(&self, pixels: &[u8]) -> Result<()> {
        let staging = Buffer::new(
            Arc::clone(&self.ctx),
            pixels.len() as u64,
            vk::BufferUsageFlags::TRANSFER_SRC,
        )?;
        discovery_engine::discovery::render::Buffer::update(&staging, 0, pixels)?;

        let image = self.image;
        let extent = vk::Extent3D { width: self.width, height: self.height, depth: 1 };
        let staging_buffer = staging.handle();

        self.ctx.one_shot(|device, command_buffer| unsafe {
            let subresource_range = vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            };

            let barrier_to_transfer = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(subresource_range)
                .src_access_mask(vk::AccessFlags::empty())
                .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);

            device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier_to_transfer],
            );

            let region = vk::BufferImageCopy::default()
                .buffer_offset(0)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                .image_extent(extent);

            device.cmd_copy_buffer_to_image(
                command_buffer,
                staging_buffer,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );

            let barrier_to_shader = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(subresource_range)
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags::SHADER_READ);

            device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier_to_shader],
            );
        })
        // staging dropped here, after the queue went idle
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            if self.view != vk::ImageView::null() {
                self.ctx.device.destroy_image_view(self.view, None);
            }
            if let Some(allocation) = self.allocation.take() {
                self.ctx.free(allocation);
            }
            if self.image != vk::Image::null() {
                self.ctx.device.destroy_image(self.image, None);
            }
        }
    }
}

#[cfg(test)]
#[path = "vulkan_texture_tests.rs"]
mod tests;
