/// Sampler - the texture sampler shared by every sampler binding

use crate::vulkan_context::{vk_error, GpuContext};
use ash::vk;
use discovery_engine::discovery::Result;
use std::sync::Arc;

/// Highest anisotropy ever requested
pub const MAX_ANISOTROPY: f32 = 16.0;

/// Linear/repeat sampler create info
///
/// Anisotropic filtering is enabled at `min(16, limit)` when the device
/// supports it (`limit` is `Some`).
pub fn sampler_create_info(anisotropy_limit: Option<f32>) -> vk::SamplerCreateInfo<'static> {
    let info = vk::SamplerCreateInfo::default()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
        .address_mode_u(vk::SamplerAddressMode::REPEAT)
        .address_mode_v(vk::SamplerAddressMode::REPEAT)
        .address_mode_w(vk::SamplerAddressMode::REPEAT)
        .mip_lod_bias(0.0)
        .compare_enable(false)
        .compare_op(vk::CompareOp::ALWAYS)
        .min_lod(0.0)
        .max_lod(0.0)
        .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
        .unnormalized_coordinates(false);

    match anisotropy_limit {
        Some(limit) => info
            .anisotropy_enable(true)
            .max_anisotropy(MAX_ANISOTROPY.min(limit)),
        None => info.anisotropy_enable(false).max_anisotropy(1.0),
    }
}

/// Owned VkSampler
pub struct Sampler {
    ctx: Arc<GpuContext>,
    sampler: vk::Sampler,
}

impl Sampler {
    pub fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let info = sampler_create_info(ctx.max_anisotropy);
        let sampler = unsafe {
            ctx.device
                .create_sampler(&info, None)
                .map_err(|e| vk_error("create sampler", e))?
        };
        Ok(Self { ctx, sampler })
    }

    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe { self.ctx.device.destroy_sampler(self.sampler, None); }
    }
}

#[cfg(test)]
#[path = "vulkan_sampler_tests.rs"]
mod tests;
