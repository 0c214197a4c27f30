/// Frame synchronization objects and the Vulkan side of frame pacing

use ash::prelude::VkResult;
use ash::vk;
use discovery_engine::discovery::render::{FrameSync, SwapchainStatus, MAX_FRAMES_IN_FLIGHT};
use discovery_engine::discovery::{Error, Result};
use discovery_engine::{engine_err, engine_error};

use crate::vulkan_context::{vk_error, GpuContext};

/// Semaphores and fences of every frame slot
pub struct FrameSyncObjects {
    pub image_available: Vec<vk::Semaphore>,
    pub render_finished: Vec<vk::Semaphore>,
    /// Created signalled so the first wait of each slot returns immediately
    pub in_flight: Vec<vk::Fence>,
}

impl FrameSyncObjects {
    /// Create the objects of `MAX_FRAMES_IN_FLIGHT` frame slots
    pub fn new(device: &ash::Device) -> Result<Self> {
        let mut objects = Self {
            image_available: Vec::with_capacity(MAX_FRAMES_IN_FLIGHT),
            render_finished: Vec::with_capacity(MAX_FRAMES_IN_FLIGHT),
            in_flight: Vec::with_capacity(MAX_FRAMES_IN_FLIGHT),
        };

        let semaphore_info = vk::SemaphoreCreateInfo::default();
        let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);

        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            let created = unsafe {
                device.create_semaphore(&semaphore_info, None).and_then(|available| {
                    objects.image_available.push(available);
                    device.create_semaphore(&semaphore_info, None)
                })
                .and_then(|finished| {
                    objects.render_finished.push(finished);
                    device.create_fence(&fence_info, None)
                })
            };

            match created {
                Ok(fence) => objects.in_flight.push(fence),
                Err(e) => {
                    engine_error!("discovery::vulkan", "Failed to create frame sync objects: {:?}", e);
                    objects.destroy(device);
                    return Err(Error::InitializationFailed(format!(
                        "Failed to create frame sync objects: {:?}",
                        e
                    )));
                }
            }
        }

        Ok(objects)
    }

    /// Destroy every semaphore and fence
    pub fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            for semaphore in self.image_available.drain(..).chain(self.render_finished.drain(..)) {
                device.destroy_semaphore(semaphore, None);
            }
            for fence in self.in_flight.drain(..) {
                device.destroy_fence(fence, None);
            }
        }
    }
}

/// Map the result of `acquire_next_image` to a swapchain status
pub fn acquire_status(result: VkResult<(u32, bool)>) -> Result<(u32, SwapchainStatus)> {
    match result {
        Ok((image_index, false)) => Ok((image_index, SwapchainStatus::Optimal)),
        Ok((image_index, true)) => Ok((image_index, SwapchainStatus::Suboptimal)),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok((0, SwapchainStatus::OutOfDate)),
        Err(e) => Err(vk_error("acquire swapchain image", e)),
    }
}

/// Map the result of `queue_present` to a swapchain status
pub fn present_status(result: VkResult<bool>) -> Result<SwapchainStatus> {
    match result {
        Ok(false) => Ok(SwapchainStatus::Optimal),
        Ok(true) => Ok(SwapchainStatus::Suboptimal),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(SwapchainStatus::OutOfDate),
        Err(e) => Err(vk_error("present swapchain image", e)),
    }
}

/// Borrowed view of the device, swapchain and sync objects for one frame operation
pub struct VulkanFrameSync<'a> {
    ctx: &'a GpuContext,
    swapchain_loader: &'a ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    objects: &'a FrameSyncObjects,
}

impl<'a> VulkanFrameSync<'a> {
    pub fn new(
        ctx: &'a GpuContext,
        swapchain_loader: &'a ash::khr::swapchain::Device,
        swapchain: vk::SwapchainKHR,
        objects: &'a FrameSyncObjects,
    ) -> Self {
        Self { ctx, swapchain_loader, swapchain, objects }
    }
}

impl FrameSync for VulkanFrameSync<'_> {
    type Commands = [vk::CommandBuffer];

    fn wait_for_fence(&self, frame: usize) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .wait_for_fences(&[self.objects.in_flight[frame]], true, u64::MAX)
                .map_err(|e| engine_err!("discovery::vulkan", "Failed to wait for fence: {:?}", e))
        }
    }

    fn reset_fence(&self, frame: usize) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .reset_fences(&[self.objects.in_flight[frame]])
                .map_err(|e| engine_err!("discovery::vulkan", "Failed to reset fence: {:?}", e))
        }
    }

    fn acquire_image(&self, frame: usize) -> Result<(u32, SwapchainStatus)> {
        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                self.objects.image_available[frame],
                vk::Fence::null(),
            )
        };
        acquire_status(result)
    }

    fn submit(&self, frame: usize, _image_index: u32, commands: &[vk::CommandBuffer]) -> Result<()> {
        let wait_semaphores = [self.objects.image_available[frame]];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [self.objects.render_finished[frame]];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(commands)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.ctx
                .device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], self.objects.in_flight[frame])
                .map_err(|e| vk_error("submit command buffers", e))
        }
    }

    fn present(&self, frame: usize, image_index: u32) -> Result<SwapchainStatus> {
        let wait_semaphores = [self.objects.render_finished[frame]];
        let swapchains = [self.swapchain];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe {
            self.swapchain_loader.queue_present(self.ctx.present_queue, &present_info)
        };
        present_status(result)
    }
}

#[cfg(test)]
#[path = "vulkan_frame_tests.rs"]
mod tests;
