/// GpuContext - Shared device state for all Vulkan objects
///
/// Contains everything needed for GPU operations:
/// - Device for Vulkan API calls
/// - Allocator for memory management
/// - Graphics and present queues
/// - The command pool used for per-image and one-shot command buffers
///
/// Every resource keeps an `Arc<GpuContext>`, so the device is destroyed
/// exactly once, after the last buffer, texture, pipeline or recorder.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator};
use gpu_allocator::{AllocationError, MemoryLocation};
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};
use discovery_engine::discovery::{Error, Result};
use discovery_engine::{engine_debug, engine_err, engine_error};

/// Shared GPU context for all Vulkan resources.
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// Physical device the logical device was created on
    pub physical_device: vk::PhysicalDevice,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop so it is dropped BEFORE the device is destroyed
    pub allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Graphics queue for command submission
    pub graphics_queue: vk::Queue,
    pub graphics_queue_family: u32,

    /// Present queue (same handle as graphics when one family supports both)
    pub present_queue: vk::Queue,
    pub present_queue_family: u32,

    /// Command pool created with RESET_COMMAND_BUFFER
    pub command_pool: Mutex<vk::CommandPool>,

    /// Maximum sampler anisotropy, `None` when the device does not support it
    pub max_anisotropy: Option<f32>,

    /// Vulkan instance, destroyed last
    pub(crate) instance: ash::Instance,

    /// Debug utils loader (for validation layers)
    pub(crate) debug_utils_loader: Option<ash::ext::debug_utils::Instance>,

    /// Debug messenger handle
    pub(crate) debug_messenger: Option<vk::DebugUtilsMessengerEXT>,

    /// Loader library, must outlive the instance
    _entry: ash::Entry,
}

impl GpuContext {
    /// Create a new GPU context
    ///
    /// # Arguments
    ///
    /// * `entry` - Loaded Vulkan library
    /// * `instance` - Vulkan instance
    /// * `device` - Vulkan logical device
    /// * `physical_device` - Physical device of `device`
    /// * `allocator` - GPU memory allocator
    /// * `queues` - (graphics queue, graphics family, present queue, present family)
    /// * `command_pool` - Resettable command pool on the graphics family
    /// * `max_anisotropy` - Sampler anisotropy limit if supported
    /// * `debug` - Debug utils loader and messenger (if validation enabled)
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        entry: ash::Entry,
        instance: ash::Instance,
        device: ash::Device,
        physical_device: vk::PhysicalDevice,
        allocator: Allocator,
        queues: (vk::Queue, u32, vk::Queue, u32),
        command_pool: vk::CommandPool,
        max_anisotropy: Option<f32>,
        debug: (Option<ash::ext::debug_utils::Instance>, Option<vk::DebugUtilsMessengerEXT>),
    ) -> Self {
        let (graphics_queue, graphics_queue_family, present_queue, present_queue_family) = queues;
        let (debug_utils_loader, debug_messenger) = debug;
        Self {
            device,
            physical_device,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            graphics_queue,
            graphics_queue_family,
            present_queue,
            present_queue_family,
            command_pool: Mutex::new(command_pool),
            max_anisotropy,
            instance,
            debug_utils_loader,
            debug_messenger,
            _entry: entry,
        }
    }

    /// Vulkan instance
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Block until the device is idle
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| engine_err!("discovery::vulkan", "Failed to wait idle: {:?}", e))
        }
    }

    /// Lock the shared command pool
    pub fn lock_command_pool(&self) -> Result<MutexGuard<'_, vk::CommandPool>> {
        self.command_pool
            .lock()
            .map_err(|_| engine_err!("discovery::vulkan", "Command pool lock poisoned"))
    }

    /// Allocate GPU memory
    ///
    /// Allocator out-of-memory maps to `Error::OutOfMemory`.
    pub fn allocate(
        &self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: MemoryLocation,
        linear: bool,
    ) -> Result<Allocation> {
        let mut allocator = self
            .allocator
            .lock()
            .map_err(|_| engine_err!("discovery::vulkan", "Allocator lock poisoned"))?;

        allocator
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| match e {
                AllocationError::OutOfMemory => {
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!("discovery::vulkan", "Out of GPU memory for {} ({:.2} MB)", name, size_mb);
                    Error::OutOfMemory
                }
                other => engine_err!("discovery::vulkan", "Failed to allocate memory for {}: {:?}", name, other),
            })
    }

    /// Return an allocation to the allocator
    pub fn free(&self, allocation: Allocation) {
        // Don't panic if lock fails - the owner still destroys its handle
        if let Ok(mut allocator) = self.allocator.lock() {
            allocator.free(allocation).ok();
        }
    }

    /// Record and run a one-shot command buffer on the graphics queue, blocking until done
    pub fn one_shot<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        let pool = self.lock_command_pool()?;

        unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffers = self
                .device
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| vk_error("allocate one-shot command buffer", e))?;
            let command_buffer = command_buffers[0];

            let result = self.run_one_shot(command_buffer, record);
            self.device.free_command_buffers(*pool, &command_buffers);
            result
        }
    }

    unsafe fn run_one_shot<F>(&self, command_buffer: vk::CommandBuffer, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        self.device
            .begin_command_buffer(command_buffer, &begin_info)
            .map_err(|e| engine_err!("discovery::vulkan", "Failed to begin one-shot command buffer: {:?}", e))?;

        record(&self.device, command_buffer);

        self.device
            .end_command_buffer(command_buffer)
            .map_err(|e| engine_err!("discovery::vulkan", "Failed to end one-shot command buffer: {:?}", e))?;

        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

        self.device
            .queue_submit(self.graphics_queue, &[submit_info], vk::Fence::null())
            .map_err(|e| vk_error("submit one-shot command buffer", e))?;

        self.device
            .queue_wait_idle(self.graphics_queue)
            .map_err(|e| engine_err!("discovery::vulkan", "Failed to wait for one-shot command buffer: {:?}", e))
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            let pool = match self.command_pool.get_mut() {
                Ok(pool) => *pool,
                Err(poisoned) => *poisoned.into_inner(),
            };
            self.device.destroy_command_pool(pool, None);

            // Free VkDeviceMemory pages BEFORE destroying the device
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);

            #[cfg(feature = "vulkan-validation")]
            crate::debug::cleanup_debug_config();

            if let (Some(debug_utils), Some(messenger)) =
                (&self.debug_utils_loader, self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
        engine_debug!("discovery::vulkan", "GPU context destroyed");
    }
}

/// Map a failed Vulkan call to an engine error
///
/// Host and device out-of-memory codes become `Error::OutOfMemory`.
pub fn vk_error(what: &str, result: vk::Result) -> Error {
    match result {
        vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
            engine_error!("discovery::vulkan", "Out of memory: failed to {}: {:?}", what, result);
            Error::OutOfMemory
        }
        other => engine_err!("discovery::vulkan", "Failed to {}: {:?}", what, other),
    }
}

#[cfg(test)]
#[path = "vulkan_context_tests.rs"]
mod tests;
